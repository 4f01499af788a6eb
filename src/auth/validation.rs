// Input validation for the OTP routes

use regex::Regex;

lazy_static::lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex");
    static ref OTP_RE: Regex = Regex::new(r"^[0-9]{6}$").expect("valid otp regex");
    static ref PHONE_RE: Regex = Regex::new(r"^\+[1-9][0-9]{7,14}$").expect("valid phone regex");
}

const MAX_FULL_NAME_LEN: usize = 100;

/// Trim and lowercase an email address, rejecting malformed input
pub fn normalize_email(email: &str) -> Result<String, String> {
    let email = email.trim().to_lowercase();

    if email.is_empty() {
        return Err("Email is required".to_string());
    }
    if !EMAIL_RE.is_match(&email) {
        return Err("Invalid email address".to_string());
    }

    Ok(email)
}

/// A verification code is exactly six digits
pub fn validate_otp(token: &str) -> Result<(), String> {
    if token.trim().is_empty() {
        return Err("Verification code is required".to_string());
    }
    if !OTP_RE.is_match(token.trim()) {
        return Err("Verification code must be 6 digits".to_string());
    }
    Ok(())
}

pub fn normalize_full_name(name: &str) -> Result<String, String> {
    let name = name.trim();

    if name.is_empty() {
        return Err("Full name is required".to_string());
    }
    if name.chars().count() > MAX_FULL_NAME_LEN {
        return Err(format!(
            "Full name must be at most {} characters",
            MAX_FULL_NAME_LEN
        ));
    }

    Ok(name.to_string())
}

/// E.164: leading '+', 8 to 15 digits
pub fn validate_phone(phone: &str) -> Result<(), String> {
    if !PHONE_RE.is_match(phone.trim()) {
        return Err("Phone number must be in international format, e.g. +2348012345678".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(
            normalize_email("  Ada@Example.COM ").unwrap(),
            "ada@example.com"
        );
        assert!(normalize_email("").is_err());
        assert!(normalize_email("ada@example").is_err());
        assert!(normalize_email("ada example@x.com").is_err());
    }

    #[test]
    fn test_validate_otp() {
        assert!(validate_otp("123456").is_ok());
        assert!(validate_otp("12345").is_err());
        assert!(validate_otp("1234567").is_err());
        assert!(validate_otp("12a456").is_err());
        assert!(validate_otp("").is_err());
    }

    #[test]
    fn test_full_name_length() {
        assert_eq!(normalize_full_name(" Ada Obi ").unwrap(), "Ada Obi");
        assert!(normalize_full_name("   ").is_err());
        assert!(normalize_full_name(&"x".repeat(101)).is_err());
        assert!(normalize_full_name(&"x".repeat(100)).is_ok());
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("+2348012345678").is_ok());
        assert!(validate_phone("08012345678").is_err());
        assert!(validate_phone("+0123456789").is_err());
        assert!(validate_phone("+1234567").is_err());
    }
}
