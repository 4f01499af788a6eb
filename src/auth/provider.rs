// Auth provider abstraction
// OTP delivery and verification are delegated to the hosted BaaS

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Request to email a one-time password
#[derive(Debug, Clone, Serialize)]
pub struct OtpRequest {
    pub email: String,
    /// Create the account if it does not exist yet (registration)
    pub create_user: bool,
    /// Profile metadata stored with a newly created account
    pub metadata: HashMap<String, String>,
}

impl OtpRequest {
    pub fn login(email: String) -> Self {
        Self {
            email,
            create_user: false,
            metadata: HashMap::new(),
        }
    }

    pub fn register(email: String, metadata: HashMap<String, String>) -> Self {
        Self {
            email,
            create_user: true,
            metadata,
        }
    }
}

/// Authenticated user as reported by the provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
}

/// Session issued after a successful OTP verification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub token_type: String,
    pub user: AuthUser,
}

/// Provider errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Provider refused the request (unknown account, bad input, throttled)
    Rejected(String),
    /// Code is wrong, expired, or already used
    InvalidOtp,
    /// Network failure or unexpected response
    Unavailable(String),
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderError::Rejected(msg) => write!(f, "{}", msg),
            ProviderError::InvalidOtp => write!(f, "Invalid or expired verification code"),
            ProviderError::Unavailable(msg) => write!(f, "Auth provider unavailable: {}", msg),
        }
    }
}

impl std::error::Error for ProviderError {}

/// OTP-capable authentication backend
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Short name used in logs and health output
    fn name(&self) -> &str;

    async fn send_otp(&self, request: &OtpRequest) -> Result<(), ProviderError>;

    async fn verify_otp(&self, email: &str, token: &str) -> Result<AuthSession, ProviderError>;
}
