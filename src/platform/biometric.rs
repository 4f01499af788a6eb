// Biometric authenticator interface

use async_trait::async_trait;

/// Options passed to the platform biometric prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BiometricPrompt {
    /// Message shown in the system prompt
    pub message: String,
    /// Label of the cancel button
    pub cancel_label: String,
    /// Hide the device passcode/PIN fallback
    pub disable_device_fallback: bool,
}

/// Biometric authentication errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BiometricError {
    /// User pressed the cancel button or dismissed the prompt
    Cancelled,
    /// Prompt timed out per platform default
    Timeout,
    /// Face/fingerprint not recognised, lockout, or system error
    Failed(String),
}

impl std::fmt::Display for BiometricError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BiometricError::Cancelled => write!(f, "Authentication cancelled"),
            BiometricError::Timeout => write!(f, "Authentication timed out"),
            BiometricError::Failed(msg) => write!(f, "Authentication failed: {}", msg),
        }
    }
}

impl std::error::Error for BiometricError {}

/// Device biometric capability and prompt
#[async_trait]
pub trait BiometricAuthenticator: Send + Sync {
    /// Whether biometric hardware is present
    async fn has_hardware(&self) -> bool;

    /// Whether at least one biometric credential is enrolled
    async fn is_enrolled(&self) -> bool;

    /// Show the prompt and wait for the user
    async fn authenticate(&self, prompt: &BiometricPrompt) -> Result<(), BiometricError>;
}

/// Result of an "authenticate if available" request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BiometricOutcome {
    /// No hardware, nothing enrolled, or no biometrics on this platform
    Unavailable,
    Authenticated,
    Rejected(BiometricError),
}
