// Lifecycle types and inactivity lock configuration

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Application lifecycle state reported by the host platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppLifecycleState {
    Active,
    Inactive,
    Background,
}

impl AppLifecycleState {
    pub fn is_active(self) -> bool {
        self == AppLifecycleState::Active
    }

    pub(crate) fn to_u8(self) -> u8 {
        match self {
            AppLifecycleState::Active => 0,
            AppLifecycleState::Inactive => 1,
            AppLifecycleState::Background => 2,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => AppLifecycleState::Inactive,
            2 => AppLifecycleState::Background,
            _ => AppLifecycleState::Active,
        }
    }
}

impl FromStr for AppLifecycleState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(AppLifecycleState::Active),
            "inactive" => Ok(AppLifecycleState::Inactive),
            "background" => Ok(AppLifecycleState::Background),
            other => Err(format!("Unknown lifecycle state: {}", other)),
        }
    }
}

impl std::fmt::Display for AppLifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AppLifecycleState::Active => "active",
            AppLifecycleState::Inactive => "inactive",
            AppLifecycleState::Background => "background",
        };
        f.write_str(name)
    }
}

/// Inactivity lock configuration
#[derive(Debug, Clone)]
pub struct InactivityConfig {
    /// Background interval after which the session is locked
    pub lock_after: Duration,
    /// Storage key of the last-active timestamp (ms since epoch)
    pub last_active_key: String,
    /// Storage key of the user's biometric preference ("true"/"false")
    pub biometric_preference_key: String,
    /// Route the navigator replaces the stack with on forced logout
    pub login_route: String,
    /// Message shown in the biometric prompt
    pub prompt_message: String,
    /// Cancel button label of the biometric prompt
    pub cancel_label: String,
}

impl Default for InactivityConfig {
    fn default() -> Self {
        Self {
            lock_after: Duration::from_secs(15 * 60),
            last_active_key: "lastActiveTimestamp".to_string(),
            biometric_preference_key: "biometricEnabled".to_string(),
            login_route: "/login".to_string(),
            prompt_message: "Session locked due to inactivity".to_string(),
            cancel_label: "Logout".to_string(),
        }
    }
}

impl InactivityConfig {
    pub fn lock_after_millis(&self) -> i64 {
        i64::try_from(self.lock_after.as_millis()).unwrap_or(i64::MAX)
    }
}

/// Why the monitor forced a logout
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogoutReason {
    /// Platform offers no re-authentication challenge (web)
    NoBiometricSupport,
    /// Biometric prompt failed or was cancelled
    BiometricRejected,
}

/// Why an expired session was left unlocked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnlockedReason {
    /// User has biometrics turned off
    BiometricsDisabled,
    /// No hardware or nothing enrolled
    BiometricsUnavailable,
}

/// What a single lifecycle transition resulted in
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockDecision {
    /// Left the active state; `persisted` is false when the write failed
    Recorded { at_ms: i64, persisted: bool },
    /// Transition with nothing to do (e.g. inactive -> background)
    Ignored,
    /// Foregrounded without a stored timestamp
    FreshSession,
    WithinWindow { elapsed_ms: i64 },
    Reauthenticated { elapsed_ms: i64 },
    LoggedOut { elapsed_ms: i64, reason: LogoutReason },
    LeftUnlocked { elapsed_ms: i64, reason: UnlockedReason },
}

impl LockDecision {
    pub fn is_logout(&self) -> bool {
        matches!(self, LockDecision::LoggedOut { .. })
    }
}
