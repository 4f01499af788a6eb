use crate::lifecycle::InactivityConfig;
use serde::{Deserialize, Serialize};

/// Inactivity lock policy as app hosts consume it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InactivityPolicy {
    pub lock_after_secs: u64,
    pub last_active_key: String,
    pub biometric_preference_key: String,
    pub login_route: String,
    pub prompt_message: String,
    pub cancel_label: String,
}

impl From<&InactivityConfig> for InactivityPolicy {
    fn from(config: &InactivityConfig) -> Self {
        Self {
            lock_after_secs: config.lock_after.as_secs(),
            last_active_key: config.last_active_key.clone(),
            biometric_preference_key: config.biometric_preference_key.clone(),
            login_route: config.login_route.clone(),
            prompt_message: config.prompt_message.clone(),
            cancel_label: config.cancel_label.clone(),
        }
    }
}
