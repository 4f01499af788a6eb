// Native (iOS/Android) platform adapter
// Secure storage plus the device biometric authenticator

use super::biometric::{BiometricAuthenticator, BiometricOutcome, BiometricPrompt};
use super::store::{KeyValueStore, StorageError};
use super::{PlatformCapabilities, PlatformKind};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct NativePlatform {
    store: Arc<dyn KeyValueStore>,
    authenticator: Arc<dyn BiometricAuthenticator>,
}

impl NativePlatform {
    pub fn new(store: Arc<dyn KeyValueStore>, authenticator: Arc<dyn BiometricAuthenticator>) -> Self {
        Self {
            store,
            authenticator,
        }
    }
}

#[async_trait]
impl PlatformCapabilities for NativePlatform {
    fn kind(&self) -> PlatformKind {
        PlatformKind::Native
    }

    fn supports_biometrics(&self) -> bool {
        true
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.store.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.store.set(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.store.delete(key).await
    }

    async fn authenticate_if_available(&self, prompt: &BiometricPrompt) -> BiometricOutcome {
        if !self.authenticator.has_hardware().await {
            debug!("No biometric hardware present");
            return BiometricOutcome::Unavailable;
        }

        if !self.authenticator.is_enrolled().await {
            debug!("No biometric credential enrolled");
            return BiometricOutcome::Unavailable;
        }

        match self.authenticator.authenticate(prompt).await {
            Ok(()) => {
                info!("Biometric re-authentication succeeded");
                BiometricOutcome::Authenticated
            }
            Err(e) => {
                warn!("Biometric re-authentication rejected: {}", e);
                BiometricOutcome::Rejected(e)
            }
        }
    }
}
