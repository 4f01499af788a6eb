// Web platform adapter
// Plain persistent key-value storage, no biometric support

use super::biometric::{BiometricOutcome, BiometricPrompt};
use super::store::{KeyValueStore, StorageError};
use super::{PlatformCapabilities, PlatformKind};
use async_trait::async_trait;
use std::sync::Arc;

pub struct WebPlatform {
    store: Arc<dyn KeyValueStore>,
}

impl WebPlatform {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl PlatformCapabilities for WebPlatform {
    fn kind(&self) -> PlatformKind {
        PlatformKind::Web
    }

    fn supports_biometrics(&self) -> bool {
        false
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

    async fn authenticate_if_available(&self, _prompt: &BiometricPrompt) -> BiometricOutcome {
        BiometricOutcome::Unavailable
    }
}
