// Platform capability layer
// Storage and biometric access behind one interface, adapter picked at startup

pub mod biometric;
pub mod native;
pub mod navigator;
pub mod store;
pub mod web;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

pub use biometric::{BiometricAuthenticator, BiometricError, BiometricOutcome, BiometricPrompt};
pub use native::NativePlatform;
pub use navigator::{ChannelNavigator, NavigationCommand, Navigator};
pub use store::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore, StorageError};
pub use web::WebPlatform;

/// Which host the app runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformKind {
    Native,
    Web,
}

/// Everything the inactivity monitor needs from the host platform
#[async_trait]
pub trait PlatformCapabilities: Send + Sync {
    fn kind(&self) -> PlatformKind;

    /// Whether a biometric re-authentication challenge can ever be offered
    fn supports_biometrics(&self) -> bool;

    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Prompt for biometrics when hardware is present and enrolled
    async fn authenticate_if_available(&self, prompt: &BiometricPrompt) -> BiometricOutcome;
}

/// Build the platform adapter once at startup.
///
/// A native host without an authenticator falls back to the web adapter, so the
/// lock policy never branches on a missing collaborator later on.
pub fn select_platform(
    kind: PlatformKind,
    store: Arc<dyn KeyValueStore>,
    authenticator: Option<Arc<dyn BiometricAuthenticator>>,
) -> Arc<dyn PlatformCapabilities> {
    match (kind, authenticator) {
        (PlatformKind::Native, Some(authenticator)) => {
            info!("Using native platform adapter");
            Arc::new(NativePlatform::new(store, authenticator))
        }
        (PlatformKind::Native, None) => {
            info!("Native platform without biometric authenticator, using web adapter");
            Arc::new(WebPlatform::new(store))
        }
        (PlatformKind::Web, _) => {
            info!("Using web platform adapter");
            Arc::new(WebPlatform::new(store))
        }
    }
}
