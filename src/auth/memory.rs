// In-process auth provider for local development and tests
// Issues 6-digit codes and keeps accounts in memory

use super::provider::{AuthProvider, AuthSession, AuthUser, OtpRequest, ProviderError};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

const SESSION_EXPIRES_IN_SECS: i64 = 3600;

#[derive(Debug, Clone)]
struct StoredUser {
    id: Uuid,
    email: String,
    metadata: HashMap<String, String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct PendingOtp {
    code: String,
    expires_at: DateTime<Utc>,
}

pub struct MemoryAuthProvider {
    users: Arc<RwLock<HashMap<String, StoredUser>>>,
    pending: Arc<RwLock<HashMap<String, PendingOtp>>>,
    otp_ttl_secs: i64,
}

impl MemoryAuthProvider {
    pub fn new(otp_ttl_secs: i64) -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
            pending: Arc::new(RwLock::new(HashMap::new())),
            otp_ttl_secs,
        }
    }

    /// Code currently pending for `email`, if any
    pub async fn pending_code(&self, email: &str) -> Option<String> {
        let pending = self.pending.read().await;
        pending.get(email).map(|p| p.code.clone())
    }

    pub async fn user_metadata(&self, email: &str) -> Option<HashMap<String, String>> {
        let users = self.users.read().await;
        users.get(email).map(|u| u.metadata.clone())
    }

    /// Move a pending code's expiry, for exercising the TTL
    pub async fn expire_pending(&self, email: &str) {
        let mut pending = self.pending.write().await;
        if let Some(entry) = pending.get_mut(email) {
            entry.expires_at = Utc::now() - Duration::seconds(1);
        }
    }

    fn generate_code() -> String {
        let mut rng = rand::thread_rng();
        format!("{:06}", rng.gen_range(0..1_000_000))
    }
}

impl Default for MemoryAuthProvider {
    fn default() -> Self {
        Self::new(300)
    }
}

#[async_trait]
impl AuthProvider for MemoryAuthProvider {
    fn name(&self) -> &str {
        "memory"
    }

    async fn send_otp(&self, request: &OtpRequest) -> Result<(), ProviderError> {
        {
            let mut users = self.users.write().await;

            if !users.contains_key(&request.email) {
                if !request.create_user {
                    return Err(ProviderError::Rejected(
                        "Signups not allowed for otp".to_string(),
                    ));
                }

                users.insert(
                    request.email.clone(),
                    StoredUser {
                        id: Uuid::new_v4(),
                        email: request.email.clone(),
                        metadata: request.metadata.clone(),
                        created_at: Utc::now(),
                    },
                );
                info!("Created account for {}", request.email);
            }
        }

        let code = Self::generate_code();
        let now = Utc::now();

        let mut pending = self.pending.write().await;
        let before = pending.len();
        pending.retain(|_, entry| entry.expires_at > now);
        if pending.len() < before {
            debug!("Evicted {} expired codes", before - pending.len());
        }

        debug!("Issued OTP for {}", request.email);
        pending.insert(
            request.email.clone(),
            PendingOtp {
                code,
                expires_at: now + Duration::seconds(self.otp_ttl_secs),
            },
        );

        Ok(())
    }

    async fn verify_otp(&self, email: &str, token: &str) -> Result<AuthSession, ProviderError> {
        {
            let mut pending = self.pending.write().await;

            let Some(entry) = pending.get(email) else {
                return Err(ProviderError::InvalidOtp);
            };

            if Utc::now() > entry.expires_at {
                pending.remove(email);
                return Err(ProviderError::InvalidOtp);
            }

            if entry.code != token {
                return Err(ProviderError::InvalidOtp);
            }

            // Single use
            pending.remove(email);
        }

        let users = self.users.read().await;
        let user = users.get(email).ok_or(ProviderError::InvalidOtp)?;

        debug!(
            "Issuing session for {} (account created {})",
            user.email, user.created_at
        );

        Ok(AuthSession {
            access_token: Uuid::new_v4().to_string(),
            refresh_token: Uuid::new_v4().to_string(),
            expires_in: SESSION_EXPIRES_IN_SECS,
            token_type: "bearer".to_string(),
            user: AuthUser {
                id: user.id.to_string(),
                email: Some(user.email.clone()),
            },
        })
    }
}
