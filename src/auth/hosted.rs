// Hosted BaaS auth provider
// Talks to the provider's REST auth endpoints with the project's anon key

use super::provider::{AuthProvider, AuthSession, OtpRequest, ProviderError};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct HostedAuthProvider {
    base_url: String,
    anon_key: String,
    client: reqwest::Client,
}

impl HostedAuthProvider {
    pub fn new(base_url: &str, anon_key: &str, timeout_secs: u64) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    async fn post(&self, path: &str, body: Value) -> Result<(StatusCode, Value), ProviderError> {
        let url = self.endpoint(path);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!("Auth provider request to {} failed: {}", url, e);
                ProviderError::Unavailable(e.to_string())
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::Unavailable(format!("Failed to read response: {}", e)))?;

        // Some endpoints answer 200 with an empty body
        let json = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        Ok((status, json))
    }
}

/// Pull a human readable message out of a provider error body
pub(crate) fn error_message(body: &Value) -> String {
    ["msg", "error_description", "message", "error"]
        .iter()
        .find_map(|field| body.get(*field).and_then(Value::as_str))
        .map(str::to_string)
        .or_else(|| body.as_str().map(str::to_string))
        .unwrap_or_else(|| "Request rejected by auth provider".to_string())
}

#[async_trait]
impl AuthProvider for HostedAuthProvider {
    fn name(&self) -> &str {
        "hosted"
    }

    async fn send_otp(&self, request: &OtpRequest) -> Result<(), ProviderError> {
        let body = json!({
            "email": request.email,
            "create_user": request.create_user,
            "data": request.metadata,
        });

        let (status, json) = self.post("otp", body).await?;

        if status.is_success() {
            info!("OTP sent to {}", request.email);
            Ok(())
        } else if status.is_server_error() {
            Err(ProviderError::Unavailable(format!(
                "Provider returned status {}",
                status
            )))
        } else {
            let message = error_message(&json);
            warn!("OTP request for {} rejected: {}", request.email, message);
            Err(ProviderError::Rejected(message))
        }
    }

    async fn verify_otp(&self, email: &str, token: &str) -> Result<AuthSession, ProviderError> {
        let body = json!({
            "type": "email",
            "email": email,
            "token": token,
        });

        let (status, json) = self.post("verify", body).await?;

        if status.is_success() {
            let session: AuthSession = serde_json::from_value(json).map_err(|e| {
                ProviderError::Unavailable(format!("Malformed session response: {}", e))
            })?;
            info!("OTP verified for {}", email);
            Ok(session)
        } else if status.is_server_error() {
            Err(ProviderError::Unavailable(format!(
                "Provider returned status {}",
                status
            )))
        } else if status == StatusCode::TOO_MANY_REQUESTS {
            Err(ProviderError::Rejected(error_message(&json)))
        } else {
            debug!("OTP verification failed for {}: {}", email, error_message(&json));
            Err(ProviderError::InvalidOtp)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let provider = HostedAuthProvider::new("https://project.example.co/", "anon", 5).unwrap();
        assert_eq!(
            provider.endpoint("otp"),
            "https://project.example.co/auth/v1/otp"
        );
    }

    #[test]
    fn test_error_message_field_priority() {
        let body = json!({"msg": "Signups not allowed for otp", "error": "x"});
        assert_eq!(error_message(&body), "Signups not allowed for otp");

        let body = json!({"error_description": "Token has expired or is invalid"});
        assert_eq!(error_message(&body), "Token has expired or is invalid");

        let body = Value::String("plain text".to_string());
        assert_eq!(error_message(&body), "plain text");

        assert_eq!(
            error_message(&Value::Null),
            "Request rejected by auth provider"
        );
    }

    #[test]
    fn test_session_response_parses() {
        let body = json!({
            "access_token": "at",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "rt",
            "user": {"id": "8d1c", "email": "a@b.co", "aud": "authenticated"}
        });

        let session: AuthSession = serde_json::from_value(body).unwrap();
        assert_eq!(session.user.id, "8d1c");
        assert_eq!(session.expires_in, 3600);
    }
}
