// OTP login, registration and verification routes
// Validate the payload, then forward to the configured auth provider

use crate::auth::validation::{normalize_email, normalize_full_name, validate_otp, validate_phone};
use crate::auth::{AuthProvider, OtpRequest, ProviderError};
use crate::lifecycle::InactivityConfig;
use crate::middleware::{RateLimitState, account_key, client_key, too_many_requests};
use crate::models::{LoginRequest, OtpSentResponse, RegisterRequest, VerifyRequest, VerifyResponse};
use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

type ApiError = (StatusCode, Json<Value>);

/// State shared by the API handlers
#[derive(Clone)]
pub struct ApiState {
    pub provider: Arc<dyn AuthProvider>,
    pub rate_limit: RateLimitState,
    /// Lock policy served to app hosts
    pub inactivity: Arc<InactivityConfig>,
}

fn bad_request(message: String) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn provider_error(err: ProviderError) -> ApiError {
    let status = match &err {
        ProviderError::Rejected(_) => StatusCode::BAD_REQUEST,
        ProviderError::InvalidOtp => StatusCode::UNAUTHORIZED,
        ProviderError::Unavailable(_) => StatusCode::BAD_GATEWAY,
    };
    (status, Json(json!({ "error": err.to_string() })))
}

/// Send a login code to an existing account
/// POST /api/auth/login
pub async fn login(
    State(state): State<ApiState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<OtpSentResponse>, ApiError> {
    let email = normalize_email(&payload.email).map_err(bad_request)?;

    state
        .provider
        .send_otp(&OtpRequest::login(email.clone()))
        .await
        .map_err(|e| {
            warn!("Login OTP for {} failed: {}", email, e);
            provider_error(e)
        })?;

    info!("Login OTP sent to {}", email);

    Ok(Json(OtpSentResponse {
        message: "OTP sent".to_string(),
        email,
    }))
}

/// Create an account and send its first code
/// POST /api/auth/register
pub async fn register(
    State(state): State<ApiState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<OtpSentResponse>), ApiError> {
    let email = normalize_email(&payload.email).map_err(bad_request)?;
    let full_name = normalize_full_name(&payload.full_name).map_err(bad_request)?;

    let mut metadata = HashMap::new();
    metadata.insert("full_name".to_string(), full_name);

    if let Some(phone) = payload.phone.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
        validate_phone(phone).map_err(bad_request)?;
        metadata.insert("phone".to_string(), phone.to_string());
    }

    state
        .provider
        .send_otp(&OtpRequest::register(email.clone(), metadata))
        .await
        .map_err(|e| {
            warn!("Registration OTP for {} failed: {}", email, e);
            provider_error(e)
        })?;

    info!("Registration OTP sent to {}", email);

    Ok((
        StatusCode::CREATED,
        Json(OtpSentResponse {
            message: "OTP sent".to_string(),
            email,
        }),
    ))
}

/// Exchange a code for a session
/// POST /api/auth/verify
pub async fn verify(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(payload): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let email = normalize_email(&payload.email).map_err(bad_request)?;
    let token = payload.token.trim();
    validate_otp(token).map_err(bad_request)?;

    let client = client_key(&headers);
    let account = account_key(&email);
    let keys = [client.as_str(), account.as_str()];

    match state.rate_limit.limiter.blocked_for(&keys).await {
        Ok(Some(remaining)) => {
            warn!(
                "Verification for {} from {} refused, blocked for {}s",
                email, client, remaining
            );
            return Err(too_many_requests(remaining));
        }
        Ok(None) => {}
        Err(e) => warn!("Block lookup failed for {}: {}", email, e),
    }

    match state.provider.verify_otp(&email, token).await {
        Ok(session) => {
            if let Err(e) = state.rate_limit.limiter.clear_failures(&keys).await {
                warn!("Failed to clear OTP failures for {}: {}", email, e);
            }
            info!("User {} verified", session.user.id);
            Ok(Json(VerifyResponse::from(session)))
        }
        Err(ProviderError::InvalidOtp) => {
            match state.rate_limit.limiter.record_failed_verify(&keys).await {
                Ok(Some(blocked)) => warn!(
                    "Invalid OTP for {} from {}, blocked for {}s",
                    email, client, blocked
                ),
                Ok(None) => warn!("Invalid OTP for {} from {}", email, client),
                Err(e) => warn!("Failed to record invalid OTP for {}: {}", email, e),
            }
            Err(provider_error(ProviderError::InvalidOtp))
        }
        Err(e) => {
            warn!("OTP verification for {} failed: {}", email, e);
            Err(provider_error(e))
        }
    }
}
