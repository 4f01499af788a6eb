// OTP abuse protection
// Request quotas per client, plus blocking after repeated wrong codes per client and per account

use async_trait::async_trait;
use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, warn};

/// Backend that tracks request budgets and failed verifications
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Spend one request from `key`'s budget.
    /// Err carries the seconds until the next request is allowed.
    async fn check_request(&self, key: &str) -> Result<(), u64>;

    /// Seconds left on the longest active block among `keys`
    async fn blocked_for(&self, keys: &[&str]) -> Result<Option<u64>, String>;

    /// Count a rejected code against every key.
    /// Returns the block length once any of them crosses the threshold.
    async fn record_failed_verify(&self, keys: &[&str]) -> Result<Option<u64>, String>;

    /// Forget failures after a successful verification
    async fn clear_failures(&self, keys: &[&str]) -> Result<(), String>;
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Requests a client may burst before it is throttled
    pub max_requests: u32,
    /// Seconds to refill a full burst
    pub window_secs: u64,
    /// Wrong codes tolerated per client or account
    pub max_failed_attempts: u32,
    /// How long a client or account stays blocked
    pub block_duration_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window_secs: 60,
            max_failed_attempts: 5,
            block_duration_secs: 300,
        }
    }
}

impl RateLimitConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_requests == 0 {
            return Err("rate_limit.max_requests must be greater than zero".to_string());
        }
        if self.window_secs == 0 {
            return Err("rate_limit.window_secs must be greater than zero".to_string());
        }
        if self.max_failed_attempts == 0 {
            return Err("rate_limit.max_failed_attempts must be greater than zero".to_string());
        }
        if self.block_duration_secs == 0 {
            return Err("rate_limit.block_duration_secs must be greater than zero".to_string());
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct RateLimitState {
    pub limiter: Arc<dyn RateLimiter>,
    pub config: RateLimitConfig,
}

impl RateLimitState {
    pub fn new(limiter: Arc<dyn RateLimiter>, config: RateLimitConfig) -> Self {
        Self { limiter, config }
    }
}

/// Key for the calling client: first X-Forwarded-For hop, then X-Real-IP
pub fn client_key(headers: &HeaderMap) -> String {
    let ip = headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .or_else(|| headers.get("x-real-ip").and_then(|h| h.to_str().ok()))
        .unwrap_or("unknown");

    format!("ip:{}", ip)
}

/// Key for the account a code is being guessed for
pub fn account_key(email: &str) -> String {
    format!("email:{}", email)
}

/// 429 body shared by the middleware and the verify route
pub fn too_many_requests(retry_after: u64) -> (StatusCode, Json<Value>) {
    (
        StatusCode::TOO_MANY_REQUESTS,
        Json(json!({
            "error": "rate_limit_exceeded",
            "error_description": "Too many requests. Please try again later.",
            "retry_after": retry_after
        })),
    )
}

/// Rejects blocked clients and spends one request from the caller's budget
pub async fn rate_limit_middleware(
    State(rate_limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let key = client_key(req.headers());
    debug!("Rate limit check for {}", key);

    match rate_limit.limiter.blocked_for(&[key.as_str()]).await {
        Ok(Some(remaining)) => {
            warn!("Blocked client {} ({}s left)", key, remaining);
            return too_many_requests(remaining).into_response();
        }
        Ok(None) => {}
        Err(e) => warn!("Block lookup failed for {}, allowing request: {}", key, e),
    }

    match rate_limit.limiter.check_request(&key).await {
        Ok(()) => next.run(req).await,
        Err(retry_after) => {
            warn!("Request quota exceeded for {}", key);
            too_many_requests(retry_after).into_response()
        }
    }
}
