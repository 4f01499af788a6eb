// Router assembly and shared state construction

use crate::auth::{AuthProvider, HostedAuthProvider, MemoryAuthProvider};
use crate::handlers::{health, inactivity, otp, otp::ApiState};
use crate::lifecycle::InactivityConfig;
use crate::middleware::{MemoryRateLimiter, RateLimitConfig, RateLimitState, rate_limit_middleware};
use crate::models::{AppConfig, AuthProviderConfig};
use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Build the auth provider selected by the configuration
pub fn build_provider(config: &AuthProviderConfig) -> Result<Arc<dyn AuthProvider>, String> {
    match config {
        AuthProviderConfig::Hosted(hosted) => {
            info!("Using hosted auth provider at {}", hosted.url);
            let provider = HostedAuthProvider::new(&hosted.url, &hosted.anon_key, hosted.timeout_secs)?;
            Ok(Arc::new(provider))
        }
        AuthProviderConfig::Memory(memory) => {
            info!("Using in-memory auth provider (development only)");
            Ok(Arc::new(MemoryAuthProvider::new(memory.otp_ttl_secs)))
        }
    }
}

/// Shared state with an in-memory rate limiter
pub fn build_state(
    provider: Arc<dyn AuthProvider>,
    rate_limit: RateLimitConfig,
    inactivity: InactivityConfig,
) -> ApiState {
    let limiter = Arc::new(MemoryRateLimiter::new(&rate_limit));

    ApiState {
        provider,
        rate_limit: RateLimitState::new(limiter, rate_limit),
        inactivity: Arc::new(inactivity),
    }
}

pub fn state_from_config(config: &AppConfig) -> Result<ApiState, String> {
    let provider = build_provider(&config.auth_provider)?;
    Ok(build_state(
        provider,
        config.rate_limit.clone(),
        InactivityConfig::from(&config.inactivity),
    ))
}

/// Assemble the HTTP router
pub fn build_router(state: ApiState) -> Router {
    let otp_routes = Router::new()
        .route("/api/auth/login", post(otp::login))
        .route("/api/auth/register", post(otp::register))
        .route("/api/auth/verify", post(otp::verify))
        .route_layer(middleware::from_fn_with_state(
            state.rate_limit.clone(),
            rate_limit_middleware,
        ));

    Router::new()
        .route("/", get(health::health_check))
        .route("/health", get(health::health_check))
        .route("/api/config/inactivity", get(inactivity::inactivity_policy))
        .merge(otp_routes)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
