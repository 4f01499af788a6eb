use crate::handlers::otp::ApiState;
use axum::extract::State;
use axum::{Json, http::StatusCode};
use serde_json::{Value, json};

pub async fn health_check(State(state): State<ApiState>) -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "joinq-auth",
            "version": env!("CARGO_PKG_VERSION"),
            "auth_provider": state.provider.name()
        })),
    )
}
