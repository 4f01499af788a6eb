use crate::handlers::otp::ApiState;
use crate::models::InactivityPolicy;
use axum::Json;
use axum::extract::State;

/// Inactivity lock policy for app hosts
/// GET /api/config/inactivity
pub async fn inactivity_policy(State(state): State<ApiState>) -> Json<InactivityPolicy> {
    Json(InactivityPolicy::from(state.inactivity.as_ref()))
}
