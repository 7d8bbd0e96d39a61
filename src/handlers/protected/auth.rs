use axum::{extract::State, response::IntoResponse, Extension, Json};
use serde_json::json;

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::state::AppState;

/// GET /api/auth/whoami - Identity of the current caller, straight from the
/// validated token
pub async fn whoami(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    state.sessions.touch(auth_user.id).await;

    Ok(Json(json!({
        "id": auth_user.id,
        "email": auth_user.email,
        "role": auth_user.role,
    })))
}

/// DELETE /api/auth/session - Logout; reports the tracked session duration.
/// The token itself stays valid until expiry, the tracker is telemetry only.
pub async fn logout(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let duration = state.sessions.logout(auth_user.id).await;

    Ok(Json(json!({
        "logged_out": true,
        "session_seconds": duration.map(|d| d.num_seconds()),
    })))
}
