use axum::{extract::State, response::IntoResponse, Extension, Json};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::database::models::User;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub plan: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CoinGrantRequest {
    pub amount: i64,
    /// Defaults to the caller; admins may credit any account
    pub user_id: Option<Uuid>,
}

/// GET /api/users/me
pub async fn me(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(auth_user.id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Account not found"))?;

    Ok(Json(user))
}

/// PUT /api/users/me - Partial profile update
pub async fn update_me(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(plan) = payload.plan.as_deref() {
        if !matches!(plan, "free" | "premium") {
            return Err(ApiError::bad_request("Plan must be free or premium"));
        }
    }

    let user = sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET name = COALESCE($1, name),
            plan = COALESCE($2, plan),
            updated_at = now()
        WHERE id = $3
        RETURNING *
        "#,
    )
    .bind(payload.name)
    .bind(payload.plan)
    .bind(auth_user.id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| ApiError::not_found("Account not found"))?;

    Ok(Json(user))
}

/// POST /api/users/me/coins - Coin grant. Reached only by admins under the
/// seeded ACL (no role rows exist for this route).
pub async fn grant_coins(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<CoinGrantRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.amount <= 0 {
        return Err(ApiError::bad_request("Grant amount must be positive"));
    }

    let target = payload.user_id.unwrap_or(auth_user.id);

    let user = sqlx::query_as::<_, User>(
        "UPDATE users SET coins = coins + $1, updated_at = now() WHERE id = $2 RETURNING *",
    )
    .bind(payload.amount)
    .bind(target)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| ApiError::not_found("Account not found"))?;

    tracing::info!(granted_by = %auth_user.id, target = %target, amount = payload.amount, "coin grant");

    Ok(Json(json!({ "user": user, "granted": payload.amount })))
}
