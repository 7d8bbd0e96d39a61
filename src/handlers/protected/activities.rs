use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::database::models::Activity;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub child_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct RecordActivityRequest {
    pub child_id: Uuid,
    pub content_id: Uuid,
    pub kind: String,
    #[serde(default)]
    pub points: i64,
}

/// GET /api/activities?child_id=... - Activity history for one of the
/// caller's children. The child is a query parameter, not a path segment, so
/// the route stays a literal path the permission table can match.
pub async fn list(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(params): Query<HistoryParams>,
) -> Result<impl IntoResponse, ApiError> {
    let owned: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM children WHERE id = $1 AND parent_id = $2")
            .bind(params.child_id)
            .bind(auth_user.id)
            .fetch_one(&state.pool)
            .await?;
    if owned == 0 {
        return Err(ApiError::not_found("Child profile not found"));
    }

    let activities = sqlx::query_as::<_, Activity>(
        "SELECT * FROM activities WHERE child_id = $1 ORDER BY created_at DESC",
    )
    .bind(params.child_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(activities))
}

/// POST /api/activities - Record a completed activity and credit the child's
/// points. Insert and credit commit together.
pub async fn create(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<RecordActivityRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.kind.trim().is_empty() {
        return Err(ApiError::bad_request("Activity kind is required"));
    }
    if payload.points < 0 {
        return Err(ApiError::bad_request("Points cannot be negative"));
    }

    let mut tx = state.pool.begin().await?;

    let owned: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM children WHERE id = $1 AND parent_id = $2")
            .bind(payload.child_id)
            .bind(auth_user.id)
            .fetch_one(&mut *tx)
            .await?;
    if owned == 0 {
        return Err(ApiError::not_found("Child profile not found"));
    }

    let activity = sqlx::query_as::<_, Activity>(
        r#"
        INSERT INTO activities (id, child_id, content_id, kind, points_awarded)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(payload.child_id)
    .bind(payload.content_id)
    .bind(payload.kind.trim())
    .bind(payload.points)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("UPDATE children SET points = points + $1, updated_at = now() WHERE id = $2")
        .bind(payload.points)
        .bind(payload.child_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(activity)))
}
