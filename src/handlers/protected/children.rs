use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::database::models::ChildProfile;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateChildRequest {
    pub name: String,
    pub age: i32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateChildRequest {
    pub name: Option<String>,
    pub age: Option<i32>,
}

/// GET /api/family/children
pub async fn list(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let children = sqlx::query_as::<_, ChildProfile>(
        "SELECT * FROM children WHERE parent_id = $1 ORDER BY created_at",
    )
    .bind(auth_user.id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(children))
}

/// POST /api/family/children
pub async fn create(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<CreateChildRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::bad_request("Child name is required"));
    }
    if !(0..=18).contains(&payload.age) {
        return Err(ApiError::bad_request("Age must be between 0 and 18"));
    }

    let child = sqlx::query_as::<_, ChildProfile>(
        r#"
        INSERT INTO children (id, parent_id, name, age)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(auth_user.id)
    .bind(payload.name.trim())
    .bind(payload.age)
    .fetch_one(&state.pool)
    .await?;

    Ok((StatusCode::CREATED, Json(child)))
}

/// GET /api/family/children/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let child = fetch_owned(&state, auth_user.id, id).await?;
    Ok(Json(child))
}

/// PUT /api/family/children/:id - Partial update
pub async fn update(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateChildRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(age) = payload.age {
        if !(0..=18).contains(&age) {
            return Err(ApiError::bad_request("Age must be between 0 and 18"));
        }
    }

    let child = sqlx::query_as::<_, ChildProfile>(
        r#"
        UPDATE children
        SET name = COALESCE($1, name),
            age = COALESCE($2, age),
            updated_at = now()
        WHERE id = $3 AND parent_id = $4
        RETURNING *
        "#,
    )
    .bind(payload.name)
    .bind(payload.age)
    .bind(id)
    .bind(auth_user.id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| ApiError::not_found("Child profile not found"))?;

    Ok(Json(child))
}

/// DELETE /api/family/children/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let result = sqlx::query("DELETE FROM children WHERE id = $1 AND parent_id = $2")
        .bind(id)
        .bind(auth_user.id)
        .execute(&state.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Child profile not found"));
    }

    Ok(Json(json!({ "deleted": true })))
}

async fn fetch_owned(
    state: &AppState,
    parent_id: Uuid,
    child_id: Uuid,
) -> Result<ChildProfile, ApiError> {
    sqlx::query_as::<_, ChildProfile>("SELECT * FROM children WHERE id = $1 AND parent_id = $2")
        .bind(child_id)
        .bind(parent_id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Child profile not found"))
}
