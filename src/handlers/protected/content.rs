use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::Role;
use crate::database::models::{content::CONTENT_KINDS, ContentItem};
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub kind: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateContentRequest {
    pub title: String,
    pub kind: String,
    #[serde(default)]
    pub body: serde_json::Value,
    #[serde(default)]
    pub price: i64,
    #[serde(default)]
    pub is_public: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateContentRequest {
    pub title: Option<String>,
    pub body: Option<serde_json::Value>,
    pub price: Option<i64>,
    pub is_public: Option<bool>,
}

/// GET /api/content - Public catalog plus the caller's own items
pub async fn list(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let items = sqlx::query_as::<_, ContentItem>(
        r#"
        SELECT * FROM content
        WHERE (is_public = true OR author_id = $1)
          AND ($2::text IS NULL OR kind = $2)
        ORDER BY created_at DESC
        "#,
    )
    .bind(auth_user.id)
    .bind(params.kind)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(items))
}

/// GET /api/content/mine
pub async fn mine(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let items = sqlx::query_as::<_, ContentItem>(
        "SELECT * FROM content WHERE author_id = $1 ORDER BY created_at DESC",
    )
    .bind(auth_user.id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(items))
}

/// POST /api/content
pub async fn create(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<CreateContentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.title.trim().is_empty() {
        return Err(ApiError::bad_request("Title is required"));
    }
    if !CONTENT_KINDS.contains(&payload.kind.as_str()) {
        return Err(ApiError::bad_request(format!(
            "Kind must be one of: {}",
            CONTENT_KINDS.join(", ")
        )));
    }
    if payload.price < 0 {
        return Err(ApiError::bad_request("Price cannot be negative"));
    }
    // Paid authoring is a teacher privilege; parents share for free
    if payload.price > 0 && auth_user.role == Role::Parent {
        return Err(ApiError::forbidden("Only teachers can publish paid content"));
    }

    let item = sqlx::query_as::<_, ContentItem>(
        r#"
        INSERT INTO content (id, author_id, title, kind, body, price, is_public, sales)
        VALUES ($1, $2, $3, $4, $5, $6, $7, 0)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(auth_user.id)
    .bind(payload.title.trim())
    .bind(&payload.kind)
    .bind(&payload.body)
    .bind(payload.price)
    .bind(payload.is_public)
    .fetch_one(&state.pool)
    .await?;

    Ok((StatusCode::CREATED, Json(item)))
}

/// GET /api/content/:id - Private items are visible to their author and admins
pub async fn get(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let item = sqlx::query_as::<_, ContentItem>("SELECT * FROM content WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Content not found"))?;

    if !item.is_public && item.author_id != auth_user.id && auth_user.role != Role::Admin {
        // Hidden rather than forbidden: private items don't leak their existence
        return Err(ApiError::not_found("Content not found"));
    }

    Ok(Json(item))
}

/// PUT /api/content/:id - Author or admin only; partial update
pub async fn update(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateContentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(price) = payload.price {
        if price < 0 {
            return Err(ApiError::bad_request("Price cannot be negative"));
        }
        if price > 0 && auth_user.role == Role::Parent {
            return Err(ApiError::forbidden("Only teachers can publish paid content"));
        }
    }

    let existing = sqlx::query_as::<_, ContentItem>("SELECT * FROM content WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Content not found"))?;

    if existing.author_id != auth_user.id && auth_user.role != Role::Admin {
        return Err(ApiError::forbidden("Only the author can modify this content"));
    }

    let item = sqlx::query_as::<_, ContentItem>(
        r#"
        UPDATE content
        SET title = COALESCE($1, title),
            body = COALESCE($2, body),
            price = COALESCE($3, price),
            is_public = COALESCE($4, is_public),
            updated_at = now()
        WHERE id = $5
        RETURNING *
        "#,
    )
    .bind(payload.title)
    .bind(payload.body)
    .bind(payload.price)
    .bind(payload.is_public)
    .bind(id)
    .fetch_one(&state.pool)
    .await?;

    Ok(Json(item))
}

/// DELETE /api/content/:id - Author or admin only
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let existing = sqlx::query_as::<_, ContentItem>("SELECT * FROM content WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Content not found"))?;

    if existing.author_id != auth_user.id && auth_user.role != Role::Admin {
        return Err(ApiError::forbidden("Only the author can delete this content"));
    }

    sqlx::query("DELETE FROM content WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await?;

    Ok(Json(json!({ "deleted": true })))
}
