use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::Role;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRouteRequest {
    pub path: String,
    pub method: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpsertPermissionRequest {
    pub role: String,
    pub allowed: bool,
}

/// GET /api/admin/routes - The full ACL: every route with its permission rows
pub async fn list_routes(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let routes = state.routes.list_routes().await?;

    let mut entries = Vec::with_capacity(routes.len());
    for route in routes {
        let permissions = state.routes.permissions_for(route.id).await?;
        entries.push(json!({ "route": route, "permissions": permissions }));
    }

    Ok(Json(entries))
}

/// POST /api/admin/routes - Register (or re-describe) a route
pub async fn register_route(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRouteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if !payload.path.starts_with('/') {
        return Err(ApiError::bad_request("Path must start with '/'"));
    }
    let method = payload.method.to_uppercase();
    if !matches!(method.as_str(), "GET" | "POST" | "PUT" | "PATCH" | "DELETE") {
        return Err(ApiError::bad_request("Unsupported HTTP method"));
    }

    let route = state
        .routes
        .register_route(&payload.path, &method, payload.description.as_deref())
        .await?;

    Ok((StatusCode::CREATED, Json(route)))
}

/// PUT /api/admin/permissions/:route_id - Upsert one (role, allowed) row.
/// The route id is the trailing segment so this endpoint is itself resolvable
/// by the matcher and stays admin-only under the seeded ACL. Granting to
/// admin is accepted but redundant: the override policy admits admins
/// regardless of stored rows.
pub async fn upsert_permission(
    State(state): State<AppState>,
    Path(route_id): Path<Uuid>,
    Json(payload): Json<UpsertPermissionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let role = Role::parse(&payload.role)
        .ok_or_else(|| ApiError::bad_request("Role must be parent, teacher or admin"))?;

    let known = state.routes.list_routes().await?;
    if !known.iter().any(|r| r.id == route_id) {
        return Err(ApiError::not_found("Route not found"));
    }

    let permission = state
        .routes
        .upsert_permission(route_id, role, payload.allowed)
        .await?;

    Ok(Json(permission))
}
