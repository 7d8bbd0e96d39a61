use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::permission::{self, AccessDecision};
use crate::permission::store::RouteStore;

/// Route-permission middleware, run after JWT authentication. Consults the
/// route table for (path, method, role) and admits or rejects the request.
/// Deny is a 403 naming the route and method; a storage failure is a 503,
/// kept distinct so clients can tell "denied" from "broken".
pub async fn route_permission_middleware(
    State(store): State<Arc<dyn RouteStore>>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let auth_user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| {
            ApiError::unauthorized("Authentication required before permission check")
                .into_response()
        })?
        .clone();

    // path_and_query keeps the raw query string; normalization strips it
    let raw_path = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let method = request.method().as_str().to_string();

    let decision = permission::authorize(store.as_ref(), &raw_path, &method, auth_user.role)
        .await
        .map_err(|e| ApiError::from(e).into_response())?;

    match decision {
        AccessDecision::Denied { path, method } => {
            tracing::warn!(%path, %method, role = %auth_user.role, "route permission denied");
            Err(ApiError::route_forbidden(path, method).into_response())
        }
        _ => Ok(next.run(request).await),
    }
}
