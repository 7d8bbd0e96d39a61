use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::database::models::Purchase;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    pub content_id: Uuid,
}

/// POST /api/purchases - Exchange coins for a catalog item. All effects are
/// applied by the ledger in a single transaction.
pub async fn create(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<PurchaseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state.ledger.purchase(auth_user.id, payload.content_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "purchase": outcome.purchase,
            "content": outcome.cloned,
        })),
    ))
}

/// GET /api/purchases - The caller's purchase history
pub async fn list(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let purchases = sqlx::query_as::<_, Purchase>(
        "SELECT * FROM purchases WHERE buyer_id = $1 ORDER BY created_at DESC",
    )
    .bind(auth_user.id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(purchases))
}
