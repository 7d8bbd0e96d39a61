use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Purchase {
    pub id: Uuid,
    pub buyer_id: Uuid,
    pub content_id: Uuid,
    pub price_paid: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}
