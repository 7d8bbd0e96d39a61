use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Kinds of catalog items. Stored as TEXT; validated at the API boundary.
pub const CONTENT_KINDS: [&str; 4] = ["story", "quiz", "summary", "game"];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ContentItem {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub kind: String,
    pub body: serde_json::Value,
    pub price: i64,
    pub is_public: bool,
    pub sales: i64,
    /// Set on purchased clones: points at the original item
    pub source_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
