use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Activity {
    pub id: Uuid,
    pub child_id: Uuid,
    pub content_id: Uuid,
    pub kind: String,
    pub points_awarded: i64,
    pub created_at: DateTime<Utc>,
}
