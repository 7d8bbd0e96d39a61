use sqlx::PgPool;
use std::sync::Arc;

use crate::permission::store::RouteStore;
use crate::services::purchase::PurchaseLedger;
use crate::services::sessions::SessionTracker;

/// Shared application state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub routes: Arc<dyn RouteStore>,
    pub ledger: Arc<dyn PurchaseLedger>,
    pub sessions: SessionTracker,
}
