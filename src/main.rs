use std::sync::Arc;

use edumart_api::database::{bootstrap, manager::DatabaseManager};
use edumart_api::permission::store::PgRouteStore;
use edumart_api::services::purchase::PgLedger;
use edumart_api::services::sessions::SessionTracker;
use edumart_api::{app, AppState};

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    // Initialize configuration (this loads the config singleton)
    let config = edumart_api::config::config();
    tracing::info!("Starting Edumart API in {:?} mode", config.environment);

    let pool = DatabaseManager::pool()
        .await
        .unwrap_or_else(|e| panic!("database unavailable at startup: {}", e));

    bootstrap::ensure_schema(&pool)
        .await
        .unwrap_or_else(|e| panic!("schema bootstrap failed: {}", e));
    bootstrap::seed_routes(&pool)
        .await
        .unwrap_or_else(|e| panic!("route seed failed: {}", e));

    let state = AppState {
        pool: pool.clone(),
        routes: Arc::new(PgRouteStore::new(pool.clone())),
        ledger: Arc::new(PgLedger::new(pool)),
        sessions: SessionTracker::new(config.sessions.ttl_minutes),
    };

    state
        .sessions
        .spawn_pruner(std::time::Duration::from_secs(60));

    let app = app(state);

    // Allow tests or deployments to override port via env
    let port = std::env::var("EDUMART_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    println!("🚀 Edumart API server listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}
