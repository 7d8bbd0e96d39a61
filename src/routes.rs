use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::protected;
use crate::middleware::{auth, route_guard};
use crate::state::AppState;

/// Full application router: public surface, protected API behind the auth and
/// route-permission middleware, global CORS/trace layers
pub fn app(state: AppState) -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(auth_public_routes())
        // Protected API
        .merge(protected_routes(state.clone()))
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn auth_public_routes() -> Router<AppState> {
    use crate::handlers::public::auth;

    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Session
        .route("/api/auth/whoami", get(protected::auth::whoami))
        .route("/api/auth/session", delete(protected::auth::logout))
        // Account
        .route(
            "/api/users/me",
            get(protected::users::me).put(protected::users::update_me),
        )
        .route("/api/users/me/coins", post(protected::users::grant_coins))
        // Child profiles
        .route(
            "/api/family/children",
            get(protected::children::list).post(protected::children::create),
        )
        .route(
            "/api/family/children/:id",
            get(protected::children::get)
                .put(protected::children::update)
                .delete(protected::children::delete),
        )
        // Content catalog
        .route(
            "/api/content",
            get(protected::content::list).post(protected::content::create),
        )
        .route("/api/content/mine", get(protected::content::mine))
        .route(
            "/api/content/:id",
            get(protected::content::get)
                .put(protected::content::update)
                .delete(protected::content::delete),
        )
        // Purchases
        .route(
            "/api/purchases",
            get(protected::purchases::list).post(protected::purchases::create),
        )
        // Activity tracking
        .route(
            "/api/activities",
            get(protected::activities::list).post(protected::activities::create),
        )
        // Admin permission tooling. Dynamic segments stay trailing so every
        // admin path is resolvable by the route matcher; a mid-path parameter
        // would leave the endpoint permanently unregistered and fail-open.
        .route(
            "/api/admin/routes",
            get(protected::admin::list_routes).post(protected::admin::register_route),
        )
        .route(
            "/api/admin/permissions/:id",
            put(protected::admin::upsert_permission),
        )
        // Innermost first: auth runs before the permission check
        .layer(axum_middleware::from_fn_with_state(
            state.routes.clone(),
            route_guard::route_permission_middleware,
        ))
        .layer(axum_middleware::from_fn(auth::jwt_auth_middleware))
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "Edumart API",
            "version": version,
            "description": "Educational-content marketplace backend",
            "endpoints": {
                "home": "/ (public)",
                "auth": "/auth/register, /auth/login (public)",
                "session": "/api/auth/whoami, /api/auth/session (protected)",
                "users": "/api/users/me (protected)",
                "family": "/api/family/children[/:id] (protected)",
                "content": "/api/content[/:id], /api/content/mine (protected)",
                "purchases": "/api/purchases (protected)",
                "activities": "/api/activities[?child_id=] (protected)",
                "admin": "/api/admin/routes, /api/admin/permissions/:route_id (admin only)",
            }
        }
    }))
}

async fn health() -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match crate::database::manager::DatabaseManager::health_check().await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            axum::response::Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            axum::response::Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
