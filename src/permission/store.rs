use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::Role;
use crate::database::models::{Route, RoutePermission};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Route store unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Persistence seam for the route-permission table. The authorization check
/// only reads; the register/upsert surface backs the admin tooling.
#[async_trait]
pub trait RouteStore: Send + Sync {
    async fn find_route(&self, path: &str, method: &str) -> Result<Option<Route>, StoreError>;

    /// Resolved `allowed` flag for (route, role), or None when no row exists.
    /// Must be deterministic in the presence of legacy duplicate rows.
    async fn permission(&self, route_id: Uuid, role: Role) -> Result<Option<bool>, StoreError>;

    async fn list_routes(&self) -> Result<Vec<Route>, StoreError>;

    async fn permissions_for(&self, route_id: Uuid) -> Result<Vec<RoutePermission>, StoreError>;

    async fn register_route(
        &self,
        path: &str,
        method: &str,
        description: Option<&str>,
    ) -> Result<Route, StoreError>;

    async fn upsert_permission(
        &self,
        route_id: Uuid,
        role: Role,
        allowed: bool,
    ) -> Result<RoutePermission, StoreError>;
}

/// Postgres-backed store used in production
pub struct PgRouteStore {
    pool: PgPool,
}

impl PgRouteStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RouteStore for PgRouteStore {
    async fn find_route(&self, path: &str, method: &str) -> Result<Option<Route>, StoreError> {
        let route = sqlx::query_as::<_, Route>(
            "SELECT * FROM routes WHERE path = $1 AND method = $2",
        )
        .bind(path)
        .bind(method)
        .fetch_optional(&self.pool)
        .await?;

        Ok(route)
    }

    async fn permission(&self, route_id: Uuid, role: Role) -> Result<Option<bool>, StoreError> {
        // (route_id, role) is unique since the constraint landed; the ordering
        // keeps pre-constraint duplicates resolving to the latest write
        let allowed = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT allowed FROM route_permissions
            WHERE route_id = $1 AND role = $2
            ORDER BY updated_at DESC
            LIMIT 1
            "#,
        )
        .bind(route_id)
        .bind(role.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(allowed)
    }

    async fn list_routes(&self) -> Result<Vec<Route>, StoreError> {
        let routes = sqlx::query_as::<_, Route>("SELECT * FROM routes ORDER BY path, method")
            .fetch_all(&self.pool)
            .await?;

        Ok(routes)
    }

    async fn permissions_for(&self, route_id: Uuid) -> Result<Vec<RoutePermission>, StoreError> {
        let permissions = sqlx::query_as::<_, RoutePermission>(
            "SELECT * FROM route_permissions WHERE route_id = $1 ORDER BY role",
        )
        .bind(route_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(permissions)
    }

    async fn register_route(
        &self,
        path: &str,
        method: &str,
        description: Option<&str>,
    ) -> Result<Route, StoreError> {
        let route = sqlx::query_as::<_, Route>(
            r#"
            INSERT INTO routes (id, path, method, description)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (path, method)
                DO UPDATE SET description = EXCLUDED.description, updated_at = now()
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(path)
        .bind(method)
        .bind(description)
        .fetch_one(&self.pool)
        .await?;

        Ok(route)
    }

    async fn upsert_permission(
        &self,
        route_id: Uuid,
        role: Role,
        allowed: bool,
    ) -> Result<RoutePermission, StoreError> {
        let permission = sqlx::query_as::<_, RoutePermission>(
            r#"
            INSERT INTO route_permissions (id, route_id, role, allowed)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (route_id, role)
                DO UPDATE SET allowed = EXCLUDED.allowed, updated_at = now()
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(route_id)
        .bind(role.as_str())
        .bind(allowed)
        .fetch_one(&self.pool)
        .await?;

        Ok(permission)
    }
}

/// In-memory store for tests and local experiments. Permission writes are
/// append-only so duplicate-row resolution (latest write wins) is exercised
/// the same way the SQL ordering resolves it.
#[derive(Default)]
pub struct MemoryRouteStore {
    routes: std::sync::Mutex<Vec<Route>>,
    permissions: std::sync::Mutex<Vec<(Uuid, Role, bool)>>,
    unavailable: std::sync::atomic::AtomicBool,
}

impl MemoryRouteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_route(&self, path: &str, method: &str) -> Uuid {
        let now = chrono::Utc::now();
        let route = Route {
            id: Uuid::new_v4(),
            path: path.to_string(),
            method: method.to_string(),
            description: None,
            created_at: now,
            updated_at: now,
        };
        let id = route.id;
        self.routes.lock().unwrap().push(route);
        id
    }

    pub fn set_permission(&self, route_id: Uuid, role: Role, allowed: bool) {
        self.permissions.lock().unwrap().push((route_id, role, allowed));
    }

    /// Makes every lookup fail, for exercising the storage-failure path
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable
            .store(unavailable, std::sync::atomic::Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(StoreError::Unavailable("simulated outage".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RouteStore for MemoryRouteStore {
    async fn find_route(&self, path: &str, method: &str) -> Result<Option<Route>, StoreError> {
        self.check_available()?;
        let routes = self.routes.lock().unwrap();
        Ok(routes
            .iter()
            .find(|r| r.path == path && r.method == method)
            .cloned())
    }

    async fn permission(&self, route_id: Uuid, role: Role) -> Result<Option<bool>, StoreError> {
        self.check_available()?;
        let permissions = self.permissions.lock().unwrap();
        Ok(permissions
            .iter()
            .rev()
            .find(|(id, r, _)| *id == route_id && *r == role)
            .map(|(_, _, allowed)| *allowed))
    }

    async fn list_routes(&self) -> Result<Vec<Route>, StoreError> {
        self.check_available()?;
        Ok(self.routes.lock().unwrap().clone())
    }

    async fn permissions_for(&self, route_id: Uuid) -> Result<Vec<RoutePermission>, StoreError> {
        self.check_available()?;
        let now = chrono::Utc::now();
        let permissions = self.permissions.lock().unwrap();
        Ok(permissions
            .iter()
            .filter(|(id, _, _)| *id == route_id)
            .map(|(id, role, allowed)| RoutePermission {
                id: Uuid::new_v4(),
                route_id: *id,
                role: role.as_str().to_string(),
                allowed: *allowed,
                created_at: now,
                updated_at: now,
            })
            .collect())
    }

    async fn register_route(
        &self,
        path: &str,
        method: &str,
        _description: Option<&str>,
    ) -> Result<Route, StoreError> {
        self.check_available()?;
        if let Some(existing) = self.find_route(path, method).await? {
            return Ok(existing);
        }
        let id = self.add_route(path, method);
        let routes = self.routes.lock().unwrap();
        Ok(routes.iter().find(|r| r.id == id).cloned().unwrap())
    }

    async fn upsert_permission(
        &self,
        route_id: Uuid,
        role: Role,
        allowed: bool,
    ) -> Result<RoutePermission, StoreError> {
        self.check_available()?;
        self.set_permission(route_id, role, allowed);
        let now = chrono::Utc::now();
        Ok(RoutePermission {
            id: Uuid::new_v4(),
            route_id,
            role: role.as_str().to_string(),
            allowed,
            created_at: now,
            updated_at: now,
        })
    }
}
