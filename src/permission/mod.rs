//! Route-permission authorization.
//!
//! Given an incoming request's path, method and the caller's role, decide
//! ALLOW or DENY against the persisted route table:
//!
//! 1. Strip the query string.
//! 2. Exact lookup on (path, method).
//! 3. On a miss, rewrite the trailing path segment to `:id` and retry. One
//!    trailing dynamic segment only; mid-path parameters never match.
//! 4. No route at all: allow. Unregistered endpoints pass unchecked so a new
//!    deploy is never bricked by a stale route table; every such pass is
//!    logged as a registration gap.
//! 5. Route found: `ADMIN_OVERRIDE` short-circuits, otherwise an explicit
//!    `allowed = true` row for the caller's role is required.
//!
//! The check is read-only and storage failures surface as errors, never as
//! an allow.

pub mod store;

use tracing::{debug, warn};

use crate::auth::Role;
use store::{RouteStore, StoreError};

/// Roles with an implicit grant on every route, checked before any table
/// lookup. Kept as a named policy so the override is auditable on its own.
pub const ADMIN_OVERRIDE: Role = Role::Admin;

/// Placeholder used for a single trailing dynamic segment in stored paths.
pub const DYNAMIC_SEGMENT: &str = ":id";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// An `allowed = true` row exists for (route, role)
    Granted,
    /// Role carries the admin override; no row consulted
    GrantedAdmin,
    /// No route row matched; fail-open policy admits the request
    GrantedUnregistered,
    /// Route matched but the role has no affirmative permission
    Denied { path: String, method: String },
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        !matches!(self, AccessDecision::Denied { .. })
    }
}

/// Strip everything from the first `?` onward
pub fn normalize_path(raw_path: &str) -> &str {
    match raw_path.find('?') {
        Some(idx) => &raw_path[..idx],
        None => raw_path,
    }
}

/// Rewrite the final path segment to the dynamic placeholder.
/// `/content/abc123` becomes `/content/:id`. Returns None when there is no
/// parent segment to anchor the rewrite (e.g. `/` or a bare word).
pub fn dynamic_form(path: &str) -> Option<String> {
    let idx = path.rfind('/')?;
    let last = &path[idx + 1..];
    if last.is_empty() || last == DYNAMIC_SEGMENT {
        return None;
    }
    Some(format!("{}/{}", &path[..idx], DYNAMIC_SEGMENT))
}

/// Decide ALLOW or DENY for one request. Read-only; a storage failure is a
/// hard error distinct from a deny.
pub async fn authorize(
    store: &dyn RouteStore,
    raw_path: &str,
    method: &str,
    role: Role,
) -> Result<AccessDecision, StoreError> {
    let path = normalize_path(raw_path);

    // Exact match first, then the single trailing-segment fallback
    let mut route = store.find_route(path, method).await?;
    if route.is_none() {
        if let Some(pattern) = dynamic_form(path) {
            route = store.find_route(&pattern, method).await?;
        }
    }

    let route = match route {
        Some(route) => route,
        None => {
            warn!(%path, %method, "no registered route; admitting by fail-open policy");
            return Ok(AccessDecision::GrantedUnregistered);
        }
    };

    if role == ADMIN_OVERRIDE {
        debug!(%path, %method, "admin override");
        return Ok(AccessDecision::GrantedAdmin);
    }

    match store.permission(route.id, role).await? {
        Some(true) => {
            debug!(%path, %method, %role, "route permission granted");
            Ok(AccessDecision::Granted)
        }
        // A missing row and an explicit false both deny
        _ => Ok(AccessDecision::Denied {
            path: path.to_string(),
            method: method.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::store::MemoryRouteStore;
    use super::*;

    fn seeded_store() -> MemoryRouteStore {
        let store = MemoryRouteStore::new();
        let child_delete = store.add_route("/api/family/children/:id", "DELETE");
        store.set_permission(child_delete, Role::Parent, true);

        let content_get = store.add_route("/api/content/:id", "GET");
        store.set_permission(content_get, Role::Parent, true);
        store.set_permission(content_get, Role::Teacher, false);
        store
    }

    #[tokio::test]
    async fn exact_match_with_query_string_allows() {
        let store = seeded_store();
        let decision = authorize(&store, "/api/family/children/42?x=1", "DELETE", Role::Parent)
            .await
            .unwrap();
        assert_eq!(
            decision,
            AccessDecision::Granted,
            "parent has an affirmative row for the matched route"
        );
    }

    #[tokio::test]
    async fn missing_row_denies_with_route_and_method() {
        let store = seeded_store();
        let decision = authorize(&store, "/api/family/children/42", "DELETE", Role::Teacher)
            .await
            .unwrap();
        assert_eq!(
            decision,
            AccessDecision::Denied {
                path: "/api/family/children/42".to_string(),
                method: "DELETE".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn explicit_false_row_denies() {
        let store = seeded_store();
        let decision = authorize(&store, "/api/content/abc123", "GET", Role::Teacher)
            .await
            .unwrap();
        assert!(!decision.is_allowed());
    }

    #[tokio::test]
    async fn unregistered_route_fails_open() {
        let store = seeded_store();
        for role in [Role::Parent, Role::Teacher, Role::Admin] {
            let decision = authorize(&store, "/api/unregistered/thing", "GET", role)
                .await
                .unwrap();
            assert_eq!(decision, AccessDecision::GrantedUnregistered);
        }
    }

    #[tokio::test]
    async fn admin_overrides_any_stored_rows() {
        let store = seeded_store();
        // Explicit false for teacher on this route; admin still passes
        let decision = authorize(&store, "/api/content/abc123", "GET", Role::Admin)
            .await
            .unwrap();
        assert_eq!(decision, AccessDecision::GrantedAdmin);
    }

    #[tokio::test]
    async fn admin_override_ignores_explicit_admin_false_row() {
        let store = MemoryRouteStore::new();
        let route = store.add_route("/api/content", "GET");
        store.set_permission(route, Role::Admin, false);

        let decision = authorize(&store, "/api/content", "GET", Role::Admin)
            .await
            .unwrap();
        assert!(decision.is_allowed());
    }

    #[tokio::test]
    async fn fallback_rewrites_only_the_last_segment() {
        let store = seeded_store();
        // `/api/content/abc/extra` rewrites to `/api/content/abc/:id`, which
        // is not registered; the request falls through to fail-open rather
        // than matching `/api/content/:id`
        let decision = authorize(&store, "/api/content/abc/extra", "GET", Role::Teacher)
            .await
            .unwrap();
        assert_eq!(decision, AccessDecision::GrantedUnregistered);
    }

    #[tokio::test]
    async fn duplicate_permission_rows_resolve_to_latest_write() {
        let store = MemoryRouteStore::new();
        let route = store.add_route("/api/content", "POST");
        store.set_permission(route, Role::Teacher, false);
        store.set_permission(route, Role::Teacher, true);

        let decision = authorize(&store, "/api/content", "POST", Role::Teacher)
            .await
            .unwrap();
        assert_eq!(decision, AccessDecision::Granted);
    }

    #[test]
    fn normalize_strips_from_first_question_mark() {
        assert_eq!(normalize_path("/a/b?x=1&y=2"), "/a/b");
        assert_eq!(normalize_path("/a/b?x=?z"), "/a/b");
        assert_eq!(normalize_path("/a/b"), "/a/b");
    }

    #[test]
    fn dynamic_form_handles_edges() {
        assert_eq!(dynamic_form("/content/abc"), Some("/content/:id".to_string()));
        assert_eq!(dynamic_form("/content/abc/"), None);
        assert_eq!(dynamic_form("/content/:id"), None);
        assert_eq!(dynamic_form("no-slash"), None);
    }
}
