use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::database::manager::DatabaseError;

/// Creates the schema if missing and seeds the route-permission table.
/// Safe to run on every startup; all statements are idempotent.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), DatabaseError> {
    let statements = [
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id UUID PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            name TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'parent',
            plan TEXT NOT NULL DEFAULT 'free',
            coins BIGINT NOT NULL DEFAULT 0 CHECK (coins >= 0),
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS children (
            id UUID PRIMARY KEY,
            parent_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            age INTEGER NOT NULL DEFAULT 0,
            points BIGINT NOT NULL DEFAULT 0,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS content (
            id UUID PRIMARY KEY,
            author_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            title TEXT NOT NULL,
            kind TEXT NOT NULL,
            body JSONB NOT NULL DEFAULT '{}',
            price BIGINT NOT NULL DEFAULT 0 CHECK (price >= 0),
            is_public BOOLEAN NOT NULL DEFAULT false,
            sales BIGINT NOT NULL DEFAULT 0,
            source_id UUID,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS purchases (
            id UUID PRIMARY KEY,
            buyer_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            content_id UUID NOT NULL REFERENCES content(id) ON DELETE CASCADE,
            price_paid BIGINT NOT NULL,
            status TEXT NOT NULL DEFAULT 'completed',
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
        // Exactly-once per (buyer, item): backs the purchase transaction
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS purchases_buyer_content_idx
            ON purchases (buyer_id, content_id)
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS activities (
            id UUID PRIMARY KEY,
            child_id UUID NOT NULL REFERENCES children(id) ON DELETE CASCADE,
            content_id UUID NOT NULL REFERENCES content(id) ON DELETE CASCADE,
            kind TEXT NOT NULL,
            points_awarded BIGINT NOT NULL DEFAULT 0,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS routes (
            id UUID PRIMARY KEY,
            path TEXT NOT NULL,
            method TEXT NOT NULL,
            description TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            UNIQUE (path, method)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS route_permissions (
            id UUID PRIMARY KEY,
            route_id UUID NOT NULL REFERENCES routes(id) ON DELETE CASCADE,
            role TEXT NOT NULL,
            allowed BOOLEAN NOT NULL DEFAULT false,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            UNIQUE (route_id, role)
        )
        "#,
    ];

    for statement in statements {
        sqlx::query(statement).execute(pool).await?;
    }

    info!("Schema ensured");
    Ok(())
}

/// Default access-control list. Admin is never listed: the override policy in
/// crate::permission admits it everywhere. Dynamic segments are trailing only;
/// the matcher cannot resolve a mid-path parameter.
const SEED_ROUTES: &[(&str, &str, &str, &[(&str, bool)])] = &[
    ("/api/auth/whoami", "GET", "Current identity", &[("parent", true), ("teacher", true)]),
    ("/api/auth/session", "DELETE", "Logout", &[("parent", true), ("teacher", true)]),
    ("/api/users/me", "GET", "Own profile", &[("parent", true), ("teacher", true)]),
    ("/api/users/me", "PUT", "Update own profile", &[("parent", true), ("teacher", true)]),
    ("/api/users/me/coins", "POST", "Coin grant (admin tooling)", &[]),
    ("/api/family/children", "GET", "List children", &[("parent", true)]),
    ("/api/family/children", "POST", "Create child profile", &[("parent", true)]),
    ("/api/family/children/:id", "GET", "Fetch child profile", &[("parent", true)]),
    ("/api/family/children/:id", "PUT", "Update child profile", &[("parent", true)]),
    ("/api/family/children/:id", "DELETE", "Delete child profile", &[("parent", true)]),
    ("/api/content", "GET", "Browse catalog", &[("parent", true), ("teacher", true)]),
    ("/api/content", "POST", "Author content", &[("parent", true), ("teacher", true)]),
    ("/api/content/mine", "GET", "Own catalog", &[("parent", true), ("teacher", true)]),
    ("/api/content/:id", "GET", "Fetch content", &[("parent", true), ("teacher", true)]),
    ("/api/content/:id", "PUT", "Update content", &[("parent", true), ("teacher", true)]),
    ("/api/content/:id", "DELETE", "Delete content", &[("parent", true), ("teacher", true)]),
    ("/api/purchases", "GET", "Own purchases", &[("parent", true), ("teacher", true)]),
    ("/api/purchases", "POST", "Buy content", &[("parent", true), ("teacher", true)]),
    ("/api/activities", "GET", "Child activity history", &[("parent", true)]),
    ("/api/activities", "POST", "Record child activity", &[("parent", true)]),
    ("/api/admin/routes", "GET", "List routes", &[]),
    ("/api/admin/routes", "POST", "Register route", &[]),
    ("/api/admin/permissions/:id", "PUT", "Upsert permission", &[]),
];

/// Upserts the seed ACL. Existing descriptions and permission flags are
/// refreshed; operator edits to other routes are left alone.
pub async fn seed_routes(pool: &PgPool) -> Result<(), DatabaseError> {
    for &(path, method, description, grants) in SEED_ROUTES {
        let route_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO routes (id, path, method, description)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (path, method)
                DO UPDATE SET description = EXCLUDED.description, updated_at = now()
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(path)
        .bind(method)
        .bind(description)
        .fetch_one(pool)
        .await?;

        for &(role, allowed) in grants.iter() {
            sqlx::query(
                r#"
                INSERT INTO route_permissions (id, route_id, role, allowed)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (route_id, role)
                    DO UPDATE SET allowed = EXCLUDED.allowed, updated_at = now()
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(route_id)
            .bind(role)
            .bind(allowed)
            .execute(pool)
            .await?;
        }
    }

    info!("Seeded {} routes", SEED_ROUTES.len());
    Ok(())
}
