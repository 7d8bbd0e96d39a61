use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::{self, Claims, Role};
use crate::config;
use crate::database::models::User;
use crate::error::ApiError;
use crate::state::AppState;

/// Coins granted to every new account so the catalog is browsable-and-buyable
/// from day one
const SIGNUP_COINS: i64 = 50;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    /// parent or teacher; admin accounts are provisioned out of band
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// POST /auth/register - Create an account and return a session token
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::bad_request("A valid email is required"));
    }
    if payload.password.len() < 8 {
        return Err(ApiError::bad_request("Password must be at least 8 characters"));
    }

    let role = match payload.role.as_deref() {
        None => Role::Parent,
        Some(raw) => match Role::parse(raw) {
            Some(Role::Admin) | None => {
                return Err(ApiError::bad_request("Role must be parent or teacher"))
            }
            Some(role) => role,
        },
    };

    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = $1")
        .bind(&email)
        .fetch_one(&state.pool)
        .await?;
    if existing > 0 {
        return Err(ApiError::conflict("An account with this email already exists"));
    }

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, email, password_hash, name, role, plan, coins)
        VALUES ($1, $2, $3, $4, $5, 'free', $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&email)
    .bind(auth::hash_password(&payload.password))
    .bind(payload.name.trim())
    .bind(role.as_str())
    .bind(SIGNUP_COINS)
    .fetch_one(&state.pool)
    .await
    // Two registrations can race past the pre-check; the unique index on
    // email settles it and the loser gets the same 409 as the pre-check
    .map_err(|e| ApiError::conflict_on_unique(e, "An account with this email already exists"))?;

    let token = issue_token(&user, role)?;
    state.sessions.login(user.id).await;

    tracing::info!(user = %user.id, %role, "account registered");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "token": token, "user": user })),
    ))
}

/// POST /auth/login - Verify credentials and return a session token
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = payload.email.trim().to_lowercase();

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid email or password"))?;

    if !auth::verify_password(&payload.password, &user.password_hash) {
        return Err(ApiError::unauthorized("Invalid email or password"));
    }

    let role = Role::parse(&user.role)
        .ok_or_else(|| ApiError::internal_server_error("Account has an unknown role"))?;

    let token = issue_token(&user, role)?;
    state.sessions.login(user.id).await;

    let expires_in = config::config().security.jwt_expiry_hours * 3600;

    Ok(Json(json!({
        "token": token,
        "user": user,
        "expires_in": expires_in
    })))
}

fn issue_token(user: &User, role: Role) -> Result<String, ApiError> {
    let claims = Claims::new(user.id, user.email.clone(), role);
    auth::generate_jwt(claims).map_err(|e| {
        tracing::error!("Token generation failed: {}", e);
        ApiError::internal_server_error("Could not issue session token")
    })
}
