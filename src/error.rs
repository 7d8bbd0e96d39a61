// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 403 Forbidden, emitted by the route-permission middleware; the body
    // identifies the offending route and method
    RouteForbidden { route: String, method: String },

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::RouteForbidden { .. } => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::InternalServerError(_) => 500,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::RouteForbidden { .. } => "Access denied for this route",
            ApiError::NotFound(msg) => msg,
            ApiError::Conflict(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::RouteForbidden { .. } => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        match self {
            ApiError::RouteForbidden { route, method } => {
                json!({
                    "error": self.message(),
                    "route": route,
                    "method": method,
                    "code": self.error_code()
                })
            }
            _ => {
                json!({
                    "error": true,
                    "message": self.message(),
                    "code": self.error_code()
                })
            }
        }
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn route_forbidden(route: impl Into<String>, method: impl Into<String>) -> Self {
        ApiError::RouteForbidden {
            route: route.into(),
            method: method.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }

    /// Map a unique-constraint violation to 409 with the given message; every
    /// other sqlx error takes the default conversion. For insert-if-absent
    /// paths where a pre-check can lose a race to a concurrent insert.
    pub fn conflict_on_unique(err: sqlx::Error, message: impl Into<String>) -> Self {
        match &err {
            sqlx::Error::Database(db)
                if matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation) =>
            {
                ApiError::conflict(message)
            }
            _ => ApiError::from(err),
        }
    }
}

// Convert other error types to ApiError

impl From<crate::database::manager::DatabaseError> for ApiError {
    fn from(err: crate::database::manager::DatabaseError) -> Self {
        match err {
            crate::database::manager::DatabaseError::NotFound(msg) => ApiError::not_found(msg),
            crate::database::manager::DatabaseError::ConfigMissing(_) => {
                ApiError::service_unavailable("Database not configured")
            }
            other => {
                tracing::error!("Database error: {}", other);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::not_found("Record not found"),
            other => {
                // Don't expose internal SQL errors to clients
                tracing::error!("SQLx error: {}", other);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
        }
    }
}

impl From<crate::permission::store::StoreError> for ApiError {
    fn from(err: crate::permission::store::StoreError) -> Self {
        // A broken permission lookup is a hard failure, never a silent allow
        tracing::error!("Route store error: {}", err);
        ApiError::service_unavailable("Permission lookup unavailable")
    }
}

impl From<crate::services::purchase::PurchaseError> for ApiError {
    fn from(err: crate::services::purchase::PurchaseError) -> Self {
        use crate::services::purchase::PurchaseError;
        match err {
            PurchaseError::ContentNotFound => ApiError::not_found("Content not found"),
            PurchaseError::BuyerNotFound => ApiError::not_found("Buyer not found"),
            PurchaseError::AlreadyOwned => ApiError::conflict("Content already purchased"),
            PurchaseError::NotForSale => ApiError::bad_request("Content is not for sale"),
            PurchaseError::SelfPurchase => {
                ApiError::bad_request("Authors cannot purchase their own content")
            }
            PurchaseError::InsufficientCoins => ApiError::bad_request("Insufficient coin balance"),
            PurchaseError::Sqlx(e) => {
                tracing::error!("Purchase transaction error: {}", e);
                ApiError::internal_server_error("Purchase could not be completed")
            }
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct DuplicateKey;

    impl std::fmt::Display for DuplicateKey {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "duplicate key value violates unique constraint")
        }
    }

    impl std::error::Error for DuplicateKey {}

    impl sqlx::error::DatabaseError for DuplicateKey {
        fn message(&self) -> &str {
            "duplicate key value violates unique constraint"
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            sqlx::error::ErrorKind::UniqueViolation
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }
    }

    #[test]
    fn unique_violation_maps_to_conflict() {
        let err = sqlx::Error::Database(Box::new(DuplicateKey));
        let api = ApiError::conflict_on_unique(err, "An account with this email already exists");

        assert_eq!(api.status_code(), 409);
        assert_eq!(api.message(), "An account with this email already exists");
    }

    #[test]
    fn other_sqlx_errors_keep_default_mapping() {
        let api = ApiError::conflict_on_unique(sqlx::Error::RowNotFound, "unused");
        assert_eq!(api.status_code(), 404);
    }

    #[test]
    fn route_forbidden_body_names_route_and_method() {
        let api = ApiError::route_forbidden("/api/content", "POST");
        let body = api.to_json();

        assert_eq!(body["route"], "/api/content");
        assert_eq!(body["method"], "POST");
        assert_eq!(api.status_code(), 403);
    }
}
