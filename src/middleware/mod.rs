pub mod auth;
pub mod route_guard;

pub use auth::AuthUser;
