pub mod activities;
pub mod admin;
pub mod auth;
pub mod children;
pub mod content;
pub mod purchases;
pub mod users;
