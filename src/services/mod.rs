pub mod purchase;
pub mod sessions;
