pub mod activity;
pub mod child;
pub mod content;
pub mod purchase;
pub mod route;
pub mod user;

pub use activity::Activity;
pub use child::ChildProfile;
pub use content::ContentItem;
pub use purchase::Purchase;
pub use route::{Route, RoutePermission};
pub use user::User;
