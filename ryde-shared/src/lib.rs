pub mod identity;
pub mod location;
pub mod models;

pub use identity::{Gender, UserProfile};
pub use location::Location;
