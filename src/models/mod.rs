pub mod auth;
pub mod child;
pub mod family;
pub mod feeding;
pub mod sleep;
pub mod summary;
pub mod user;
pub mod waste;
