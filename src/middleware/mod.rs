pub mod auth;
pub mod family;
