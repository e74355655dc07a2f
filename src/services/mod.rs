pub mod auth;
pub mod children;
pub mod family;
pub mod metrics;
pub mod records;
pub mod sleep;
pub mod stats;
