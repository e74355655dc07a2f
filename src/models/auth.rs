use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims embedded in the JWT access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user UUID
    pub exp: usize,
    pub iat: usize,
}

/// Extracted from the validated JWT: available via Axum extractors
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
}
