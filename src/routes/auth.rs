use axum::{extract::State, http::StatusCode, Json};
use serde_json::Value;

use crate::{
    middleware::family::CurrentUser,
    models::user::{LoginRequest, RegisterRequest, UserProfile},
    services::auth::AuthService,
    AppState,
};

use super::{error, service_error, to_json, ApiError};

/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    match AuthService::register(state.store.as_ref(), &state.token_settings(), &body).await {
        Ok(res) => Ok((StatusCode::CREATED, to_json(res)?)),
        Err(e) if AuthService::is_duplicate_email(&e) => {
            Err(error(StatusCode::CONFLICT, "Email already registered"))
        }
        Err(e) => Err(service_error(e)),
    }
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<Value>, ApiError> {
    AuthService::login(state.store.as_ref(), &state.token_settings(), &body)
        .await
        .map_err(|e| error(StatusCode::UNAUTHORIZED, e))
        .and_then(to_json)
}

/// GET /auth/me
pub async fn me(CurrentUser(user): CurrentUser) -> Result<Json<Value>, ApiError> {
    to_json(UserProfile::from(user))
}
