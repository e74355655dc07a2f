use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    models::{auth::AuthenticatedUser, user::User},
    store::{StoreError, UserStore},
    AppState,
};

/// The authenticated caller, loaded from the store.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = (StatusCode, Json<Value>);

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth = AuthenticatedUser::from_request_parts(parts, state)
            .await
            .map_err(|(status, msg)| (status, Json(json!({ "error": msg }))))?;

        match state.store.get_user(auth.user_id).await {
            Ok(user) => Ok(CurrentUser(user)),
            // token outlived its account
            Err(StoreError::NotFound) => Err((
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Unknown user" })),
            )),
            Err(e) => {
                tracing::error!("failed to load user {}: {e}", auth.user_id);
                Err((
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Database error" })),
                ))
            }
        }
    }
}

/// The caller plus the family every record in the request is scoped to.
#[derive(Debug, Clone)]
pub struct FamilyMember {
    pub user: User,
    pub family_id: Uuid,
}

impl FromRequestParts<AppState> for FamilyMember {
    type Rejection = (StatusCode, Json<Value>);

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        match user.family_id {
            Some(family_id) => Ok(FamilyMember { user, family_id }),
            None => Err((
                StatusCode::FORBIDDEN,
                Json(json!({ "error": "Create or join a family first" })),
            )),
        }
    }
}
