use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    middleware::family::{CurrentUser, FamilyMember},
    models::family::{AcceptInvitationRequest, CreateFamilyRequest, InviteRequest},
    services::family::{FamilyError, FamilyService},
    AppState,
};

use super::{error, store_error, to_json, ApiError};

fn family_error(e: FamilyError) -> ApiError {
    match e {
        FamilyError::AlreadyInFamily => error(StatusCode::CONFLICT, e),
        FamilyError::InvitationNotFound => error(StatusCode::NOT_FOUND, e),
        FamilyError::NotInvitee => error(StatusCode::FORBIDDEN, e),
        FamilyError::Expired => error(StatusCode::GONE, e),
        FamilyError::Invalid(_) => error(StatusCode::BAD_REQUEST, e),
        FamilyError::Store(s) => store_error(s),
    }
}

/// POST /family: create a family and join it
pub async fn create_family(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<CreateFamilyRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let family = FamilyService::create(state.store.as_ref(), &user, &body.name)
        .await
        .map_err(family_error)?;
    Ok((StatusCode::CREATED, to_json(family)?))
}

/// GET /family: the caller's family and its members
pub async fn get_family(
    State(state): State<AppState>,
    member: FamilyMember,
) -> Result<Json<Value>, ApiError> {
    FamilyService::get(state.store.as_ref(), member.family_id)
        .await
        .map_err(family_error)
        .and_then(to_json)
}

/// POST /family/invitations
pub async fn invite(
    State(state): State<AppState>,
    member: FamilyMember,
    Json(body): Json<InviteRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let ttl = Duration::hours(state.config.invitation_expiry_hours);
    let invitation = FamilyService::invite(
        state.store.as_ref(),
        member.family_id,
        member.user.id,
        &body.email,
        ttl,
    )
    .await
    .map_err(family_error)?;
    Ok((StatusCode::CREATED, to_json(invitation)?))
}

/// GET /family/invitations: invitations sent by the caller's family
pub async fn list_family_invitations(
    State(state): State<AppState>,
    member: FamilyMember,
) -> Result<Json<Value>, ApiError> {
    FamilyService::list_for_family(state.store.as_ref(), member.family_id)
        .await
        .map_err(family_error)
        .and_then(to_json)
}

/// DELETE /family/invitations/{id}
pub async fn revoke_invitation(
    State(state): State<AppState>,
    member: FamilyMember,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    FamilyService::revoke(state.store.as_ref(), member.family_id, id)
        .await
        .map(|_| Json(json!({ "message": "Invitation revoked" })))
        .map_err(family_error)
}

/// GET /invitations: pending invitations addressed to the caller
pub async fn list_my_invitations(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Value>, ApiError> {
    FamilyService::list_for_email(state.store.as_ref(), &user.email, Utc::now())
        .await
        .map_err(family_error)
        .and_then(to_json)
}

/// POST /invitations/accept {code}
pub async fn accept_invitation(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<AcceptInvitationRequest>,
) -> Result<Json<Value>, ApiError> {
    FamilyService::accept(state.store.as_ref(), &user, &body.code, Utc::now())
        .await
        .map_err(family_error)
        .and_then(to_json)
}
