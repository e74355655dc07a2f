use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    middleware::family::FamilyMember,
    models::child::{Child, CreateChildRequest, UpdateChildRequest},
    services::children::ChildService,
    AppState,
};

use super::{service_error, store_error, to_json, ApiError};

/// Load a child of the caller's family; 404 for anyone else's child.
pub(crate) async fn resolve_child(
    state: &AppState,
    member: &FamilyMember,
    child_id: Uuid,
) -> Result<Child, ApiError> {
    ChildService::get_in_family(state.store.as_ref(), member.family_id, child_id)
        .await
        .map_err(store_error)
}

pub async fn list_children(
    State(state): State<AppState>,
    member: FamilyMember,
) -> Result<Json<Value>, ApiError> {
    ChildService::list(state.store.as_ref(), member.family_id)
        .await
        .map_err(store_error)
        .and_then(to_json)
}

pub async fn create_child(
    State(state): State<AppState>,
    member: FamilyMember,
    Json(body): Json<CreateChildRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let child = ChildService::create(state.store.as_ref(), member.family_id, &body)
        .await
        .map_err(service_error)?;
    Ok((StatusCode::CREATED, to_json(child)?))
}

pub async fn get_child(
    State(state): State<AppState>,
    member: FamilyMember,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    resolve_child(&state, &member, id).await.and_then(to_json)
}

pub async fn update_child(
    State(state): State<AppState>,
    member: FamilyMember,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateChildRequest>,
) -> Result<Json<Value>, ApiError> {
    let child = resolve_child(&state, &member, id).await?;
    ChildService::update(state.store.as_ref(), child, &body)
        .await
        .map_err(service_error)
        .and_then(to_json)
}

pub async fn delete_child(
    State(state): State<AppState>,
    member: FamilyMember,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let child = resolve_child(&state, &member, id).await?;
    ChildService::delete(state.store.as_ref(), &child)
        .await
        .map(|_| Json(json!({ "message": "Child deleted" })))
        .map_err(store_error)
}
