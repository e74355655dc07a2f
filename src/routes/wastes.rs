use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    middleware::family::FamilyMember,
    models::waste::WasteRequest,
    services::{records::RecordService, stats::StatsService},
    store::WasteStore,
    AppState,
};

use super::{
    children::resolve_child, owned_by, replaceable, service_error, stats_error, store_error,
    to_json, ApiError, ListQuery,
};

pub async fn list_wastes(
    State(state): State<AppState>,
    member: FamilyMember,
    Path(child_id): Path<Uuid>,
    Query(params): Query<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    let limit = params.limit()?;
    let child = resolve_child(&state, &member, child_id).await?;
    state
        .store
        .list_wastes(child.id, limit)
        .await
        .map_err(store_error)
        .and_then(to_json)
}

pub async fn create_waste(
    State(state): State<AppState>,
    member: FamilyMember,
    Path(child_id): Path<Uuid>,
    Json(body): Json<WasteRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let child = resolve_child(&state, &member, child_id).await?;
    let waste = RecordService::save_waste(state.store.as_ref(), &child, member.user.id, None, &body)
        .await
        .map_err(service_error)?;
    Ok((StatusCode::CREATED, to_json(waste)?))
}

pub async fn get_waste(
    State(state): State<AppState>,
    member: FamilyMember,
    Path((child_id, id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>, ApiError> {
    let child = resolve_child(&state, &member, child_id).await?;
    owned_by(state.store.get_waste(id).await, |w| w.child_id == child.id).and_then(to_json)
}

pub async fn replace_waste(
    State(state): State<AppState>,
    member: FamilyMember,
    Path((child_id, id)): Path<(Uuid, Uuid)>,
    Json(body): Json<WasteRequest>,
) -> Result<Json<Value>, ApiError> {
    let child = resolve_child(&state, &member, child_id).await?;
    replaceable(state.store.get_waste(id).await, |w| w.child_id == child.id)?;
    RecordService::save_waste(state.store.as_ref(), &child, member.user.id, Some(id), &body)
        .await
        .map_err(service_error)
        .and_then(to_json)
}

pub async fn delete_waste(
    State(state): State<AppState>,
    member: FamilyMember,
    Path((child_id, id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>, ApiError> {
    let child = resolve_child(&state, &member, child_id).await?;
    owned_by(state.store.get_waste(id).await, |w| w.child_id == child.id)?;
    state
        .store
        .delete_waste(id)
        .await
        .map(|_| Json(json!({ "message": "Waste deleted" })))
        .map_err(store_error)
}

/// GET /children/{child_id}/wastes/stats: counts per type over the last 24 hours
pub async fn waste_stats(
    State(state): State<AppState>,
    member: FamilyMember,
    Path(child_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let child = resolve_child(&state, &member, child_id).await?;
    StatsService::waste_stats(state.store.as_ref(), child.id)
        .await
        .map_err(stats_error)
        .and_then(to_json)
}

/// GET /children/{child_id}/wastes/graph: per-day counts over the last 7 days
pub async fn waste_graph(
    State(state): State<AppState>,
    member: FamilyMember,
    Path(child_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let child = resolve_child(&state, &member, child_id).await?;
    StatsService::waste_graph_data(state.store.as_ref(), child.id)
        .await
        .map_err(stats_error)
        .and_then(to_json)
}
