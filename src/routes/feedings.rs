use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    middleware::family::FamilyMember,
    models::feeding::FeedingRequest,
    services::{records::RecordService, stats::StatsService},
    store::FeedingStore,
    AppState,
};

use super::{
    children::resolve_child, owned_by, replaceable, service_error, stats_error, store_error,
    to_json, ApiError, ListQuery,
};

/// GET /children/{child_id}/feedings?limit=N
pub async fn list_feedings(
    State(state): State<AppState>,
    member: FamilyMember,
    Path(child_id): Path<Uuid>,
    Query(params): Query<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    let limit = params.limit()?;
    let child = resolve_child(&state, &member, child_id).await?;
    state
        .store
        .list_feedings(child.id, limit)
        .await
        .map_err(store_error)
        .and_then(to_json)
}

/// POST /children/{child_id}/feedings
pub async fn create_feeding(
    State(state): State<AppState>,
    member: FamilyMember,
    Path(child_id): Path<Uuid>,
    Json(body): Json<FeedingRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let child = resolve_child(&state, &member, child_id).await?;
    let feeding = RecordService::save_feeding(state.store.as_ref(), &child, member.user.id, None, &body)
        .await
        .map_err(service_error)?;
    Ok((StatusCode::CREATED, to_json(feeding)?))
}

/// GET /children/{child_id}/feedings/{id}
pub async fn get_feeding(
    State(state): State<AppState>,
    member: FamilyMember,
    Path((child_id, id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>, ApiError> {
    let child = resolve_child(&state, &member, child_id).await?;
    owned_by(state.store.get_feeding(id).await, |f| f.child_id == child.id).and_then(to_json)
}

/// PUT /children/{child_id}/feedings/{id}: insert or replace by id
pub async fn replace_feeding(
    State(state): State<AppState>,
    member: FamilyMember,
    Path((child_id, id)): Path<(Uuid, Uuid)>,
    Json(body): Json<FeedingRequest>,
) -> Result<Json<Value>, ApiError> {
    let child = resolve_child(&state, &member, child_id).await?;
    replaceable(state.store.get_feeding(id).await, |f| f.child_id == child.id)?;
    RecordService::save_feeding(state.store.as_ref(), &child, member.user.id, Some(id), &body)
        .await
        .map_err(service_error)
        .and_then(to_json)
}

/// DELETE /children/{child_id}/feedings/{id}
pub async fn delete_feeding(
    State(state): State<AppState>,
    member: FamilyMember,
    Path((child_id, id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>, ApiError> {
    let child = resolve_child(&state, &member, child_id).await?;
    owned_by(state.store.get_feeding(id).await, |f| f.child_id == child.id)?;
    state
        .store
        .delete_feeding(id)
        .await
        .map(|_| Json(json!({ "message": "Feeding deleted" })))
        .map_err(store_error)
}

/// GET /children/{child_id}/feedings/stats: last 24 hours
pub async fn feeding_stats(
    State(state): State<AppState>,
    member: FamilyMember,
    Path(child_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let child = resolve_child(&state, &member, child_id).await?;
    StatsService::feeding_stats(state.store.as_ref(), child.id)
        .await
        .map_err(stats_error)
        .and_then(to_json)
}

/// GET /children/{child_id}/feedings/graph
pub async fn feeding_graph(
    State(state): State<AppState>,
    member: FamilyMember,
    Path(child_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let child = resolve_child(&state, &member, child_id).await?;
    StatsService::feeding_graph_data(child.id)
        .await
        .map_err(stats_error)
        .and_then(to_json)
}
