use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    middleware::family::FamilyMember,
    models::sleep::SleepRequest,
    services::{
        records::RecordService,
        sleep::{SessionError, SleepService},
        stats::StatsService,
    },
    store::SleepStore,
    AppState,
};

use super::{
    children::resolve_child, error, owned_by, replaceable, service_error, stats_error,
    store_error, to_json, ApiError, ListQuery,
};

fn session_error(e: SessionError) -> ApiError {
    match e {
        SessionError::ExistingStart => error(StatusCode::CONFLICT, e),
        SessionError::NoExistingSession => error(StatusCode::NOT_FOUND, e),
        SessionError::Store(s) => store_error(s),
    }
}

/// GET /children/{child_id}/sleeps/status
pub async fn sleep_status(
    State(state): State<AppState>,
    member: FamilyMember,
    Path(child_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let child = resolve_child(&state, &member, child_id).await?;
    SleepService::status(state.store.as_ref(), member.family_id, child.id)
        .await
        .map_err(session_error)
        .and_then(to_json)
}

/// POST /children/{child_id}/sleeps/start
pub async fn start_sleep(
    State(state): State<AppState>,
    member: FamilyMember,
    Path(child_id): Path<Uuid>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let child = resolve_child(&state, &member, child_id).await?;
    let sleep = SleepService::start(state.store.as_ref(), member.family_id, child.id, member.user.id)
        .await
        .map_err(session_error)?;
    Ok((StatusCode::CREATED, to_json(sleep)?))
}

/// POST /children/{child_id}/sleeps/end
pub async fn end_sleep(
    State(state): State<AppState>,
    member: FamilyMember,
    Path(child_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let child = resolve_child(&state, &member, child_id).await?;
    SleepService::end(state.store.as_ref(), member.family_id, child.id)
        .await
        .map_err(session_error)
        .and_then(to_json)
}

pub async fn list_sleeps(
    State(state): State<AppState>,
    member: FamilyMember,
    Path(child_id): Path<Uuid>,
    Query(params): Query<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    let limit = params.limit()?;
    let child = resolve_child(&state, &member, child_id).await?;
    state
        .store
        .list_sleeps(child.id, limit)
        .await
        .map_err(store_error)
        .and_then(to_json)
}

/// POST /children/{child_id}/sleeps: log an interval after the fact
pub async fn create_sleep(
    State(state): State<AppState>,
    member: FamilyMember,
    Path(child_id): Path<Uuid>,
    Json(body): Json<SleepRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let child = resolve_child(&state, &member, child_id).await?;
    let sleep = RecordService::save_sleep(state.store.as_ref(), &child, member.user.id, None, &body)
        .await
        .map_err(service_error)?;
    Ok((StatusCode::CREATED, to_json(sleep)?))
}

pub async fn get_sleep(
    State(state): State<AppState>,
    member: FamilyMember,
    Path((child_id, id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>, ApiError> {
    let child = resolve_child(&state, &member, child_id).await?;
    owned_by(state.store.get_sleep(id).await, |s| s.child_id == child.id).and_then(to_json)
}

pub async fn replace_sleep(
    State(state): State<AppState>,
    member: FamilyMember,
    Path((child_id, id)): Path<(Uuid, Uuid)>,
    Json(body): Json<SleepRequest>,
) -> Result<Json<Value>, ApiError> {
    let child = resolve_child(&state, &member, child_id).await?;
    replaceable(state.store.get_sleep(id).await, |s| s.child_id == child.id)?;
    RecordService::save_sleep(state.store.as_ref(), &child, member.user.id, Some(id), &body)
        .await
        .map_err(service_error)
        .and_then(to_json)
}

pub async fn delete_sleep(
    State(state): State<AppState>,
    member: FamilyMember,
    Path((child_id, id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>, ApiError> {
    let child = resolve_child(&state, &member, child_id).await?;
    owned_by(state.store.get_sleep(id).await, |s| s.child_id == child.id)?;
    state
        .store
        .delete_sleep(id)
        .await
        .map(|_| Json(json!({ "message": "Sleep deleted" })))
        .map_err(store_error)
}

/// GET /children/{child_id}/sleeps/stats: last 24 hours, by session start
pub async fn sleep_stats(
    State(state): State<AppState>,
    member: FamilyMember,
    Path(child_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let child = resolve_child(&state, &member, child_id).await?;
    StatsService::sleep_stats(state.store.as_ref(), child.id)
        .await
        .map_err(stats_error)
        .and_then(to_json)
}

/// GET /children/{child_id}/sleeps/graph
pub async fn sleep_graph(
    State(state): State<AppState>,
    member: FamilyMember,
    Path(child_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let child = resolve_child(&state, &member, child_id).await?;
    StatsService::sleep_graph_data(child.id)
        .await
        .map_err(stats_error)
        .and_then(to_json)
}
