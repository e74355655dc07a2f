pub mod auth;
pub mod children;
pub mod family;
pub mod feedings;
pub mod health;
pub mod metrics;
pub mod sleeps;
pub mod wastes;

use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::store::StoreError;

pub type ApiError = (StatusCode, Json<Value>);

/// Query params for list endpoints.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

impl ListQuery {
    /// The row cap to hand to the store; negative values are a client error.
    pub fn limit(&self) -> Result<Option<i64>, ApiError> {
        match self.limit {
            Some(n) if n < 0 => Err(error(StatusCode::BAD_REQUEST, "limit must not be negative")),
            other => Ok(other),
        }
    }
}

pub(crate) fn error(status: StatusCode, msg: impl std::fmt::Display) -> ApiError {
    (status, Json(json!({ "error": msg.to_string() })))
}

pub(crate) fn to_json<T: Serialize>(value: T) -> Result<Json<Value>, ApiError> {
    serde_json::to_value(value)
        .map(Json)
        .map_err(|e| error(StatusCode::INTERNAL_SERVER_ERROR, e))
}

/// Missing rows are 404, constraint clashes 409, everything else 500.
pub(crate) fn store_error(e: StoreError) -> ApiError {
    match e {
        StoreError::NotFound => error(StatusCode::NOT_FOUND, "Not found"),
        StoreError::Conflict(msg) => error(StatusCode::CONFLICT, msg),
        other => {
            tracing::error!("store failure: {other}");
            error(StatusCode::INTERNAL_SERVER_ERROR, other)
        }
    }
}

/// Service errors carrying a `StoreError` keep its mapping; anything else is
/// a validation failure.
pub(crate) fn service_error(e: anyhow::Error) -> ApiError {
    match e.downcast::<StoreError>() {
        Ok(store) => store_error(store),
        Err(other) => error(StatusCode::BAD_REQUEST, other),
    }
}

pub(crate) fn stats_error(e: crate::services::stats::StatsError) -> ApiError {
    use crate::services::stats::StatsError;
    match e {
        StatsError::NotImplemented(_) => error(StatusCode::NOT_IMPLEMENTED, e),
        StatsError::Store(s) => store_error(s),
    }
}

/// A record fetched by id must belong to the child named in the path.
pub(crate) fn owned_by<T>(record: Result<T, StoreError>, belongs: impl FnOnce(&T) -> bool) -> Result<T, ApiError> {
    match record {
        Ok(r) if belongs(&r) => Ok(r),
        Ok(_) => Err(store_error(StoreError::NotFound)),
        Err(e) => Err(store_error(e)),
    }
}

/// For PUT: the id is either unused or already owned by this child.
pub(crate) fn replaceable<T>(existing: Result<T, StoreError>, belongs: impl FnOnce(&T) -> bool) -> Result<(), ApiError> {
    match existing {
        Err(StoreError::NotFound) => Ok(()),
        other => owned_by(other, belongs).map(|_| ()),
    }
}
