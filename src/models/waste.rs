use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A diaper change. `kind` is an integer category (1 = wet, 2 = dirty, 3 = mixed
/// in the bundled clients); the backend does not restrict it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Waste {
    pub id: Uuid,
    pub family_id: Uuid,
    pub child_id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub kind: i32,
    pub notes: String,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct WasteRequest {
    #[serde(rename = "type")]
    pub kind: i32,
    #[serde(default)]
    pub notes: String,
    pub recorded_at: Option<DateTime<Utc>>,
}
