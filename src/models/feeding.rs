use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Valid values for the side field of a breast feeding.
pub const BREAST_SIDES: &[&str] = &["left", "right", "both"];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Feeding {
    pub id: Uuid,
    pub family_id: Uuid,
    pub child_id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub kind: String,
    pub amount: f64,
    pub side: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Body for POST (create) and PUT (replace) of a feeding.
#[derive(Debug, Deserialize)]
pub struct FeedingRequest {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub amount: f64,
    pub side: Option<String>,
    /// Defaults to the time of the request.
    pub recorded_at: Option<DateTime<Utc>>,
}

impl FeedingRequest {
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.kind.trim().is_empty(), "feeding type is required");
        anyhow::ensure!(
            self.amount.is_finite() && self.amount >= 0.0,
            "amount must be a non-negative number"
        );
        if let Some(ref side) = self.side {
            anyhow::ensure!(
                BREAST_SIDES.contains(&side.as_str()),
                "invalid side: {side}"
            );
        }
        Ok(())
    }
}
