use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A sleep interval. `ended_at` is `None` while the session is open.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Sleep {
    pub id: Uuid,
    pub family_id: Uuid,
    pub child_id: Uuid,
    pub user_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Sleep {
    /// A fresh open session starting at `now`.
    pub fn open(family_id: Uuid, child_id: Uuid, user_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            family_id,
            child_id,
            user_id,
            started_at: now,
            ended_at: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }

    /// Whole seconds slept, or `None` for an open session.
    pub fn duration_seconds(&self) -> Option<i64> {
        self.ended_at
            .map(|end| end.timestamp() - self.started_at.timestamp())
    }
}

/// Body for manually logging (or replacing) a sleep interval.
#[derive(Debug, Deserialize)]
pub struct SleepRequest {
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl SleepRequest {
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(end) = self.ended_at {
            anyhow::ensure!(end > self.started_at, "ended_at must be after started_at");
        }
        Ok(())
    }
}

/// Result of a session status lookup.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SleepStatus {
    pub sleeping: bool,
    pub session: Option<Sleep>,
}
