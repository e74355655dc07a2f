//! Derived, never-persisted aggregates built on demand from a window of records.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use super::{feeding::Feeding, sleep::Sleep, waste::Waste};

#[derive(Debug, Clone, Serialize)]
pub struct FeedingSummary {
    pub data: Vec<Feeding>,
    /// Summed amount per feeding type.
    pub total: BTreeMap<String, f64>,
    /// Number of feedings per type.
    pub range: BTreeMap<String, u32>,
    pub mean: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SleepSummary {
    pub data: Vec<Sleep>,
    /// Seconds slept across closed sessions.
    pub total: i64,
    /// Number of closed sessions.
    pub range: u32,
    /// `None` when no closed session falls in the window.
    pub mean: Option<f64>,
    /// Sessions in the window that are still open and excluded from the totals.
    pub open_sessions: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct WasteSummary {
    pub data: Vec<Waste>,
    /// Number of changes per waste type.
    pub total: BTreeMap<i32, u32>,
}

/// One (day, type, count) triple. Days without records never appear.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChartRow {
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: i32,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartData {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub dataset: Vec<ChartRow>,
}
