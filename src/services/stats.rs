//! Rolling-window summaries for a child.
//!
//! Everything is recomputed from the store on each call; nothing is cached.
//! Stats cover the trailing 24 hours, chart data the trailing 7 days, both as
//! the half-open window `[now - window, now)`.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    models::{
        feeding::Feeding,
        sleep::Sleep,
        summary::{ChartData, ChartRow, FeedingSummary, SleepSummary, WasteSummary},
        waste::Waste,
    },
    store::{FeedingStore, SleepStore, StoreError, WasteStore},
};

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("{0} chart data is not implemented")]
    NotImplemented(&'static str),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub fn stats_window() -> Duration {
    Duration::days(1)
}

pub fn graph_window() -> Duration {
    Duration::days(7)
}

pub struct StatsService;

impl StatsService {
    pub async fn feeding_stats<S>(store: &S, child_id: Uuid) -> Result<FeedingSummary, StatsError>
    where
        S: FeedingStore + ?Sized,
    {
        Self::feeding_stats_at(store, child_id, Utc::now()).await
    }

    pub async fn feeding_stats_at<S>(
        store: &S,
        child_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<FeedingSummary, StatsError>
    where
        S: FeedingStore + ?Sized,
    {
        let data = store
            .list_feedings_between(child_id, now - stats_window(), now)
            .await?;
        Ok(summarize_feedings(data))
    }

    pub async fn sleep_stats<S>(store: &S, child_id: Uuid) -> Result<SleepSummary, StatsError>
    where
        S: SleepStore + ?Sized,
    {
        Self::sleep_stats_at(store, child_id, Utc::now()).await
    }

    /// Window is applied to the start of each session.
    pub async fn sleep_stats_at<S>(
        store: &S,
        child_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<SleepSummary, StatsError>
    where
        S: SleepStore + ?Sized,
    {
        let data = store
            .list_sleeps_between(child_id, now - stats_window(), now)
            .await?;
        Ok(summarize_sleeps(data))
    }

    pub async fn waste_stats<S>(store: &S, child_id: Uuid) -> Result<WasteSummary, StatsError>
    where
        S: WasteStore + ?Sized,
    {
        Self::waste_stats_at(store, child_id, Utc::now()).await
    }

    pub async fn waste_stats_at<S>(
        store: &S,
        child_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<WasteSummary, StatsError>
    where
        S: WasteStore + ?Sized,
    {
        let data = store
            .list_wastes_between(child_id, now - stats_window(), now)
            .await?;
        Ok(summarize_wastes(data))
    }

    pub async fn waste_graph_data<S>(store: &S, child_id: Uuid) -> Result<ChartData, StatsError>
    where
        S: WasteStore + ?Sized,
    {
        Self::waste_graph_data_at(store, child_id, Utc::now()).await
    }

    pub async fn waste_graph_data_at<S>(
        store: &S,
        child_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<ChartData, StatsError>
    where
        S: WasteStore + ?Sized,
    {
        let start = now - graph_window();
        let data = store.list_wastes_between(child_id, start, now).await?;
        Ok(ChartData {
            start,
            end: now,
            dataset: chart_rows(&data),
        })
    }

    pub async fn feeding_graph_data(_child_id: Uuid) -> Result<ChartData, StatsError> {
        Err(StatsError::NotImplemented("feeding"))
    }

    pub async fn sleep_graph_data(_child_id: Uuid) -> Result<ChartData, StatsError> {
        Err(StatsError::NotImplemented("sleep"))
    }
}

pub fn summarize_feedings(data: Vec<Feeding>) -> FeedingSummary {
    let mut total: BTreeMap<String, f64> = BTreeMap::new();
    let mut range: BTreeMap<String, u32> = BTreeMap::new();
    for f in &data {
        *total.entry(f.kind.clone()).or_default() += f.amount;
        *range.entry(f.kind.clone()).or_default() += 1;
    }
    // every key in total has a count of at least one
    let mean = total
        .iter()
        .map(|(kind, sum)| (kind.clone(), sum / f64::from(range[kind])))
        .collect();

    FeedingSummary {
        data,
        total,
        range,
        mean,
    }
}

/// Open sessions stay in `data` but never contribute to the duration totals.
pub fn summarize_sleeps(data: Vec<Sleep>) -> SleepSummary {
    let mut total = 0i64;
    let mut range = 0u32;
    let mut open_sessions = 0u32;
    for s in &data {
        match s.duration_seconds() {
            Some(secs) => {
                total += secs;
                range += 1;
            }
            None => open_sessions += 1,
        }
    }
    let mean = (range > 0).then(|| total as f64 / f64::from(range));

    SleepSummary {
        data,
        total,
        range,
        mean,
        open_sessions,
    }
}

pub fn summarize_wastes(data: Vec<Waste>) -> WasteSummary {
    let mut total: BTreeMap<i32, u32> = BTreeMap::new();
    for w in &data {
        *total.entry(w.kind).or_default() += 1;
    }
    WasteSummary { data, total }
}

/// Bucket records by UTC calendar day and count each type per day.
/// Rows come out newest day first, then by ascending type.
pub fn chart_rows(data: &[Waste]) -> Vec<ChartRow> {
    let mut buckets: BTreeMap<NaiveDate, BTreeMap<i32, u32>> = BTreeMap::new();
    for w in data {
        *buckets
            .entry(w.recorded_at.date_naive())
            .or_default()
            .entry(w.kind)
            .or_default() += 1;
    }

    buckets
        .into_iter()
        .rev()
        .flat_map(|(date, counts)| {
            counts
                .into_iter()
                .map(move |(kind, count)| ChartRow { date, kind, count })
        })
        .collect()
}
