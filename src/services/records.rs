//! Field mapping from request bodies to feeding, sleep and waste records.

use chrono::Utc;
use uuid::Uuid;

use crate::{
    models::{
        child::Child,
        feeding::{Feeding, FeedingRequest},
        sleep::{Sleep, SleepRequest},
        waste::{Waste, WasteRequest},
    },
    services::metrics::RECORDS_CREATED_COUNTER,
    store::{FeedingStore, SleepStore, WasteStore},
};

pub struct RecordService;

impl RecordService {
    /// Insert (fresh id) or replace (`id` given) a feeding for `child`.
    pub async fn save_feeding<S>(
        store: &S,
        child: &Child,
        user_id: Uuid,
        id: Option<Uuid>,
        req: &FeedingRequest,
    ) -> anyhow::Result<Feeding>
    where
        S: FeedingStore + ?Sized,
    {
        req.validate()?;
        let feeding = Feeding {
            id: id.unwrap_or_else(Uuid::new_v4),
            family_id: child.family_id,
            child_id: child.id,
            user_id,
            kind: req.kind.trim().to_lowercase(),
            amount: req.amount,
            side: req.side.clone(),
            recorded_at: req.recorded_at.unwrap_or_else(Utc::now),
        };
        store.upsert_feeding(&feeding).await?;
        if id.is_none() {
            RECORDS_CREATED_COUNTER.with_label_values(&["feeding"]).inc();
        }
        Ok(feeding)
    }

    /// Insert or replace a manually logged sleep. An open interval is subject
    /// to the same one-open-session rule as a started session.
    pub async fn save_sleep<S>(
        store: &S,
        child: &Child,
        user_id: Uuid,
        id: Option<Uuid>,
        req: &SleepRequest,
    ) -> anyhow::Result<Sleep>
    where
        S: SleepStore + ?Sized,
    {
        req.validate()?;
        let sleep = Sleep {
            id: id.unwrap_or_else(Uuid::new_v4),
            family_id: child.family_id,
            child_id: child.id,
            user_id,
            started_at: req.started_at,
            ended_at: req.ended_at,
        };
        store.upsert_sleep(&sleep).await?;
        if id.is_none() {
            RECORDS_CREATED_COUNTER.with_label_values(&["sleep"]).inc();
        }
        Ok(sleep)
    }

    pub async fn save_waste<S>(
        store: &S,
        child: &Child,
        user_id: Uuid,
        id: Option<Uuid>,
        req: &WasteRequest,
    ) -> anyhow::Result<Waste>
    where
        S: WasteStore + ?Sized,
    {
        let waste = Waste {
            id: id.unwrap_or_else(Uuid::new_v4),
            family_id: child.family_id,
            child_id: child.id,
            user_id,
            kind: req.kind,
            notes: req.notes.trim().to_string(),
            recorded_at: req.recorded_at.unwrap_or_else(Utc::now),
        };
        store.upsert_waste(&waste).await?;
        if id.is_none() {
            RECORDS_CREATED_COUNTER.with_label_values(&["waste"]).inc();
        }
        Ok(waste)
    }
}
