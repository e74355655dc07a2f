//! A store whose every call fails, for exercising error paths in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{FeedingStore, SleepStore, StoreError, StoreResult, WasteStore};
use crate::models::{feeding::Feeding, sleep::Sleep, waste::Waste};

pub struct FailingStore;

fn down<T>() -> StoreResult<T> {
    Err(StoreError::Backend("connection refused".into()))
}

#[async_trait]
impl FeedingStore for FailingStore {
    async fn upsert_feeding(&self, _: &Feeding) -> StoreResult<()> {
        down()
    }

    async fn get_feeding(&self, _: Uuid) -> StoreResult<Feeding> {
        down()
    }

    async fn list_feedings(&self, _: Uuid, _: Option<i64>) -> StoreResult<Vec<Feeding>> {
        down()
    }

    async fn list_feedings_between(&self, _: Uuid, _: DateTime<Utc>, _: DateTime<Utc>) -> StoreResult<Vec<Feeding>> {
        down()
    }

    async fn delete_feeding(&self, _: Uuid) -> StoreResult<()> {
        down()
    }
}

#[async_trait]
impl WasteStore for FailingStore {
    async fn upsert_waste(&self, _: &Waste) -> StoreResult<()> {
        down()
    }

    async fn get_waste(&self, _: Uuid) -> StoreResult<Waste> {
        down()
    }

    async fn list_wastes(&self, _: Uuid, _: Option<i64>) -> StoreResult<Vec<Waste>> {
        down()
    }

    async fn list_wastes_between(&self, _: Uuid, _: DateTime<Utc>, _: DateTime<Utc>) -> StoreResult<Vec<Waste>> {
        down()
    }

    async fn delete_waste(&self, _: Uuid) -> StoreResult<()> {
        down()
    }
}

#[async_trait]
impl SleepStore for FailingStore {
    async fn upsert_sleep(&self, _: &Sleep) -> StoreResult<()> {
        down()
    }

    async fn get_sleep(&self, _: Uuid) -> StoreResult<Sleep> {
        down()
    }

    async fn list_sleeps(&self, _: Uuid, _: Option<i64>) -> StoreResult<Vec<Sleep>> {
        down()
    }

    async fn list_sleeps_between(&self, _: Uuid, _: DateTime<Utc>, _: DateTime<Utc>) -> StoreResult<Vec<Sleep>> {
        down()
    }

    async fn delete_sleep(&self, _: Uuid) -> StoreResult<()> {
        down()
    }

    async fn find_open_sleep(&self, _: Uuid, _: Uuid) -> StoreResult<Option<Sleep>> {
        down()
    }

    async fn insert_open_sleep(&self, _: &Sleep) -> StoreResult<()> {
        down()
    }

    async fn close_sleep(&self, _: Uuid, _: DateTime<Utc>) -> StoreResult<bool> {
        down()
    }
}
