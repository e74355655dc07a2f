//! # Record store
//!
//! Storage traits the services and handlers are written against. Each
//! aggregate gets its own trait; [`RecordStore`] bundles them so the
//! application can hold a single `Arc<dyn RecordStore>` regardless of which
//! backend is configured.

#[cfg(test)]
pub(crate) mod failing;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    child::Child,
    family::{Family, Invitation},
    feeding::Feeding,
    sleep::Sleep,
    user::User,
    waste::Waste,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("conflicting record: {0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),

    #[error("store unavailable: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(ref db) if db.code().as_deref() == Some("23505") => {
                StoreError::Conflict(db.message().to_string())
            }
            other => StoreError::Database(other),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `Conflict` when the email is already registered.
    async fn insert_user(&self, user: &User) -> StoreResult<()>;

    async fn get_user(&self, id: Uuid) -> StoreResult<User>;

    /// Case-insensitive lookup.
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn set_user_family(&self, user_id: Uuid, family_id: Uuid) -> StoreResult<()>;
}

#[async_trait]
pub trait FamilyStore: Send + Sync {
    async fn insert_family(&self, family: &Family) -> StoreResult<()>;

    async fn get_family(&self, id: Uuid) -> StoreResult<Family>;

    /// Members ordered by name.
    async fn list_members(&self, family_id: Uuid) -> StoreResult<Vec<User>>;

    async fn insert_invitation(&self, invitation: &Invitation) -> StoreResult<()>;

    async fn get_invitation(&self, id: Uuid) -> StoreResult<Invitation>;

    async fn get_invitation_by_code(&self, code: &str) -> StoreResult<Invitation>;

    /// Newest first.
    async fn list_family_invitations(&self, family_id: Uuid) -> StoreResult<Vec<Invitation>>;

    /// Invitations addressed to `email` (case-insensitive), newest first.
    async fn list_invitations_for_email(&self, email: &str) -> StoreResult<Vec<Invitation>>;

    async fn delete_invitation(&self, id: Uuid) -> StoreResult<()>;
}

#[async_trait]
pub trait ChildStore: Send + Sync {
    /// Insert-or-replace by id.
    async fn upsert_child(&self, child: &Child) -> StoreResult<()>;

    async fn get_child(&self, id: Uuid) -> StoreResult<Child>;

    /// Children of a family ordered by name.
    async fn list_children(&self, family_id: Uuid) -> StoreResult<Vec<Child>>;

    /// Removes the child together with its feeding, sleep and waste records.
    async fn delete_child(&self, id: Uuid) -> StoreResult<()>;
}

#[async_trait]
pub trait FeedingStore: Send + Sync {
    async fn upsert_feeding(&self, feeding: &Feeding) -> StoreResult<()>;

    async fn get_feeding(&self, id: Uuid) -> StoreResult<Feeding>;

    /// Newest first, optionally capped at `limit` rows.
    async fn list_feedings(&self, child_id: Uuid, limit: Option<i64>) -> StoreResult<Vec<Feeding>>;

    /// Feedings with `from <= recorded_at < to`, newest first.
    async fn list_feedings_between(
        &self,
        child_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<Feeding>>;

    async fn delete_feeding(&self, id: Uuid) -> StoreResult<()>;
}

#[async_trait]
pub trait WasteStore: Send + Sync {
    async fn upsert_waste(&self, waste: &Waste) -> StoreResult<()>;

    async fn get_waste(&self, id: Uuid) -> StoreResult<Waste>;

    async fn list_wastes(&self, child_id: Uuid, limit: Option<i64>) -> StoreResult<Vec<Waste>>;

    /// Wastes with `from <= recorded_at < to`, newest first.
    async fn list_wastes_between(
        &self,
        child_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<Waste>>;

    async fn delete_waste(&self, id: Uuid) -> StoreResult<()>;
}

#[async_trait]
pub trait SleepStore: Send + Sync {
    /// Insert-or-replace by id. Fails with `Conflict` if the write would leave
    /// two open sessions for the same (family, child).
    async fn upsert_sleep(&self, sleep: &Sleep) -> StoreResult<()>;

    async fn get_sleep(&self, id: Uuid) -> StoreResult<Sleep>;

    async fn list_sleeps(&self, child_id: Uuid, limit: Option<i64>) -> StoreResult<Vec<Sleep>>;

    /// Sleeps with `from <= started_at < to`, newest first.
    async fn list_sleeps_between(
        &self,
        child_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<Sleep>>;

    async fn delete_sleep(&self, id: Uuid) -> StoreResult<()>;

    /// The open session for (family, child), if any.
    async fn find_open_sleep(&self, family_id: Uuid, child_id: Uuid) -> StoreResult<Option<Sleep>>;

    /// Atomically inserts an open session. Fails with `Conflict` if one is
    /// already open for the same (family, child).
    async fn insert_open_sleep(&self, sleep: &Sleep) -> StoreResult<()>;

    /// Sets `ended_at` only if the session is still open. Returns whether a
    /// session was closed.
    async fn close_sleep(&self, id: Uuid, ended_at: DateTime<Utc>) -> StoreResult<bool>;
}

/// Everything the API needs from a backend.
#[async_trait]
pub trait RecordStore:
    UserStore + FamilyStore + ChildStore + FeedingStore + WasteStore + SleepStore
{
    /// Cheap round-trip used by the health check.
    async fn ping(&self) -> StoreResult<()>;
}
