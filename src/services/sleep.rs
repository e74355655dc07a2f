//! Sleep session tracking.
//!
//! Each (family, child) pair is either closed (no open sleep record) or open
//! (exactly one record with no end time). `start` moves closed -> open, `end`
//! moves open -> closed; anything else is rejected. The one-open-session
//! invariant is enforced by the store, so two concurrent starts cannot both
//! succeed.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    models::sleep::{Sleep, SleepStatus},
    services::metrics::SLEEP_TRANSITIONS_COUNTER,
    store::{SleepStore, StoreError},
};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("a sleep session is already in progress")]
    ExistingStart,

    #[error("no sleep session in progress")]
    NoExistingSession,

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct SleepService;

impl SleepService {
    /// Current session state for a child. An empty result is not an error.
    pub async fn status<S>(store: &S, family_id: Uuid, child_id: Uuid) -> Result<SleepStatus, SessionError>
    where
        S: SleepStore + ?Sized,
    {
        let session = store.find_open_sleep(family_id, child_id).await?;
        Ok(SleepStatus {
            sleeping: session.is_some(),
            session,
        })
    }

    pub async fn start<S>(
        store: &S,
        family_id: Uuid,
        child_id: Uuid,
        user_id: Uuid,
    ) -> Result<Sleep, SessionError>
    where
        S: SleepStore + ?Sized,
    {
        Self::start_at(store, family_id, child_id, user_id, Utc::now()).await
    }

    pub async fn start_at<S>(
        store: &S,
        family_id: Uuid,
        child_id: Uuid,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Sleep, SessionError>
    where
        S: SleepStore + ?Sized,
    {
        let result = Self::try_start(store, family_id, child_id, user_id, now).await;
        record_transition("start", &result);
        result
    }

    async fn try_start<S>(
        store: &S,
        family_id: Uuid,
        child_id: Uuid,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Sleep, SessionError>
    where
        S: SleepStore + ?Sized,
    {
        let status = Self::status(store, family_id, child_id).await?;
        if status.sleeping {
            return Err(SessionError::ExistingStart);
        }

        let sleep = Sleep::open(family_id, child_id, user_id, now);
        match store.insert_open_sleep(&sleep).await {
            Ok(()) => {
                tracing::debug!(%child_id, sleep_id = %sleep.id, "sleep session started");
                Ok(sleep)
            }
            // lost the race to a concurrent start
            Err(StoreError::Conflict(_)) => Err(SessionError::ExistingStart),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn end<S>(store: &S, family_id: Uuid, child_id: Uuid) -> Result<Sleep, SessionError>
    where
        S: SleepStore + ?Sized,
    {
        Self::end_at(store, family_id, child_id, Utc::now()).await
    }

    pub async fn end_at<S>(
        store: &S,
        family_id: Uuid,
        child_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Sleep, SessionError>
    where
        S: SleepStore + ?Sized,
    {
        let result = Self::try_end(store, family_id, child_id, now).await;
        record_transition("end", &result);
        result
    }

    async fn try_end<S>(
        store: &S,
        family_id: Uuid,
        child_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Sleep, SessionError>
    where
        S: SleepStore + ?Sized,
    {
        let mut sleep = Self::status(store, family_id, child_id)
            .await?
            .session
            .ok_or(SessionError::NoExistingSession)?;

        // never record an end before the start
        let ended_at = now.max(sleep.started_at);
        if !store.close_sleep(sleep.id, ended_at).await? {
            return Err(SessionError::NoExistingSession);
        }
        sleep.ended_at = Some(ended_at);
        tracing::debug!(%child_id, sleep_id = %sleep.id, "sleep session ended");
        Ok(sleep)
    }
}

fn record_transition(transition: &str, result: &Result<Sleep, SessionError>) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(SessionError::ExistingStart) | Err(SessionError::NoExistingSession) => "rejected",
        Err(SessionError::Store(_)) => "error",
    };
    SLEEP_TRANSITIONS_COUNTER
        .with_label_values(&[transition, outcome])
        .inc();
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::store::MemoryStore;

    struct Ids {
        family: Uuid,
        child: Uuid,
        user: Uuid,
    }

    fn ids() -> Ids {
        Ids {
            family: Uuid::new_v4(),
            child: Uuid::new_v4(),
            user: Uuid::new_v4(),
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 20, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn status_before_any_start_is_closed() {
        let store = MemoryStore::new();
        let id = ids();
        let status = SleepService::status(&store, id.family, id.child).await.unwrap();
        assert!(!status.sleeping);
        assert!(status.session.is_none());
    }

    #[tokio::test]
    async fn start_opens_a_session() {
        let store = MemoryStore::new();
        let id = ids();
        let started = SleepService::start_at(&store, id.family, id.child, id.user, t0())
            .await
            .unwrap();
        assert!(started.is_open());

        let status = SleepService::status(&store, id.family, id.child).await.unwrap();
        assert!(status.sleeping);
        let session = status.session.unwrap();
        assert_eq!(session.id, started.id);
        assert_eq!(session.started_at, t0());
        assert_eq!(session.user_id, id.user);
    }

    #[tokio::test]
    async fn start_uses_the_current_time() {
        let store = MemoryStore::new();
        let id = ids();
        let before = Utc::now();
        let started = SleepService::start(&store, id.family, id.child, id.user).await.unwrap();
        assert!(started.started_at >= before);
        assert!(started.started_at <= Utc::now());
    }

    #[tokio::test]
    async fn second_start_is_rejected_without_a_new_record() {
        let store = MemoryStore::new();
        let id = ids();
        SleepService::start_at(&store, id.family, id.child, id.user, t0()).await.unwrap();

        let err = SleepService::start_at(&store, id.family, id.child, id.user, t0() + Duration::minutes(5))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::ExistingStart));
        assert_eq!(store.list_sleeps(id.child, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn end_without_session_is_rejected() {
        let store = MemoryStore::new();
        let id = ids();
        let err = SleepService::end_at(&store, id.family, id.child, t0()).await.unwrap_err();
        assert!(matches!(err, SessionError::NoExistingSession));
    }

    #[tokio::test]
    async fn start_end_closes_the_slot() {
        let store = MemoryStore::new();
        let id = ids();
        SleepService::start_at(&store, id.family, id.child, id.user, t0()).await.unwrap();
        let ended = SleepService::end_at(&store, id.family, id.child, t0() + Duration::hours(2))
            .await
            .unwrap();
        assert_eq!(ended.ended_at, Some(t0() + Duration::hours(2)));
        assert_eq!(ended.duration_seconds(), Some(7200));

        let status = SleepService::status(&store, id.family, id.child).await.unwrap();
        assert!(!status.sleeping);
        assert!(status.session.is_none());

        let stored = store.get_sleep(ended.id).await.unwrap();
        assert_eq!(stored, ended);
    }

    #[tokio::test]
    async fn end_is_not_idempotent() {
        let store = MemoryStore::new();
        let id = ids();
        SleepService::start_at(&store, id.family, id.child, id.user, t0()).await.unwrap();
        SleepService::end_at(&store, id.family, id.child, t0() + Duration::hours(1)).await.unwrap();

        let err = SleepService::end_at(&store, id.family, id.child, t0() + Duration::hours(2))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::NoExistingSession));
    }

    #[tokio::test]
    async fn sessions_are_scoped_per_child() {
        let store = MemoryStore::new();
        let id = ids();
        let sibling = Uuid::new_v4();
        SleepService::start_at(&store, id.family, id.child, id.user, t0()).await.unwrap();
        SleepService::start_at(&store, id.family, sibling, id.user, t0()).await.unwrap();

        SleepService::end_at(&store, id.family, id.child, t0() + Duration::hours(1)).await.unwrap();
        let sibling_status = SleepService::status(&store, id.family, sibling).await.unwrap();
        assert!(sibling_status.sleeping);
    }

    #[tokio::test]
    async fn concurrent_starts_leave_one_open_session() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let id = ids();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            let (family, child, user) = (id.family, id.child, id.user);
            handles.push(tokio::spawn(async move {
                SleepService::start_at(store.as_ref(), family, child, user, t0()).await
            }));
        }

        let mut ok = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(_) => ok += 1,
                Err(SessionError::ExistingStart) => {}
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(ok, 1);
        let open: Vec<_> = store
            .list_sleeps(id.child, None)
            .await
            .unwrap()
            .into_iter()
            .filter(Sleep::is_open)
            .collect();
        assert_eq!(open.len(), 1);
    }

    #[tokio::test]
    async fn store_failures_reach_the_caller() {
        use crate::store::failing::FailingStore;
        let id = ids();

        let err = SleepService::status(&FailingStore, id.family, id.child).await.unwrap_err();
        assert!(matches!(err, SessionError::Store(StoreError::Backend(_))));

        let err = SleepService::start_at(&FailingStore, id.family, id.child, id.user, t0())
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Store(_)));

        let err = SleepService::end_at(&FailingStore, id.family, id.child, t0()).await.unwrap_err();
        assert!(matches!(err, SessionError::Store(_)));
    }
}
