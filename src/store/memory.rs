use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{
    ChildStore, FamilyStore, FeedingStore, RecordStore, SleepStore, StoreError, StoreResult,
    UserStore, WasteStore,
};
use crate::models::{
    child::Child,
    family::{Family, Invitation},
    feeding::Feeding,
    sleep::Sleep,
    user::User,
    waste::Waste,
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    families: HashMap<Uuid, Family>,
    invitations: HashMap<Uuid, Invitation>,
    children: HashMap<Uuid, Child>,
    feedings: HashMap<Uuid, Feeding>,
    sleeps: HashMap<Uuid, Sleep>,
    wastes: HashMap<Uuid, Waste>,
}

/// Process-local store for development (`STORE_BACKEND=memory`) and tests.
/// Every operation runs under a single lock, so check-then-insert sequences
/// are atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".into()))
    }
}

fn found<T: Clone>(map: &HashMap<Uuid, T>, id: Uuid) -> StoreResult<T> {
    map.get(&id).cloned().ok_or(StoreError::NotFound)
}

fn removed<T>(value: Option<T>) -> StoreResult<()> {
    value.map(|_| ()).ok_or(StoreError::NotFound)
}

/// Clone, sort newest first and cap at `limit`.
fn newest_first<'a, T, I, K>(rows: I, key: K, limit: Option<i64>) -> Vec<T>
where
    T: Clone + 'a,
    I: Iterator<Item = &'a T>,
    K: Fn(&T) -> DateTime<Utc>,
{
    let mut out: Vec<T> = rows.cloned().collect();
    out.sort_by(|a, b| key(b).cmp(&key(a)));
    if let Some(n) = limit {
        out.truncate(usize::try_from(n.max(0)).unwrap_or(usize::MAX));
    }
    out
}

fn in_window(ts: DateTime<Utc>, from: DateTime<Utc>, to: DateTime<Utc>) -> bool {
    ts >= from && ts < to
}

fn has_other_open(tables: &Tables, sleep: &Sleep) -> bool {
    tables.sleeps.values().any(|s| {
        s.id != sleep.id
            && s.is_open()
            && s.family_id == sleep.family_id
            && s.child_id == sleep.child_id
    })
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut t = self.lock()?;
        if t.users.values().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(StoreError::Conflict(format!("email {} already registered", user.email)));
        }
        t.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<User> {
        found(&self.lock()?.users, id)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .lock()?
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn set_user_family(&self, user_id: Uuid, family_id: Uuid) -> StoreResult<()> {
        let mut t = self.lock()?;
        let user = t.users.get_mut(&user_id).ok_or(StoreError::NotFound)?;
        user.family_id = Some(family_id);
        Ok(())
    }
}

#[async_trait]
impl FamilyStore for MemoryStore {
    async fn insert_family(&self, family: &Family) -> StoreResult<()> {
        let mut t = self.lock()?;
        if t.families.contains_key(&family.id) {
            return Err(StoreError::Conflict(format!("family {} exists", family.id)));
        }
        t.families.insert(family.id, family.clone());
        Ok(())
    }

    async fn get_family(&self, id: Uuid) -> StoreResult<Family> {
        found(&self.lock()?.families, id)
    }

    async fn list_members(&self, family_id: Uuid) -> StoreResult<Vec<User>> {
        let t = self.lock()?;
        let mut members: Vec<User> = t
            .users
            .values()
            .filter(|u| u.family_id == Some(family_id))
            .cloned()
            .collect();
        members.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.email.cmp(&b.email)));
        Ok(members)
    }

    async fn insert_invitation(&self, invitation: &Invitation) -> StoreResult<()> {
        let mut t = self.lock()?;
        if t.invitations.values().any(|i| i.code == invitation.code) {
            return Err(StoreError::Conflict("invitation code already used".into()));
        }
        t.invitations.insert(invitation.id, invitation.clone());
        Ok(())
    }

    async fn get_invitation(&self, id: Uuid) -> StoreResult<Invitation> {
        found(&self.lock()?.invitations, id)
    }

    async fn get_invitation_by_code(&self, code: &str) -> StoreResult<Invitation> {
        self.lock()?
            .invitations
            .values()
            .find(|i| i.code == code)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn list_family_invitations(&self, family_id: Uuid) -> StoreResult<Vec<Invitation>> {
        let t = self.lock()?;
        Ok(newest_first(
            t.invitations.values().filter(|i| i.family_id == family_id),
            |i| i.created_at,
            None,
        ))
    }

    async fn list_invitations_for_email(&self, email: &str) -> StoreResult<Vec<Invitation>> {
        let t = self.lock()?;
        Ok(newest_first(
            t.invitations.values().filter(|i| i.email.eq_ignore_ascii_case(email)),
            |i| i.created_at,
            None,
        ))
    }

    async fn delete_invitation(&self, id: Uuid) -> StoreResult<()> {
        removed(self.lock()?.invitations.remove(&id))
    }
}

#[async_trait]
impl ChildStore for MemoryStore {
    async fn upsert_child(&self, child: &Child) -> StoreResult<()> {
        self.lock()?.children.insert(child.id, child.clone());
        Ok(())
    }

    async fn get_child(&self, id: Uuid) -> StoreResult<Child> {
        found(&self.lock()?.children, id)
    }

    async fn list_children(&self, family_id: Uuid) -> StoreResult<Vec<Child>> {
        let t = self.lock()?;
        let mut children: Vec<Child> = t
            .children
            .values()
            .filter(|c| c.family_id == family_id)
            .cloned()
            .collect();
        children.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.created_at.cmp(&b.created_at)));
        Ok(children)
    }

    async fn delete_child(&self, id: Uuid) -> StoreResult<()> {
        let mut t = self.lock()?;
        t.children.remove(&id).ok_or(StoreError::NotFound)?;
        t.feedings.retain(|_, f| f.child_id != id);
        t.sleeps.retain(|_, s| s.child_id != id);
        t.wastes.retain(|_, w| w.child_id != id);
        Ok(())
    }
}

#[async_trait]
impl FeedingStore for MemoryStore {
    async fn upsert_feeding(&self, feeding: &Feeding) -> StoreResult<()> {
        self.lock()?.feedings.insert(feeding.id, feeding.clone());
        Ok(())
    }

    async fn get_feeding(&self, id: Uuid) -> StoreResult<Feeding> {
        found(&self.lock()?.feedings, id)
    }

    async fn list_feedings(&self, child_id: Uuid, limit: Option<i64>) -> StoreResult<Vec<Feeding>> {
        let t = self.lock()?;
        Ok(newest_first(
            t.feedings.values().filter(|f| f.child_id == child_id),
            |f| f.recorded_at,
            limit,
        ))
    }

    async fn list_feedings_between(
        &self,
        child_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<Feeding>> {
        let t = self.lock()?;
        Ok(newest_first(
            t.feedings
                .values()
                .filter(|f| f.child_id == child_id && in_window(f.recorded_at, from, to)),
            |f| f.recorded_at,
            None,
        ))
    }

    async fn delete_feeding(&self, id: Uuid) -> StoreResult<()> {
        removed(self.lock()?.feedings.remove(&id))
    }
}

#[async_trait]
impl WasteStore for MemoryStore {
    async fn upsert_waste(&self, waste: &Waste) -> StoreResult<()> {
        self.lock()?.wastes.insert(waste.id, waste.clone());
        Ok(())
    }

    async fn get_waste(&self, id: Uuid) -> StoreResult<Waste> {
        found(&self.lock()?.wastes, id)
    }

    async fn list_wastes(&self, child_id: Uuid, limit: Option<i64>) -> StoreResult<Vec<Waste>> {
        let t = self.lock()?;
        Ok(newest_first(
            t.wastes.values().filter(|w| w.child_id == child_id),
            |w| w.recorded_at,
            limit,
        ))
    }

    async fn list_wastes_between(
        &self,
        child_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<Waste>> {
        let t = self.lock()?;
        Ok(newest_first(
            t.wastes
                .values()
                .filter(|w| w.child_id == child_id && in_window(w.recorded_at, from, to)),
            |w| w.recorded_at,
            None,
        ))
    }

    async fn delete_waste(&self, id: Uuid) -> StoreResult<()> {
        removed(self.lock()?.wastes.remove(&id))
    }
}

#[async_trait]
impl SleepStore for MemoryStore {
    async fn upsert_sleep(&self, sleep: &Sleep) -> StoreResult<()> {
        let mut t = self.lock()?;
        if sleep.is_open() && has_other_open(&t, sleep) {
            return Err(StoreError::Conflict("a sleep session is already open".into()));
        }
        t.sleeps.insert(sleep.id, sleep.clone());
        Ok(())
    }

    async fn get_sleep(&self, id: Uuid) -> StoreResult<Sleep> {
        found(&self.lock()?.sleeps, id)
    }

    async fn list_sleeps(&self, child_id: Uuid, limit: Option<i64>) -> StoreResult<Vec<Sleep>> {
        let t = self.lock()?;
        Ok(newest_first(
            t.sleeps.values().filter(|s| s.child_id == child_id),
            |s| s.started_at,
            limit,
        ))
    }

    async fn list_sleeps_between(
        &self,
        child_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<Sleep>> {
        let t = self.lock()?;
        Ok(newest_first(
            t.sleeps
                .values()
                .filter(|s| s.child_id == child_id && in_window(s.started_at, from, to)),
            |s| s.started_at,
            None,
        ))
    }

    async fn delete_sleep(&self, id: Uuid) -> StoreResult<()> {
        removed(self.lock()?.sleeps.remove(&id))
    }

    async fn find_open_sleep(&self, family_id: Uuid, child_id: Uuid) -> StoreResult<Option<Sleep>> {
        Ok(self
            .lock()?
            .sleeps
            .values()
            .find(|s| s.is_open() && s.family_id == family_id && s.child_id == child_id)
            .cloned())
    }

    async fn insert_open_sleep(&self, sleep: &Sleep) -> StoreResult<()> {
        let mut t = self.lock()?;
        if has_other_open(&t, sleep) {
            return Err(StoreError::Conflict("a sleep session is already open".into()));
        }
        let mut open = sleep.clone();
        open.ended_at = None;
        t.sleeps.insert(open.id, open);
        Ok(())
    }

    async fn close_sleep(&self, id: Uuid, ended_at: DateTime<Utc>) -> StoreResult<bool> {
        let mut t = self.lock()?;
        match t.sleeps.get_mut(&id) {
            Some(s) if s.is_open() => {
                s.ended_at = Some(ended_at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        self.lock().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, hour, 0, 0).unwrap()
    }

    fn waste(child_id: Uuid, kind: i32, recorded_at: DateTime<Utc>) -> Waste {
        Waste {
            id: Uuid::new_v4(),
            family_id: Uuid::new_v4(),
            child_id,
            user_id: Uuid::new_v4(),
            kind,
            notes: String::new(),
            recorded_at,
        }
    }

    #[tokio::test]
    async fn saved_records_read_back_unchanged() {
        let store = MemoryStore::new();
        let child_id = Uuid::new_v4();
        let feeding = Feeding {
            id: Uuid::new_v4(),
            family_id: Uuid::new_v4(),
            child_id,
            user_id: Uuid::new_v4(),
            kind: "breast".into(),
            amount: 12.5,
            side: Some("left".into()),
            recorded_at: at(8),
        };
        store.upsert_feeding(&feeding).await.unwrap();
        assert_eq!(store.get_feeding(feeding.id).await.unwrap(), feeding);

        let w = waste(child_id, 2, at(9));
        store.upsert_waste(&w).await.unwrap();
        assert_eq!(store.get_waste(w.id).await.unwrap(), w);
    }

    #[tokio::test]
    async fn upsert_replaces_by_id() {
        let store = MemoryStore::new();
        let mut w = waste(Uuid::new_v4(), 1, at(8));
        store.upsert_waste(&w).await.unwrap();
        w.kind = 3;
        w.notes = "blowout".into();
        store.upsert_waste(&w).await.unwrap();

        let all = store.list_wastes(w.child_id, None).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].kind, 3);
    }

    #[tokio::test]
    async fn window_is_half_open_and_newest_first() {
        let store = MemoryStore::new();
        let child_id = Uuid::new_v4();
        for hour in [6, 8, 10, 12] {
            store.upsert_waste(&waste(child_id, 1, at(hour))).await.unwrap();
        }

        let rows = store
            .list_wastes_between(child_id, at(8), at(12))
            .await
            .unwrap();
        let hours: Vec<_> = rows.iter().map(|w| w.recorded_at).collect();
        assert_eq!(hours, vec![at(10), at(8)]);
    }

    #[tokio::test]
    async fn list_limit_caps_results() {
        let store = MemoryStore::new();
        let child_id = Uuid::new_v4();
        for hour in 1..=5 {
            store.upsert_waste(&waste(child_id, 1, at(hour))).await.unwrap();
        }
        let rows = store.list_wastes(child_id, Some(2)).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].recorded_at, at(5));
    }

    #[tokio::test]
    async fn second_open_sleep_conflicts() {
        let store = MemoryStore::new();
        let (family, child, user) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        store
            .insert_open_sleep(&Sleep::open(family, child, user, at(1)))
            .await
            .unwrap();
        let err = store
            .insert_open_sleep(&Sleep::open(family, child, user, at(2)))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        // a different child is unaffected
        store
            .insert_open_sleep(&Sleep::open(family, Uuid::new_v4(), user, at(2)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn close_sleep_only_closes_open_sessions() {
        let store = MemoryStore::new();
        let sleep = Sleep::open(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), at(1));
        store.insert_open_sleep(&sleep).await.unwrap();

        assert!(store.close_sleep(sleep.id, at(3)).await.unwrap());
        assert!(!store.close_sleep(sleep.id, at(4)).await.unwrap());
        assert_eq!(store.get_sleep(sleep.id).await.unwrap().ended_at, Some(at(3)));
        assert!(!store.close_sleep(Uuid::new_v4(), at(4)).await.unwrap());
    }

    #[tokio::test]
    async fn delete_child_cascades() {
        let store = MemoryStore::new();
        let family_id = Uuid::new_v4();
        let child = Child {
            id: Uuid::new_v4(),
            family_id,
            name: "Ada".into(),
            birth_date: None,
            created_at: at(0),
        };
        store.upsert_child(&child).await.unwrap();
        store.upsert_waste(&waste(child.id, 1, at(1))).await.unwrap();

        store.delete_child(child.id).await.unwrap();
        assert!(matches!(store.get_child(child.id).await, Err(StoreError::NotFound)));
        assert!(store.list_wastes(child.id, None).await.unwrap().is_empty());
        assert!(matches!(store.delete_child(child.id).await, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn emails_are_unique_ignoring_case() {
        let store = MemoryStore::new();
        let user = User {
            id: Uuid::new_v4(),
            email: "Parent@Example.com".into(),
            password_hash: "x".into(),
            name: "Parent".into(),
            family_id: None,
            created_at: at(0),
        };
        store.insert_user(&user).await.unwrap();

        let dup = User { id: Uuid::new_v4(), email: "parent@example.com".into(), ..user.clone() };
        assert!(matches!(store.insert_user(&dup).await, Err(StoreError::Conflict(_))));

        let fetched = store.find_user_by_email("PARENT@example.COM").await.unwrap();
        assert_eq!(fetched.map(|u| u.id), Some(user.id));
    }
}
