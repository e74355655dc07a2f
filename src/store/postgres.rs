use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
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

/// Postgres-backed store. Schema lives in `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn expect_affected(rows: u64) -> StoreResult<()> {
    if rows == 0 {
        Err(StoreError::NotFound)
    } else {
        Ok(())
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO users (id, email, password_hash, name, family_id, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(user.family_id)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<User> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn set_user_family(&self, user_id: Uuid, family_id: Uuid) -> StoreResult<()> {
        let res = sqlx::query("UPDATE users SET family_id = $1 WHERE id = $2")
            .bind(family_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        expect_affected(res.rows_affected())
    }
}

#[async_trait]
impl FamilyStore for PgStore {
    async fn insert_family(&self, family: &Family) -> StoreResult<()> {
        sqlx::query("INSERT INTO families (id, name, created_at) VALUES ($1, $2, $3)")
            .bind(family.id)
            .bind(&family.name)
            .bind(family.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_family(&self, id: Uuid) -> StoreResult<Family> {
        let family = sqlx::query_as::<_, Family>("SELECT * FROM families WHERE id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(family)
    }

    async fn list_members(&self, family_id: Uuid) -> StoreResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE family_id = $1 ORDER BY name, email",
        )
        .bind(family_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn insert_invitation(&self, invitation: &Invitation) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO invitations (id, family_id, email, code, invited_by, created_at, expires_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(invitation.id)
        .bind(invitation.family_id)
        .bind(&invitation.email)
        .bind(&invitation.code)
        .bind(invitation.invited_by)
        .bind(invitation.created_at)
        .bind(invitation.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_invitation(&self, id: Uuid) -> StoreResult<Invitation> {
        let invitation = sqlx::query_as::<_, Invitation>("SELECT * FROM invitations WHERE id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(invitation)
    }

    async fn get_invitation_by_code(&self, code: &str) -> StoreResult<Invitation> {
        let invitation = sqlx::query_as::<_, Invitation>("SELECT * FROM invitations WHERE code = $1")
            .bind(code)
            .fetch_one(&self.pool)
            .await?;
        Ok(invitation)
    }

    async fn list_family_invitations(&self, family_id: Uuid) -> StoreResult<Vec<Invitation>> {
        let invitations = sqlx::query_as::<_, Invitation>(
            "SELECT * FROM invitations WHERE family_id = $1 ORDER BY created_at DESC",
        )
        .bind(family_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(invitations)
    }

    async fn list_invitations_for_email(&self, email: &str) -> StoreResult<Vec<Invitation>> {
        let invitations = sqlx::query_as::<_, Invitation>(
            "SELECT * FROM invitations WHERE LOWER(email) = LOWER($1) ORDER BY created_at DESC",
        )
        .bind(email)
        .fetch_all(&self.pool)
        .await?;
        Ok(invitations)
    }

    async fn delete_invitation(&self, id: Uuid) -> StoreResult<()> {
        let res = sqlx::query("DELETE FROM invitations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        expect_affected(res.rows_affected())
    }
}

#[async_trait]
impl ChildStore for PgStore {
    async fn upsert_child(&self, child: &Child) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO children (id, family_id, name, birth_date, created_at)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (id) DO UPDATE SET
                 name       = EXCLUDED.name,
                 birth_date = EXCLUDED.birth_date",
        )
        .bind(child.id)
        .bind(child.family_id)
        .bind(&child.name)
        .bind(child.birth_date)
        .bind(child.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_child(&self, id: Uuid) -> StoreResult<Child> {
        let child = sqlx::query_as::<_, Child>("SELECT * FROM children WHERE id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(child)
    }

    async fn list_children(&self, family_id: Uuid) -> StoreResult<Vec<Child>> {
        let children = sqlx::query_as::<_, Child>(
            "SELECT * FROM children WHERE family_id = $1 ORDER BY name, created_at",
        )
        .bind(family_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(children)
    }

    async fn delete_child(&self, id: Uuid) -> StoreResult<()> {
        // FK CASCADE removes feedings, sleeps and wastes
        let res = sqlx::query("DELETE FROM children WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        expect_affected(res.rows_affected())
    }
}

#[async_trait]
impl FeedingStore for PgStore {
    async fn upsert_feeding(&self, feeding: &Feeding) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO feedings (id, family_id, child_id, user_id, kind, amount, side, recorded_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             ON CONFLICT (id) DO UPDATE SET
                 user_id     = EXCLUDED.user_id,
                 kind        = EXCLUDED.kind,
                 amount      = EXCLUDED.amount,
                 side        = EXCLUDED.side,
                 recorded_at = EXCLUDED.recorded_at",
        )
        .bind(feeding.id)
        .bind(feeding.family_id)
        .bind(feeding.child_id)
        .bind(feeding.user_id)
        .bind(&feeding.kind)
        .bind(feeding.amount)
        .bind(&feeding.side)
        .bind(feeding.recorded_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_feeding(&self, id: Uuid) -> StoreResult<Feeding> {
        let feeding = sqlx::query_as::<_, Feeding>("SELECT * FROM feedings WHERE id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(feeding)
    }

    async fn list_feedings(&self, child_id: Uuid, limit: Option<i64>) -> StoreResult<Vec<Feeding>> {
        let feedings = sqlx::query_as::<_, Feeding>(
            "SELECT * FROM feedings WHERE child_id = $1 ORDER BY recorded_at DESC LIMIT $2",
        )
        .bind(child_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(feedings)
    }

    async fn list_feedings_between(
        &self,
        child_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<Feeding>> {
        let feedings = sqlx::query_as::<_, Feeding>(
            "SELECT * FROM feedings
             WHERE child_id = $1 AND recorded_at >= $2 AND recorded_at < $3
             ORDER BY recorded_at DESC",
        )
        .bind(child_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(feedings)
    }

    async fn delete_feeding(&self, id: Uuid) -> StoreResult<()> {
        let res = sqlx::query("DELETE FROM feedings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        expect_affected(res.rows_affected())
    }
}

#[async_trait]
impl WasteStore for PgStore {
    async fn upsert_waste(&self, waste: &Waste) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO wastes (id, family_id, child_id, user_id, kind, notes, recorded_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (id) DO UPDATE SET
                 user_id     = EXCLUDED.user_id,
                 kind        = EXCLUDED.kind,
                 notes       = EXCLUDED.notes,
                 recorded_at = EXCLUDED.recorded_at",
        )
        .bind(waste.id)
        .bind(waste.family_id)
        .bind(waste.child_id)
        .bind(waste.user_id)
        .bind(waste.kind)
        .bind(&waste.notes)
        .bind(waste.recorded_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_waste(&self, id: Uuid) -> StoreResult<Waste> {
        let waste = sqlx::query_as::<_, Waste>("SELECT * FROM wastes WHERE id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(waste)
    }

    async fn list_wastes(&self, child_id: Uuid, limit: Option<i64>) -> StoreResult<Vec<Waste>> {
        let wastes = sqlx::query_as::<_, Waste>(
            "SELECT * FROM wastes WHERE child_id = $1 ORDER BY recorded_at DESC LIMIT $2",
        )
        .bind(child_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(wastes)
    }

    async fn list_wastes_between(
        &self,
        child_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<Waste>> {
        let wastes = sqlx::query_as::<_, Waste>(
            "SELECT * FROM wastes
             WHERE child_id = $1 AND recorded_at >= $2 AND recorded_at < $3
             ORDER BY recorded_at DESC",
        )
        .bind(child_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(wastes)
    }

    async fn delete_waste(&self, id: Uuid) -> StoreResult<()> {
        let res = sqlx::query("DELETE FROM wastes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        expect_affected(res.rows_affected())
    }
}

#[async_trait]
impl SleepStore for PgStore {
    async fn upsert_sleep(&self, sleep: &Sleep) -> StoreResult<()> {
        // sleeps_one_open_idx rejects a second open session with 23505
        sqlx::query(
            "INSERT INTO sleeps (id, family_id, child_id, user_id, started_at, ended_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (id) DO UPDATE SET
                 user_id    = EXCLUDED.user_id,
                 started_at = EXCLUDED.started_at,
                 ended_at   = EXCLUDED.ended_at",
        )
        .bind(sleep.id)
        .bind(sleep.family_id)
        .bind(sleep.child_id)
        .bind(sleep.user_id)
        .bind(sleep.started_at)
        .bind(sleep.ended_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_sleep(&self, id: Uuid) -> StoreResult<Sleep> {
        let sleep = sqlx::query_as::<_, Sleep>("SELECT * FROM sleeps WHERE id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(sleep)
    }

    async fn list_sleeps(&self, child_id: Uuid, limit: Option<i64>) -> StoreResult<Vec<Sleep>> {
        let sleeps = sqlx::query_as::<_, Sleep>(
            "SELECT * FROM sleeps WHERE child_id = $1 ORDER BY started_at DESC LIMIT $2",
        )
        .bind(child_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(sleeps)
    }

    async fn list_sleeps_between(
        &self,
        child_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<Sleep>> {
        let sleeps = sqlx::query_as::<_, Sleep>(
            "SELECT * FROM sleeps
             WHERE child_id = $1 AND started_at >= $2 AND started_at < $3
             ORDER BY started_at DESC",
        )
        .bind(child_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(sleeps)
    }

    async fn delete_sleep(&self, id: Uuid) -> StoreResult<()> {
        let res = sqlx::query("DELETE FROM sleeps WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        expect_affected(res.rows_affected())
    }

    async fn find_open_sleep(&self, family_id: Uuid, child_id: Uuid) -> StoreResult<Option<Sleep>> {
        let sleep = sqlx::query_as::<_, Sleep>(
            "SELECT * FROM sleeps
             WHERE family_id = $1 AND child_id = $2 AND ended_at IS NULL",
        )
        .bind(family_id)
        .bind(child_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(sleep)
    }

    async fn insert_open_sleep(&self, sleep: &Sleep) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO sleeps (id, family_id, child_id, user_id, started_at, ended_at)
             VALUES ($1, $2, $3, $4, $5, NULL)",
        )
        .bind(sleep.id)
        .bind(sleep.family_id)
        .bind(sleep.child_id)
        .bind(sleep.user_id)
        .bind(sleep.started_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn close_sleep(&self, id: Uuid, ended_at: DateTime<Utc>) -> StoreResult<bool> {
        let res = sqlx::query("UPDATE sleeps SET ended_at = $1 WHERE id = $2 AND ended_at IS NULL")
            .bind(ended_at)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
