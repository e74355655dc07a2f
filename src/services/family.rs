use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    models::{
        family::{Family, FamilyResponse, Invitation},
        user::User,
    },
    services::metrics::INVITATIONS_COUNTER,
    store::{FamilyStore, StoreError, UserStore},
};

#[derive(Debug, Error)]
pub enum FamilyError {
    #[error("you already belong to a family")]
    AlreadyInFamily,

    #[error("invitation not found")]
    InvitationNotFound,

    #[error("this invitation is addressed to someone else")]
    NotInvitee,

    #[error("invitation has expired")]
    Expired,

    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

fn invitation_code() -> String {
    rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

pub struct FamilyService;

impl FamilyService {
    /// Create a family and make `user` its first member.
    pub async fn create<S>(store: &S, user: &User, name: &str) -> Result<Family, FamilyError>
    where
        S: UserStore + FamilyStore + ?Sized,
    {
        if user.family_id.is_some() {
            return Err(FamilyError::AlreadyInFamily);
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(FamilyError::Invalid("family name is required".into()));
        }

        let family = Family {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        store.insert_family(&family).await?;
        store.set_user_family(user.id, family.id).await?;
        tracing::info!(family_id = %family.id, user_id = %user.id, "family created");
        Ok(family)
    }

    pub async fn get<S>(store: &S, family_id: Uuid) -> Result<FamilyResponse, FamilyError>
    where
        S: FamilyStore + ?Sized,
    {
        let family = store.get_family(family_id).await?;
        let members = store
            .list_members(family_id)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();
        Ok(FamilyResponse { family, members })
    }

    pub async fn invite<S>(
        store: &S,
        family_id: Uuid,
        invited_by: Uuid,
        email: &str,
        ttl: Duration,
    ) -> Result<Invitation, FamilyError>
    where
        S: FamilyStore + ?Sized,
    {
        let email = email.trim().to_lowercase();
        if !email.contains('@') {
            return Err(FamilyError::Invalid("invalid email address".into()));
        }

        let now = Utc::now();
        let invitation = Invitation {
            id: Uuid::new_v4(),
            family_id,
            email,
            code: invitation_code(),
            invited_by,
            created_at: now,
            expires_at: now + ttl,
        };
        store.insert_invitation(&invitation).await?;
        INVITATIONS_COUNTER.with_label_values(&["created"]).inc();
        Ok(invitation)
    }

    pub async fn list_for_family<S>(store: &S, family_id: Uuid) -> Result<Vec<Invitation>, FamilyError>
    where
        S: FamilyStore + ?Sized,
    {
        Ok(store.list_family_invitations(family_id).await?)
    }

    /// Non-expired invitations addressed to `email`.
    pub async fn list_for_email<S>(
        store: &S,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<Invitation>, FamilyError>
    where
        S: FamilyStore + ?Sized,
    {
        Ok(store
            .list_invitations_for_email(email)
            .await?
            .into_iter()
            .filter(|i| !i.is_expired(now))
            .collect())
    }

    /// Withdraw an invitation sent by `family_id`.
    pub async fn revoke<S>(store: &S, family_id: Uuid, invitation_id: Uuid) -> Result<(), FamilyError>
    where
        S: FamilyStore + ?Sized,
    {
        let invitation = Self::find(store, invitation_id).await?;
        if invitation.family_id != family_id {
            return Err(FamilyError::InvitationNotFound);
        }
        store.delete_invitation(invitation_id).await?;
        INVITATIONS_COUNTER.with_label_values(&["revoked"]).inc();
        Ok(())
    }

    /// Join the family whose invitation carries `code`. The invitation is
    /// consumed.
    pub async fn accept<S>(
        store: &S,
        user: &User,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Family, FamilyError>
    where
        S: UserStore + FamilyStore + ?Sized,
    {
        let invitation = match store.get_invitation_by_code(code.trim()).await {
            Ok(i) => i,
            Err(StoreError::NotFound) => return Err(FamilyError::InvitationNotFound),
            Err(e) => return Err(e.into()),
        };
        if !invitation.email.eq_ignore_ascii_case(&user.email) {
            return Err(FamilyError::NotInvitee);
        }
        if invitation.is_expired(now) {
            return Err(FamilyError::Expired);
        }
        if user.family_id.is_some() {
            return Err(FamilyError::AlreadyInFamily);
        }

        let family = store.get_family(invitation.family_id).await?;
        store.set_user_family(user.id, family.id).await?;
        store.delete_invitation(invitation.id).await?;
        INVITATIONS_COUNTER.with_label_values(&["accepted"]).inc();
        tracing::info!(family_id = %family.id, user_id = %user.id, "invitation accepted");
        Ok(family)
    }

    async fn find<S>(store: &S, invitation_id: Uuid) -> Result<Invitation, FamilyError>
    where
        S: FamilyStore + ?Sized,
    {
        match store.get_invitation(invitation_id).await {
            Ok(i) => Ok(i),
            Err(StoreError::NotFound) => Err(FamilyError::InvitationNotFound),
            Err(e) => Err(e.into()),
        }
    }
}
