use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::user::UserProfile;

/// The sharing boundary: every child and record belongs to exactly one family.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Family {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A pending invitation for `email` to join `family_id`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Invitation {
    pub id: Uuid,
    pub family_id: Uuid,
    pub email: String,
    pub code: String,
    pub invited_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Invitation {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateFamilyRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct InviteRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct AcceptInvitationRequest {
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct FamilyResponse {
    #[serde(flatten)]
    pub family: Family,
    pub members: Vec<UserProfile>,
}
