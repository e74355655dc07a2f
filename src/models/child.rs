use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Child {
    pub id: Uuid,
    pub family_id: Uuid,
    pub name: String,
    pub birth_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateChildRequest {
    pub name: String,
    pub birth_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateChildRequest {
    pub name: Option<String>,
    pub birth_date: Option<NaiveDate>,
}
