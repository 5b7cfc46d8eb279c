//! Database models for users.

use crate::types::{Role, UserId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database request for creating a new user
#[derive(Debug, Clone)]
pub struct UserCreateDBRequest {
    /// Already normalized (trimmed, lowercased)
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// Database response for a user
#[derive(Debug, Clone, FromRow)]
pub struct UserDBResponse {
    pub id: UserId,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user as listed on the admin surface, with the number of restaurants they own
#[derive(Debug, Clone, FromRow)]
pub struct UserSummaryDBResponse {
    pub id: UserId,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub restaurant_count: i64,
}
