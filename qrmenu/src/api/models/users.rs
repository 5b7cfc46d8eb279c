//! API request/response models for users.

use crate::db::models::users::{UserDBResponse, UserSummaryDBResponse};
use crate::types::{Role, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The authenticated caller, as carried in access token claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CurrentUser {
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
    pub email: String,
    pub role: Role,
}

impl From<&UserDBResponse> for CurrentUser {
    fn from(db: &UserDBResponse) -> Self {
        Self {
            id: db.id,
            email: db.email.clone(),
            role: db.role,
        }
    }
}

/// A user as returned by the API. Never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserDBResponse> for UserResponse {
    fn from(db: UserDBResponse) -> Self {
        Self {
            id: db.id,
            email: db.email,
            role: db.role,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

/// A user on the admin listing, with the number of restaurants they own
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserSummaryResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub restaurant_count: i64,
}

impl From<UserSummaryDBResponse> for UserSummaryResponse {
    fn from(db: UserSummaryDBResponse) -> Self {
        Self {
            id: db.id,
            email: db.email,
            role: db.role,
            created_at: db.created_at,
            updated_at: db.updated_at,
            restaurant_count: db.restaurant_count,
        }
    }
}

/// Request body for changing a user's role
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoleUpdate {
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserBody {
    pub user: UserResponse,
}
