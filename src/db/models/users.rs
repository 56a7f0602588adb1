//! Database models for users.

use crate::api::models::users::{Role, UserUpdate};
use crate::types::UserId;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database request for creating a new user
#[derive(Debug, Clone)]
pub struct UserCreateDBRequest {
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub password_hash: Option<String>,
}

/// Database request for updating a user
#[derive(Debug, Clone, Default)]
pub struct UserUpdateDBRequest {
    /// Outer None leaves the name untouched, Some(None) clears it
    pub name: Option<Option<String>>,
    pub role: Option<Role>,
    pub password_hash: Option<String>,
}

impl From<UserUpdate> for UserUpdateDBRequest {
    fn from(api: UserUpdate) -> Self {
        Self {
            name: api.name,
            role: api.role,
            password_hash: None, // Regular updates don't include password changes
        }
    }
}

/// Database response for a user
#[derive(Debug, Clone, FromRow)]
pub struct UserDBResponse {
    pub id: UserId,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub password_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
