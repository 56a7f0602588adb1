//! Database models for sessions.

use crate::api::models::users::Role;
use crate::types::UserId;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database request for creating a session at sign-in
#[derive(Debug, Clone)]
pub struct SessionCreateDBRequest {
    pub token: String,
    pub user_id: UserId,
    /// The role claim, populated at sign-in from the user record
    pub role: Option<Role>,
    pub expires: DateTime<Utc>,
}

/// Database response for a session row
#[derive(Debug, Clone, FromRow)]
pub struct SessionDBResponse {
    pub token: String,
    pub user_id: UserId,
    /// The cached role claim; None until resolved and written back
    pub role: Option<Role>,
    pub expires: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
