//! Database models for password reset tokens.

use crate::types::UserId;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Request to create a password reset token. The raw token is hashed by the
/// repository before it is stored.
#[derive(Debug, Clone)]
pub struct PasswordResetTokenCreateRequest {
    pub user_id: UserId,
    pub raw_token: String,
    pub expires_at: DateTime<Utc>,
}

/// A stored password reset token (hash only)
#[derive(Debug, Clone, FromRow)]
pub struct PasswordResetToken {
    pub id: Uuid,
    pub user_id: UserId,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
