//! Database repository for password reset tokens.

use chrono::Utc;
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::password,
    config::Config,
    db::{
        errors::{DbError, Result},
        models::password_reset_tokens::{PasswordResetToken, PasswordResetTokenCreateRequest},
    },
    types::{UserId, abbrev_uuid},
};

pub struct PasswordResetTokens<'c> {
    db: &'c mut PgConnection,
}

impl<'c> PasswordResetTokens<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), err)]
    pub async fn create(&mut self, request: &PasswordResetTokenCreateRequest) -> Result<PasswordResetToken> {
        let token_hash = password::hash_string(&request.raw_token).map_err(|e| DbError::Other(anyhow::anyhow!(e)))?;

        let token = sqlx::query_as::<_, PasswordResetToken>(
            r#"
            INSERT INTO password_reset_tokens (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(request.user_id)
        .bind(token_hash)
        .bind(request.expires_at)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(token)
    }

    /// Create a password reset token for a user, returning the raw token for
    /// the email alongside the stored record.
    #[instrument(skip(self, config), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn create_for_user(&mut self, user_id: UserId, config: &Config) -> Result<(String, PasswordResetToken)> {
        let raw_token = password::generate_token();
        let expires_at = Utc::now()
            + chrono::Duration::from_std(config.auth.native.password_reset_token_duration)
                .unwrap_or(chrono::Duration::minutes(30));

        let token = self
            .create(&PasswordResetTokenCreateRequest {
                user_id,
                raw_token: raw_token.clone(),
                expires_at,
            })
            .await?;

        Ok((raw_token, token))
    }

    /// Find a valid token by ID and verify the raw token
    #[instrument(skip(self, raw_token), err)]
    pub async fn find_valid_token_by_id(&mut self, token_id: Uuid, raw_token: &str) -> Result<Option<PasswordResetToken>> {
        let token = sqlx::query_as::<_, PasswordResetToken>("SELECT * FROM password_reset_tokens WHERE id = $1")
            .bind(token_id)
            .fetch_optional(&mut *self.db)
            .await?;

        if let Some(token) = token {
            // Check if token is still valid (not expired and not used)
            if token.used_at.is_some() {
                return Ok(None);
            }
            if Utc::now() > token.expires_at {
                return Ok(None);
            }

            // Verify the raw token matches the hash
            match password::verify_string(raw_token, &token.token_hash) {
                Ok(true) => Ok(Some(token)),
                Ok(false) => Ok(None),
                Err(e) => {
                    tracing::error!("Token verification error for token {}: {:?}", token_id, e);
                    Ok(None)
                }
            }
        } else {
            Ok(None)
        }
    }

    /// Invalidate all tokens for a user
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn invalidate_for_user(&mut self, user_id: UserId) -> Result<u64> {
        let result = sqlx::query("UPDATE password_reset_tokens SET used_at = NOW() WHERE user_id = $1 AND used_at IS NULL")
            .bind(user_id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected())
    }
}
