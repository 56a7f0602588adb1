//! Database repository for sessions.
//!
//! Sessions are keyed by their opaque token rather than a surrogate ID, so
//! this repository exposes token-based point operations instead of the
//! generic [`Repository`](super::repository::Repository) trait.

use crate::api::models::users::Role;
use crate::db::{
    errors::Result,
    models::sessions::{SessionCreateDBRequest, SessionDBResponse},
};
use crate::types::{UserId, abbrev_uuid};
use sqlx::PgConnection;
use tracing::instrument;

pub struct Sessions<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Sessions<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&request.user_id)), err)]
    pub async fn create(&mut self, request: &SessionCreateDBRequest) -> Result<SessionDBResponse> {
        let session = sqlx::query_as::<_, SessionDBResponse>(
            r#"
            INSERT INTO sessions (token, user_id, role, expires)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&request.token)
        .bind(request.user_id)
        .bind(request.role)
        .bind(request.expires)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(session)
    }

    /// Fetch an unexpired session by its token. Expired rows are treated as
    /// absent; they are swept by [`delete_expired`](Self::delete_expired).
    #[instrument(skip_all, err)]
    pub async fn get_active(&mut self, token: &str) -> Result<Option<SessionDBResponse>> {
        let session = sqlx::query_as::<_, SessionDBResponse>("SELECT * FROM sessions WHERE token = $1 AND expires > NOW()")
            .bind(token)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(session)
    }

    /// Write the resolved role claim back onto the session so subsequent
    /// requests skip the users lookup.
    #[instrument(skip(self, token), err)]
    pub async fn set_role(&mut self, token: &str, role: Role) -> Result<bool> {
        let result = sqlx::query("UPDATE sessions SET role = $2 WHERE token = $1")
            .bind(token)
            .bind(role)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip_all, err)]
    pub async fn delete(&mut self, token: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove every session belonging to a user (e.g. after a password reset).
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn delete_for_user(&mut self, user_id: UserId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected())
    }

    /// Sweep expired sessions.
    #[instrument(skip(self), err)]
    pub async fn delete_expired(&mut self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires <= NOW()")
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected())
    }
}
