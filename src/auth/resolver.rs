//! Session-role resolution.
//!
//! Produces the effective role for the current principal. Consulted in
//! priority order: the claim already cached on the session, then a point
//! lookup of the user's role by id, then by email. Anything unresolved
//! defaults to `builder`, which can only move obstacle status; structural
//! mutations always require a positively-resolved admin.

use sqlx::PgConnection;
use tracing::{debug, instrument};

use crate::{api::models::users::Role, db::handlers::repository::Repository, db::handlers::Users, types::UserId};

/// Resolve the effective role for a principal.
///
/// Lookup failures are swallowed and treated as "role not found" so a
/// degraded identity store does not block read-only use; the chain just
/// continues to the next source.
#[instrument(skip(conn))]
pub async fn resolve_role(claim: Option<Role>, user_id: Option<UserId>, email: Option<&str>, conn: &mut PgConnection) -> Role {
    // A populated claim short-circuits without touching the store
    if let Some(role) = claim {
        return role;
    }

    if let Some(id) = user_id {
        match Users::new(conn).get_by_id(id).await {
            Ok(Some(user)) => return user.role,
            Ok(None) => {}
            Err(e) => {
                debug!("Role lookup by id failed, continuing fallback: {e}");
            }
        }
    }

    if let Some(email) = email {
        match Users::new(conn).get_user_by_email(email).await {
            Ok(Some(user)) => return user.role,
            Ok(None) => {}
            Err(e) => {
                debug!("Role lookup by email failed, continuing fallback: {e}");
            }
        }
    }

    Role::Builder
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::Repository;
    use crate::db::models::users::UserCreateDBRequest;
    use sqlx::PgPool;
    use uuid::Uuid;

    async fn seed_user(pool: &PgPool, email: &str, role: Role) -> UserId {
        let mut conn = pool.acquire().await.unwrap();
        Users::new(&mut conn)
            .create(&UserCreateDBRequest {
                email: email.to_string(),
                name: None,
                role,
                password_hash: None,
            })
            .await
            .unwrap()
            .id
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_claim_takes_priority_over_store(pool: PgPool) {
        // The stored role differs from the claim; the claim must win
        let user_id = seed_user(&pool, "claim-wins@example.com", Role::Builder).await;
        let mut conn = pool.acquire().await.unwrap();

        let role = resolve_role(Some(Role::Admin), Some(user_id), None, &mut conn).await;
        assert_eq!(role, Role::Admin);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_fallback_to_lookup_by_id(pool: PgPool) {
        let user_id = seed_user(&pool, "by-id@example.com", Role::Admin).await;
        let mut conn = pool.acquire().await.unwrap();

        let role = resolve_role(None, Some(user_id), None, &mut conn).await;
        assert_eq!(role, Role::Admin);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_fallback_to_lookup_by_email(pool: PgPool) {
        seed_user(&pool, "by-email@example.com", Role::Admin).await;
        let mut conn = pool.acquire().await.unwrap();

        // Unknown id falls through to the email path
        let role = resolve_role(None, Some(Uuid::new_v4()), Some("by-email@example.com"), &mut conn).await;
        assert_eq!(role, Role::Admin);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_unresolvable_defaults_to_builder(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();

        let role = resolve_role(None, Some(Uuid::new_v4()), Some("ghost@example.com"), &mut conn).await;
        assert_eq!(role, Role::Builder);

        let role = resolve_role(None, None, None, &mut conn).await;
        assert_eq!(role, Role::Builder);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_store_failure_swallowed(pool: PgPool) {
        let user_id = seed_user(&pool, "degraded@example.com", Role::Admin).await;
        let mut conn = pool.acquire().await.unwrap();

        // Break the users table so every lookup errors; resolution must
        // fall through to the default instead of failing the request
        sqlx::query("ALTER TABLE users RENAME TO users_gone")
            .execute(&mut *conn)
            .await
            .unwrap();

        let role = resolve_role(None, Some(user_id), Some("degraded@example.com"), &mut conn).await;
        assert_eq!(role, Role::Builder);
    }
}
