use crate::AppState;
use crate::api::models::users::{CurrentUser, UserResponse, UserUpdate};
use crate::auth::guard;
use crate::db::errors::DbError;
use crate::db::handlers::{Repository, Users, users::UserFilter};
use crate::db::models::users::UserUpdateDBRequest;
use crate::errors::{Error, Result};
use crate::types::{Action, UserId};
use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use utoipa::IntoParams;

/// Query parameters for listing users
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListUsersQuery {
    /// Number of users to skip
    pub skip: Option<i64>,
    /// Maximum number of users to return
    pub limit: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    summary = "List users",
    description = "List all users (admin only)",
    params(ListUsersQuery),
    responses(
        (status = 200, description = "List of users", body = [UserResponse]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin access required"),
        (status = 500, description = "Internal server error"),
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
    user: CurrentUser,
) -> Result<Json<Vec<UserResponse>>> {
    guard::authorize(Some(user.role), Action::ListUsers, &[])?;

    let skip = query.skip.unwrap_or(0).max(0);
    let limit = query.limit.unwrap_or(100).clamp(1, 1000);

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let users = Users::new(&mut conn).list(&UserFilter::new(skip, limit)).await?;

    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

#[utoipa::path(
    put,
    path = "/users/{id}",
    tag = "users",
    summary = "Update user",
    description = "Update a user's name or role (admin only)",
    params(("id" = String, Path, description = "User ID (UUID)")),
    request_body = UserUpdate,
    responses(
        (status = 200, description = "Updated user", body = UserResponse),
        (status = 400, description = "Invalid id"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin access required"),
        (status = 404, description = "User not found"),
        (status = 500, description = "Internal server error"),
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: CurrentUser,
    Json(request): Json<UserUpdate>,
) -> Result<Json<UserResponse>> {
    let target_id = id.parse::<UserId>().map_err(|_| Error::BadRequest {
        message: "Invalid user ID format".to_string(),
    })?;
    guard::authorize(Some(user.role), Action::UpdateUser, &[])?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let updated = Users::new(&mut conn)
        .update(target_id, &UserUpdateDBRequest::from(request))
        .await
        .map_err(|e| match e {
            DbError::NotFound => Error::NotFound {
                resource: "User".to_string(),
                id: target_id.to_string(),
            },
            e => Error::Database(e),
        })?;

    Ok(Json(UserResponse::from(updated)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::users::Role;
    use crate::test_utils::{create_test_app, create_test_user, login_cookie};
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_users_is_admin_only(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_user(&pool, Role::Admin).await;
        let builder = create_test_user(&pool, Role::Builder).await;

        let response = server.get("/users").await;
        response.assert_status(axum::http::StatusCode::UNAUTHORIZED);

        let builder_cookie = login_cookie(&pool, &builder).await;
        let response = server.get("/users").add_header("cookie", &builder_cookie).await;
        response.assert_status(axum::http::StatusCode::FORBIDDEN);

        let admin_cookie = login_cookie(&pool, &admin).await;
        let response = server.get("/users").add_header("cookie", &admin_cookie).await;
        response.assert_status_ok();
        let users: Vec<UserResponse> = response.json();
        assert!(users.len() >= 2);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_admin_promotes_builder(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_user(&pool, Role::Admin).await;
        let builder = create_test_user(&pool, Role::Builder).await;
        let cookie = login_cookie(&pool, &admin).await;

        let response = server
            .put(&format!("/users/{}", builder.id))
            .add_header("cookie", &cookie)
            .json(&serde_json::json!({"role": "admin", "name": "Promoted"}))
            .await;
        response.assert_status_ok();
        let updated: UserResponse = response.json();
        assert_eq!(updated.role, Role::Admin);
        assert_eq!(updated.name, Some("Promoted".to_string()));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_builder_cannot_touch_users(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let builder = create_test_user(&pool, Role::Builder).await;
        let cookie = login_cookie(&pool, &builder).await;

        // Not even their own record
        let response = server
            .put(&format!("/users/{}", builder.id))
            .add_header("cookie", &cookie)
            .json(&serde_json::json!({"role": "admin"}))
            .await;
        response.assert_status(axum::http::StatusCode::FORBIDDEN);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_unknown_or_malformed_user(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_user(&pool, Role::Admin).await;
        let cookie = login_cookie(&pool, &admin).await;

        let response = server
            .put("/users/not-a-uuid")
            .add_header("cookie", &cookie)
            .json(&serde_json::json!({"role": "admin"}))
            .await;
        response.assert_status(axum::http::StatusCode::BAD_REQUEST);

        let response = server
            .put(&format!("/users/{}", uuid::Uuid::new_v4()))
            .add_header("cookie", &cookie)
            .json(&serde_json::json!({"role": "admin"}))
            .await;
        response.assert_status(axum::http::StatusCode::NOT_FOUND);
    }
}
