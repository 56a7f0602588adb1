use crate::api::models::obstacles::{ObstacleCreate, ObstacleResponse, ObstacleUpdate};
use crate::api::models::images::OkResponse;
use crate::api::models::users::CurrentUser;
use crate::auth::guard;
use crate::db::errors::DbError;
use crate::db::handlers::{ObstacleImages, Obstacles, Repository, obstacles::ObstacleFilter};
use crate::db::models::obstacles::{ObstacleCreateDBRequest, ObstacleUpdateDBRequest};
use crate::errors::{Error, Result};
use crate::types::{Action, ObstacleId};
use crate::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

fn parse_obstacle_id(raw: &str) -> Result<ObstacleId> {
    raw.parse::<ObstacleId>().map_err(|_| Error::BadRequest {
        message: "Invalid id".to_string(),
    })
}

/// Strip the public uploads prefix off a stored URL, yielding the storage key
pub(crate) fn storage_key_for_url<'a>(url: &'a str, public_path: &str) -> Option<&'a str> {
    url.strip_prefix(&format!("{public_path}/"))
}

#[utoipa::path(
    get,
    path = "/obstacles",
    tag = "obstacles",
    summary = "List obstacles",
    description = "List all obstacles in display order",
    responses(
        (status = 200, description = "List of obstacles", body = [ObstacleResponse]),
        (status = 500, description = "Internal server error"),
    )
)]
pub async fn list_obstacles(State(state): State<AppState>) -> Result<Json<Vec<ObstacleResponse>>> {
    guard::authorize(None, Action::ListObstacles, &[])?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let obstacles = Obstacles::new(&mut conn).list(&ObstacleFilter).await?;

    Ok(Json(obstacles.into_iter().map(ObstacleResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/obstacles",
    tag = "obstacles",
    summary = "Create obstacle",
    description = "Create a new obstacle (admin only)",
    request_body = ObstacleCreate,
    responses(
        (status = 201, description = "Obstacle created", body = ObstacleResponse),
        (status = 400, description = "Missing name"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin access required"),
        (status = 500, description = "Internal server error"),
    )
)]
pub async fn create_obstacle(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<ObstacleCreate>,
) -> Result<(StatusCode, Json<ObstacleResponse>)> {
    guard::authorize(Some(user.role), Action::CreateObstacle, &[])?;

    let name = request.name.trim().to_string();
    if name.is_empty() {
        return Err(Error::BadRequest {
            message: "Name is required".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let obstacle = Obstacles::new(&mut conn)
        .create(&ObstacleCreateDBRequest {
            name,
            ..ObstacleCreateDBRequest::from(request)
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ObstacleResponse::from(obstacle))))
}

#[utoipa::path(
    get,
    path = "/obstacles/{id}",
    tag = "obstacles",
    summary = "Get obstacle",
    params(("id" = i64, Path, description = "Obstacle ID")),
    responses(
        (status = 200, description = "Obstacle", body = ObstacleResponse),
        (status = 400, description = "Invalid id"),
        (status = 404, description = "Obstacle not found"),
        (status = 500, description = "Internal server error"),
    )
)]
pub async fn get_obstacle(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<ObstacleResponse>> {
    let id = parse_obstacle_id(&id)?;
    guard::authorize(None, Action::GetObstacle, &[])?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let obstacle = Obstacles::new(&mut conn)
        .get_by_id(id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "Obstacle".to_string(),
            id: id.to_string(),
        })?;

    Ok(Json(ObstacleResponse::from(obstacle)))
}

#[utoipa::path(
    put,
    path = "/obstacles/{id}",
    tag = "obstacles",
    summary = "Update obstacle",
    description = "Partially update an obstacle. Builders may only change status; \
                   a non-admin patch naming any other field is rejected in its entirety.",
    params(("id" = i64, Path, description = "Obstacle ID")),
    request_body = ObstacleUpdate,
    responses(
        (status = 200, description = "Updated obstacle", body = ObstacleResponse),
        (status = 400, description = "Invalid id"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - field not allowed for role"),
        (status = 404, description = "Obstacle not found"),
        (status = 500, description = "Internal server error"),
    )
)]
pub async fn update_obstacle(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: CurrentUser,
    Json(request): Json<ObstacleUpdate>,
) -> Result<Json<ObstacleResponse>> {
    let id = parse_obstacle_id(&id)?;

    // The whole patch is rejected if any field is off-limits for the role
    guard::authorize(Some(user.role), Action::UpdateObstacle, &request.requested_fields())?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let obstacle = Obstacles::new(&mut conn)
        .update(id, &ObstacleUpdateDBRequest::from(request))
        .await
        .map_err(|e| match e {
            DbError::NotFound => Error::NotFound {
                resource: "Obstacle".to_string(),
                id: id.to_string(),
            },
            e => Error::Database(e),
        })?;

    Ok(Json(ObstacleResponse::from(obstacle)))
}

#[utoipa::path(
    delete,
    path = "/obstacles/{id}",
    tag = "obstacles",
    summary = "Delete obstacle",
    description = "Delete an obstacle and its images (admin only). Backing image \
                   files are removed best-effort after the rows.",
    params(("id" = i64, Path, description = "Obstacle ID")),
    responses(
        (status = 200, description = "Obstacle deleted", body = OkResponse),
        (status = 400, description = "Invalid id"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin access required"),
        (status = 404, description = "Obstacle not found"),
        (status = 500, description = "Internal server error"),
    )
)]
pub async fn delete_obstacle(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: CurrentUser,
) -> Result<Json<OkResponse>> {
    let id = parse_obstacle_id(&id)?;
    guard::authorize(Some(user.role), Action::DeleteObstacle, &[])?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    // Grab the image URLs before the rows cascade away with the obstacle
    let images = ObstacleImages::new(&mut conn).list_for_obstacle(id).await?;

    let deleted = Obstacles::new(&mut conn).delete(id).await?;
    if !deleted {
        return Err(Error::NotFound {
            resource: "Obstacle".to_string(),
            id: id.to_string(),
        });
    }

    // The row delete is authoritative; file removal failures are logged and
    // swallowed
    for image in images {
        if let Some(key) = storage_key_for_url(&image.url, &state.config.uploads.public_path)
            && let Err(e) = state.storage.delete(key).await
        {
            tracing::warn!("Failed to remove backing file for image {}: {e}", image.id);
        }
    }

    Ok(Json(OkResponse::ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::obstacles::ObstacleStatus;
    use crate::api::models::users::Role;
    use crate::test_utils::{create_test_app, create_test_user, login_cookie};
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_round_trip_create_then_get(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_user(&pool, Role::Admin).await;
        let cookie = login_cookie(&pool, &admin).await;

        let created = server
            .post("/obstacles")
            .add_header("cookie", &cookie)
            .json(&serde_json::json!({"name": "Monkey Bars", "status": "planned", "order": 1}))
            .await;
        created.assert_status(axum::http::StatusCode::CREATED);
        let created: ObstacleResponse = created.json();

        let fetched = server.get(&format!("/obstacles/{}", created.id)).await;
        fetched.assert_status_ok();
        let fetched: ObstacleResponse = fetched.json();

        assert_eq!(fetched.name, "Monkey Bars");
        assert_eq!(fetched.status, ObstacleStatus::Planned);
        assert_eq!(fetched.order, Some(1));
        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.created_at, created.created_at);
        assert_eq!(fetched.updated_at, created.updated_at);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_requires_admin_and_name(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let builder = create_test_user(&pool, Role::Builder).await;
        let builder_cookie = login_cookie(&pool, &builder).await;

        // No session at all
        let response = server.post("/obstacles").json(&serde_json::json!({"name": "Wall"})).await;
        response.assert_status(axum::http::StatusCode::UNAUTHORIZED);

        // Builder session
        let response = server
            .post("/obstacles")
            .add_header("cookie", &builder_cookie)
            .json(&serde_json::json!({"name": "Wall"}))
            .await;
        response.assert_status(axum::http::StatusCode::FORBIDDEN);

        // Admin with a blank name
        let admin = create_test_user(&pool, Role::Admin).await;
        let admin_cookie = login_cookie(&pool, &admin).await;
        let response = server
            .post("/obstacles")
            .add_header("cookie", &admin_cookie)
            .json(&serde_json::json!({"name": "   "}))
            .await;
        response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_is_public_and_display_ordered(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_user(&pool, Role::Admin).await;
        let cookie = login_cookie(&pool, &admin).await;

        for body in [
            serde_json::json!({"name": "first", "order": 5}),
            serde_json::json!({"name": "second"}),
            serde_json::json!({"name": "third", "order": 1}),
        ] {
            server.post("/obstacles").add_header("cookie", &cookie).json(&body).await.assert_status(axum::http::StatusCode::CREATED);
        }

        // No session needed for reads
        let response = server.get("/obstacles").await;
        response.assert_status_ok();
        let listed: Vec<ObstacleResponse> = response.json();
        let names: Vec<&str> = listed.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["third", "first", "second"]);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_builder_status_only_patch(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_user(&pool, Role::Admin).await;
        let admin_cookie = login_cookie(&pool, &admin).await;
        let builder = create_test_user(&pool, Role::Builder).await;
        let builder_cookie = login_cookie(&pool, &builder).await;

        let created: ObstacleResponse = server
            .post("/obstacles")
            .add_header("cookie", &admin_cookie)
            .json(&serde_json::json!({"name": "Rings"}))
            .await
            .json();

        // Status-only patch is allowed for builders
        let response = server
            .put(&format!("/obstacles/{}", created.id))
            .add_header("cookie", &builder_cookie)
            .json(&serde_json::json!({"status": "in_progress"}))
            .await;
        response.assert_status_ok();
        let updated: ObstacleResponse = response.json();
        assert_eq!(updated.status, ObstacleStatus::InProgress);

        // Any other field in the patch rejects it entirely (no partial apply)
        let response = server
            .put(&format!("/obstacles/{}", created.id))
            .add_header("cookie", &builder_cookie)
            .json(&serde_json::json!({"status": "done", "name": "Renamed"}))
            .await;
        response.assert_status(axum::http::StatusCode::FORBIDDEN);

        let after: ObstacleResponse = server.get(&format!("/obstacles/{}", created.id)).await.json();
        assert_eq!(after.name, "Rings");
        assert_eq!(after.status, ObstacleStatus::InProgress);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_requires_session(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;

        let response = server
            .put("/obstacles/1")
            .json(&serde_json::json!({"status": "done"}))
            .await;
        response.assert_status(axum::http::StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_bad_and_missing_ids(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_user(&pool, Role::Admin).await;
        let cookie = login_cookie(&pool, &admin).await;

        let response = server.get("/obstacles/not-a-number").await;
        response.assert_status(axum::http::StatusCode::BAD_REQUEST);

        let response = server.get("/obstacles/999999").await;
        response.assert_status(axum::http::StatusCode::NOT_FOUND);
        let body: serde_json::Value = response.json();
        assert!(body.get("error").is_some());

        let response = server
            .put("/obstacles/999999")
            .add_header("cookie", &cookie)
            .json(&serde_json::json!({"status": "done"}))
            .await;
        response.assert_status(axum::http::StatusCode::NOT_FOUND);

        let response = server.delete("/obstacles/999999").add_header("cookie", &cookie).await;
        response.assert_status(axum::http::StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_storage_key_for_url() {
        assert_eq!(storage_key_for_url("/uploads/obst_1_x.png", "/uploads"), Some("obst_1_x.png"));
        assert_eq!(storage_key_for_url("https://cdn.example.com/x.png", "/uploads"), None);
    }
}
