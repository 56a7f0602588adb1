use crate::AppState;
use crate::api::handlers::obstacles::storage_key_for_url;
use crate::api::models::images::{ObstacleImageResponse, OkResponse};
use crate::api::models::users::CurrentUser;
use crate::auth::guard;
use crate::db::handlers::ObstacleImages;
use crate::db::models::obstacle_images::ObstacleImageCreateDBRequest;
use crate::errors::{Error, Result};
use crate::types::{Action, ObstacleId, ObstacleImageId};
use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
};
use chrono::Utc;
use rand::{Rng, rng};

fn parse_id<T: std::str::FromStr>(raw: &str) -> Result<T> {
    raw.parse::<T>().map_err(|_| Error::BadRequest {
        message: "Invalid id".to_string(),
    })
}

/// Storage key for an uploaded image: obstacle id + timestamp + random
/// suffix + the client extension truncated to a bounded length, so
/// concurrent uploads for the same obstacle never collide.
fn image_storage_key(obstacle_id: ObstacleId, original_filename: &str) -> String {
    let ext = std::path::Path::new(original_filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_else(|| ".bin".to_string());
    let safe_ext: String = ext.chars().take(10).collect();

    let suffix: String = rng()
        .sample_iter(rand::distr::Alphanumeric)
        .take(10)
        .map(|c| (c as char).to_ascii_lowercase())
        .collect();

    format!("obst_{}_{}_{}{}", obstacle_id, Utc::now().timestamp_millis(), suffix, safe_ext)
}

#[utoipa::path(
    get,
    path = "/obstacles/{id}/images",
    tag = "images",
    summary = "List images",
    description = "List images attached to an obstacle",
    params(("id" = i64, Path, description = "Obstacle ID")),
    responses(
        (status = 200, description = "List of images", body = [ObstacleImageResponse]),
        (status = 400, description = "Invalid id"),
        (status = 500, description = "Internal server error"),
    )
)]
pub async fn list_images(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Vec<ObstacleImageResponse>>> {
    let obstacle_id: ObstacleId = parse_id(&id)?;
    guard::authorize(None, Action::ListImages, &[])?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let images = ObstacleImages::new(&mut conn).list_for_obstacle(obstacle_id).await?;

    Ok(Json(images.into_iter().map(ObstacleImageResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/obstacles/{id}/images",
    tag = "images",
    summary = "Upload images",
    description = "Upload one or more image files for an obstacle (admin only). \
                   Multipart entries under the 'image' field whose media type is \
                   not image/* are skipped; the rest of the batch still inserts.",
    request_body(content_type = "multipart/form-data", description = "Image files under the 'image' field, optional shared 'label'"),
    params(("id" = i64, Path, description = "Obstacle ID")),
    responses(
        (status = 201, description = "Inserted image records", body = [ObstacleImageResponse]),
        (status = 400, description = "Invalid id or no files provided"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin access required"),
        (status = 500, description = "Internal server error"),
    )
)]
pub async fn upload_images(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: CurrentUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Vec<ObstacleImageResponse>>)> {
    let obstacle_id: ObstacleId = parse_id(&id)?;
    guard::authorize(Some(user.role), Action::UploadImages, &[])?;

    // Collect entries first: the shared label field may arrive after the
    // files in the multipart stream
    let mut uploads: Vec<(String, Vec<u8>)> = Vec::new();
    let mut provided = 0usize;
    let mut label: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| Error::BadRequest {
        message: format!("Failed to parse multipart data: {e}"),
    })? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "image" => {
                provided += 1;

                // Best-effort batch: silently skip entries that don't
                // declare an image media type
                let content_type = field.content_type().unwrap_or("").to_string();
                if !content_type.starts_with("image/") {
                    tracing::debug!("Skipping non-image upload entry with media type '{content_type}'");
                    continue;
                }

                let filename = field.file_name().unwrap_or("").to_string();
                let bytes = field.bytes().await.map_err(|e| Error::BadRequest {
                    message: format!("Failed to read file data: {e}"),
                })?;

                uploads.push((filename, bytes.to_vec()));
            }
            "label" => {
                label = Some(field.text().await.map_err(|e| Error::BadRequest {
                    message: format!("Failed to read label: {e}"),
                })?);
            }
            _ => {
                // Ignore unknown fields (forward compatibility)
            }
        }
    }

    if provided == 0 {
        return Err(Error::BadRequest {
            message: "No files provided (field 'image')".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut inserted = Vec::with_capacity(uploads.len());

    for (filename, bytes) in uploads {
        let key = image_storage_key(obstacle_id, &filename);
        state.storage.store(&key, &bytes).await.map_err(Error::Database)?;

        let image = ObstacleImages::new(&mut conn)
            .create(&ObstacleImageCreateDBRequest {
                obstacle_id,
                url: format!("{}/{}", state.config.uploads.public_path, key),
                label: label.clone(),
            })
            .await?;

        inserted.push(ObstacleImageResponse::from(image));
    }

    Ok((StatusCode::CREATED, Json(inserted)))
}

#[utoipa::path(
    delete,
    path = "/obstacles/{id}/images/{image_id}",
    tag = "images",
    summary = "Delete image",
    description = "Delete an image record and its backing file (admin only). \
                   The record delete is authoritative; file removal is best-effort.",
    params(
        ("id" = i64, Path, description = "Obstacle ID"),
        ("image_id" = i64, Path, description = "Image ID"),
    ),
    responses(
        (status = 200, description = "Image deleted", body = OkResponse),
        (status = 400, description = "Invalid id"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin access required"),
        (status = 404, description = "Image not found"),
        (status = 500, description = "Internal server error"),
    )
)]
pub async fn delete_image(
    State(state): State<AppState>,
    Path((id, image_id)): Path<(String, String)>,
    user: CurrentUser,
) -> Result<Json<OkResponse>> {
    let obstacle_id: ObstacleId = parse_id(&id)?;
    let image_id: ObstacleImageId = parse_id(&image_id)?;
    guard::authorize(Some(user.role), Action::DeleteImage, &[])?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let deleted = ObstacleImages::new(&mut conn)
        .delete_scoped(image_id, obstacle_id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "Image".to_string(),
            id: image_id.to_string(),
        })?;

    // The row delete is authoritative; a failed file removal is logged and
    // swallowed
    if let Some(key) = storage_key_for_url(&deleted.url, &state.config.uploads.public_path)
        && let Err(e) = state.storage.delete(key).await
    {
        tracing::warn!("Failed to remove backing file for image {image_id}: {e}");
    }

    Ok(Json(OkResponse::ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::obstacles::ObstacleResponse;
    use crate::api::models::users::Role;
    use crate::test_utils::{create_test_app, create_test_app_and_state, create_test_user, login_cookie};
    use sqlx::PgPool;

    async fn seed_obstacle(server: &axum_test::TestServer, cookie: &str) -> ObstacleId {
        let created: ObstacleResponse = server
            .post("/obstacles")
            .add_header("cookie", cookie)
            .json(&serde_json::json!({"name": "Cargo Net"}))
            .await
            .json();
        created.id
    }

    fn multipart_with_files(files: &[(&str, &str)], label: Option<&str>) -> axum_test::multipart::MultipartForm {
        let mut form = axum_test::multipart::MultipartForm::new();
        for (name, content_type) in files {
            form = form.add_part(
                "image",
                axum_test::multipart::Part::bytes(b"file-bytes".to_vec())
                    .file_name(*name)
                    .mime_type(*content_type),
            );
        }
        if let Some(label) = label {
            form = form.add_text("label", label);
        }
        form
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_upload_skips_non_image_entries(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_user(&pool, Role::Admin).await;
        let cookie = login_cookie(&pool, &admin).await;
        let obstacle_id = seed_obstacle(&server, &cookie).await;

        // Three entries, one with a non-image media type: exactly two insert
        let response = server
            .post(&format!("/obstacles/{obstacle_id}/images"))
            .add_header("cookie", &cookie)
            .multipart(multipart_with_files(
                &[("a.png", "image/png"), ("notes.txt", "text/plain"), ("b.jpg", "image/jpeg")],
                Some("build day"),
            ))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        let inserted: Vec<ObstacleImageResponse> = response.json();
        assert_eq!(inserted.len(), 2);
        assert!(inserted.iter().all(|i| i.label.as_deref() == Some("build day")));
        assert!(inserted.iter().all(|i| i.url.starts_with("/uploads/obst_")));

        let listed: Vec<ObstacleImageResponse> = server.get(&format!("/obstacles/{obstacle_id}/images")).await.json();
        assert_eq!(listed.len(), 2);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_upload_requires_admin_and_files(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_user(&pool, Role::Admin).await;
        let admin_cookie = login_cookie(&pool, &admin).await;
        let builder = create_test_user(&pool, Role::Builder).await;
        let builder_cookie = login_cookie(&pool, &builder).await;
        let obstacle_id = seed_obstacle(&server, &admin_cookie).await;

        let response = server
            .post(&format!("/obstacles/{obstacle_id}/images"))
            .add_header("cookie", &builder_cookie)
            .multipart(multipart_with_files(&[("a.png", "image/png")], None))
            .await;
        response.assert_status(axum::http::StatusCode::FORBIDDEN);

        // No 'image' entries at all
        let response = server
            .post(&format!("/obstacles/{obstacle_id}/images"))
            .add_header("cookie", &admin_cookie)
            .multipart(axum_test::multipart::MultipartForm::new().add_text("label", "only a label"))
            .await;
        response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_delete_image_removes_backing_file(pool: PgPool) {
        let (server, state) = create_test_app_and_state(pool.clone()).await;
        let admin = create_test_user(&pool, Role::Admin).await;
        let cookie = login_cookie(&pool, &admin).await;
        let obstacle_id = seed_obstacle(&server, &cookie).await;

        let inserted: Vec<ObstacleImageResponse> = server
            .post(&format!("/obstacles/{obstacle_id}/images"))
            .add_header("cookie", &cookie)
            .multipart(multipart_with_files(&[("a.png", "image/png")], None))
            .await
            .json();
        let image = &inserted[0];
        let key = storage_key_for_url(&image.url, "/uploads").unwrap();
        assert!(state.storage.exists(key).await.unwrap());

        let response = server
            .delete(&format!("/obstacles/{obstacle_id}/images/{}", image.id))
            .add_header("cookie", &cookie)
            .await;
        response.assert_status_ok();
        assert!(!state.storage.exists(key).await.unwrap());

        // Gone means gone
        let response = server
            .delete(&format!("/obstacles/{obstacle_id}/images/{}", image.id))
            .add_header("cookie", &cookie)
            .await;
        response.assert_status(axum::http::StatusCode::NOT_FOUND);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_delete_image_survives_missing_file(pool: PgPool) {
        let (server, state) = create_test_app_and_state(pool.clone()).await;
        let admin = create_test_user(&pool, Role::Admin).await;
        let cookie = login_cookie(&pool, &admin).await;
        let obstacle_id = seed_obstacle(&server, &cookie).await;

        let inserted: Vec<ObstacleImageResponse> = server
            .post(&format!("/obstacles/{obstacle_id}/images"))
            .add_header("cookie", &cookie)
            .multipart(multipart_with_files(&[("a.png", "image/png")], None))
            .await
            .json();
        let image = &inserted[0];

        // Remove the file out from under the record; the logical delete must
        // still succeed
        let key = storage_key_for_url(&image.url, "/uploads").unwrap();
        state.storage.delete(key).await.unwrap();

        let response = server
            .delete(&format!("/obstacles/{obstacle_id}/images/{}", image.id))
            .add_header("cookie", &cookie)
            .await;
        response.assert_status_ok();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_delete_obstacle_cleans_up_image_files(pool: PgPool) {
        let (server, state) = create_test_app_and_state(pool.clone()).await;
        let admin = create_test_user(&pool, Role::Admin).await;
        let cookie = login_cookie(&pool, &admin).await;
        let obstacle_id = seed_obstacle(&server, &cookie).await;

        let inserted: Vec<ObstacleImageResponse> = server
            .post(&format!("/obstacles/{obstacle_id}/images"))
            .add_header("cookie", &cookie)
            .multipart(multipart_with_files(&[("a.png", "image/png"), ("b.png", "image/png")], None))
            .await
            .json();
        assert_eq!(inserted.len(), 2);

        let response = server.delete(&format!("/obstacles/{obstacle_id}")).add_header("cookie", &cookie).await;
        response.assert_status_ok();

        for image in &inserted {
            let key = storage_key_for_url(&image.url, "/uploads").unwrap();
            assert!(!state.storage.exists(key).await.unwrap());
        }

        let listed: Vec<ObstacleImageResponse> = server.get(&format!("/obstacles/{obstacle_id}/images")).await.json();
        assert!(listed.is_empty());
    }

    #[test]
    fn test_image_storage_key_shape() {
        let key = image_storage_key(7, "photo.jpeg");
        assert!(key.starts_with("obst_7_"));
        assert!(key.ends_with(".jpeg"));

        // Extension bounded, missing extension falls back to .bin
        let key = image_storage_key(7, "weird.extremelylongextension");
        assert!(key.contains(".extremely") && !key.ends_with("extension"));
        let key = image_storage_key(7, "noext");
        assert!(key.ends_with(".bin"));

        // Two keys for the same obstacle never collide
        assert_ne!(image_storage_key(7, "a.png"), image_storage_key(7, "a.png"));
    }
}
