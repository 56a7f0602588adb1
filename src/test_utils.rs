//! Test utilities for integration testing (available with `test-utils` feature).

use crate::{
    AppState, Application,
    api::models::users::Role,
    auth::password,
    config::Config,
    db::{
        handlers::{Repository, Sessions, Users, file_storage::LocalFileStorage},
        models::{sessions::SessionCreateDBRequest, users::UserCreateDBRequest},
    },
};
use axum_test::TestServer;
use chrono::Utc;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Per-process directories keep parallel test binaries from interfering
fn test_dir(kind: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("courseboard-test-{kind}-{}", std::process::id()))
}

pub fn create_test_config() -> Config {
    let mut config = Config::default();
    config.port = 0;
    config.admin_email = "admin@test.com".to_string();
    config.uploads.dir = test_dir("uploads");
    config.auth.native.session.cookie_secure = false;
    config.auth.native.email.transport = crate::config::EmailTransportConfig::File {
        path: test_dir("emails").to_string_lossy().to_string(),
    };
    config
}

pub async fn create_test_app_state(pool: PgPool) -> AppState {
    let config = create_test_config();
    tokio::fs::create_dir_all(&config.uploads.dir)
        .await
        .expect("Failed to create test uploads dir");
    let storage = Arc::new(LocalFileStorage::new(config.uploads.dir.clone()));

    AppState::builder().db(pool).config(config).storage(storage).build()
}

/// Spin up a TestServer over the full application
pub async fn create_test_app(pool: PgPool) -> TestServer {
    Application::new_with_pool(create_test_config(), Some(pool))
        .await
        .expect("Failed to create application")
        .into_test_server()
}

/// Spin up a TestServer plus the state behind it, for tests that need to
/// poke at storage directly
pub async fn create_test_app_and_state(pool: PgPool) -> (TestServer, AppState) {
    let state = create_test_app_state(pool).await;
    let router = crate::build_router(&state).expect("Failed to build router");
    let server = TestServer::new(router.into_make_service()).expect("Failed to create test server");
    (server, state)
}

/// Create a user with a unique email and the given role
pub async fn create_test_user(pool: &PgPool, role: Role) -> crate::db::models::users::UserDBResponse {
    let mut conn = pool.acquire().await.unwrap();
    Users::new(&mut conn)
        .create(&UserCreateDBRequest {
            email: format!("user-{}@test.com", Uuid::new_v4()),
            name: None,
            role,
            password_hash: None,
        })
        .await
        .expect("Failed to create test user")
}

/// Create a builder account that can log in with the given password
pub async fn create_test_user_with_password(pool: &PgPool, email: &str, password: &str) -> crate::db::models::users::UserDBResponse {
    let password_hash = password::hash_string(password).expect("Failed to hash test password");
    let mut conn = pool.acquire().await.unwrap();
    Users::new(&mut conn)
        .create(&UserCreateDBRequest {
            email: email.to_string(),
            name: None,
            role: Role::Builder,
            password_hash: Some(password_hash),
        })
        .await
        .expect("Failed to create test user")
}

/// Open a session for a user and return the Cookie header value
pub async fn login_cookie(pool: &PgPool, user: &crate::db::models::users::UserDBResponse) -> String {
    let config = create_test_config();
    let token = password::generate_token();

    let mut conn = pool.acquire().await.unwrap();
    Sessions::new(&mut conn)
        .create(&SessionCreateDBRequest {
            token: token.clone(),
            user_id: user.id,
            role: Some(user.role),
            expires: Utc::now() + chrono::Duration::hours(1),
        })
        .await
        .expect("Failed to create test session");

    format!("{}={}", config.auth.native.session.cookie_name, token)
}
