//! # courseboard: obstacle course build tracker
//!
//! `courseboard` is a small multi-user CRUD service for tracking the build
//! of an obstacle course. Authenticated users track a list of obstacles
//! (name, description, status, display order) with attached images, and an
//! admin role manages user permissions.
//!
//! ## Overview
//!
//! The interesting part of the system is access control. Every request
//! resolves the caller's role (`admin` or `builder`) exactly once, through
//! a role claim cached on the server-side session with a users-table
//! fallback, and a pure authorization guard then decides allow/deny from
//! `(role, action, requested fields)`. Builders may only move obstacle
//! status; every structural mutation - creating or deleting obstacles,
//! managing images, administering users - requires an admin.
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum)
//! for the HTTP layer and uses PostgreSQL (via SQLx) for persistence.
//!
//! A request flows: axum handler -> `CurrentUser` extractor (session
//! lookup + role resolution in [`auth`]) -> [`auth::guard`] -> repository
//! ([`db::handlers`]) -> PostgreSQL. Reads of obstacles and images are
//! public; everything else needs a session cookie.
//!
//! Uploaded image files live on the local filesystem under a configured
//! uploads directory and are served statically under `/uploads`. Image
//! records reference them by public URL; file cleanup on delete is
//! best-effort by design - the database row is authoritative.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use courseboard::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = courseboard::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     courseboard::telemetry::init_telemetry()?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
mod email;
pub mod errors;
mod openapi;
pub mod telemetry;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

use crate::{
    api::models::users::Role,
    auth::password,
    config::CorsOrigin,
    db::handlers::{Repository, Users, file_storage::FileStorage},
    db::models::users::{UserCreateDBRequest, UserUpdateDBRequest},
    openapi::ApiDoc,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{self, HeaderValue},
    routing::{delete, get, post, put},
};
use bon::Builder;
pub use config::Config;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use types::{ObstacleId, ObstacleImageId, UserId};

/// Application state shared across all request handlers.
///
/// # Fields
///
/// - `db`: PostgreSQL connection pool
/// - `config`: Application configuration loaded from environment/files
/// - `storage`: Backing file storage for uploaded images
///
/// # Example
///
/// ```ignore
/// let state = AppState::builder()
///     .db(pool)
///     .config(config)
///     .storage(storage)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    pub storage: Arc<dyn FileStorage>,
}

/// Get the courseboard database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Create the initial admin user if it doesn't exist.
///
/// This function is idempotent - it will create a new admin user if one
/// doesn't exist, or update the password if the user already exists. It is
/// called during application startup to ensure there's always an admin user
/// available.
#[instrument(skip_all)]
pub async fn create_initial_admin_user(email: &str, password: Option<&str>, db: &PgPool) -> anyhow::Result<UserId> {
    // Hash password if provided
    let password_hash = match password {
        Some(pwd) => Some(password::hash_string(pwd).map_err(|e| anyhow::anyhow!("Failed to hash admin password: {e}"))?),
        None => None,
    };

    let mut tx = db.begin().await?;
    let mut user_repo = Users::new(&mut tx);

    if let Some(existing_user) = user_repo.get_user_by_email(email).await? {
        // User exists - refresh the password if one was provided
        if password_hash.is_some() {
            user_repo
                .update(
                    existing_user.id,
                    &UserUpdateDBRequest {
                        password_hash,
                        ..Default::default()
                    },
                )
                .await?;
        }
        tx.commit().await?;
        return Ok(existing_user.id);
    }

    let created_user = user_repo
        .create(&UserCreateDBRequest {
            email: email.to_string(),
            name: None,
            role: Role::Admin,
            password_hash,
        })
        .await?;

    tx.commit().await?;
    info!("Created initial admin user {}", email);
    Ok(created_user.id)
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let mut origins = Vec::new();
    for origin in &config.auth.security.cors.allowed_origins {
        let header_value = match origin {
            CorsOrigin::Wildcard => "*".parse::<HeaderValue>()?,
            CorsOrigin::Url(url) => url.as_str().parse::<HeaderValue>()?,
        };
        origins.push(header_value);
    }

    let mut cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(config.auth.security.cors.allow_credentials)
        .expose_headers(vec![http::header::LOCATION]);

    if let Some(max_age) = config.auth.security.cors.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the main application router with all endpoints and middleware.
///
/// This constructs the complete Axum router with:
/// - Authentication routes (login, registration, password reset)
/// - Obstacle, image, and user routes
/// - Static serving of the uploads directory
/// - OpenAPI documentation at `/docs`
/// - CORS configuration and tracing middleware
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    // Authentication routes (at root level)
    let auth_routes = Router::new()
        .route("/authentication/register", post(api::handlers::auth::register))
        .route("/authentication/login", post(api::handlers::auth::login))
        .route("/authentication/logout", post(api::handlers::auth::logout))
        .route("/authentication/password-resets", post(api::handlers::auth::request_password_reset))
        .route(
            "/authentication/password-resets/{token_id}/confirm",
            post(api::handlers::auth::confirm_password_reset),
        )
        .with_state(state.clone());

    // Image upload route with its own body limit (other routes use default)
    let upload_limit = state.config.uploads.max_upload_size as usize;
    let upload_router = Router::new().route(
        "/obstacles/{id}/images",
        post(api::handlers::images::upload_images).layer(DefaultBodyLimit::max(upload_limit)),
    );

    let api_routes = Router::new()
        .merge(upload_router)
        // Obstacles
        .route(
            "/obstacles",
            get(api::handlers::obstacles::list_obstacles).post(api::handlers::obstacles::create_obstacle),
        )
        .route(
            "/obstacles/{id}",
            get(api::handlers::obstacles::get_obstacle)
                .put(api::handlers::obstacles::update_obstacle)
                .delete(api::handlers::obstacles::delete_obstacle),
        )
        // Images
        .route("/obstacles/{id}/images", get(api::handlers::images::list_images))
        .route(
            "/obstacles/{id}/images/{image_id}",
            delete(api::handlers::images::delete_image),
        )
        // User management (admin only)
        .route("/users", get(api::handlers::users::list_users))
        .route("/users/{id}", put(api::handlers::users::update_user))
        .with_state(state.clone());

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .merge(auth_routes)
        .merge(api_routes)
        // Uploaded images are public and URL-addressable
        .nest_service(&state.config.uploads.public_path, ServeDir::new(&state.config.uploads.dir))
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    // Create CORS layer from config
    let cors_layer = create_cors_layer(&state.config)?;

    let router = router.layer(cors_layer).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(tracing::Level::INFO))
            .on_request(DefaultOnRequest::new().level(tracing::Level::INFO))
            .on_response(DefaultOnResponse::new().level(tracing::Level::INFO)),
    );

    Ok(router)
}

/// Main application struct that owns all resources and lifecycle.
///
/// # Lifecycle
///
/// 1. **Create**: [`Application::new`] connects to the database, runs
///    migrations, ensures the initial admin user, and prepares file storage
/// 2. **Serve**: [`Application::serve`] binds a TCP port and handles
///    requests until the shutdown future resolves
pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        Self::new_with_pool(config, None).await
    }

    /// Create an application over an existing pool (used by tests), or
    /// connect using the configured database URL.
    pub async fn new_with_pool(config: Config, pool: Option<PgPool>) -> anyhow::Result<Self> {
        let pool = match pool {
            Some(pool) => pool,
            None => PgPool::connect(&config.database_url).await?,
        };

        migrator().run(&pool).await?;

        // Ensure there's always an admin account to bootstrap from
        create_initial_admin_user(&config.admin_email, config.admin_password.as_deref(), &pool)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create initial admin user: {e}"))?;

        let storage = db::handlers::file_storage::create_file_storage(&config.uploads.dir)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to initialize file storage: {e}"))?;

        let state = AppState::builder().db(pool.clone()).config(config.clone()).storage(storage).build();

        let router = build_router(&state)?;

        Ok(Self { router, config, pool })
    }

    /// Convert application into a test server (for tests)
    #[cfg(any(test, feature = "test-utils"))]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router.into_make_service()).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("Courseboard listening on http://{bind_addr}");

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Closing database connections...");
        self.pool.close().await;

        Ok(())
    }
}
