//! OpenAPI documentation configuration, served at `/docs`.

use utoipa::OpenApi;

use crate::api::handlers;
use crate::api::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Courseboard API",
        description = "Obstacle course build tracker: obstacles, images, and user administration."
    ),
    paths(
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::logout,
        handlers::auth::request_password_reset,
        handlers::auth::confirm_password_reset,
        handlers::obstacles::list_obstacles,
        handlers::obstacles::create_obstacle,
        handlers::obstacles::get_obstacle,
        handlers::obstacles::update_obstacle,
        handlers::obstacles::delete_obstacle,
        handlers::images::list_images,
        handlers::images::upload_images,
        handlers::images::delete_image,
        handlers::users::list_users,
        handlers::users::update_user,
    ),
    components(schemas(
        models::auth::AuthResponse,
        models::auth::AuthSuccessResponse,
        models::auth::LoginRequest,
        models::auth::PasswordResetConfirmRequest,
        models::auth::PasswordResetRequest,
        models::auth::PasswordResetResponse,
        models::auth::RegisterRequest,
        models::images::ObstacleImageResponse,
        models::images::OkResponse,
        models::obstacles::ObstacleCreate,
        models::obstacles::ObstacleResponse,
        models::obstacles::ObstacleStatus,
        models::obstacles::ObstacleUpdate,
        models::users::Role,
        models::users::UserResponse,
        models::users::UserUpdate,
    ))
)]
pub struct ApiDoc;
