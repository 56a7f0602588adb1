//! API layer for HTTP request handling and data models.
//!
//! This module contains the REST API implementation, organized into:
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures for API communication
//!
//! # API Structure
//!
//! - **Authentication** (`/authentication/*`): Login, registration,
//!   password resets
//! - **Obstacles** (`/obstacles`, `/obstacles/{id}`): Course obstacle CRUD
//! - **Images** (`/obstacles/{id}/images/*`): Image upload and management
//! - **Users** (`/users`, `/users/{id}`): User administration
//!
//! All endpoints are documented with OpenAPI annotations using `utoipa`;
//! documentation is served at `/docs` when the server is running.

pub mod handlers;
pub mod models;
