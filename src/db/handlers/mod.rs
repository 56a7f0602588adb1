//! Repository implementations for database access.
//!
//! Each repository wraps a SQLx connection or transaction, provides
//! strongly-typed CRUD operations for one table, and returns domain models
//! from [`crate::db::models`]. Table-shaped repositories implement the
//! [`Repository`] trait; sessions and images expose bespoke token- and
//! obstacle-scoped operations instead.

pub mod file_storage;
pub mod obstacle_images;
pub mod obstacles;
pub mod password_reset_tokens;
pub mod repository;
pub mod sessions;
pub mod users;

pub use obstacle_images::ObstacleImages;
pub use obstacles::Obstacles;
pub use password_reset_tokens::PasswordResetTokens;
pub use repository::Repository;
pub use sessions::Sessions;
pub use users::Users;
