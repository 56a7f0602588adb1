//! Database layer for data persistence and access.
//!
//! This module implements the data access layer using SQLx with PostgreSQL,
//! following the repository pattern: API handlers call repositories in
//! [`handlers`], which run queries and return record structs from
//! [`models`]. Database-specific errors live in [`errors`].
//!
//! Repositories are constructed from a connection or transaction:
//!
//! ```ignore
//! let mut tx = pool.begin().await?;
//! let mut repo = Users::new(&mut tx);
//! let user = repo.create(&create_request).await?;
//! tx.commit().await?;
//! ```
//!
//! Migrations live in `migrations/` and are embedded via
//! [`crate::migrator`].

pub mod errors;
pub mod handlers;
pub mod models;
