//! Authentication and authorization system.
//!
//! # Authentication
//!
//! Browser-based authentication using secure HTTP-only cookies: users sign
//! in via `/authentication/login` with email/password, receive an opaque
//! session token backed by a database row, and the [`current_user`]
//! extractor turns that cookie back into a principal on each request.
//!
//! # Authorization
//!
//! Two roles exist: `admin` and `builder`. Role resolution happens once per
//! request in [`resolver`], consulting the session's cached role claim
//! first and falling back to user-table lookups; the result is written back
//! onto the session. The pure [`guard`] then decides allow/deny from
//! `(role, action, requested fields)`.
//!
//! # Modules
//!
//! - [`current_user`]: Extractor for getting the authenticated user in handlers
//! - [`guard`]: The pure authorization decision function
//! - [`password`]: Password hashing and verification using Argon2
//! - [`resolver`]: Session-role resolution with store fallback
//! - [`session`]: Session issuance and cookie handling
//!
//! # Usage in Handlers
//!
//! ```ignore
//! use courseboard::api::models::users::CurrentUser;
//! use courseboard::auth::guard;
//! use courseboard::types::Action;
//!
//! async fn protected_handler(user: CurrentUser) -> Result<(), Error> {
//!     guard::authorize(Some(user.role), Action::CreateObstacle, &[])?;
//!     Ok(())
//! }
//! ```

pub mod current_user;
pub mod guard;
pub mod password;
pub mod resolver;
pub mod session;
