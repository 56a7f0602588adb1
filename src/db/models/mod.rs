//! Database record models matching table schemas.
//!
//! Each struct here corresponds to a table row (deriving `sqlx::FromRow`
//! where repositories read it back), kept separate from the API models so
//! storage and API representations can evolve independently.

pub mod obstacle_images;
pub mod obstacles;
pub mod password_reset_tokens;
pub mod sessions;
pub mod users;
