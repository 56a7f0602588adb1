//! Database models for obstacle images.

use crate::types::{ObstacleId, ObstacleImageId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database request for recording an uploaded image
#[derive(Debug, Clone)]
pub struct ObstacleImageCreateDBRequest {
    pub obstacle_id: ObstacleId,
    pub url: String,
    pub label: Option<String>,
}

/// Database response for an obstacle image
#[derive(Debug, Clone, FromRow)]
pub struct ObstacleImageDBResponse {
    pub id: ObstacleImageId,
    pub obstacle_id: ObstacleId,
    pub url: String,
    pub label: Option<String>,
    pub created_at: DateTime<Utc>,
}
