//! API response models for obstacle images.

use crate::db::models::obstacle_images::ObstacleImageDBResponse;
use crate::types::{ObstacleId, ObstacleImageId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ObstacleImageResponse {
    pub id: ObstacleImageId,
    pub obstacle_id: ObstacleId,
    /// Public URL under the uploads path
    pub url: String,
    pub label: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<ObstacleImageDBResponse> for ObstacleImageResponse {
    fn from(db: ObstacleImageDBResponse) -> Self {
        Self {
            id: db.id,
            obstacle_id: db.obstacle_id,
            url: db.url,
            label: db.label,
            created_at: db.created_at,
        }
    }
}

/// Acknowledgement body for successful deletes
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub fn ok() -> Self {
        Self { ok: true }
    }
}
