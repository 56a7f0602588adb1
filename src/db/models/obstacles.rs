//! Database models for obstacles.

use crate::api::models::obstacles::{ObstacleCreate, ObstacleStatus, ObstacleUpdate};
use crate::types::ObstacleId;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database request for creating an obstacle
#[derive(Debug, Clone)]
pub struct ObstacleCreateDBRequest {
    pub name: String,
    pub description: Option<String>,
    pub status: ObstacleStatus,
    pub order: Option<i32>,
}

impl From<ObstacleCreate> for ObstacleCreateDBRequest {
    fn from(api: ObstacleCreate) -> Self {
        Self {
            name: api.name,
            description: api.description,
            status: api.status.unwrap_or_default(),
            order: api.order,
        }
    }
}

/// Database request for a partial obstacle update. Double-Option fields
/// distinguish "leave untouched" (outer None) from "set NULL" (Some(None)).
#[derive(Debug, Clone, Default)]
pub struct ObstacleUpdateDBRequest {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<ObstacleStatus>,
    pub order: Option<Option<i32>>,
}

impl From<ObstacleUpdate> for ObstacleUpdateDBRequest {
    fn from(api: ObstacleUpdate) -> Self {
        Self {
            name: api.name,
            description: api.description,
            status: api.status,
            order: api.order,
        }
    }
}

/// Database response for an obstacle
#[derive(Debug, Clone, FromRow)]
pub struct ObstacleDBResponse {
    pub id: ObstacleId,
    pub name: String,
    pub description: Option<String>,
    pub status: ObstacleStatus,
    pub order: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
