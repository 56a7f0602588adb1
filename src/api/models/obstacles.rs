//! API request/response models for obstacles.

use crate::db::models::obstacles::ObstacleDBResponse;
use crate::types::{ObstacleField, ObstacleId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "obstacle_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ObstacleStatus {
    #[default]
    Planned,
    InProgress,
    Done,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ObstacleCreate {
    pub name: String,
    pub description: Option<String>,
    /// Defaults to `planned`
    pub status: Option<ObstacleStatus>,
    pub order: Option<i32>,
}

/// Partial obstacle update. Double-Option fields distinguish "absent"
/// (leave untouched) from `null` (clear).
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ObstacleUpdate {
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    pub status: Option<ObstacleStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<i32>)]
    pub order: Option<Option<i32>>,
}

impl ObstacleUpdate {
    /// The fields this patch touches, as seen by the authorization guard.
    /// Setting a field to null counts as touching it.
    pub fn requested_fields(&self) -> Vec<ObstacleField> {
        let mut fields = Vec::new();
        if self.name.is_some() {
            fields.push(ObstacleField::Name);
        }
        if self.description.is_some() {
            fields.push(ObstacleField::Description);
        }
        if self.status.is_some() {
            fields.push(ObstacleField::Status);
        }
        if self.order.is_some() {
            fields.push(ObstacleField::Order);
        }
        fields
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ObstacleResponse {
    pub id: ObstacleId,
    pub name: String,
    pub description: Option<String>,
    pub status: ObstacleStatus,
    pub order: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ObstacleDBResponse> for ObstacleResponse {
    fn from(db: ObstacleDBResponse) -> Self {
        Self {
            id: db.id,
            name: db.name,
            description: db.description,
            status: db.status,
            order: db.order,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}
