//! Common type definitions and the authorization vocabulary.
//!
//! This module defines:
//! - Type aliases for entity IDs (UserId, ObstacleId, ObstacleImageId)
//! - The [`Action`] and [`ObstacleField`] enums consumed by the
//!   authorization guard
//! - [`abbrev_uuid`] for readable log fields

use std::fmt;
use uuid::Uuid;

// Type aliases for IDs
pub type UserId = Uuid;
pub type ObstacleId = i64;
pub type ObstacleImageId = i64;

/// Abbreviate a UUID to its first 8 characters for more readable logs and traces
/// Example: "550e8400-e29b-41d4-a716-446655440000" -> "550e8400"
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}

/// Everything a request can ask this service to do, as seen by the
/// authorization guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    ListObstacles,
    GetObstacle,
    CreateObstacle,
    UpdateObstacle,
    DeleteObstacle,
    ListImages,
    UploadImages,
    DeleteImage,
    ListUsers,
    UpdateUser,
}

impl Action {
    /// Read actions that are served without a session.
    pub fn is_public_read(self) -> bool {
        matches!(self, Action::ListObstacles | Action::GetObstacle | Action::ListImages)
    }

    /// Destructive or structural mutations, reserved for admins.
    pub fn is_admin_only(self) -> bool {
        matches!(
            self,
            Action::CreateObstacle
                | Action::DeleteObstacle
                | Action::UploadImages
                | Action::DeleteImage
                | Action::ListUsers
                | Action::UpdateUser
        )
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::ListObstacles => "list obstacles",
            Action::GetObstacle => "read obstacle",
            Action::CreateObstacle => "create obstacle",
            Action::UpdateObstacle => "update obstacle",
            Action::DeleteObstacle => "delete obstacle",
            Action::ListImages => "list images",
            Action::UploadImages => "upload images",
            Action::DeleteImage => "delete image",
            Action::ListUsers => "list users",
            Action::UpdateUser => "update user",
        };
        write!(f, "{name}")
    }
}

/// Fields of an obstacle that a partial update can touch. The guard uses
/// these to enforce the status-only rule for builders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObstacleField {
    Name,
    Description,
    Status,
    Order,
}

impl fmt::Display for ObstacleField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ObstacleField::Name => "name",
            ObstacleField::Description => "description",
            ObstacleField::Status => "status",
            ObstacleField::Order => "order",
        };
        write!(f, "{name}")
    }
}
