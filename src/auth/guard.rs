//! The authorization guard.
//!
//! A pure decision function mapping `(role, action, requested fields)` to
//! allow or deny. It performs no I/O, so every combination can be tested by
//! enumeration. Rules are checked in order; the first match wins:
//!
//! 1. No principal: only public read actions are allowed (`Unauthorized`
//!    otherwise).
//! 2. Destructive or structural mutations require `admin` (`Forbidden`
//!    otherwise).
//! 3. Obstacle updates by non-admins may touch `status` and nothing else;
//!    a patch naming any other field is rejected in its entirety.
//! 4. Everything else is allowed.

use crate::{
    api::models::users::Role,
    errors::Error,
    types::{Action, ObstacleField},
};

/// Decide whether a principal may perform an action.
///
/// `fields` is only meaningful for [`Action::UpdateObstacle`]; other
/// actions pass an empty slice.
pub fn authorize(role: Option<Role>, action: Action, fields: &[ObstacleField]) -> Result<(), Error> {
    // Rule 1: unauthenticated principals may only take public read actions
    let Some(role) = role else {
        if action.is_public_read() {
            return Ok(());
        }
        return Err(Error::Unauthenticated { message: None });
    };

    // Rule 2: structural mutations are admin-only
    if action.is_admin_only() && role != Role::Admin {
        return Err(Error::InsufficientPermissions { action });
    }

    // Rule 3: non-admin obstacle updates must be status-only patches
    if action == Action::UpdateObstacle && role != Role::Admin && fields.iter().any(|f| *f != ObstacleField::Status) {
        return Err(Error::InsufficientPermissions { action });
    }

    // Rule 4
    Ok(())
}
