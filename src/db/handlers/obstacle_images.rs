//! Database repository for obstacle images.
//!
//! Images are always addressed through their obstacle, so the operations
//! here are obstacle-scoped rather than the generic repository trait.

use crate::db::{
    errors::Result,
    models::obstacle_images::{ObstacleImageCreateDBRequest, ObstacleImageDBResponse},
};
use crate::types::{ObstacleId, ObstacleImageId};
use sqlx::PgConnection;
use tracing::instrument;

pub struct ObstacleImages<'c> {
    db: &'c mut PgConnection,
}

impl<'c> ObstacleImages<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(obstacle_id = request.obstacle_id), err)]
    pub async fn create(&mut self, request: &ObstacleImageCreateDBRequest) -> Result<ObstacleImageDBResponse> {
        let image = sqlx::query_as::<_, ObstacleImageDBResponse>(
            r#"
            INSERT INTO obstacle_images (obstacle_id, url, label)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(request.obstacle_id)
        .bind(&request.url)
        .bind(&request.label)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(image)
    }

    #[instrument(skip(self), err)]
    pub async fn list_for_obstacle(&mut self, obstacle_id: ObstacleId) -> Result<Vec<ObstacleImageDBResponse>> {
        let images = sqlx::query_as::<_, ObstacleImageDBResponse>(
            "SELECT * FROM obstacle_images WHERE obstacle_id = $1 ORDER BY id ASC",
        )
        .bind(obstacle_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(images)
    }

    /// Delete an image addressed by both its own id and its obstacle's id,
    /// returning the deleted row so the caller can clean up the backing file.
    #[instrument(skip(self), err)]
    pub async fn delete_scoped(
        &mut self,
        image_id: ObstacleImageId,
        obstacle_id: ObstacleId,
    ) -> Result<Option<ObstacleImageDBResponse>> {
        let image = sqlx::query_as::<_, ObstacleImageDBResponse>(
            "DELETE FROM obstacle_images WHERE id = $1 AND obstacle_id = $2 RETURNING *",
        )
        .bind(image_id)
        .bind(obstacle_id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(image)
    }
}
