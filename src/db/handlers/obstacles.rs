//! Database repository for obstacles.

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::obstacles::{ObstacleCreateDBRequest, ObstacleDBResponse, ObstacleUpdateDBRequest},
};
use crate::types::ObstacleId;
use sqlx::PgConnection;
use std::collections::HashMap;
use tracing::instrument;

/// Filter for listing obstacles. Listing always returns the full set in
/// display order, so there is nothing to configure yet.
#[derive(Debug, Clone, Default)]
pub struct ObstacleFilter;

pub struct Obstacles<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Obstacles<'c> {
    type CreateRequest = ObstacleCreateDBRequest;
    type UpdateRequest = ObstacleUpdateDBRequest;
    type Response = ObstacleDBResponse;
    type Id = ObstacleId;
    type Filter = ObstacleFilter;

    #[instrument(skip(self, request), fields(name = %request.name), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let obstacle = sqlx::query_as::<_, ObstacleDBResponse>(
            r#"
            INSERT INTO obstacles (name, description, status, "order")
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&request.name)
        .bind(&request.description)
        .bind(request.status)
        .bind(request.order)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(obstacle)
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let obstacle = sqlx::query_as::<_, ObstacleDBResponse>("SELECT * FROM obstacles WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(obstacle)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<Self::Id>) -> Result<HashMap<Self::Id, Self::Response>> {
        let obstacles = sqlx::query_as::<_, ObstacleDBResponse>("SELECT * FROM obstacles WHERE id = ANY($1)")
            .bind(&ids)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(obstacles.into_iter().map(|o| (o.id, o)).collect())
    }

    /// Display order: explicit "order" first (nulls sort last), ties and
    /// unordered rows by id.
    #[instrument(skip_all, err)]
    async fn list(&mut self, _filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let obstacles =
            sqlx::query_as::<_, ObstacleDBResponse>(r#"SELECT * FROM obstacles ORDER BY "order" ASC NULLS LAST, id ASC"#)
                .fetch_all(&mut *self.db)
                .await?;

        Ok(obstacles)
    }

    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM obstacles WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        // Boolean flags distinguish "leave untouched" from "set NULL" for
        // the nullable columns
        let obstacle = sqlx::query_as::<_, ObstacleDBResponse>(
            r#"
            UPDATE obstacles SET
                name = COALESCE($2, name),
                description = CASE WHEN $3 THEN $4 ELSE description END,
                status = COALESCE($5, status),
                "order" = CASE WHEN $6 THEN $7 ELSE "order" END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.name)
        .bind(request.description.is_some())
        .bind(request.description.clone().flatten())
        .bind(request.status)
        .bind(request.order.is_some())
        .bind(request.order.flatten())
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(obstacle)
    }
}

impl<'c> Obstacles<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }
}
