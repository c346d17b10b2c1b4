use async_trait::async_trait;
use sqlx::{PgPool, Postgres};
use stowage_core::models::Dimension;
use stowage_core::AppError;

use crate::traits::DimensionSource;

#[derive(Clone)]
pub struct DimensionRepository {
    pool: PgPool,
}

impl DimensionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DimensionSource for DimensionRepository {
    #[tracing::instrument(skip(self), fields(db.table = "storage_dimensions"))]
    async fn list_enabled(&self) -> Result<Vec<Dimension>, AppError> {
        let dimensions = sqlx::query_as::<Postgres, Dimension>(
            r#"
            SELECT id, name, width, height, quality, format, applies_to,
                   maintain_aspect_ratio, enabled, sort_order, inserted_at
            FROM storage_dimensions
            WHERE enabled = TRUE
            ORDER BY sort_order, name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(dimensions)
    }
}
