//! Settings repository: key/value rows in storage_settings.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres};
use stowage_core::AppError;

use crate::traits::SettingsSource;

#[derive(Clone)]
pub struct SettingsRepository {
    pool: PgPool,
}

impl SettingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsSource for SettingsRepository {
    #[tracing::instrument(skip(self), fields(db.table = "storage_settings"))]
    async fn get_setting(&self, key: &str) -> Result<Option<String>, AppError> {
        let value = sqlx::query_scalar::<Postgres, String>(
            "SELECT value FROM storage_settings WHERE key = $1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(value)
    }
}
