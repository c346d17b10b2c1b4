use sqlx::{PgPool, Postgres};
use stowage_core::models::File;
use stowage_core::AppError;
use uuid::Uuid;

/// Read access to original file records.
#[derive(Clone)]
pub struct FileRepository {
    pool: PgPool,
}

impl FileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "storage_files", db.record_id = %id))]
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<File>, AppError> {
        let file = sqlx::query_as::<Postgres, File>(
            r#"
            SELECT id, original_file_name, file_name, file_path, mime_type, file_type,
                   ext, checksum, size, inserted_at
            FROM storage_files
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(file)
    }
}
