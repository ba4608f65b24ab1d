//! PostgreSQL catalog: CRUD for the uploaded_files table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres};
use stowage_core::{AppError, FileType, Metadata, NewUploadedFile, StorageBackend, UploadedFile};
use uuid::Uuid;

use crate::repository::CatalogRepository;

const COLUMNS: &str = "id, request_id, original_filename, file_type, file_size, storage_backend, \
     cloudinary_public_id, s3_key, local_path, public_url, secure_url, metadata, \
     created_at, updated_at";

/// Row type for uploaded_files table (for FromRow).
#[derive(Debug, sqlx::FromRow)]
pub struct UploadedFileRow {
    pub id: Uuid,
    pub request_id: Option<String>,
    pub original_filename: String,
    pub file_type: FileType,
    pub file_size: i64,
    pub storage_backend: StorageBackend,
    pub cloudinary_public_id: Option<String>,
    pub s3_key: Option<String>,
    pub local_path: Option<String>,
    pub public_url: String,
    pub secure_url: Option<String>,
    pub metadata: Json<Metadata>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UploadedFileRow {
    /// Only the locator column matching the backend tag is carried over.
    pub fn into_uploaded_file(self) -> UploadedFile {
        let native_id = match self.storage_backend {
            StorageBackend::Cloudinary => self.cloudinary_public_id,
            StorageBackend::S3 => self.s3_key,
            StorageBackend::Local => self.local_path,
        };
        UploadedFile {
            id: self.id,
            request_id: self.request_id,
            original_filename: self.original_filename,
            file_type: self.file_type,
            file_size: self.file_size,
            storage_backend: self.storage_backend,
            native_id,
            public_url: self.public_url,
            secure_url: self.secure_url,
            metadata: self.metadata.0,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Split an entry's native id into the (cloudinary_public_id, s3_key,
/// local_path) columns.
fn native_columns(file: &UploadedFile) -> (Option<&str>, Option<&str>, Option<&str>) {
    (
        file.cloudinary_public_id(),
        file.s3_key(),
        file.local_path(),
    )
}

/// Repository for uploaded_files table.
#[derive(Clone)]
pub struct PgCatalogRepository {
    pool: PgPool,
}

impl PgCatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogRepository for PgCatalogRepository {
    #[tracing::instrument(skip(self, file), fields(db.table = "uploaded_files", db.operation = "insert"))]
    async fn create(&self, file: NewUploadedFile) -> Result<UploadedFile, AppError> {
        let file = file.into_uploaded_file();
        let (cloudinary_public_id, s3_key, local_path) = native_columns(&file);

        let row: UploadedFileRow = sqlx::query_as::<Postgres, UploadedFileRow>(&format!(
            r#"
            INSERT INTO uploaded_files (
                id, request_id, original_filename, file_type, file_size, storage_backend,
                cloudinary_public_id, s3_key, local_path, public_url, secure_url, metadata,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(file.id)
        .bind(&file.request_id)
        .bind(&file.original_filename)
        .bind(file.file_type)
        .bind(file.file_size)
        .bind(file.storage_backend)
        .bind(cloudinary_public_id)
        .bind(s3_key)
        .bind(local_path)
        .bind(&file.public_url)
        .bind(&file.secure_url)
        .bind(Json(&file.metadata))
        .bind(file.created_at)
        .bind(file.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(
                error = ?e,
                file_id = %file.id,
                backend = %file.storage_backend,
                "Failed to insert catalog entry"
            );
            e
        })?;

        Ok(row.into_uploaded_file())
    }

    #[tracing::instrument(skip(self), fields(db.table = "uploaded_files", db.record_id = %id))]
    async fn get(&self, id: Uuid) -> Result<Option<UploadedFile>, AppError> {
        let row: Option<UploadedFileRow> = sqlx::query_as::<Postgres, UploadedFileRow>(&format!(
            "SELECT {COLUMNS} FROM uploaded_files WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(UploadedFileRow::into_uploaded_file))
    }

    #[tracing::instrument(skip(self), fields(db.table = "uploaded_files"))]
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<UploadedFile>, AppError> {
        let rows: Vec<UploadedFileRow> = sqlx::query_as::<Postgres, UploadedFileRow>(&format!(
            "SELECT {COLUMNS} FROM uploaded_files ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(UploadedFileRow::into_uploaded_file)
            .collect())
    }

    #[tracing::instrument(skip(self), fields(db.table = "uploaded_files", backend = %backend))]
    async fn list_by_backend(
        &self,
        backend: StorageBackend,
    ) -> Result<Vec<UploadedFile>, AppError> {
        let rows: Vec<UploadedFileRow> = sqlx::query_as::<Postgres, UploadedFileRow>(&format!(
            "SELECT {COLUMNS} FROM uploaded_files WHERE storage_backend = $1 ORDER BY created_at ASC"
        ))
        .bind(backend)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(UploadedFileRow::into_uploaded_file)
            .collect())
    }

    #[tracing::instrument(skip(self, file), fields(db.table = "uploaded_files", db.record_id = %file.id))]
    async fn update_location(&self, file: &UploadedFile) -> Result<(), AppError> {
        let (cloudinary_public_id, s3_key, local_path) = native_columns(file);

        let result = sqlx::query(
            r#"
            UPDATE uploaded_files
            SET storage_backend = $2,
                cloudinary_public_id = $3,
                s3_key = $4,
                local_path = $5,
                public_url = $6,
                secure_url = $7,
                metadata = $8,
                updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(file.id)
        .bind(file.storage_backend)
        .bind(cloudinary_public_id)
        .bind(s3_key)
        .bind(local_path)
        .bind(&file.public_url)
        .bind(&file.secure_url)
        .bind(Json(&file.metadata))
        .bind(file.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Uploaded file {} not found", file.id)));
        }
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "uploaded_files", db.record_id = %id))]
    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM uploaded_files WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(backend: StorageBackend) -> UploadedFileRow {
        let now = Utc::now();
        UploadedFileRow {
            id: Uuid::new_v4(),
            request_id: None,
            original_filename: "a.png".to_string(),
            file_type: FileType::Image,
            file_size: 3,
            storage_backend: backend,
            cloudinary_public_id: Some("images/a_anonymous".to_string()),
            s3_key: Some("images/1.png".to_string()),
            local_path: None,
            public_url: "https://x/a.png".to_string(),
            secure_url: None,
            metadata: Json(json!({"width": 10}).as_object().cloned().unwrap()),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn row_keeps_only_locator_of_its_backend() {
        let file = row(StorageBackend::S3).into_uploaded_file();
        assert_eq!(file.s3_key(), Some("images/1.png"));
        assert_eq!(file.cloudinary_public_id(), None);
        assert_eq!(file.metadata["width"], json!(10));

        let file = row(StorageBackend::Local).into_uploaded_file();
        assert_eq!(file.native_id, None);
    }

    #[test]
    fn native_columns_populate_one_slot() {
        let file = row(StorageBackend::Cloudinary).into_uploaded_file();
        assert_eq!(
            native_columns(&file),
            (Some("images/a_anonymous"), None, None)
        );
    }

    #[test]
    fn schema_indexes_request_lookups_by_recency() {
        let schema = include_str!("../../../migrations/0001_create_uploaded_files.sql");
        assert!(schema.contains("ON uploaded_files (request_id, created_at DESC)"));
        assert!(schema.contains("ON uploaded_files (storage_backend)"));
    }
}
