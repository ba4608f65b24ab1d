//! Upload orchestration: the single entry point callers use to store,
//! resolve and delete files.

use bytes::Bytes;
use std::sync::Arc;
use stowage_core::{AppError, FileType, NewUploadedFile, UploadOptions, UploadedFile, UrlOptions};
use stowage_db::CatalogRepository;
use stowage_storage::StorageSelector;
use uuid::Uuid;

#[derive(Clone)]
pub struct FileUploadService {
    catalog: Arc<dyn CatalogRepository>,
    selector: Arc<StorageSelector>,
}

impl FileUploadService {
    pub fn new(catalog: Arc<dyn CatalogRepository>, selector: Arc<StorageSelector>) -> Self {
        Self { catalog, selector }
    }

    /// Store `data` on the active backend and record it in the catalog.
    ///
    /// The type is detected from `filename` when not given. No catalog entry
    /// is written unless the backend upload succeeded.
    #[tracing::instrument(skip(self, data, filename), fields(filename = %filename, size_bytes = data.len()))]
    pub async fn upload_file(
        &self,
        data: Bytes,
        filename: &str,
        file_type: Option<FileType>,
        request_id: Option<String>,
    ) -> Result<UploadedFile, AppError> {
        let file_type = file_type.unwrap_or_else(|| FileType::from_filename(filename));
        let file_size = data.len() as i64;

        let storage = self.selector.select().await?;
        let backend = storage.backend_type();

        let result = storage
            .upload(
                data,
                filename,
                file_type,
                &UploadOptions::with_request_id(request_id.clone()),
            )
            .await?;

        let file = self
            .catalog
            .create(NewUploadedFile::from_upload(
                backend,
                filename,
                file_type,
                file_size,
                request_id,
                result,
            ))
            .await?;

        tracing::info!(
            file_id = %file.id,
            backend = %backend,
            file_type = %file_type,
            "File uploaded"
        );

        Ok(file)
    }

    /// Remove the entry's bytes from the backend that holds them, then drop
    /// the catalog row.
    ///
    /// The row is removed even when the backend delete reports `false`. The
    /// returned flag is the backend's result and is advisory only.
    #[tracing::instrument(skip(self, file), fields(file_id = %file.id, backend = %file.storage_backend))]
    pub async fn delete_file(&self, file: &UploadedFile) -> bool {
        let removed = match self.selector.for_backend(file.storage_backend).await {
            Ok(storage) => storage.delete(file).await,
            Err(e) => {
                tracing::warn!(error = %e, "Storage backend unavailable for delete");
                false
            }
        };

        if !removed && file.native_id_for(file.storage_backend).is_some() {
            tracing::warn!(
                native_id = file.native_id.as_deref().unwrap_or_default(),
                "Remote object was not deleted and may be orphaned"
            );
        }

        match self.catalog.delete(file.id).await {
            Ok(_) => removed,
            Err(e) => {
                tracing::error!(error = %e, "Failed to delete catalog entry");
                false
            }
        }
    }

    /// Look the entry up first; a missing id is reported as `NotFound`.
    pub async fn delete_file_by_id(&self, id: Uuid) -> Result<bool, AppError> {
        let file = self.get_file(id).await?;
        Ok(self.delete_file(&file).await)
    }

    /// Resolve an access URL through the entry's recorded backend.
    pub async fn get_file_url(
        &self,
        file: &UploadedFile,
        options: &UrlOptions,
    ) -> Result<String, AppError> {
        let storage = self.selector.for_backend(file.storage_backend).await?;
        Ok(storage.get_url(file, options).await)
    }

    pub async fn get_file_url_by_id(
        &self,
        id: Uuid,
        options: &UrlOptions,
    ) -> Result<String, AppError> {
        let file = self.get_file(id).await?;
        self.get_file_url(&file, options).await
    }

    pub async fn get_file(&self, id: Uuid) -> Result<UploadedFile, AppError> {
        self.catalog
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Uploaded file {} not found", id)))
    }

    pub async fn list_files(&self, limit: i64, offset: i64) -> Result<Vec<UploadedFile>, AppError> {
        self.catalog.list(limit, offset).await
    }
}
