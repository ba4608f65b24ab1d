//! Catalog repository contract.

use async_trait::async_trait;
use stowage_core::{AppError, NewUploadedFile, StorageBackend, UploadedFile};
use uuid::Uuid;

/// Persistence for catalog entries.
///
/// Implementations must keep the stored native id consistent with the
/// entry's backend tag.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Persist a new entry and return it with its id and timestamps.
    async fn create(&self, file: NewUploadedFile) -> Result<UploadedFile, AppError>;

    async fn get(&self, id: Uuid) -> Result<Option<UploadedFile>, AppError>;

    /// Entries newest first.
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<UploadedFile>, AppError>;

    /// Every entry currently stored on `backend`, oldest first.
    async fn list_by_backend(&self, backend: StorageBackend)
        -> Result<Vec<UploadedFile>, AppError>;

    /// Persist a relocated entry: backend tag, native id, URLs, metadata and
    /// `updated_at`. Fails with [`AppError::NotFound`] if the row is gone.
    async fn update_location(&self, file: &UploadedFile) -> Result<(), AppError>;

    /// Remove an entry. Returns whether a row was deleted.
    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;
}
