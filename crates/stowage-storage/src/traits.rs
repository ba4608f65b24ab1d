//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use async_trait::async_trait;
use bytes::Bytes;
use stowage_core::{
    AppError, FileType, StorageBackend, UploadOptions, UploadResult, UploadedFile, UrlOptions,
};
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{backend} upload failed: {message}")]
    UploadFailed {
        backend: StorageBackend,
        message: String,
    },

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl StorageError {
    pub(crate) fn upload(backend: StorageBackend, message: impl Into<String>) -> Self {
        StorageError::UploadFailed {
            backend,
            message: message.into(),
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::UploadFailed { backend, message } => {
                AppError::Upload { backend, message }
            }
            StorageError::ConfigError(msg) => AppError::Configuration(msg),
            StorageError::NotFound(msg) => AppError::NotFound(msg),
            StorageError::InvalidKey(msg) => AppError::InvalidInput(msg),
            other => AppError::Internal(other.to_string()),
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage abstraction trait
///
/// Every backend (CDN object storage, S3 bucket, local filesystem) implements
/// this contract. Backends hold configuration and clients only; the catalog
/// entry is the single source of truth for where bytes live, so `delete`,
/// `get_url` and `download` all take the entry itself.
///
/// Implementations must be safe to call concurrently for distinct files.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Store `data` and report where it landed.
    ///
    /// Any transport, auth or remote failure is returned as
    /// [`StorageError::UploadFailed`] naming the backend. No retries.
    async fn upload(
        &self,
        data: Bytes,
        filename: &str,
        file_type: FileType,
        options: &UploadOptions,
    ) -> StorageResult<UploadResult>;

    /// Remove the entry's bytes from this backend.
    ///
    /// Returns `false` when the entry has no native id here, when the remote
    /// side reports nothing to delete, and when the delete itself fails (the
    /// failure is logged). Never returns an error.
    async fn delete(&self, file: &UploadedFile) -> bool;

    /// Resolve an access URL, applying whatever options this backend supports.
    ///
    /// Falls back to the entry's stored URL when options are unsupported,
    /// the native id is missing, or URL generation fails.
    async fn get_url(&self, file: &UploadedFile, options: &UrlOptions) -> String;

    /// Read the entry's raw bytes back from this backend.
    async fn download(&self, file: &UploadedFile) -> StorageResult<Bytes>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
