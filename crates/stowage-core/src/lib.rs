//! Stowage Core Library
//!
//! Domain types shared by every stowage crate: the catalog entry model, the
//! storage backend tag, file classification, configuration and the error
//! taxonomy.

pub mod config;
pub mod error;
pub mod file_type;
pub mod models;
pub mod storage_types;
pub mod validation;

// Re-export commonly used types
pub use config::{CloudinaryConfig, Config, LocalStorageConfig, S3Config, StorageConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use file_type::FileType;
pub use models::{Metadata, NewUploadedFile, UploadOptions, UploadResult, UploadedFile, UrlOptions};
pub use storage_types::StorageBackend;
