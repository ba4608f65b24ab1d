//! Stowage Services Layer
//!
//! Orchestration on top of the storage backends and the catalog:
//! [`FileUploadService`] is what callers use to upload, resolve and delete
//! files; [`StorageMigrator`] moves existing entries between backends.

pub mod migration;
pub mod upload;

pub use migration::{
    MigrationItem, MigrationReport, MigrationRequest, MigrationStage, MigrationStatus,
    StorageMigrator,
};
pub use stowage_storage::{create_storage, Storage, StorageBackend, StorageError, StorageSelector};
pub use upload::FileUploadService;
