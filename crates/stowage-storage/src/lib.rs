//! Stowage Storage Library
//!
//! This crate provides the storage abstraction and its backends: Cloudinary
//! (CDN object storage), S3-compatible buckets and the local filesystem.
//! A [`StorageSelector`] picks the backend for each operation.
//!
//! # Storage key format
//!
//! Bucket and filesystem keys are namespaced by file category:
//!
//! - **S3 / local**: `{fileType}s/{uuid}{ext}`
//! - **Cloudinary**: `{fileType}s/{stem}_{requestId}` (the provider may
//!   append a suffix to keep it unique)
//!
//! Keys must not contain `..` or a leading `/`. Key generation is centralized
//! in the `keys` module so all backends stay consistent.

#[cfg(feature = "storage-cloudinary")]
pub mod cloudinary;
pub mod factory;
pub(crate) mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
#[cfg(feature = "storage-cloudinary")]
pub use cloudinary::CloudinaryStorage;
pub use factory::{create_storage, StorageSelector};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use stowage_core::StorageBackend;
pub use traits::{Storage, StorageError, StorageResult};
