#[cfg(feature = "storage-cloudinary")]
use crate::CloudinaryStorage;
#[cfg(feature = "storage-local")]
use crate::LocalStorage;
#[cfg(feature = "storage-s3")]
use crate::S3Storage;
use crate::{Storage, StorageBackend, StorageError, StorageResult};
use std::collections::HashMap;
use std::sync::Arc;
use stowage_core::StorageConfig;
use tokio::sync::RwLock;

#[cfg(feature = "storage-cloudinary")]
const HTTP_TIMEOUT_SECS: u64 = 120;

/// Create a storage backend from configuration
///
/// Per-backend settings are checked here, so a missing bucket or missing
/// credentials surface as [`StorageError::ConfigError`] only when that
/// backend is actually needed.
pub async fn create_storage(
    backend: StorageBackend,
    config: &StorageConfig,
) -> StorageResult<Arc<dyn Storage>> {
    match backend {
        #[cfg(feature = "storage-cloudinary")]
        StorageBackend::Cloudinary => {
            let cloudinary = config.cloudinary.clone().ok_or_else(|| {
                StorageError::ConfigError(
                    "CLOUDINARY_CLOUD_NAME, CLOUDINARY_API_KEY and CLOUDINARY_API_SECRET (or CLOUDINARY_URL) not configured"
                        .to_string(),
                )
            })?;
            let http_client = reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(HTTP_TIMEOUT_SECS))
                .build()
                .map_err(|e| {
                    StorageError::ConfigError(format!("Failed to create HTTP client: {}", e))
                })?;

            Ok(Arc::new(CloudinaryStorage::new(cloudinary, http_client)))
        }

        #[cfg(not(feature = "storage-cloudinary"))]
        StorageBackend::Cloudinary => Err(StorageError::ConfigError(
            "Cloudinary storage backend not available (storage-cloudinary feature not enabled)"
                .to_string(),
        )),

        #[cfg(feature = "storage-s3")]
        StorageBackend::S3 => {
            let bucket = config
                .s3
                .bucket
                .clone()
                .ok_or_else(|| StorageError::ConfigError("S3_BUCKET not configured".to_string()))?;

            let storage = S3Storage::new(bucket, config.s3.region.clone(), config.s3.endpoint.clone())?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-s3"))]
        StorageBackend::S3 => Err(StorageError::ConfigError(
            "S3 storage backend not available (storage-s3 feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-local")]
        StorageBackend::Local => {
            let storage =
                LocalStorage::new(config.local.path.clone(), config.local.base_url.clone()).await?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-local"))]
        StorageBackend::Local => Err(StorageError::ConfigError(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),
    }
}

/// Resolves which backend handles an operation.
///
/// The active backend name is read on every [`select`](Self::select) call, so
/// switching it with [`set_active`](Self::set_active) takes effect for the
/// next operation without restarting. Named lookups through
/// [`for_backend`](Self::for_backend) never touch the active name, which lets
/// migrations address source and destination explicitly.
///
/// Backends are built lazily and reused.
pub struct StorageSelector {
    config: StorageConfig,
    active: RwLock<String>,
    instances: RwLock<HashMap<StorageBackend, Arc<dyn Storage>>>,
}

impl StorageSelector {
    pub fn new(config: StorageConfig) -> Self {
        let active = config.backend.clone();
        Self {
            config,
            active: RwLock::new(active),
            instances: RwLock::new(HashMap::new()),
        }
    }

    /// Register a prebuilt backend under `backend`, replacing any instance
    /// built from configuration.
    pub fn with_backend(mut self, backend: StorageBackend, storage: Arc<dyn Storage>) -> Self {
        self.instances.get_mut().insert(backend, storage);
        self
    }

    /// Raw name of the currently active backend.
    pub async fn active_name(&self) -> String {
        self.active.read().await.clone()
    }

    /// Switch the active backend. The name is not validated until the next
    /// [`select`](Self::select).
    pub async fn set_active(&self, name: impl Into<String>) {
        let name = name.into();
        tracing::info!(backend = %name, "Active storage backend changed");
        *self.active.write().await = name;
    }

    /// Backend for new uploads, resolved from the active name at call time.
    pub async fn select(&self) -> StorageResult<Arc<dyn Storage>> {
        let name = self.active_name().await;
        let backend = name.parse::<StorageBackend>().map_err(|_| {
            StorageError::ConfigError(format!("Unsupported storage backend: {}", name))
        })?;
        self.for_backend(backend).await
    }

    /// Backend named by `backend`, regardless of the active selection.
    pub async fn for_backend(&self, backend: StorageBackend) -> StorageResult<Arc<dyn Storage>> {
        if let Some(storage) = self.instances.read().await.get(&backend) {
            return Ok(storage.clone());
        }

        let mut instances = self.instances.write().await;
        if let Some(storage) = instances.get(&backend) {
            return Ok(storage.clone());
        }

        let storage = create_storage(backend, &self.config).await?;
        tracing::debug!(backend = %backend, "Storage backend initialized");
        instances.insert(backend, storage.clone());
        Ok(storage)
    }
}

#[cfg(all(test, feature = "storage-local"))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn local_config(dir: &std::path::Path) -> StorageConfig {
        StorageConfig::local(dir.display().to_string(), "/media/")
    }

    #[tokio::test]
    async fn select_follows_active_name() {
        let dir = tempdir().unwrap();
        let selector = StorageSelector::new(local_config(dir.path()));

        let storage = selector.select().await.unwrap();
        assert_eq!(storage.backend_type(), StorageBackend::Local);

        selector.set_active("azure").await;
        let err = selector.select().await.err().unwrap();
        assert!(matches!(err, StorageError::ConfigError(ref m) if m.contains("azure")));

        selector.set_active("LOCAL").await;
        assert!(selector.select().await.is_ok());
    }

    #[tokio::test]
    async fn for_backend_reuses_instances() {
        let dir = tempdir().unwrap();
        let selector = StorageSelector::new(local_config(dir.path()));

        let a = selector.for_backend(StorageBackend::Local).await.unwrap();
        let b = selector.for_backend(StorageBackend::Local).await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn missing_backend_settings_fail_at_construction() {
        let dir = tempdir().unwrap();
        let selector = StorageSelector::new(local_config(dir.path()));

        assert!(matches!(
            selector.for_backend(StorageBackend::S3).await,
            Err(StorageError::ConfigError(ref m)) if m.contains("S3_BUCKET")
        ));
        assert!(matches!(
            selector.for_backend(StorageBackend::Cloudinary).await,
            Err(StorageError::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn registered_backend_takes_precedence() {
        let dir = tempdir().unwrap();
        let other = tempdir().unwrap();
        let prebuilt: Arc<dyn Storage> = Arc::new(
            LocalStorage::new(other.path(), "/other/".to_string())
                .await
                .unwrap(),
        );
        let selector = StorageSelector::new(local_config(dir.path()))
            .with_backend(StorageBackend::Local, prebuilt.clone());

        let selected = selector.select().await.unwrap();
        assert!(Arc::ptr_eq(&selected, &prebuilt));
    }
}
