use crate::keys::generate_storage_key;
use crate::traits::{Storage, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use serde_json::json;
use std::path::{Path, PathBuf};
use stowage_core::{
    FileType, Metadata, StorageBackend, UploadOptions, UploadResult, UploadedFile, UrlOptions,
};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local filesystem storage implementation
#[derive(Clone, Debug)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for file storage (e.g., "/var/lib/stowage/media")
    /// * `base_url` - Base media URL files are served under (e.g., "/media/")
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            base_url,
        })
    }

    /// Convert storage key to filesystem path with security validation
    ///
    /// Rejects keys with traversal sequences that could escape the base
    /// storage directory.
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        if storage_key.is_empty() || storage_key.contains("..") || storage_key.starts_with('/') {
            return Err(StorageError::InvalidKey(format!(
                "Storage key {:?} contains invalid characters",
                storage_key
            )));
        }

        let path = self.base_path.join(storage_key);

        if let (Ok(base_canonical), Ok(canonical)) =
            (self.base_path.canonicalize(), path.canonicalize())
        {
            if canonical.strip_prefix(&base_canonical).is_err() {
                return Err(StorageError::InvalidKey(
                    "Storage key resolves outside storage directory".to_string(),
                ));
            }
        }

        Ok(path)
    }

    /// Generate public URL for file
    fn generate_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    async fn write_file(&self, path: &Path, data: &[u8]) -> StorageResult<()> {
        self.ensure_parent_dir(path).await?;
        let mut file = fs::File::create(path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        Ok(())
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn upload(
        &self,
        data: Bytes,
        filename: &str,
        file_type: FileType,
        _options: &UploadOptions,
    ) -> StorageResult<UploadResult> {
        let key = generate_storage_key(file_type, filename);
        let path = self
            .key_to_path(&key)
            .map_err(|e| StorageError::upload(StorageBackend::Local, e.to_string()))?;
        let size = data.len();

        let start = std::time::Instant::now();

        self.write_file(&path, &data).await.map_err(|e| {
            tracing::error!(
                error = %e,
                path = %path.display(),
                key = %key,
                size_bytes = size,
                "Local storage upload failed"
            );
            StorageError::upload(
                StorageBackend::Local,
                format!("Failed to write file {}: {}", path.display(), e),
            )
        })?;

        let url = self.generate_url(&key);

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        let mut metadata = Metadata::new();
        metadata.insert("full_path".into(), json!(path.display().to_string()));
        metadata.insert("relative_path".into(), json!(key));

        Ok(UploadResult {
            public_url: url.clone(),
            secure_url: Some(url),
            native_id: key,
            metadata,
        })
    }

    async fn delete(&self, file: &UploadedFile) -> bool {
        let Some(key) = file.local_path() else {
            tracing::debug!(file_id = %file.id, "No local path recorded, nothing to delete");
            return false;
        };

        let path = match self.key_to_path(key) {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(error = %e, file_id = %file.id, key = %key, "Local storage delete failed");
                return false;
            }
        };
        let start = std::time::Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            tracing::debug!(path = %path.display(), key = %key, "Local file already absent");
            return false;
        }

        if let Err(e) = fs::remove_file(&path).await {
            tracing::warn!(
                error = %e,
                path = %path.display(),
                key = %key,
                "Local storage delete failed"
            );
            return false;
        }

        tracing::info!(
            path = %path.display(),
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        true
    }

    async fn get_url(&self, file: &UploadedFile, _options: &UrlOptions) -> String {
        file.public_url.clone()
    }

    async fn download(&self, file: &UploadedFile) -> StorageResult<Bytes> {
        let key = file
            .local_path()
            .ok_or_else(|| StorageError::NotFound(format!("file {} has no local path", file.id)))?;
        let path = self.key_to_path(key)?;
        let start = std::time::Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(key.to_string()));
        }

        let data = fs::read(&path).await.map_err(|e| {
            StorageError::DownloadFailed(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage download successful"
        );

        Ok(Bytes::from(data))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
