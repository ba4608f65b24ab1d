#![allow(dead_code)]

//! Shared fixtures: a local backend in a temp dir, an S3 backend over an
//! in-memory object store, and a scriptable mock backend.

use async_trait::async_trait;
use bytes::Bytes;
use object_store::memory::InMemory;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use stowage_core::{
    FileType, Metadata, StorageBackend, StorageConfig, UploadOptions, UploadResult, UploadedFile,
    UrlOptions,
};
use stowage_db::InMemoryCatalogRepository;
use stowage_services::{FileUploadService, StorageMigrator};
use stowage_storage::{S3Storage, Storage, StorageError, StorageResult, StorageSelector};
use tempfile::TempDir;

pub const MEDIA_URL: &str = "/media/";

pub struct TestGateway {
    pub service: FileUploadService,
    pub migrator: StorageMigrator,
    pub catalog: Arc<InMemoryCatalogRepository>,
    pub selector: Arc<StorageSelector>,
    pub _temp_dir: TempDir,
}

/// Gateway with the local backend active and S3 served from memory.
pub fn gateway() -> TestGateway {
    gateway_with(Vec::new())
}

pub fn gateway_with(backends: Vec<(StorageBackend, Arc<dyn Storage>)>) -> TestGateway {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let config = StorageConfig::local(temp_dir.path().display().to_string(), MEDIA_URL);

    let s3: Arc<dyn Storage> = Arc::new(S3Storage::with_store(
        Arc::new(InMemory::new()),
        "uploads".to_string(),
        "us-east-1".to_string(),
        None,
    ));
    let mut selector = StorageSelector::new(config).with_backend(StorageBackend::S3, s3);
    for (backend, storage) in backends {
        selector = selector.with_backend(backend, storage);
    }
    let selector = Arc::new(selector);

    let catalog = Arc::new(InMemoryCatalogRepository::new());
    TestGateway {
        service: FileUploadService::new(catalog.clone(), selector.clone()),
        migrator: StorageMigrator::new(catalog.clone(), selector.clone()),
        catalog,
        selector,
        _temp_dir: temp_dir,
    }
}

/// In-memory backend that counts calls and can be told to fail.
#[derive(Default)]
pub struct MockStorage {
    pub backend: Option<StorageBackend>,
    pub objects: Arc<Mutex<HashMap<String, Bytes>>>,
    pub fail_uploads: bool,
    pub fail_downloads_for: Option<String>,
    pub uploads: AtomicUsize,
    pub downloads: AtomicUsize,
    pub deletes: AtomicUsize,
}

impl MockStorage {
    pub fn new(backend: StorageBackend) -> Self {
        Self {
            backend: Some(backend),
            ..Default::default()
        }
    }

    pub fn failing(backend: StorageBackend) -> Self {
        Self {
            fail_uploads: true,
            ..Self::new(backend)
        }
    }

    pub fn calls(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
            + self.downloads.load(Ordering::SeqCst)
            + self.deletes.load(Ordering::SeqCst)
    }

    fn tag(&self) -> StorageBackend {
        self.backend.unwrap_or(StorageBackend::Cloudinary)
    }
}

#[async_trait]
impl Storage for MockStorage {
    async fn upload(
        &self,
        data: Bytes,
        filename: &str,
        file_type: FileType,
        options: &UploadOptions,
    ) -> StorageResult<UploadResult> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        if self.fail_uploads {
            return Err(StorageError::UploadFailed {
                backend: self.tag(),
                message: "connection reset".to_string(),
            });
        }

        let native_id = format!(
            "{}/{}_{}",
            file_type.key_prefix(),
            filename,
            options.request_id_or_anonymous()
        );
        self.objects
            .lock()
            .unwrap()
            .insert(native_id.clone(), data);

        let mut metadata = Metadata::new();
        metadata.insert("resource_type".into(), json!("image"));
        Ok(UploadResult {
            public_url: format!("https://cdn.test/{}", native_id),
            secure_url: Some(format!("https://cdn.test/{}", native_id)),
            native_id,
            metadata,
        })
    }

    async fn delete(&self, file: &UploadedFile) -> bool {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        match file.native_id_for(self.tag()) {
            Some(id) => self.objects.lock().unwrap().remove(id).is_some(),
            None => false,
        }
    }

    async fn get_url(&self, file: &UploadedFile, _options: &UrlOptions) -> String {
        file.best_url().to_string()
    }

    async fn download(&self, file: &UploadedFile) -> StorageResult<Bytes> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        if self.fail_downloads_for.as_deref() == Some(file.original_filename.as_str()) {
            return Err(StorageError::DownloadFailed("404 Not Found".to_string()));
        }
        file.native_id_for(self.tag())
            .and_then(|id| self.objects.lock().unwrap().get(id).cloned())
            .ok_or_else(|| StorageError::NotFound(file.id.to_string()))
    }

    fn backend_type(&self) -> StorageBackend {
        self.tag()
    }
}
