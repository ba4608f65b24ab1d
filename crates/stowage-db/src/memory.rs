//! In-process catalog used by tools and tests that run without PostgreSQL.

use async_trait::async_trait;
use std::collections::HashMap;
use stowage_core::{AppError, NewUploadedFile, StorageBackend, UploadedFile};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::repository::CatalogRepository;

#[derive(Default)]
pub struct InMemoryCatalogRepository {
    files: RwLock<HashMap<Uuid, UploadedFile>>,
}

impl InMemoryCatalogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn is_empty(&self) -> bool {
        self.files.read().await.is_empty()
    }
}

#[async_trait]
impl CatalogRepository for InMemoryCatalogRepository {
    async fn create(&self, file: NewUploadedFile) -> Result<UploadedFile, AppError> {
        let file = file.into_uploaded_file();
        self.files.write().await.insert(file.id, file.clone());
        Ok(file)
    }

    async fn get(&self, id: Uuid) -> Result<Option<UploadedFile>, AppError> {
        Ok(self.files.read().await.get(&id).cloned())
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<UploadedFile>, AppError> {
        let mut files: Vec<UploadedFile> = self.files.read().await.values().cloned().collect();
        files.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(files
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn list_by_backend(
        &self,
        backend: StorageBackend,
    ) -> Result<Vec<UploadedFile>, AppError> {
        let mut files: Vec<UploadedFile> = self
            .files
            .read()
            .await
            .values()
            .filter(|f| f.storage_backend == backend)
            .cloned()
            .collect();
        files.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(files)
    }

    async fn update_location(&self, file: &UploadedFile) -> Result<(), AppError> {
        let mut files = self.files.write().await;
        let stored = files
            .get_mut(&file.id)
            .ok_or_else(|| AppError::NotFound(format!("Uploaded file {} not found", file.id)))?;

        stored.storage_backend = file.storage_backend;
        stored.native_id = file.native_id.clone();
        stored.public_url = file.public_url.clone();
        stored.secure_url = file.secure_url.clone();
        stored.metadata = file.metadata.clone();
        stored.updated_at = file.updated_at;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.files.write().await.remove(&id).is_some())
    }
}
