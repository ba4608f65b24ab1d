//! Moves catalog entries, and their bytes, from one backend to another.

use serde::Serialize;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::Arc;
use stowage_core::{AppError, StorageBackend, UploadOptions, UploadedFile};
use stowage_db::CatalogRepository;
use stowage_storage::{Storage, StorageSelector};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationRequest {
    pub source: StorageBackend,
    pub destination: StorageBackend,
    pub dry_run: bool,
}

/// Step at which a single entry failed to migrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationStage {
    Download,
    Upload,
    Catalog,
}

impl Display for MigrationStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(match self {
            MigrationStage::Download => "download",
            MigrationStage::Upload => "upload",
            MigrationStage::Catalog => "catalog",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MigrationStatus {
    WouldMigrate,
    Migrated,
    Failed { stage: MigrationStage, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationItem {
    pub file_id: Uuid,
    pub original_filename: String,
    #[serde(flatten)]
    pub status: MigrationStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub source: StorageBackend,
    pub destination: StorageBackend,
    pub dry_run: bool,
    pub migrated_count: usize,
    pub failed_count: usize,
    pub items: Vec<MigrationItem>,
}

impl MigrationReport {
    fn new(request: MigrationRequest) -> Self {
        Self {
            source: request.source,
            destination: request.destination,
            dry_run: request.dry_run,
            migrated_count: 0,
            failed_count: 0,
            items: Vec::new(),
        }
    }

    pub fn candidates(&self) -> usize {
        self.items.len()
    }

    fn push(&mut self, file: &UploadedFile, status: MigrationStatus) {
        match status {
            MigrationStatus::Migrated => self.migrated_count += 1,
            MigrationStatus::Failed { .. } => self.failed_count += 1,
            MigrationStatus::WouldMigrate => {}
        }
        self.items.push(MigrationItem {
            file_id: file.id,
            original_filename: file.original_filename.clone(),
            status,
        });
    }
}

/// Batch re-upload of every entry stored on one backend to another.
///
/// Source and destination are resolved by name and passed through the loop;
/// the selector's active backend is never touched, so concurrent uploads
/// keep going to whatever backend is active.
#[derive(Clone)]
pub struct StorageMigrator {
    catalog: Arc<dyn CatalogRepository>,
    selector: Arc<StorageSelector>,
}

impl StorageMigrator {
    pub fn new(catalog: Arc<dyn CatalogRepository>, selector: Arc<StorageSelector>) -> Self {
        Self { catalog, selector }
    }

    /// Run one migration batch.
    ///
    /// Entries are processed one at a time. A failing entry is recorded in
    /// the report and the batch carries on.
    #[tracing::instrument(skip(self), fields(
        migration.source = %request.source,
        migration.destination = %request.destination,
        migration.dry_run = request.dry_run
    ))]
    pub async fn migrate(&self, request: MigrationRequest) -> Result<MigrationReport, AppError> {
        if request.source == request.destination {
            return Err(AppError::InvalidInput(
                "Source and target backends cannot be the same".to_string(),
            ));
        }

        let candidates = self.catalog.list_by_backend(request.source).await?;
        let mut report = MigrationReport::new(request);

        tracing::info!(candidates = candidates.len(), "Starting storage migration");

        if request.dry_run {
            for file in &candidates {
                report.push(file, MigrationStatus::WouldMigrate);
            }
            return Ok(report);
        }

        if candidates.is_empty() {
            return Ok(report);
        }

        let source = self.selector.for_backend(request.source).await?;
        let destination = self.selector.for_backend(request.destination).await?;

        for file in &candidates {
            let status = match self
                .migrate_one(file, source.as_ref(), destination.as_ref())
                .await
            {
                Ok(()) => {
                    tracing::info!(file_id = %file.id, filename = %file.original_filename, "Migrated");
                    MigrationStatus::Migrated
                }
                Err((stage, reason)) => {
                    tracing::warn!(
                        file_id = %file.id,
                        filename = %file.original_filename,
                        stage = %stage,
                        error = %reason,
                        "Migration failed for file"
                    );
                    MigrationStatus::Failed { stage, reason }
                }
            };
            report.push(file, status);
        }

        tracing::info!(
            migrated = report.migrated_count,
            failed = report.failed_count,
            "Storage migration completed"
        );

        Ok(report)
    }

    async fn migrate_one(
        &self,
        file: &UploadedFile,
        source: &dyn Storage,
        destination: &dyn Storage,
    ) -> Result<(), (MigrationStage, String)> {
        let data = source
            .download(file)
            .await
            .map_err(|e| (MigrationStage::Download, e.to_string()))?;

        let result = destination
            .upload(
                data,
                &file.original_filename,
                file.file_type,
                &UploadOptions::with_request_id(file.request_id.clone()),
            )
            .await
            .map_err(|e| (MigrationStage::Upload, e.to_string()))?;

        let mut relocated = file.clone();
        relocated.relocate(destination.backend_type(), result);

        self.catalog
            .update_location(&relocated)
            .await
            .map_err(|e| (MigrationStage::Catalog, e.to_string()))
    }
}
