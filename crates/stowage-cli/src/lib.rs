use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::path::Path;
use std::time::Duration;
use stowage_core::{Config, FileType, StorageBackend, UploadedFile};
use stowage_services::{MigrationReport, MigrationStage, MigrationStatus};
use uuid::Uuid;

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

/// Setup database connection pool and run migrations
pub async fn setup_database(config: &Config) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_timeout_seconds))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!(
        max_connections = config.db_max_connections,
        "Database connected successfully"
    );

    // Path: workspace migrations/ from crate root
    let migrations_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../migrations");
    let migrator = sqlx::migrate::Migrator::new(migrations_dir)
        .await
        .context("Failed to load migrations")?;
    migrator
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    Ok(pool)
}

/// Clap value parser for backend names.
pub fn parse_backend(s: &str) -> Result<StorageBackend, String> {
    s.parse::<StorageBackend>().map_err(|e| e.to_string())
}

/// Clap value parser for file types.
pub fn parse_file_type(s: &str) -> Result<FileType, String> {
    s.parse::<FileType>().map_err(|e| e.to_string())
}

/// One row of `stowage list`.
#[derive(Debug, Serialize)]
pub struct FileSummary {
    pub id: Uuid,
    pub original_filename: String,
    pub file_type: FileType,
    pub storage_backend: StorageBackend,
    pub size: String,
    pub public_url: String,
    pub created_at: DateTime<Utc>,
}

impl From<&UploadedFile> for FileSummary {
    fn from(file: &UploadedFile) -> Self {
        Self {
            id: file.id,
            original_filename: file.original_filename.clone(),
            file_type: file.file_type,
            storage_backend: file.storage_backend,
            size: file.file_size_mb(),
            public_url: file.public_url.clone(),
            created_at: file.created_at,
        }
    }
}

/// Human-readable transcript of a migration run.
pub fn migration_lines(report: &MigrationReport) -> Vec<String> {
    if report.items.is_empty() {
        return vec![format!("No files found for backend: {}", report.source)];
    }

    let mut lines = vec![format!(
        "Found {} files to migrate from {} to {}",
        report.candidates(),
        report.source,
        report.destination
    )];

    if report.dry_run {
        lines.push("DRY RUN - No files will be migrated".to_string());
    }

    for item in &report.items {
        lines.push(match &item.status {
            MigrationStatus::WouldMigrate => format!("Would migrate: {}", item.original_filename),
            MigrationStatus::Migrated => format!("Migrated: {}", item.original_filename),
            MigrationStatus::Failed {
                stage: MigrationStage::Download,
                ..
            } => format!("Failed to download: {}", item.original_filename),
            MigrationStatus::Failed { reason, .. } => {
                format!("Migration failed for {}: {}", item.original_filename, reason)
            }
        });
    }

    if !report.dry_run {
        lines.push(format!(
            "Migration completed: {} succeeded, {} failed",
            report.migrated_count, report.failed_count
        ));
    }

    lines
}
