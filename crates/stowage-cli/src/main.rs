//! Stowage CLI: upload, inspect, resolve, delete and migrate catalogued files.
//!
//! Reads the same environment as the gateway (DATABASE_URL, STORAGE_BACKEND,
//! per-backend credentials).

use anyhow::Context;
use bytes::Bytes;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::sync::Arc;
use stowage_cli::{
    init_tracing, migration_lines, parse_backend, parse_file_type, setup_database, FileSummary,
};
use stowage_core::validation::validate_upload;
use stowage_core::{Config, FileType, StorageBackend, UrlOptions};
use stowage_db::PgCatalogRepository;
use stowage_services::{FileUploadService, MigrationRequest, StorageMigrator, StorageSelector};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "stowage", about = "File upload gateway CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file to the active storage backend
    Upload {
        /// Path to the file to upload
        file: std::path::PathBuf,
        /// File type: image, document, video, audio, other (detected when omitted)
        #[arg(long, value_parser = parse_file_type)]
        r#type: Option<FileType>,
        /// Correlation id recorded with the upload
        #[arg(long)]
        request_id: Option<String>,
    },
    /// Get a single catalog entry by ID
    Get {
        /// File UUID
        id: Uuid,
    },
    /// List catalog entries, newest first
    List {
        /// Maximum number of items
        #[arg(long, default_value = "20")]
        limit: i64,
        /// Offset for pagination
        #[arg(long, default_value = "0")]
        offset: i64,
    },
    /// Resolve an access URL, optionally transformed or pre-signed
    Url {
        /// File UUID
        id: Uuid,
        #[arg(long)]
        width: Option<u32>,
        #[arg(long)]
        height: Option<u32>,
        /// Crop mode (defaults to fill when a dimension is given)
        #[arg(long)]
        crop: Option<String>,
        #[arg(long)]
        quality: Option<String>,
        #[arg(long)]
        format: Option<String>,
        /// Lifetime of a pre-signed URL, in seconds
        #[arg(long)]
        expires_in: Option<u64>,
    },
    /// Delete a file from its backend and the catalog
    Delete {
        /// File UUID
        id: Uuid,
    },
    /// Move every file stored on one backend to another
    Migrate {
        #[arg(long, value_parser = parse_backend)]
        from_backend: StorageBackend,
        #[arg(long, value_parser = parse_backend)]
        to_backend: StorageBackend,
        /// List what would be migrated without moving anything
        #[arg(long)]
        dry_run: bool,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::debug!(
        environment = %config.environment,
        backend = %config.storage.backend,
        "Configuration loaded"
    );

    let pool = setup_database(&config).await?;
    let catalog = Arc::new(PgCatalogRepository::new(pool));
    let selector = Arc::new(StorageSelector::new(config.storage.clone()));
    let service = FileUploadService::new(catalog.clone(), selector.clone());

    match cli.command {
        Commands::Upload {
            file,
            r#type,
            request_id,
        } => {
            let filename = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| anyhow::anyhow!("{} is not a file", file.display()))?;
            let data = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;

            validate_upload(
                &filename,
                data.len(),
                config.max_file_size_bytes,
                &config.allowed_extensions,
            )?;

            let uploaded = service
                .upload_file(Bytes::from(data), &filename, r#type, request_id)
                .await?;
            print_json(&uploaded)?;
        }
        Commands::Get { id } => {
            let file = service.get_file(id).await?;
            print_json(&file)?;
        }
        Commands::List { limit, offset } => {
            let files = service.list_files(limit, offset).await?;
            let summaries: Vec<FileSummary> = files.iter().map(FileSummary::from).collect();
            print_json(&summaries)?;
        }
        Commands::Url {
            id,
            width,
            height,
            crop,
            quality,
            format,
            expires_in,
        } => {
            let options = UrlOptions {
                width,
                height,
                crop,
                quality,
                format,
                expires_in,
            };
            let url = service.get_file_url_by_id(id, &options).await?;
            print_json(&serde_json::json!({ "url": url }))?;
        }
        Commands::Delete { id } => {
            let removed = service.delete_file_by_id(id).await?;
            print_json(&serde_json::json!({
                "success": true,
                "storage_deleted": removed,
                "message": format!("File {} deleted", id),
            }))?;
        }
        Commands::Migrate {
            from_backend,
            to_backend,
            dry_run,
        } => {
            let migrator = StorageMigrator::new(catalog, selector);
            let report = migrator
                .migrate(MigrationRequest {
                    source: from_backend,
                    destination: to_backend,
                    dry_run,
                })
                .await?;
            for line in migration_lines(&report) {
                println!("{}", line);
            }
        }
    }

    Ok(())
}
