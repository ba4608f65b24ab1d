//! Configuration module
//!
//! Gateway configuration is read from the environment (a `.env` file is
//! honoured). Per-backend settings are only checked when a backend is
//! actually constructed, so a half-configured backend that is never selected
//! does not prevent startup.

use std::env;

use crate::storage_types::StorageBackend;

const DEFAULT_STORAGE_BACKEND: &str = "cloudinary";
const DB_MAX_CONNECTIONS: u32 = 10;
const DB_TIMEOUT_SECS: u64 = 30;
const MAX_FILE_SIZE_MB: usize = 10;
const DEFAULT_S3_REGION: &str = "us-east-1";
const DEFAULT_CLOUDINARY_API_URL: &str = "https://api.cloudinary.com";
const DEFAULT_CLOUDINARY_DELIVERY_URL: &str = "https://res.cloudinary.com";
const DEFAULT_LOCAL_STORAGE_PATH: &str = "media";
const DEFAULT_LOCAL_STORAGE_BASE_URL: &str = "/media/";
const DEFAULT_ALLOWED_EXTENSIONS: &str = "jpg,jpeg,png,gif,webp,bmp,svg,pdf,doc,docx,txt,csv,xls,xlsx";

/// Credentials and endpoints for the CDN-backed object store.
#[derive(Clone, Debug)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    /// Upload/admin API root.
    pub api_url: String,
    /// Delivery root used to build transformation URLs.
    pub delivery_url: String,
}

#[derive(Clone, Debug)]
pub struct S3Config {
    pub bucket: Option<String>,
    pub region: String,
    pub endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO, etc.)
}

#[derive(Clone, Debug)]
pub struct LocalStorageConfig {
    pub path: String,
    pub base_url: String,
}

/// Storage selection and per-backend settings.
#[derive(Clone, Debug)]
pub struct StorageConfig {
    /// Symbolic name of the active backend. Kept raw: an unsupported name is
    /// reported when a backend is selected, not when configuration loads.
    pub backend: String,
    pub cloudinary: Option<CloudinaryConfig>,
    pub s3: S3Config,
    pub local: LocalStorageConfig,
}

impl StorageConfig {
    /// Configuration with only the local backend usable; handy for tools and tests.
    pub fn local(path: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            backend: StorageBackend::Local.to_string(),
            cloudinary: None,
            s3: S3Config {
                bucket: None,
                region: DEFAULT_S3_REGION.to_string(),
                endpoint: None,
            },
            local: LocalStorageConfig {
                path: path.into(),
                base_url: base_url.into(),
            },
        }
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub environment: String,
    pub storage: StorageConfig,
    pub max_file_size_bytes: usize,
    /// Lower-case extensions without the leading dot.
    pub allowed_extensions: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        let config = Self::from_vars(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_vars<F>(var: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        let environment = non_empty("ENVIRONMENT")
            .or_else(|| non_empty("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let database_url = non_empty("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set"))?;

        let max_file_size_mb = non_empty("MAX_FILE_SIZE_MB")
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(MAX_FILE_SIZE_MB);
        let max_file_size_bytes = max_file_size_mb
            .checked_mul(1024 * 1024)
            .ok_or_else(|| anyhow::anyhow!("MAX_FILE_SIZE_MB is too large: {}", max_file_size_mb))?;

        let allowed_extensions = non_empty("ALLOWED_EXTENSIONS")
            .unwrap_or_else(|| DEFAULT_ALLOWED_EXTENSIONS.to_string())
            .split(',')
            .map(|s| s.trim().trim_start_matches('.').to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        let cloudinary = match (
            non_empty("CLOUDINARY_CLOUD_NAME"),
            non_empty("CLOUDINARY_API_KEY"),
            non_empty("CLOUDINARY_API_SECRET"),
        ) {
            (Some(cloud_name), Some(api_key), Some(api_secret)) => {
                Some((cloud_name, api_key, api_secret))
            }
            _ => non_empty("CLOUDINARY_URL").and_then(|url| parse_cloudinary_url(&url)),
        }
        .map(|(cloud_name, api_key, api_secret)| CloudinaryConfig {
            cloud_name,
            api_key,
            api_secret,
            api_url: non_empty("CLOUDINARY_API_URL")
                .unwrap_or_else(|| DEFAULT_CLOUDINARY_API_URL.to_string()),
            delivery_url: non_empty("CLOUDINARY_DELIVERY_URL")
                .unwrap_or_else(|| DEFAULT_CLOUDINARY_DELIVERY_URL.to_string()),
        });

        let storage = StorageConfig {
            backend: non_empty("STORAGE_BACKEND")
                .unwrap_or_else(|| DEFAULT_STORAGE_BACKEND.to_string())
                .trim()
                .to_lowercase(),
            cloudinary,
            s3: S3Config {
                bucket: non_empty("S3_BUCKET"),
                region: non_empty("S3_REGION")
                    .or_else(|| non_empty("AWS_REGION"))
                    .unwrap_or_else(|| DEFAULT_S3_REGION.to_string()),
                endpoint: non_empty("S3_ENDPOINT"),
            },
            local: LocalStorageConfig {
                path: non_empty("LOCAL_STORAGE_PATH")
                    .unwrap_or_else(|| DEFAULT_LOCAL_STORAGE_PATH.to_string()),
                base_url: non_empty("LOCAL_STORAGE_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_LOCAL_STORAGE_BASE_URL.to_string()),
            },
        };

        Ok(Config {
            database_url,
            db_max_connections: non_empty("DB_MAX_CONNECTIONS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(DB_MAX_CONNECTIONS),
            db_timeout_seconds: non_empty("DB_TIMEOUT_SECONDS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(DB_TIMEOUT_SECS),
            environment,
            storage,
            max_file_size_bytes,
            allowed_extensions,
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.database_url.starts_with("postgres://")
            && !self.database_url.starts_with("postgresql://")
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        if self.max_file_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_FILE_SIZE_MB must be greater than 0"));
        }

        Ok(())
    }
}

/// Split `cloudinary://<api_key>:<api_secret>@<cloud_name>` into its parts.
fn parse_cloudinary_url(url: &str) -> Option<(String, String, String)> {
    let rest = url.trim().strip_prefix("cloudinary://")?;
    let (credentials, cloud_name) = rest.rsplit_once('@')?;
    let (api_key, api_secret) = credentials.split_once(':')?;
    if cloud_name.is_empty() || api_key.is_empty() || api_secret.is_empty() {
        return None;
    }
    Some((
        cloud_name.trim_end_matches('/').to_string(),
        api_key.to_string(),
        api_secret.to_string(),
    ))
}
