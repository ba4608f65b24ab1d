//! Catalog entry model: one record per uploaded object.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use uuid::Uuid;

use crate::file_type::FileType;
use crate::storage_types::StorageBackend;

/// Open-ended, backend-reported attributes (dimensions, bucket, region...).
pub type Metadata = Map<String, JsonValue>;

/// Durable record describing an uploaded file and where its bytes live.
///
/// The backend-native locator is held as a single `native_id` tied to
/// `storage_backend`; the per-backend accessors below return it only for the
/// matching backend, so at most one of them is ever populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub id: Uuid,
    pub request_id: Option<String>,
    pub original_filename: String,
    pub file_type: FileType,
    pub file_size: i64,
    pub storage_backend: StorageBackend,
    pub native_id: Option<String>,
    pub public_url: String,
    pub secure_url: Option<String>,
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UploadedFile {
    /// Native id for `backend`, if this entry is stored there.
    pub fn native_id_for(&self, backend: StorageBackend) -> Option<&str> {
        if self.storage_backend == backend {
            self.native_id.as_deref().filter(|id| !id.is_empty())
        } else {
            None
        }
    }

    pub fn cloudinary_public_id(&self) -> Option<&str> {
        self.native_id_for(StorageBackend::Cloudinary)
    }

    pub fn s3_key(&self) -> Option<&str> {
        self.native_id_for(StorageBackend::S3)
    }

    pub fn local_path(&self) -> Option<&str> {
        self.native_id_for(StorageBackend::Local)
    }

    /// Best URL known without contacting storage: secure first, then public.
    pub fn best_url(&self) -> &str {
        self.secure_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .unwrap_or(&self.public_url)
    }

    pub fn file_size_mb(&self) -> String {
        format!("{:.2} MB", self.file_size as f64 / (1024.0 * 1024.0))
    }

    /// Repoint this entry at a new backend after a re-upload.
    ///
    /// Sets the backend tag and the new native id (dropping the old one),
    /// overwrites both URLs and merges the new metadata over the old.
    pub fn relocate(&mut self, backend: StorageBackend, result: UploadResult) {
        self.storage_backend = backend;
        self.native_id = Some(result.native_id);
        self.public_url = result.public_url;
        self.secure_url = result.secure_url;
        self.metadata.extend(result.metadata);
        self.updated_at = Utc::now();
    }
}

/// Fields needed to create a catalog entry after a successful backend upload.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUploadedFile {
    pub request_id: Option<String>,
    pub original_filename: String,
    pub file_type: FileType,
    pub file_size: i64,
    pub storage_backend: StorageBackend,
    pub native_id: String,
    pub public_url: String,
    pub secure_url: Option<String>,
    pub metadata: Metadata,
}

impl NewUploadedFile {
    /// Map a backend result onto a new entry for the backend that produced it.
    pub fn from_upload(
        backend: StorageBackend,
        original_filename: impl Into<String>,
        file_type: FileType,
        file_size: i64,
        request_id: Option<String>,
        result: UploadResult,
    ) -> Self {
        Self {
            request_id,
            original_filename: original_filename.into(),
            file_type,
            file_size,
            storage_backend: backend,
            native_id: result.native_id,
            public_url: result.public_url,
            secure_url: result.secure_url,
            metadata: result.metadata,
        }
    }

    /// Materialize the entry with a fresh id and timestamps.
    pub fn into_uploaded_file(self) -> UploadedFile {
        let now = Utc::now();
        UploadedFile {
            id: Uuid::new_v4(),
            request_id: self.request_id,
            original_filename: self.original_filename,
            file_type: self.file_type,
            file_size: self.file_size,
            storage_backend: self.storage_backend,
            native_id: Some(self.native_id),
            public_url: self.public_url,
            secure_url: self.secure_url,
            metadata: self.metadata,
            created_at: now,
            updated_at: now,
        }
    }
}

/// What a backend reports after storing bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResult {
    pub public_url: String,
    pub secure_url: Option<String>,
    pub native_id: String,
    pub metadata: Metadata,
}

/// Per-call upload options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadOptions {
    pub request_id: Option<String>,
}

impl UploadOptions {
    pub fn with_request_id(request_id: Option<String>) -> Self {
        Self { request_id }
    }

    /// Request id as recorded in storage namespaces and object metadata.
    pub fn request_id_or_anonymous(&self) -> &str {
        self.request_id
            .as_deref()
            .filter(|r| !r.is_empty())
            .unwrap_or("anonymous")
    }
}

/// Options for URL resolution. Each backend honours the subset it supports
/// and ignores the rest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlOptions {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub crop: Option<String>,
    pub quality: Option<String>,
    pub format: Option<String>,
    /// Lifetime of a pre-signed URL, in seconds.
    pub expires_in: Option<u64>,
}

impl UrlOptions {
    pub fn expiring(expires_in: u64) -> Self {
        Self {
            expires_in: Some(expires_in),
            ..Default::default()
        }
    }
}
