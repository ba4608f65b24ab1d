use crate::keys::{content_type_for, generate_storage_key};
use crate::traits::{Storage, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use http::Method;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path;
use object_store::signer::Signer;
use object_store::Error as ObjectStoreError;
use object_store::{
    Attribute, Attributes, ObjectStore, ObjectStoreExt, PutOptions, PutPayload,
    Result as ObjectResult,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use stowage_core::{
    FileType, Metadata, StorageBackend, UploadOptions, UploadResult, UploadedFile, UrlOptions,
};

/// S3 storage implementation
#[derive(Clone)]
pub struct S3Storage {
    store: Arc<dyn ObjectStore>,
    signer: Option<Arc<dyn Signer>>,
    bucket: String,
    region: String,
    endpoint_url: Option<String>, // Custom endpoint for S3-compatible providers
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    ///
    /// Credentials come from the standard AWS environment variables.
    pub fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
    ) -> StorageResult<Self> {
        Self::from_builder(AmazonS3Builder::from_env(), bucket, region, endpoint_url)
    }

    fn from_builder(
        builder: AmazonS3Builder,
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
    ) -> StorageResult<Self> {
        let mut builder = builder
            .with_region(region.clone())
            .with_bucket_name(bucket.clone());

        if let Some(ref endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = Arc::new(
            builder
                .build()
                .map_err(|e| StorageError::ConfigError(e.to_string()))?,
        );

        Ok(S3Storage {
            store: store.clone(),
            signer: Some(store),
            bucket,
            region,
            endpoint_url,
        })
    }

    /// Build on top of an arbitrary object store. No signer is attached, so
    /// expiring URLs fall back to the stored public URL.
    pub fn with_store(
        store: Arc<dyn ObjectStore>,
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
    ) -> Self {
        S3Storage {
            store,
            signer: None,
            bucket,
            region,
            endpoint_url,
        }
    }

    /// Generate public URL for S3 object
    ///
    /// For AWS S3: https://{bucket}.s3.{region}.amazonaws.com/{key}
    /// For S3-compatible providers (path-style): {endpoint}/{bucket}/{key}
    fn generate_url(&self, key: &str) -> String {
        if let Some(ref endpoint) = self.endpoint_url {
            let base_url = endpoint.trim_end_matches('/');
            format!("{}/{}/{}", base_url, self.bucket, key)
        } else {
            format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket, self.region, key
            )
        }
    }

    fn object_attributes(filename: &str, file_type: FileType, uploaded_by: &str) -> Attributes {
        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type_for(filename).into());
        attributes.insert(
            Attribute::Metadata("original-filename".into()),
            filename.to_string().into(),
        );
        attributes.insert(
            Attribute::Metadata("file-type".into()),
            file_type.as_str().into(),
        );
        attributes.insert(
            Attribute::Metadata("uploaded-by".into()),
            uploaded_by.to_string().into(),
        );
        attributes
    }

    async fn presigned_url(&self, key: &str, expires_in: Duration) -> StorageResult<String> {
        let signer = self.signer.as_ref().ok_or_else(|| {
            StorageError::BackendError("object store does not support URL signing".to_string())
        })?;
        let location = Path::from(key.to_string());

        let url_result: ObjectResult<_> =
            signer.signed_url(Method::GET, &location, expires_in).await;

        let url = url_result
            .map_err(|e| StorageError::BackendError(e.to_string()))?
            .to_string();

        Ok(url)
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn upload(
        &self,
        data: Bytes,
        filename: &str,
        file_type: FileType,
        options: &UploadOptions,
    ) -> StorageResult<UploadResult> {
        let key = generate_storage_key(file_type, filename);
        let size = data.len() as u64;
        let location = Path::from(key.clone());
        let put_options = PutOptions {
            attributes: Self::object_attributes(
                filename,
                file_type,
                options.request_id_or_anonymous(),
            ),
            ..Default::default()
        };

        let start = std::time::Instant::now();

        let result: ObjectResult<_> = self
            .store
            .put_opts(&location, PutPayload::from(data), put_options)
            .await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 upload failed"
            );
            StorageError::upload(StorageBackend::S3, e.to_string())
        })?;

        let url = self.generate_url(&key);

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        let mut metadata = Metadata::new();
        metadata.insert("bucket".into(), json!(self.bucket));
        metadata.insert("region".into(), json!(self.region));
        metadata.insert("s3_key".into(), json!(key));

        Ok(UploadResult {
            public_url: url.clone(),
            secure_url: Some(url),
            native_id: key,
            metadata,
        })
    }

    async fn delete(&self, file: &UploadedFile) -> bool {
        let Some(key) = file.s3_key() else {
            tracing::debug!(file_id = %file.id, "No S3 key recorded, nothing to delete");
            return false;
        };
        let start = std::time::Instant::now();
        let location = Path::from(key.to_string());

        match self.store.head(&location).await {
            Ok(_) => {}
            Err(ObjectStoreError::NotFound { .. }) => {
                tracing::debug!(bucket = %self.bucket, key = %key, "S3 object already absent");
                return false;
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    "S3 delete failed"
                );
                return false;
            }
        }

        let result: ObjectResult<_> = self.store.delete(&location).await;

        if let Err(e) = result {
            tracing::warn!(
                error = %e,
                bucket = %self.bucket,
                key = %key,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 delete failed"
            );
            return false;
        }

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );

        true
    }

    async fn get_url(&self, file: &UploadedFile, options: &UrlOptions) -> String {
        let (Some(key), Some(expires_in)) = (file.s3_key(), options.expires_in) else {
            return file.public_url.clone();
        };

        match self
            .presigned_url(key, Duration::from_secs(expires_in))
            .await
        {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    "Failed to generate presigned URL, using public URL"
                );
                file.public_url.clone()
            }
        }
    }

    async fn download(&self, file: &UploadedFile) -> StorageResult<Bytes> {
        let key = file
            .s3_key()
            .ok_or_else(|| StorageError::NotFound(format!("file {} has no S3 key", file.id)))?;
        let start = std::time::Instant::now();
        let location = Path::from(key.to_string());

        let result: ObjectResult<_> = self.store.get(&location).await;

        let result = result.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(key.to_string()),
            other => {
                tracing::error!(
                    error = %other,
                    bucket = %self.bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 download failed"
                );
                StorageError::DownloadFailed(other.to_string())
            }
        })?;

        let bytes = result
            .bytes()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = bytes.len() as u64,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 download successful"
        );

        Ok(bytes)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
