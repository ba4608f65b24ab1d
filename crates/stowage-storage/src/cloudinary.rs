//! Cloudinary-backed object storage.
//!
//! Talks to the upload API directly over HTTP with signed requests. Delivery
//! URLs with on-the-fly transformations are built locally.

use crate::keys::cloudinary_public_id;
use crate::traits::{Storage, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use stowage_core::{
    CloudinaryConfig, FileType, Metadata, StorageBackend, UploadOptions, UploadResult,
    UploadedFile, UrlOptions,
};

const DEFAULT_RESOURCE_TYPE: &str = "image";
const DEFAULT_CROP: &str = "fill";
const IMAGE_UPLOAD_TRANSFORMATION: &str = "q_auto:good/f_auto";

#[derive(Debug, Deserialize)]
struct UploadResponse {
    public_id: String,
    version: Option<u64>,
    width: Option<u64>,
    height: Option<u64>,
    format: Option<String>,
    resource_type: Option<String>,
    bytes: Option<u64>,
    url: Option<String>,
    secure_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Cloudinary storage implementation
#[derive(Clone)]
pub struct CloudinaryStorage {
    config: CloudinaryConfig,
    http_client: Client,
}

impl Debug for CloudinaryStorage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("CloudinaryStorage")
            .field("cloud_name", &self.config.cloud_name)
            .finish()
    }
}

impl CloudinaryStorage {
    pub fn new(config: CloudinaryConfig, http_client: Client) -> Self {
        Self {
            config,
            http_client,
        }
    }

    fn api_endpoint(&self, resource_type: &str, action: &str) -> String {
        format!(
            "{}/v1_1/{}/{}/{}",
            self.config.api_url.trim_end_matches('/'),
            self.config.cloud_name,
            resource_type,
            action
        )
    }

    /// Add `timestamp`, `api_key` and `signature` to a set of API params.
    fn signed_params(&self, mut params: BTreeMap<&'static str, String>) -> Vec<(&'static str, String)> {
        params.insert("timestamp", chrono::Utc::now().timestamp().to_string());
        let signature = sign(&params, &self.config.api_secret);

        let mut signed: Vec<(&'static str, String)> = params.into_iter().collect();
        signed.push(("api_key", self.config.api_key.clone()));
        signed.push(("signature", signature));
        signed.push(("signature_algorithm", "sha256".to_string()));
        signed
    }

    /// Delivery URL with transformation components for an image.
    ///
    /// Returns `None` when no option maps to a transformation.
    fn transformation_url(&self, public_id: &str, options: &UrlOptions) -> Option<String> {
        let components = transformation_components(options);
        if components.is_empty() {
            return None;
        }
        Some(format!(
            "{}/{}/image/upload/{}/{}",
            self.config.delivery_url.trim_end_matches('/'),
            self.config.cloud_name,
            components.join("/"),
            public_id
        ))
    }

    async fn error_message(response: reqwest::Response) -> String {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        match serde_json::from_str::<ErrorResponse>(&body) {
            Ok(parsed) => format!("{} - {}", status, parsed.error.message),
            Err(_) => format!("{} - {}", status, body),
        }
    }
}

/// Hex SHA-256 over `k1=v1&k2=v2...` (keys sorted) followed by the secret.
fn sign(params: &BTreeMap<&'static str, String>, secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(string_to_sign(params).as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

fn string_to_sign(params: &BTreeMap<&'static str, String>) -> String {
    params
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

fn transformation_components(options: &UrlOptions) -> Vec<String> {
    let mut components = Vec::new();

    if options.width.is_some() || options.height.is_some() {
        let mut size = vec![format!(
            "c_{}",
            options.crop.as_deref().unwrap_or(DEFAULT_CROP)
        )];
        if let Some(width) = options.width {
            size.push(format!("w_{}", width));
        }
        if let Some(height) = options.height {
            size.push(format!("h_{}", height));
        }
        components.push(size.join(","));
    }
    if let Some(ref quality) = options.quality {
        components.push(format!("q_{}", quality));
    }
    if let Some(ref format) = options.format {
        components.push(format!("f_{}", format));
    }

    components
}

#[async_trait]
impl Storage for CloudinaryStorage {
    async fn upload(
        &self,
        data: Bytes,
        filename: &str,
        file_type: FileType,
        options: &UploadOptions,
    ) -> StorageResult<UploadResult> {
        let public_id =
            cloudinary_public_id(file_type, filename, options.request_id_or_anonymous());
        let size = data.len() as u64;

        let mut params = BTreeMap::new();
        params.insert("public_id", public_id.clone());
        params.insert("unique_filename", "true".to_string());
        params.insert("overwrite", "false".to_string());
        if file_type == FileType::Image {
            params.insert("transformation", IMAGE_UPLOAD_TRANSFORMATION.to_string());
        }

        let mut form = Form::new();
        for (key, value) in self.signed_params(params) {
            form = form.text(key, value);
        }
        form = form.part(
            "file",
            Part::bytes(data.to_vec()).file_name(filename.to_string()),
        );

        let start = std::time::Instant::now();

        let response = self
            .http_client
            .post(self.api_endpoint("auto", "upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    public_id = %public_id,
                    size_bytes = size,
                    "Cloudinary upload request failed"
                );
                StorageError::upload(StorageBackend::Cloudinary, e.to_string())
            })?;

        if !response.status().is_success() {
            let message = Self::error_message(response).await;
            tracing::error!(
                error = %message,
                public_id = %public_id,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Cloudinary upload failed"
            );
            return Err(StorageError::upload(StorageBackend::Cloudinary, message));
        }

        let uploaded: UploadResponse = response.json().await.map_err(|e| {
            StorageError::upload(
                StorageBackend::Cloudinary,
                format!("Failed to parse upload response: {}", e),
            )
        })?;

        tracing::info!(
            public_id = %uploaded.public_id,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Cloudinary upload successful"
        );

        let mut metadata = Metadata::new();
        metadata.insert("cloudinary_version".into(), json!(uploaded.version));
        metadata.insert("width".into(), json!(uploaded.width));
        metadata.insert("height".into(), json!(uploaded.height));
        metadata.insert("format".into(), json!(uploaded.format));
        metadata.insert("resource_type".into(), json!(uploaded.resource_type));
        metadata.insert("bytes".into(), json!(uploaded.bytes));

        let secure_url = uploaded.secure_url.filter(|u| !u.is_empty());
        let public_url = secure_url
            .clone()
            .or_else(|| uploaded.url.filter(|u| !u.is_empty()))
            .unwrap_or_default();

        Ok(UploadResult {
            public_url,
            secure_url,
            native_id: uploaded.public_id,
            metadata,
        })
    }

    async fn delete(&self, file: &UploadedFile) -> bool {
        let Some(public_id) = file.cloudinary_public_id() else {
            tracing::debug!(file_id = %file.id, "No Cloudinary public id recorded, nothing to delete");
            return false;
        };
        let resource_type = file
            .metadata
            .get("resource_type")
            .and_then(|v| v.as_str())
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_RESOURCE_TYPE);

        let mut params = BTreeMap::new();
        params.insert("public_id", public_id.to_string());
        let start = std::time::Instant::now();

        let response = match self
            .http_client
            .post(self.api_endpoint(resource_type, "destroy"))
            .form(&self.signed_params(params))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, public_id = %public_id, "Cloudinary delete failed");
                return false;
            }
        };

        if !response.status().is_success() {
            let message = Self::error_message(response).await;
            tracing::warn!(error = %message, public_id = %public_id, "Cloudinary delete failed");
            return false;
        }

        match response.json::<DestroyResponse>().await {
            Ok(destroyed) if destroyed.result == "ok" => {
                tracing::info!(
                    public_id = %public_id,
                    resource_type = %resource_type,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Cloudinary delete successful"
                );
                true
            }
            Ok(destroyed) => {
                tracing::debug!(
                    public_id = %public_id,
                    result = %destroyed.result,
                    "Cloudinary reported nothing to delete"
                );
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, public_id = %public_id, "Cloudinary delete failed");
                false
            }
        }
    }

    async fn get_url(&self, file: &UploadedFile, options: &UrlOptions) -> String {
        if file.file_type == FileType::Image {
            if let Some(url) = file
                .cloudinary_public_id()
                .and_then(|public_id| self.transformation_url(public_id, options))
            {
                return url;
            }
        }
        file.best_url().to_string()
    }

    async fn download(&self, file: &UploadedFile) -> StorageResult<Bytes> {
        let url = file.best_url();
        let start = std::time::Instant::now();

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(StorageError::DownloadFailed(format!(
                "{} returned {}",
                url, status
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;

        tracing::info!(
            url = %url,
            size_bytes = bytes.len() as u64,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Cloudinary download successful"
        );

        Ok(bytes)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Cloudinary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> CloudinaryStorage {
        CloudinaryStorage::new(
            CloudinaryConfig {
                cloud_name: "demo".to_string(),
                api_key: "key".to_string(),
                api_secret: "secret".to_string(),
                api_url: "https://api.cloudinary.com/".to_string(),
                delivery_url: "https://res.cloudinary.com".to_string(),
            },
            Client::new(),
        )
    }

    #[test]
    fn string_to_sign_is_sorted_and_skips_empty_values() {
        let mut params = BTreeMap::new();
        params.insert("timestamp", "1700000000".to_string());
        params.insert("public_id", "images/cat_anonymous".to_string());
        params.insert("overwrite", "false".to_string());
        params.insert("transformation", String::new());

        assert_eq!(
            string_to_sign(&params),
            "overwrite=false&public_id=images/cat_anonymous&timestamp=1700000000"
        );
    }

    #[test]
    fn signature_depends_on_secret() {
        let mut params = BTreeMap::new();
        params.insert("public_id", "images/cat_anonymous".to_string());

        let a = sign(&params, "secret-a");
        let b = sign(&params, "secret-b");
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
    }

    #[test]
    fn api_endpoint_trims_trailing_slash() {
        assert_eq!(
            storage().api_endpoint("video", "destroy"),
            "https://api.cloudinary.com/v1_1/demo/video/destroy"
        );
    }

    #[test]
    fn transformation_defaults_crop_to_fill() {
        let options = UrlOptions {
            width: Some(200),
            quality: Some("auto".to_string()),
            ..Default::default()
        };
        assert_eq!(
            storage().transformation_url("images/cat_anonymous", &options),
            Some(
                "https://res.cloudinary.com/demo/image/upload/c_fill,w_200/q_auto/images/cat_anonymous"
                    .to_string()
            )
        );
    }

    #[test]
    fn transformation_with_explicit_crop_and_format() {
        let options = UrlOptions {
            width: Some(100),
            height: Some(50),
            crop: Some("thumb".to_string()),
            format: Some("webp".to_string()),
            ..Default::default()
        };
        assert_eq!(
            transformation_components(&options),
            vec!["c_thumb,w_100,h_50".to_string(), "f_webp".to_string()]
        );
    }

    #[test]
    fn no_transformation_for_expiry_only() {
        assert!(storage()
            .transformation_url("images/cat", &UrlOptions::expiring(60))
            .is_none());
    }
}
