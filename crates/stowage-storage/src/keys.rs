//! Shared key generation for storage backends.
//!
//! Bucket and filesystem keys: `{fileType}s/{uuid}{ext}` with the original
//! extension kept verbatim. CDN public ids: `{fileType}s/{stem}_{requestId}`.
//! Keys never contain `..` or a leading `/`.

use stowage_core::file_type::{extension_lowercase, extension_verbatim, file_stem};
use stowage_core::FileType;
use uuid::Uuid;

/// Generate a collision-free key for bucket and filesystem backends.
///
/// The caller-supplied name contributes only its extension; the rest is a
/// fresh random component per upload.
pub fn generate_storage_key(file_type: FileType, filename: &str) -> String {
    format!(
        "{}/{}{}",
        file_type.key_prefix(),
        Uuid::new_v4(),
        extension_verbatim(filename)
    )
}

/// Public id requested from the CDN provider for an upload.
pub fn cloudinary_public_id(file_type: FileType, filename: &str, request_id: &str) -> String {
    format!(
        "{}/{}_{}",
        file_type.key_prefix(),
        file_stem(filename),
        request_id
    )
}

/// Content type for a filename, looked up from its lower-cased extension.
///
/// Deliberately a fixed table: unknown extensions are sent as generic binary.
pub fn content_type_for(filename: &str) -> &'static str {
    match extension_lowercase(filename).as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("pdf") => "application/pdf",
        Some("doc") => "application/msword",
        Some("docx") => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        Some("txt") => "text/plain",
        Some("csv") => "text/csv",
        _ => "application/octet-stream",
    }
}
