use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use crate::error::AppError;

/// Storage backend types
///
/// Every concrete backend reports one of these tags, and every catalog entry
/// records the tag of the backend that currently owns its bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "storage_backend", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Cloudinary,
    S3,
    Local,
}

impl StorageBackend {
    pub const ALL: [StorageBackend; 3] = [
        StorageBackend::Cloudinary,
        StorageBackend::S3,
        StorageBackend::Local,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::Cloudinary => "cloudinary",
            StorageBackend::S3 => "s3",
            StorageBackend::Local => "local",
        }
    }
}

impl FromStr for StorageBackend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cloudinary" => Ok(StorageBackend::Cloudinary),
            "s3" => Ok(StorageBackend::S3),
            "local" => Ok(StorageBackend::Local),
            _ => Err(AppError::Configuration(format!(
                "Unsupported storage backend: {}",
                s
            ))),
        }
    }
}

impl Display for StorageBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_names_case_insensitively() {
        assert_eq!(
            "Cloudinary".parse::<StorageBackend>().unwrap(),
            StorageBackend::Cloudinary
        );
        assert_eq!(" s3 ".parse::<StorageBackend>().unwrap(), StorageBackend::S3);
        assert_eq!("LOCAL".parse::<StorageBackend>().unwrap(), StorageBackend::Local);
    }

    #[test]
    fn unknown_name_is_configuration_error() {
        let err = "gcs".parse::<StorageBackend>().unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
        assert!(err.to_string().contains("gcs"));
    }
}
