//! File classification by extension.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp", "svg"];
const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "doc", "docx", "txt", "csv", "xls", "xlsx"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mkv", "mov", "wmv", "flv"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "flac", "aac", "ogg"];

/// Coarse file category recorded on every catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "file_type", rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Image,
    Document,
    Video,
    Audio,
    Other,
}

impl FileType {
    /// Classify a filename by its extension (case-insensitive).
    ///
    /// Total: a missing or unknown extension maps to [`FileType::Other`].
    pub fn from_filename(filename: &str) -> Self {
        let ext = match extension_lowercase(filename) {
            Some(ext) => ext,
            None => return FileType::Other,
        };
        let ext = ext.as_str();

        if IMAGE_EXTENSIONS.contains(&ext) {
            FileType::Image
        } else if DOCUMENT_EXTENSIONS.contains(&ext) {
            FileType::Document
        } else if VIDEO_EXTENSIONS.contains(&ext) {
            FileType::Video
        } else if AUDIO_EXTENSIONS.contains(&ext) {
            FileType::Audio
        } else {
            FileType::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Image => "image",
            FileType::Document => "document",
            FileType::Video => "video",
            FileType::Audio => "audio",
            FileType::Other => "other",
        }
    }

    /// Directory-style namespace used in storage keys, e.g. `images`.
    pub fn key_prefix(&self) -> String {
        format!("{}s", self.as_str())
    }
}

impl Display for FileType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "image" => Ok(FileType::Image),
            "document" => Ok(FileType::Document),
            "video" => Ok(FileType::Video),
            "audio" => Ok(FileType::Audio),
            "other" => Ok(FileType::Other),
            _ => Err(AppError::InvalidInput(format!(
                "Invalid file type '{}'. Must be one of: image, document, video, audio, other",
                s
            ))),
        }
    }
}

/// Extension of `filename` including the leading dot, exactly as supplied.
///
/// Returns an empty string when the name has no extension.
pub fn extension_verbatim(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default()
}

/// Lower-cased extension of `filename` without the leading dot.
pub fn extension_lowercase(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// Filename without its extension, case preserved.
pub fn file_stem(filename: &str) -> String {
    Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_one_type_per_category() {
        assert_eq!(FileType::from_filename("a.jpg"), FileType::Image);
        assert_eq!(FileType::from_filename("a.pdf"), FileType::Document);
        assert_eq!(FileType::from_filename("a.mp4"), FileType::Video);
        assert_eq!(FileType::from_filename("a.mp3"), FileType::Audio);
        assert_eq!(FileType::from_filename("a.xyz"), FileType::Other);
    }

    #[test]
    fn detection_ignores_extension_case() {
        assert_eq!(FileType::from_filename("PHOTO.JPEG"), FileType::Image);
        assert_eq!(FileType::from_filename("Report.Docx"), FileType::Document);
    }

    #[test]
    fn detection_is_total_for_odd_names() {
        assert_eq!(FileType::from_filename(""), FileType::Other);
        assert_eq!(FileType::from_filename("Makefile"), FileType::Other);
        assert_eq!(FileType::from_filename(".bashrc"), FileType::Other);
        assert_eq!(FileType::from_filename("archive.tar.gz"), FileType::Other);
        assert_eq!(FileType::from_filename("notes.txt"), FileType::Document);
    }

    #[test]
    fn extension_helpers() {
        assert_eq!(extension_verbatim("Photo.JPG"), ".JPG");
        assert_eq!(extension_verbatim("README"), "");
        assert_eq!(extension_lowercase("Photo.JPG").as_deref(), Some("jpg"));
        assert_eq!(file_stem("My Photo.JPG"), "My Photo");
    }

    #[test]
    fn key_prefix_is_plural() {
        assert_eq!(FileType::Image.key_prefix(), "images");
        assert_eq!(FileType::Other.key_prefix(), "others");
    }

    #[test]
    fn parse_rejects_unknown_type() {
        assert_eq!("Video".parse::<FileType>().unwrap(), FileType::Video);
        assert!(matches!(
            "spreadsheet".parse::<FileType>(),
            Err(AppError::InvalidInput(_))
        ));
    }
}
