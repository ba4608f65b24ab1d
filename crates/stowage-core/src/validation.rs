//! Upload gatekeeping run by callers before they hand bytes to the gateway.

use crate::error::AppError;
use crate::file_type::extension_lowercase;

/// Reject empty files and files larger than `max_size` bytes.
pub fn validate_file_size(size: usize, max_size: usize) -> Result<(), AppError> {
    if size == 0 {
        return Err(AppError::InvalidInput("File is empty".to_string()));
    }
    if size > max_size {
        return Err(AppError::PayloadTooLarge(format!(
            "File size must be less than {}MB",
            max_size / (1024 * 1024)
        )));
    }
    Ok(())
}

/// Check the filename's extension against an allow-list of lower-case
/// extensions without the leading dot. Returns the normalized extension.
///
/// An empty allow-list accepts every extension.
pub fn validate_file_extension(filename: &str, allowed: &[String]) -> Result<String, AppError> {
    let ext = extension_lowercase(filename).unwrap_or_default();
    if allowed.is_empty() || allowed.iter().any(|a| a == &ext) {
        return Ok(ext);
    }
    Err(AppError::InvalidInput(format!(
        "File extension .{} is not allowed",
        ext
    )))
}

/// Both checks, in the order the upload endpoint applies them.
pub fn validate_upload(
    filename: &str,
    size: usize,
    max_size: usize,
    allowed_extensions: &[String],
) -> Result<(), AppError> {
    validate_file_size(size, max_size)?;
    validate_file_extension(filename, allowed_extensions)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed() -> Vec<String> {
        vec!["jpg".into(), "pdf".into(), "txt".into()]
    }

    #[test]
    fn size_limits() {
        assert!(validate_file_size(1, 10).is_ok());
        assert!(validate_file_size(10, 10).is_ok());
        assert!(matches!(
            validate_file_size(0, 10),
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            validate_file_size(11, 10),
            Err(AppError::PayloadTooLarge(_))
        ));
    }

    #[test]
    fn oversize_message_reports_megabytes() {
        let err = validate_file_size(11 * 1024 * 1024, 10 * 1024 * 1024).unwrap_err();
        assert!(err.to_string().contains("10MB"));
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        assert_eq!(
            validate_file_extension("Scan.PDF", &allowed()).unwrap(),
            "pdf"
        );
        assert!(validate_file_extension("movie.mp4", &allowed()).is_err());
        assert!(validate_file_extension("noext", &allowed()).is_err());
    }

    #[test]
    fn empty_allow_list_accepts_everything() {
        assert!(validate_file_extension("anything.xyz", &[]).is_ok());
    }

    #[test]
    fn validate_upload_checks_size_first() {
        let err = validate_upload("movie.mp4", 0, 10, &allowed()).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(ref m) if m.contains("empty")));
        assert!(validate_upload("notes.txt", 5, 10, &allowed()).is_ok());
    }
}
