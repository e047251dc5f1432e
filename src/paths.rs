//! Syntactic validation of server-local Windows PDF paths.
//!
//! The backend runs on Windows and accepts jobs for files already on its
//! disk. Users type those paths by hand, so the cheap syntactic checks run
//! here first — a path that cannot possibly be valid never reaches the
//! network. The backend still has the final word via `/validate-pdf-path/`
//! (the file must actually exist over there).

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::TranslateError;

/// Absolute Windows path to a `.pdf` file: drive letter, backslash
/// separators, no characters Windows forbids in file names.
static WINDOWS_PDF_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^[A-Za-z]:\\(?:[^\\/:*?"<>|\r\n]+\\)*[^\\/:*?"<>|\r\n]+\.(?i:pdf)$"#).unwrap()
});

/// Validate `path` as an absolute Windows path to a `.pdf` file.
///
/// Checks run cheapest-first so the error names the most specific problem:
/// empty input, wrong extension, missing drive prefix, forbidden characters.
pub fn validate_windows_pdf_path(path: &str) -> Result<(), TranslateError> {
    let invalid = |reason: &str| TranslateError::InvalidPath {
        path: path.to_string(),
        reason: reason.to_string(),
    };

    if path.trim().is_empty() {
        return Err(invalid("path is empty"));
    }
    if !path.to_ascii_lowercase().ends_with(".pdf") {
        return Err(invalid("path must point to a .pdf file"));
    }

    let bytes = path.as_bytes();
    let has_drive_prefix =
        bytes.len() > 3 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' && bytes[2] == b'\\';
    if !has_drive_prefix {
        return Err(invalid(
            "must be an absolute Windows path with a drive letter, e.g. C:\\docs\\report.pdf",
        ));
    }

    if !WINDOWS_PDF_PATH.is_match(path) {
        return Err(invalid(
            r#"contains characters Windows forbids in file names (\ / : * ? " < > |)"#,
        ));
    }

    Ok(())
}

/// The file name component of a backslash-separated path.
///
/// Fallback for when the backend's validation response carries no filename.
/// Tolerates forward slashes too, since backend-reported storage paths use
/// them.
pub fn filename_from_path(path: &str) -> &str {
    path.rsplit(['\\', '/']).next().unwrap_or(path)
}
