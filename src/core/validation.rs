//! Validation for file names, folder paths, and principals
//!
//! All request inputs pass through here before any component is touched,
//! so the components themselves can assume normalized, well-formed values.

use crate::error::{DepotError, Result};
use regex::Regex;

/// Pattern for a single file name or folder segment: no slashes, no control
/// characters, 1-255 bytes.
const NAME_PATTERN: &str = r"^[^/\x00-\x1F\x7F]{1,255}$";

/// Pattern for a principal identity: address-like token, starts with an
/// alphanumeric, then alphanumerics plus `. _ : @ -`, max 128 characters.
const PRINCIPAL_PATTERN: &str = r"^[A-Za-z0-9][A-Za-z0-9._:@-]{0,127}$";

/// Validate a file name.
///
/// File names are flat identifiers (the folder lives in a separate field),
/// so slashes are rejected outright.
///
/// # Examples
///
/// ```
/// use depot_rs::core::validation::validate_file_name;
///
/// assert!(validate_file_name("notes.txt").is_ok());
/// assert!(validate_file_name("").is_err());
/// assert!(validate_file_name("a/b.txt").is_err());
/// ```
pub fn validate_file_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(DepotError::InvalidFileName(
            "file name cannot be empty".to_string(),
        ));
    }
    if name == "." || name == ".." {
        return Err(DepotError::InvalidFileName(format!(
            "'{}' is not a valid file name",
            name
        )));
    }
    let re = Regex::new(NAME_PATTERN).unwrap();
    if !re.is_match(name) {
        return Err(DepotError::InvalidFileName(format!(
            "file name '{}' must be 1-255 characters with no slashes or control characters",
            name
        )));
    }
    Ok(())
}

/// Validate a principal identity string.
pub fn validate_principal(principal: &str) -> Result<()> {
    if principal.is_empty() {
        return Err(DepotError::InvalidPrincipal(
            "principal cannot be empty".to_string(),
        ));
    }
    let re = Regex::new(PRINCIPAL_PATTERN).unwrap();
    if !re.is_match(principal) {
        return Err(DepotError::InvalidPrincipal(format!(
            "principal '{}' must be an address-like token (alphanumeric plus . _ : @ -)",
            principal
        )));
    }
    Ok(())
}

/// Normalize a folder path to canonical form.
///
/// Canonical paths are slash-delimited, start and end with `/`, and the
/// root is `/`. Input may omit the leading or trailing slash; empty input
/// and `"/"` both mean the root.
///
/// # Examples
///
/// ```
/// use depot_rs::core::validation::normalize_folder_path;
///
/// assert_eq!(normalize_folder_path("").unwrap(), "/");
/// assert_eq!(normalize_folder_path("docs").unwrap(), "/docs/");
/// assert_eq!(normalize_folder_path("/docs/reports/").unwrap(), "/docs/reports/");
///
/// assert!(normalize_folder_path("/docs//reports/").is_err());
/// assert!(normalize_folder_path("/../etc/").is_err());
/// ```
pub fn normalize_folder_path(path: &str) -> Result<String> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        // Reject inputs like "//" that collapse to nothing but contained
        // an empty segment.
        if path.contains("//") {
            return Err(DepotError::InvalidFolderPath(format!(
                "folder path '{}' contains an empty segment",
                path
            )));
        }
        return Ok("/".to_string());
    }

    let re = Regex::new(NAME_PATTERN).unwrap();
    let mut canonical = String::with_capacity(trimmed.len() + 2);
    canonical.push('/');
    for segment in trimmed.split('/') {
        if segment.is_empty() {
            return Err(DepotError::InvalidFolderPath(format!(
                "folder path '{}' contains an empty segment",
                path
            )));
        }
        if segment == "." || segment == ".." {
            return Err(DepotError::InvalidFolderPath(format!(
                "folder path '{}' contains a relative segment",
                path
            )));
        }
        if !re.is_match(segment) {
            return Err(DepotError::InvalidFolderPath(format!(
                "folder segment '{}' must be 1-255 characters with no control characters",
                segment
            )));
        }
        canonical.push_str(segment);
        canonical.push('/');
    }
    Ok(canonical)
}

/// Parent of a canonical folder path, `None` for the root.
///
/// Input must already be canonical (as produced by [`normalize_folder_path`]).
pub fn parent_folder(path: &str) -> Option<String> {
    if path == "/" {
        return None;
    }
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) => Some("/".to_string()),
        Some(idx) => Some(format!("{}/", &trimmed[..idx])),
        None => None,
    }
}

/// Last segment of a canonical folder path, empty for the root.
pub fn folder_name(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_file_names() {
        assert!(validate_file_name("notes.txt").is_ok());
        assert!(validate_file_name("Report (final) v2.pdf").is_ok());
        assert!(validate_file_name("a").is_ok());
        assert!(validate_file_name(&"x".repeat(255)).is_ok());
    }

    #[test]
    fn test_invalid_file_names() {
        assert!(validate_file_name("").is_err());
        assert!(validate_file_name(".").is_err());
        assert!(validate_file_name("..").is_err());
        assert!(validate_file_name("a/b.txt").is_err());
        assert!(validate_file_name("bad\x00name").is_err());
        assert!(validate_file_name(&"x".repeat(256)).is_err());
    }

    #[test]
    fn test_valid_principals() {
        assert!(validate_principal("alice").is_ok());
        assert!(validate_principal("0x1a2b3c").is_ok());
        assert!(validate_principal("user@example.com").is_ok());
        assert!(validate_principal("svc:backup-runner").is_ok());
    }

    #[test]
    fn test_invalid_principals() {
        assert!(validate_principal("").is_err());
        assert!(validate_principal("-leading-dash").is_err());
        assert!(validate_principal("has space").is_err());
        assert!(validate_principal(&"p".repeat(200)).is_err());
    }

    #[test]
    fn test_normalize_folder_path() {
        assert_eq!(normalize_folder_path("").unwrap(), "/");
        assert_eq!(normalize_folder_path("/").unwrap(), "/");
        assert_eq!(normalize_folder_path("docs").unwrap(), "/docs/");
        assert_eq!(normalize_folder_path("/docs").unwrap(), "/docs/");
        assert_eq!(normalize_folder_path("docs/").unwrap(), "/docs/");
        assert_eq!(normalize_folder_path("/a/b/c/").unwrap(), "/a/b/c/");
    }

    #[test]
    fn test_normalize_rejects_malformed() {
        assert!(normalize_folder_path("//").is_err());
        assert!(normalize_folder_path("/a//b/").is_err());
        assert!(normalize_folder_path("/./").is_err());
        assert!(normalize_folder_path("/a/../b/").is_err());
        assert!(normalize_folder_path("/bad\x1fseg/").is_err());
    }

    #[test]
    fn test_parent_folder() {
        assert_eq!(parent_folder("/"), None);
        assert_eq!(parent_folder("/docs/"), Some("/".to_string()));
        assert_eq!(parent_folder("/docs/reports/"), Some("/docs/".to_string()));
    }

    #[test]
    fn test_folder_name() {
        assert_eq!(folder_name("/"), "");
        assert_eq!(folder_name("/docs/"), "docs");
        assert_eq!(folder_name("/docs/reports/"), "reports");
    }
}
