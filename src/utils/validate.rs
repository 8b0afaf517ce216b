//! Input validation utilities for article identifiers, DOIs, URLs, and filenames.
//!
//! Identifiers end up in file names and request URLs, so anything that could
//! escape the output directory or smuggle control characters is rejected here.

use thiserror::Error;
use url::Url;

/// Validation error types
#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid DOI format: {0}")]
    InvalidDoi(String),

    #[error("Invalid filename: contains disallowed characters")]
    InvalidFilename,

    #[error("Path traversal detected: {0}")]
    PathTraversal(String),

    /// Names are always written inside the output directory
    #[error("File name must not contain a path separator: {0}")]
    PathSeparator(String),
}

/// Prefixes under which a DOI may be written, checked case-insensitively.
const DOI_PREFIXES: &[&str] = &[
    "doi:",
    "https://doi.org/",
    "http://doi.org/",
    "https://www.doi.org/",
    "http://www.doi.org/",
    "https://dx.doi.org/",
    "http://dx.doi.org/",
];

/// Check an already-trimmed identifier for characters that must never reach
/// a request or a file name.
pub fn sanitize_identifier(id: &str) -> Result<String, ValidationError> {
    let id = id.trim();

    if id.is_empty() {
        return Err(ValidationError::InvalidIdentifier("empty identifier".to_string()));
    }

    if id.contains("..") {
        return Err(ValidationError::PathTraversal(id.to_string()));
    }

    if id.contains('\0') {
        return Err(ValidationError::InvalidIdentifier(
            "contains null byte".to_string(),
        ));
    }

    if id.chars().any(|ch| ch.is_control()) {
        return Err(ValidationError::InvalidIdentifier(
            "contains control characters".to_string(),
        ));
    }

    Ok(id.to_string())
}

/// Strip any resolver prefix from a DOI and check its basic shape.
///
/// DOIs have the format "10.xxxx/xxxxxx" where xxxx is a registrant code
/// and xxxxxx is an item ID. Case is preserved.
pub fn validate_doi(doi: &str) -> Result<String, ValidationError> {
    let mut doi = doi.trim();

    if doi.is_empty() {
        return Err(ValidationError::InvalidDoi("empty DOI".to_string()));
    }

    for prefix in DOI_PREFIXES {
        if doi
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
        {
            doi = doi[prefix.len()..].trim_start();
            break;
        }
    }

    if !doi.starts_with("10.") {
        return Err(ValidationError::InvalidDoi(
            "DOI must start with '10.'".to_string(),
        ));
    }

    if !doi.contains('/') {
        return Err(ValidationError::InvalidDoi(
            "DOI must contain a slash".to_string(),
        ));
    }

    if doi.contains("..") {
        return Err(ValidationError::InvalidDoi(
            "path traversal detected".to_string(),
        ));
    }

    Ok(doi.to_string())
}

/// Whether the string looks like a bare or prefixed DOI.
pub fn looks_like_doi(value: &str) -> bool {
    validate_doi(value).is_ok()
}

/// Sanitize a filename to prevent path traversal and other attacks
///
/// Removes path separators and dangerous characters and limits length.
pub fn sanitize_filename(filename: &str) -> Result<String, ValidationError> {
    let filename = filename.trim();

    if filename.is_empty() {
        return Err(ValidationError::InvalidFilename);
    }

    if filename.contains("..")
        || filename.starts_with('/')
        || filename.starts_with('\\')
        || filename.contains(":/")
        || filename.contains(":\\")
    {
        return Err(ValidationError::PathTraversal(filename.to_string()));
    }

    if filename.contains(['/', '\\']) {
        return Err(ValidationError::PathSeparator(filename.to_string()));
    }

    // Keep only safe characters: alphanumeric, dash, underscore, dot, space
    let mut sanitized: String = filename
        .chars()
        .filter(|ch| ch.is_alphanumeric() || matches!(ch, '-' | '_' | '.' | ' '))
        .collect();

    const MAX_FILENAME_LENGTH: usize = 255;
    if sanitized.len() > MAX_FILENAME_LENGTH {
        let ext_pos = sanitized.rfind('.').unwrap_or(sanitized.len());
        let ext = sanitized.split_at(ext_pos).1.to_string();
        let mut base_len = MAX_FILENAME_LENGTH.saturating_sub(ext.len()).min(ext_pos);
        while !sanitized.is_char_boundary(base_len) {
            base_len -= 1;
        }
        sanitized = format!("{}{}", &sanitized[..base_len], ext);
    }

    if sanitized.is_empty() || sanitized.chars().all(|c| c == '.') {
        return Err(ValidationError::InvalidFilename);
    }

    Ok(sanitized)
}

/// Turn a DOI into a string usable as a file stem (`10.1000/a.b` -> `10.1000_a.b`).
pub fn doi_file_stem(doi: &str) -> String {
    let doi = validate_doi(doi).unwrap_or_else(|_| doi.trim().to_string());
    doi.chars()
        .map(|ch| {
            if ch.is_alphanumeric() || matches!(ch, '-' | '.') {
                ch
            } else {
                '_'
            }
        })
        .collect()
}

/// Make `href` absolute.
///
/// Absolute URLs pass through, protocol-relative ones (`//host/x`) take the
/// base scheme, and anything else is appended to the base's scheme+authority,
/// not to the base path.
pub fn rebase_url(href: &str, base: &Url) -> Result<Url, ValidationError> {
    let href = href.trim();

    if href.is_empty() {
        return Err(ValidationError::InvalidUrl("empty href".to_string()));
    }

    if let Ok(absolute) = Url::parse(href) {
        if absolute.has_host() {
            return Ok(absolute);
        }
    }

    let candidate = if href.starts_with("//") {
        format!("{}:{}", base.scheme(), href)
    } else {
        let origin = base.origin().ascii_serialization();
        if origin == "null" {
            return Err(ValidationError::InvalidUrl(format!(
                "cannot rebase against {}",
                base
            )));
        }
        if href.starts_with('/') {
            format!("{}{}", origin, href)
        } else {
            format!("{}/{}", origin, href)
        }
    };

    Url::parse(&candidate).map_err(|e| ValidationError::InvalidUrl(e.to_string()))
}
