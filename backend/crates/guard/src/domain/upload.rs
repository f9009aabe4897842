//! Upload validation
//!
//! Size, filename and extension checks, content sniffing against the
//! declared extension, and a scan of the leading bytes for interpreter or
//! script markers.

use crate::error::{GuardError, GuardResult, UploadRejection, ViolationKind};

use super::signatures::SignatureRegistry;

/// One uploaded file, fully buffered
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Multipart field name
    pub field: String,
    pub filename: String,
    /// Content type declared by the client
    pub declared_type: Option<String>,
    pub data: Vec<u8>,
}

/// Limits applied to every upload
#[derive(Debug, Clone)]
pub struct UploadPolicy<'a> {
    pub max_file_bytes: usize,
    pub max_filename_len: usize,
    pub content_scan_bytes: usize,
    pub blocked_extensions: &'a [String],
}

/// Outcome of a successful validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReport {
    pub extension: String,
    pub sniffed_type: Option<&'static str>,
    /// Whether the sniffed type agrees with the extension
    pub type_matches: bool,
}

/// Content types we recognise, with the extensions each may carry
const KNOWN_TYPES: [(&str, &[&str]); 8] = [
    ("image/jpeg", &["jpg", "jpeg"]),
    ("image/png", &["png"]),
    ("image/gif", &["gif"]),
    ("image/webp", &["webp"]),
    ("application/pdf", &["pdf"]),
    ("text/plain", &["txt"]),
    ("application/json", &["json"]),
    ("text/csv", &["csv"]),
];

/// Lowercase extension of `filename`, empty if there is none
pub fn extension_of(filename: &str) -> String {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_ascii_lowercase(),
        _ => String::new(),
    }
}

/// Best-effort content type from magic bytes
///
/// Text formats are told apart by their extension once the content is
/// known to be UTF-8 without NUL bytes.
pub fn sniff_content_type(data: &[u8], extension: &str) -> Option<&'static str> {
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("image/jpeg");
    }
    if data.starts_with(b"\x89PNG\r\n\x1a\n") {
        return Some("image/png");
    }
    if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        return Some("image/gif");
    }
    if data.len() >= 12 && &data[..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        return Some("image/webp");
    }
    if data.starts_with(b"%PDF-") {
        return Some("application/pdf");
    }

    let text = std::str::from_utf8(data).ok().filter(|t| !t.contains('\0'))?;
    let trimmed = text.trim_start();
    if extension == "json" && (trimmed.starts_with('{') || trimmed.starts_with('[')) {
        return Some("application/json");
    }
    if extension == "csv" {
        return Some("text/csv");
    }
    Some("text/plain")
}

fn type_matches(sniffed: Option<&str>, extension: &str) -> bool {
    let Some(sniffed) = sniffed else {
        return false;
    };
    KNOWN_TYPES
        .iter()
        .any(|(mime, exts)| *mime == sniffed && exts.contains(&extension))
}

/// Whether the first `limit` bytes contain an interpreter or script marker
pub fn contains_script_marker(data: &[u8], limit: usize) -> bool {
    let prefix = &data[..data.len().min(limit)];
    let text = String::from_utf8_lossy(prefix);
    SignatureRegistry::file_markers()
        .iter()
        .any(|re| re.is_match(&text))
}

/// Validate one upload
///
/// ## Returns
/// A report on success; a type mismatch is reported, not rejected.
pub fn validate_upload(file: &UploadedFile, policy: &UploadPolicy<'_>) -> GuardResult<UploadReport> {
    if file.data.len() > policy.max_file_bytes {
        return Err(GuardError::upload(UploadRejection::TooLarge));
    }

    if file.filename.len() > policy.max_filename_len {
        return Err(GuardError::upload(UploadRejection::FilenameTooLong));
    }

    let extension = extension_of(&file.filename);
    if policy.blocked_extensions.iter().any(|e| *e == extension) {
        return Err(GuardError::upload(UploadRejection::BlockedExtension(extension)));
    }

    let sniffed_type = sniff_content_type(&file.data, &extension);
    let type_matches = type_matches(sniffed_type, &extension);
    if !type_matches {
        tracing::warn!(
            target: "security",
            field = %file.field,
            extension = %extension,
            declared = file.declared_type.as_deref().unwrap_or("-"),
            sniffed = sniffed_type.unwrap_or("unknown"),
            "Upload content type mismatch"
        );
    }

    if contains_script_marker(&file.data, policy.content_scan_bytes) {
        tracing::error!(target: "security", field = %file.field, "Malicious content in upload");
        return Err(GuardError::violation(ViolationKind::MaliciousFile));
    }

    Ok(UploadReport {
        extension,
        sniffed_type,
        type_matches,
    })
}
