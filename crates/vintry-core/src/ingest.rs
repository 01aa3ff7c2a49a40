//! Upload validation for the image ingestion boundary.
//!
//! Runs before any decode work: size cap, magic-byte MIME sniffing with an
//! extension fallback, and an image-type allowlist. Declared MIME types are
//! advisory only; the bytes decide. Also provides the content hash used as
//! idempotent job identity for retried uploads.

use once_cell::sync::Lazy;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use tracing::debug;

/// Image MIME types the resolver accepts for label photos.
static ALLOWED_IMAGE_MIMES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "image/jpeg",
        "image/png",
        "image/webp",
        "image/gif",
        "image/bmp",
        "image/tiff",
    ]
    .into_iter()
    .collect()
});

/// Result of upload validation.
#[derive(Debug, Clone)]
pub struct UploadValidation {
    pub allowed: bool,
    pub reject_reason: Option<String>,
    pub detected_mime: Option<String>,
}

impl UploadValidation {
    fn allowed(detected: String) -> Self {
        Self {
            allowed: true,
            reject_reason: None,
            detected_mime: Some(detected),
        }
    }

    fn rejected(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reject_reason: Some(reason.into()),
            detected_mime: None,
        }
    }
}

/// Validate an uploaded label photo before decoding.
pub fn validate_image(
    filename: &str,
    data: &[u8],
    claimed_mime: &str,
    max_size_bytes: u64,
) -> UploadValidation {
    if data.is_empty() {
        return UploadValidation::rejected("Upload is empty");
    }

    if data.len() as u64 > max_size_bytes {
        return UploadValidation::rejected(format!(
            "Upload exceeds maximum size of {} bytes",
            max_size_bytes
        ));
    }

    let detected = detect_image_mime(filename, data, claimed_mime);
    if ALLOWED_IMAGE_MIMES.contains(detected.as_str()) {
        UploadValidation::allowed(detected)
    } else {
        debug!(
            subsystem = "ingest",
            claimed = claimed_mime,
            detected = %detected,
            "Upload rejected: not an accepted image type"
        );
        UploadValidation::rejected(format!("Unsupported upload type: {}", detected))
    }
}

/// Detect the actual content type of upload bytes.
///
/// Magic bytes win; extension is the fallback for formats `infer` misses;
/// the claimed type is only trusted when neither says otherwise. Binary
/// claims that failed magic detection are downgraded to octet-stream so
/// garbage never reaches the decoder on the strength of its header alone.
pub fn detect_image_mime(filename: &str, data: &[u8], claimed: &str) -> String {
    if let Some(kind) = infer::get(data) {
        return kind.mime_type().to_string();
    }

    if let Some(ext) = filename.rsplit('.').next() {
        if let Some(mime) = mime_from_extension(ext) {
            return mime.to_string();
        }
    }

    if claimed.starts_with("image/") {
        // Claimed an image but no recognizable magic bytes: not an image.
        return "application/octet-stream".to_string();
    }

    claimed.to_string()
}

fn mime_from_extension(ext: &str) -> Option<&'static str> {
    match ext.to_lowercase().as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "tif" | "tiff" => Some("image/tiff"),
        _ => None,
    }
}

/// SHA-256 hex digest of upload bytes, used as idempotent job identity.
pub fn content_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
