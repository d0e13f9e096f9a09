//! Upload request validation
//!
//! Decodes the `metadata` header and enforces the filename charset before any
//! storage interaction happens. Every failure maps to a distinct client-facing
//! message so callers can tell exactly which part of the envelope was wrong.

use serde_json::Value;
use thiserror::Error;

/// Characters allowed by the POSIX portable filename convention.
pub const PORTABLE_FILENAME_CHARS: &str =
    ".-_0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Validation failures for the upload envelope. All map to HTTP 400.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Missing header field: 'metadata'.")]
    MissingMetadataHeader,
    #[error("Json decoding failure in header-field 'metadata'.")]
    MalformedMetadataJson,
    #[error("Missing key in metadata header field: 'filename'.")]
    MissingFilename,
    #[error("Missing name in metadata header field: 'idtype'.")]
    MissingIdType,
    #[error("Invalid character in filename. Allowed: '{}'", PORTABLE_FILENAME_CHARS)]
    InvalidFilename,
}

/// The decoded `metadata` upload header. `idtype` is kept as the raw string
/// so that strategy errors surface after filename errors, in header order.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadMetadata {
    pub filename: String,
    pub idtype: String,
    pub customid: Option<String>,
}

/// Decode and validate the `metadata` header of an upload request.
pub fn parse_upload_metadata(header: Option<&str>) -> Result<UploadMetadata, ValidationError> {
    let raw = header.ok_or(ValidationError::MissingMetadataHeader)?;
    let value: Value =
        serde_json::from_str(raw).map_err(|_| ValidationError::MalformedMetadataJson)?;

    let filename_value = value
        .get("filename")
        .ok_or(ValidationError::MissingFilename)?;
    let idtype_value = value.get("idtype").ok_or(ValidationError::MissingIdType)?;

    // Filenames must be strings over the portable charset, never empty.
    let filename = filename_value
        .as_str()
        .filter(|f| is_portable_filename(f))
        .ok_or(ValidationError::InvalidFilename)?
        .to_string();

    // A non-string idtype falls through to the strategy check as an unknown
    // strategy rather than failing here.
    let idtype = idtype_value.as_str().unwrap_or_default().to_string();

    // Non-string custom ids are stringified, matching the lenient contract
    // that custom has no charset restriction.
    let customid = value.get("customid").map(|v| match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    });

    Ok(UploadMetadata {
        filename,
        idtype,
        customid,
    })
}

fn is_portable_filename(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| PORTABLE_FILENAME_CHARS.contains(c))
}
