//! File identifier generation strategies
//!
//! Two strategies exist: `snowflake` builds a low-collision composite of host
//! hash, nanosecond timestamp and 256 bits of randomness; `custom` echoes a
//! caller-supplied string. Neither strategy is the source of truth for
//! uniqueness, the record store's write-once check is.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

/// Minimum length for caller-supplied identifiers.
pub const CUSTOM_ID_MIN_LEN: usize = 5;

/// Which strategy produced a file identifier. Stored with the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdStrategy {
    Snowflake,
    Custom,
}

impl IdStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdStrategy::Snowflake => "snowflake",
            IdStrategy::Custom => "custom",
        }
    }
}

impl std::str::FromStr for IdStrategy {
    type Err = FileIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "snowflake" => Ok(IdStrategy::Snowflake),
            "custom" => Ok(IdStrategy::Custom),
            _ => Err(FileIdError::UnknownStrategy),
        }
    }
}

/// Identifier generation failures. Messages are client-facing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FileIdError {
    #[error("Bad idtype. Allowed: 'snowflake', 'custom'.")]
    UnknownStrategy,
    #[error("Metadata missing 'customid' key for idtype 'custom'.")]
    MissingCustomId,
    #[error("Too short customid. Minimum size is {}.", CUSTOM_ID_MIN_LEN)]
    CustomIdTooShort,
}

/// Produce a file identifier under the given strategy. `custom_id` is only
/// consulted for [`IdStrategy::Custom`].
pub fn generate(strategy: IdStrategy, custom_id: Option<&str>) -> Result<String, FileIdError> {
    match strategy {
        IdStrategy::Snowflake => Ok(snowflake()),
        IdStrategy::Custom => {
            let id = custom_id.ok_or(FileIdError::MissingCustomId)?;
            // Length is in characters; custom ids have no charset restriction
            // so multibyte input is legal and must not be measured in bytes.
            if id.chars().count() < CUSTOM_ID_MIN_LEN {
                return Err(FileIdError::CustomIdTooShort);
            }
            Ok(id.to_string())
        }
    }
}

/// Current wall-clock time as nanoseconds since the epoch.
pub fn now_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// Composite identifier: 16 hex chars of the host name hash, the nanosecond
/// timestamp in hex, and two dashless v4 UUIDs, joined with `-`.
fn snowflake() -> String {
    let host = hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "localhost".to_string());
    let host_hash: String = hex::encode(Sha256::digest(host.as_bytes()))
        .chars()
        .take(16)
        .collect();
    let random = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
    format!("{}-{:x}-{}", host_hash, now_nanos(), random)
}
