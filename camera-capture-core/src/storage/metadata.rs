use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::models::error::SessionError;

/// Metadata stored as a JSON sidecar next to each finished clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipMetadata {
    pub id: String,
    pub file_path: String,
    pub duration_secs: f64,
    pub created_at: String,
    pub checksum: String,
}

/// Write clip metadata as `{clip_path}.metadata.json`.
pub fn write_metadata(metadata: &ClipMetadata, clip_path: &Path) -> Result<(), SessionError> {
    let metadata_path = clip_path.with_extension("metadata.json");
    let json = serde_json::to_string_pretty(metadata)
        .map_err(|e| SessionError::Storage(format!("failed to serialize metadata: {e}")))?;
    fs::write(&metadata_path, json)
        .map_err(|e| SessionError::Storage(format!("failed to write metadata: {e}")))?;
    Ok(())
}

/// Read clip metadata from the JSON sidecar.
pub fn read_metadata(clip_path: &Path) -> Result<ClipMetadata, SessionError> {
    let metadata_path = clip_path.with_extension("metadata.json");
    let json = fs::read_to_string(&metadata_path)
        .map_err(|e| SessionError::Storage(format!("failed to read metadata: {e}")))?;
    serde_json::from_str(&json)
        .map_err(|e| SessionError::Storage(format!("failed to parse metadata: {e}")))
}

/// Compute the SHA-256 hex digest of a finished clip file.
pub fn sha256_file(path: &Path) -> Result<String, SessionError> {
    let data = fs::read(path)
        .map_err(|e| SessionError::Storage(format!("failed to read file for checksum: {e}")))?;
    let digest = Sha256::digest(&data);
    Ok(digest.iter().map(|b| format!("{b:02x}")).collect())
}
