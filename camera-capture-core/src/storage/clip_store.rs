use std::fs;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::models::error::SessionError;

/// Container file extension used for recorded clips.
pub const CLIP_EXTENSION: &str = "mov";

/// Path for clip number `index` of session `session_id`:
/// `{sessionID}-TV-clip.{n}.mov` under `directory`.
pub fn clip_file_path(directory: &Path, session_id: Uuid, index: usize) -> PathBuf {
    directory.join(format!("{session_id}-TV-clip.{index}.{CLIP_EXTENSION}"))
}

/// Path for the merged output of session `session_id`.
pub fn merged_file_path(directory: &Path, session_id: Uuid) -> PathBuf {
    directory.join(format!("{session_id}-TV-merged.{CLIP_EXTENSION}"))
}

/// Make `path` writable: create the parent directory and remove any stale
/// file left at the path by an earlier run.
pub fn prepare_destination(path: &Path) -> Result<(), SessionError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| SessionError::Storage(format!("failed to create directory: {e}")))?;
    }
    if path.exists() {
        fs::remove_file(path)
            .map_err(|e| SessionError::Storage(format!("failed to remove stale file: {e}")))?;
    }
    Ok(())
}
