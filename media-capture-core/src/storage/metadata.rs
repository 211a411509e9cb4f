use std::fs;
use std::path::{Path, PathBuf};

use crate::models::error::CaptureError;
use crate::models::recording_result::RecordingMetadata;

/// `recording-1700000000000.webm` → `recording-1700000000000.metadata.json`.
pub fn sidecar_path(artifact_path: &Path) -> PathBuf {
    artifact_path.with_extension("metadata.json")
}

/// Write the artifact's metadata sidecar next to it.
pub fn write_metadata(metadata: &RecordingMetadata, artifact_path: &Path) -> Result<PathBuf, CaptureError> {
    let path = sidecar_path(artifact_path);
    let json = serde_json::to_string_pretty(metadata)
        .map_err(|e| CaptureError::StorageError(format!("failed to serialize metadata: {}", e)))?;
    fs::write(&path, json).map_err(|e| CaptureError::StorageError(format!("failed to write metadata: {}", e)))?;
    Ok(path)
}

pub fn read_metadata(artifact_path: &Path) -> Result<RecordingMetadata, CaptureError> {
    let json = fs::read_to_string(sidecar_path(artifact_path))
        .map_err(|e| CaptureError::StorageError(format!("failed to read metadata: {}", e)))?;
    serde_json::from_str(&json).map_err(|e| CaptureError::StorageError(format!("failed to parse metadata: {}", e)))
}
