use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Result returned when a recording session completes and its chunks are finalized.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingArtifact {
    pub file_path: PathBuf,
    pub byte_len: u64,
    pub chunk_count: usize,
    pub duration_secs: f64,
    pub checksum: String,
    pub metadata: RecordingMetadata,
}

/// Metadata stored alongside a finalized recording.
///
/// Written as a JSON sidecar next to the artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub id: String,
    pub session_id: String,
    pub file_path: String,
    pub mime_type: String,
    pub created_at: String,
    pub created_at_ms: i64,
    pub duration_secs: f64,
    pub chunk_count: usize,
    pub byte_len: u64,
    pub checksum: String,
    /// Screen/window sources in the order they were recorded.
    pub source_ids: Vec<String>,
    pub source_switches: u32,
}

/// Session facts the recorder hands to finalization.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub session_id: String,
    pub mime_type: String,
    pub duration_secs: f64,
    pub source_ids: Vec<String>,
    pub source_switches: u32,
}

impl RecordingMetadata {
    pub fn new(
        summary: &SessionSummary,
        file_path: &str,
        created_at: chrono::DateTime<chrono::Utc>,
        chunk_count: usize,
        byte_len: u64,
        checksum: &str,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: summary.session_id.clone(),
            file_path: file_path.to_string(),
            mime_type: summary.mime_type.clone(),
            created_at: created_at.to_rfc3339(),
            created_at_ms: created_at.timestamp_millis(),
            duration_secs: summary.duration_secs,
            chunk_count,
            byte_len,
            checksum: checksum.to_string(),
            source_ids: summary.source_ids.clone(),
            source_switches: summary.source_switches,
        }
    }
}
