use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::models::error::CaptureError;
use crate::models::recording_result::{RecordingArtifact, RecordingMetadata, SessionSummary};
use crate::session::chunks::ChunkSequence;
use crate::storage::metadata;

/// Retries when two artifacts land on the same millisecond.
const MAX_NAME_ATTEMPTS: i64 = 1000;

/// Joins a session's chunks into one artifact file.
///
/// ## Output
///
/// ```text
/// <output_directory>/<kind>-<epoch-millis>.<ext>            chunk 0 ++ chunk 1 ++ ...
/// <output_directory>/<kind>-<epoch-millis>.metadata.json    RecordingMetadata
/// ```
///
/// Existing files are never overwritten: a name collision bumps the
/// millisecond suffix.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    output_directory: PathBuf,
}

impl ArtifactWriter {
    pub fn new(output_directory: impl Into<PathBuf>) -> Self {
        Self {
            output_directory: output_directory.into(),
        }
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    /// `recording`, 1700000000000, `webm` → `recording-1700000000000.webm`.
    pub fn file_name(kind: &str, epoch_millis: i64, extension: &str) -> String {
        format!("{}-{}.{}", kind, epoch_millis, extension)
    }

    /// Write `chunks` in order, checksum them, and write the metadata sidecar.
    ///
    /// An empty sequence is refused: there is nothing to save.
    pub fn finalize(
        &self,
        chunks: &ChunkSequence,
        summary: &SessionSummary,
        kind: &str,
        extension: &str,
    ) -> Result<RecordingArtifact, CaptureError> {
        if chunks.is_empty() {
            return Err(CaptureError::StorageError("no recorded data to finalize".into()));
        }

        fs::create_dir_all(&self.output_directory)
            .map_err(|e| CaptureError::StorageError(format!("failed to create directory: {}", e)))?;

        let created_at = Utc::now();
        let (file_path, file) = self.create_unique(kind, extension, created_at)?;

        let checksum = match write_chunks(file, chunks) {
            Ok(checksum) => checksum,
            Err(e) => {
                let _ = fs::remove_file(&file_path);
                return Err(CaptureError::StorageError(format!("write failed: {}", e)));
            }
        };

        let metadata = RecordingMetadata::new(
            summary,
            &file_path.to_string_lossy(),
            created_at,
            chunks.len(),
            chunks.total_bytes(),
            &checksum,
        );
        metadata::write_metadata(&metadata, &file_path)?;

        log::info!(
            "Finalized {} ({} chunks, {} bytes)",
            file_path.display(),
            chunks.len(),
            chunks.total_bytes()
        );

        Ok(RecordingArtifact {
            file_path,
            byte_len: chunks.total_bytes(),
            chunk_count: chunks.len(),
            duration_secs: summary.duration_secs,
            checksum,
            metadata,
        })
    }

    fn create_unique(
        &self,
        kind: &str,
        extension: &str,
        created_at: DateTime<Utc>,
    ) -> Result<(PathBuf, File), CaptureError> {
        let base = created_at.timestamp_millis();
        for offset in 0..MAX_NAME_ATTEMPTS {
            let path = self
                .output_directory
                .join(Self::file_name(kind, base + offset, extension));
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(CaptureError::StorageError(format!("failed to create file: {}", e))),
            }
        }
        Err(CaptureError::StorageError(format!(
            "no free file name for {}-{} in {}",
            kind,
            base,
            self.output_directory.display()
        )))
    }
}

/// Stream every chunk to `file`, hashing as it goes.
fn write_chunks(file: File, chunks: &ChunkSequence) -> io::Result<String> {
    let mut writer = BufWriter::new(file);
    let mut hasher = Sha256::new();
    for chunk in chunks.iter() {
        hasher.update(&chunk.data);
        writer.write_all(&chunk.data)?;
    }
    writer.flush()?;
    Ok(hex_encode(&hasher.finalize()))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
