use std::process::ExitStatus;

use thiserror::Error;

use media_capture_core::CaptureError;

/// Failures of the ffmpeg child process.
#[derive(Debug, Error)]
pub enum FfmpegError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {message}")]
    Exited {
        program: String,
        status: ExitStatus,
        message: String,
    },

    #[error("unexpected ffprobe output: {0:?}")]
    ProbeOutput(String),

    #[error("failed to read process output: {0}")]
    Io(#[from] std::io::Error),
}

impl From<FfmpegError> for CaptureError {
    fn from(e: FfmpegError) -> Self {
        CaptureError::ExternalProcessFault(e.to_string())
    }
}
