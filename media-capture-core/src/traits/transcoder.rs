use std::path::PathBuf;
use std::sync::Arc;

use crate::models::error::CaptureError;
use crate::transcode::job::TranscodeJob;
use crate::transcode::progress::TranscodeProgress;

/// Callback invoked for every progress report parsed from the transcoder.
pub type ProgressCallback = Arc<dyn Fn(&TranscodeProgress) + Send + Sync + 'static>;

/// Opaque handle to a running transcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TranscodeHandle(u64);

impl TranscodeHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Terminal outcome of a transcode.
#[derive(Debug, Clone, PartialEq)]
pub enum TranscodeOutcome {
    Completed { output: PathBuf },
    Cancelled,
    Failed(CaptureError),
}

impl TranscodeOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// A bounded capability for running an external transcoder.
///
/// The process-spawning mechanism lives behind this trait so it can be
/// swapped without touching callers.
pub trait Transcoder: Send + Sync {
    /// Launch `job`, reporting progress through `on_progress`.
    fn start(&self, job: TranscodeJob, on_progress: ProgressCallback) -> Result<TranscodeHandle, CaptureError>;

    /// Terminate a running transcode. Unknown or finished handles are ignored.
    fn cancel(&self, handle: TranscodeHandle) -> Result<(), CaptureError>;

    /// Block until the transcode ends.
    fn wait(&self, handle: TranscodeHandle) -> TranscodeOutcome;
}
