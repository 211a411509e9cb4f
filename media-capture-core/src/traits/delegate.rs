use crate::models::error::CaptureError;
use crate::models::media::AudioLevels;
use crate::models::recording_result::RecordingArtifact;
use crate::models::state::RecordingState;

/// Event delegate for recorder notifications.
///
/// All methods are called from whichever thread drives the recorder.
/// Implementations should marshal to the UI thread if needed.
pub trait RecorderDelegate: Send + Sync {
    /// Called when the recorder state changes.
    fn on_state_changed(&self, state: RecordingState);

    /// Called after each event dispatch with the latest mix levels.
    fn on_levels_updated(&self, levels: &AudioLevels);

    /// Called when an operation fails and the failure is surfaced to the user.
    fn on_error(&self, error: &CaptureError);

    /// Called once per completed session when the artifact is ready to save.
    fn on_artifact_ready(&self, artifact: &RecordingArtifact);
}
