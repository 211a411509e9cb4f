use thiserror::Error;

/// Errors that can occur during capture, recording and transcoding.
///
/// Acquisition and encoder errors are recovered at the session boundary:
/// the recorder rolls back to idle with every stream released before the
/// error reaches the caller. Nothing here is retried automatically.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// The user or the OS refused capture permission.
    #[error("capture permission denied: {0}")]
    DeviceDenied(String),

    /// The source vanished between enumeration and acquisition.
    #[error("capture device not available: {0}")]
    DeviceUnavailable(String),

    /// The encoder failed mid-session.
    #[error("encoder fault: {0}")]
    EncoderFault(String),

    /// The transcoder exited non-zero, was killed, or could not be spawned.
    #[error("external process fault: {0}")]
    ExternalProcessFault(String),

    /// The operation is not valid in the current recorder state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("storage error: {0}")]
    StorageError(String),
}

impl CaptureError {
    /// Stable code for hosts that surface errors to users.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DeviceDenied(_) => "DEVICE_DENIED",
            Self::DeviceUnavailable(_) => "DEVICE_UNAVAILABLE",
            Self::EncoderFault(_) => "ENCODER_FAULT",
            Self::ExternalProcessFault(_) => "EXTERNAL_PROCESS_FAULT",
            Self::InvalidState(_) => "INVALID_STATE",
            Self::ConfigurationFailed(_) => "CONFIGURATION_FAILED",
            Self::StorageError(_) => "STORAGE_ERROR",
        }
    }

    /// Whether this error came from acquiring a capture device.
    pub fn is_acquisition_error(&self) -> bool {
        matches!(self, Self::DeviceDenied(_) | Self::DeviceUnavailable(_))
    }
}
