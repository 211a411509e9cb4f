use std::sync::Arc;

use crate::models::error::CaptureError;
use crate::models::media::{CaptureRequest, CaptureSource, TrackInfo, TrackKind};

/// Callback invoked when an audio buffer is available on a stream.
///
/// Parameters:
/// - `samples`: Interleaved f32 samples.
/// - `sample_rate`: The actual sample rate of the delivered audio.
/// - `channels`: Number of channels (1 = mono, 2 = stereo interleaved).
pub type AudioBufferCallback = Arc<dyn Fn(&[f32], f64, u16) + Send + Sync + 'static>;

/// An active platform capture stream (screen, camera, or microphone).
///
/// While a stream is alive the process holds an exclusive lock on the
/// underlying device. [`MediaStream::stop`] stops every track and releases it.
/// Streams are wrapped in a `MediaStreamHandle` which guarantees `stop` runs
/// exactly once.
pub trait MediaStream: Send {
    /// Platform identifier of this stream.
    fn id(&self) -> &str;

    /// Tracks currently carried by this stream.
    fn tracks(&self) -> Vec<TrackInfo>;

    fn has_audio(&self) -> bool {
        self.tracks().iter().any(|t| t.kind == TrackKind::Audio)
    }

    fn has_video(&self) -> bool {
        self.tracks().iter().any(|t| t.kind == TrackKind::Video)
    }

    /// Route this stream's audio to `callback`, replacing any previous sink.
    ///
    /// The callback may fire on any thread; keep processing minimal.
    /// Streams without audio tracks accept the sink and never call it.
    fn attach_audio_sink(&mut self, callback: AudioBufferCallback);

    /// Stop delivering audio to the attached sink.
    fn detach_audio_sink(&mut self);

    /// Stop every track and release the capture device.
    fn stop(&mut self);
}

/// Interface for platform-specific capture backends.
///
/// Implemented by the host platform (desktop capturer, camera and
/// microphone APIs). The recorder only talks to devices through this trait.
pub trait CaptureProvider: Send {
    /// List the screens and windows currently available for capture.
    ///
    /// Called immediately before every selection; results must not be cached.
    fn enumerate_sources(&self) -> Result<Vec<CaptureSource>, CaptureError>;

    /// Open a capture stream.
    ///
    /// Fails with `DeviceDenied` when permission is refused and
    /// `DeviceUnavailable` when the requested source no longer exists.
    fn acquire(&mut self, request: &CaptureRequest) -> Result<Box<dyn MediaStream>, CaptureError>;
}
