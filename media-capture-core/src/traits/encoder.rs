use crossbeam_channel::{Receiver, Sender};

use crate::models::config::EncoderSettings;
use crate::models::error::CaptureError;
use crate::models::media::TrackInfo;
use crate::processing::mix_graph::MixOutput;

/// Events raised by an encoder, consumed by the recorder in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncoderEvent {
    /// A fragment of encoded output. Empty fragments are ignored.
    Chunk(Vec<u8>),
    /// All buffered data has been emitted after a stop request.
    Completed,
    /// The encoder failed; the session cannot continue.
    Error(String),
}

/// Sending side of the encoder event queue.
///
/// Cloneable so an encoder can hand it to its own worker threads. Sends
/// after the recorder dropped its receiver are silently discarded.
#[derive(Debug, Clone)]
pub struct EncoderEvents {
    tx: Sender<EncoderEvent>,
}

impl EncoderEvents {
    /// Create a connected sender/receiver pair.
    pub fn channel() -> (Self, Receiver<EncoderEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self { tx }, rx)
    }

    pub fn chunk(&self, data: Vec<u8>) {
        self.emit(EncoderEvent::Chunk(data));
    }

    pub fn completed(&self) {
        self.emit(EncoderEvent::Completed);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(EncoderEvent::Error(message.into()));
    }

    pub fn emit(&self, event: EncoderEvent) {
        if self.tx.send(event).is_err() {
            log::debug!("encoder event dropped: recorder no longer listening");
        }
    }
}

/// The combined input an encoder records: one video track plus the mixed audio.
#[derive(Clone)]
pub struct CombinedStream {
    /// Stream id of the screen/window the video comes from.
    pub video_stream_id: String,
    pub video_track: TrackInfo,
    /// Pull-side of the mixing graph destination.
    pub audio: MixOutput,
}

impl std::fmt::Debug for CombinedStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CombinedStream")
            .field("video_stream_id", &self.video_stream_id)
            .field("video_track", &self.video_track)
            .field("audio_taps", &self.audio.tap_count())
            .finish()
    }
}

/// Media encoder interface.
///
/// The encoder emits `Chunk` events at the configured timeslice while
/// recording, none while paused, and a final flush followed by `Completed`
/// after [`Encoder::stop`].
pub trait Encoder: Send {
    /// Begin encoding `input`. Events go to `events` until the next start.
    fn start(
        &mut self,
        input: CombinedStream,
        settings: &EncoderSettings,
        events: EncoderEvents,
    ) -> Result<(), CaptureError>;

    /// Suspend chunk emission.
    fn pause(&mut self) -> Result<(), CaptureError>;

    /// Resume chunk emission on the same output sequence.
    fn resume(&mut self) -> Result<(), CaptureError>;

    /// Continue the same output sequence from a new input.
    fn retarget(&mut self, input: CombinedStream) -> Result<(), CaptureError>;

    /// Request a final flush. Buffered data is emitted as a last chunk,
    /// then `Completed`; either may arrive after this returns.
    fn stop(&mut self) -> Result<(), CaptureError>;

    /// Drop everything without flushing.
    fn abort(&mut self);
}
