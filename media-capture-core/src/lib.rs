//! # media-capture-core
//!
//! Platform-agnostic media capture core library.
//!
//! Provides the recording session state machine, the audio mixing graph,
//! output finalization, and the transcode job model. Platform backends
//! (capture devices, media encoders, transcoder processes) implement the
//! traits in [`traits`] and plug into the generic [`Recorder`].
//!
//! ## Architecture
//!
//! ```text
//! media-capture-core (this crate)
//! ├── models/       ← CaptureError, RecordingState, CaptureRequest, RecorderConfiguration, etc.
//! ├── traits/       ← CaptureProvider, MediaStream, SourceSelector, Encoder, RecorderDelegate, Transcoder
//! ├── capture/      ← MediaStreamHandle, source selection and acquisition
//! ├── processing/   ← GainMixer, TapBuffer, MixGraph
//! ├── session/      ← Recorder (the single authoritative session owner), ChunkSequence
//! ├── storage/      ← ArtifactWriter, metadata sidecar
//! └── transcode/    ← TranscodeJob, QualityPreset, Timecode progress parsing
//! ```

pub mod capture;
pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;
pub mod transcode;

#[cfg(test)]
mod test_support;

// Re-export key types at crate root for convenience.
pub use capture::handle::MediaStreamHandle;
pub use models::config::{EncoderSettings, MixSettings, RecorderConfiguration};
pub use models::error::CaptureError;
pub use models::media::{
    AudioConstraints, AudioLevels, AudioRole, CaptureRequest, CaptureSource, OutputChunk, StreamKind, TrackInfo,
    TrackKind,
};
pub use models::recording_result::{RecordingArtifact, RecordingMetadata};
pub use models::state::RecordingState;
pub use processing::gain_mixer::GainMixer;
pub use processing::mix_graph::{GainHandle, MixGraph, MixInput, MixOutput};
pub use processing::tap_buffer::TapBuffer;
pub use session::chunks::ChunkSequence;
pub use session::recorder::{Recorder, SelectionOutcome};
pub use storage::artifact_writer::ArtifactWriter;
pub use traits::capture_provider::{AudioBufferCallback, CaptureProvider, MediaStream};
pub use traits::delegate::RecorderDelegate;
pub use traits::encoder::{CombinedStream, Encoder, EncoderEvent, EncoderEvents};
pub use traits::source_selector::{SelectionPurpose, SourceChoice, SourceSelector};
pub use traits::transcoder::{ProgressCallback, TranscodeHandle, TranscodeOutcome, Transcoder};
pub use transcode::job::{OutputFormat, QualityPreset, QualitySettings, Scale, TranscodeJob, TranscodeTask};
pub use transcode::progress::{Timecode, TranscodeProgress};
