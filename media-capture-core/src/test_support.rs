//! In-memory capture provider, stream, encoder, and delegate used by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::config::EncoderSettings;
use crate::models::error::CaptureError;
use crate::models::media::{AudioLevels, CaptureRequest, CaptureSource, StreamKind, TrackInfo, TrackKind};
use crate::models::recording_result::RecordingArtifact;
use crate::models::state::RecordingState;
use crate::traits::capture_provider::{AudioBufferCallback, CaptureProvider, MediaStream};
use crate::traits::delegate::RecorderDelegate;
use crate::traits::encoder::{CombinedStream, Encoder, EncoderEvents};

/// Test-side view of a fake stream.
pub struct StreamProbe {
    pub id: String,
    pub kind: Option<StreamKind>,
    released: AtomicBool,
    stops: AtomicUsize,
    sink: Mutex<Option<AudioBufferCallback>>,
}

impl StreamProbe {
    /// Deliver mono 48 kHz samples to the attached sink, if any.
    pub fn feed(&self, samples: &[f32]) {
        let sink = self.sink.lock().clone();
        if let Some(sink) = sink {
            sink(samples, 48000.0, 1);
        }
    }

    pub fn has_sink(&self) -> bool {
        self.sink.lock().is_some()
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

struct FakeStream {
    probe: Arc<StreamProbe>,
    tracks: Vec<TrackInfo>,
}

impl MediaStream for FakeStream {
    fn id(&self) -> &str {
        &self.probe.id
    }

    fn tracks(&self) -> Vec<TrackInfo> {
        self.tracks.clone()
    }

    fn attach_audio_sink(&mut self, callback: AudioBufferCallback) {
        *self.probe.sink.lock() = Some(callback);
    }

    fn detach_audio_sink(&mut self) {
        *self.probe.sink.lock() = None;
    }

    fn stop(&mut self) {
        self.probe.released.store(true, Ordering::SeqCst);
        self.probe.stops.fetch_add(1, Ordering::SeqCst);
    }
}

fn build_stream(id: &str, kind: Option<StreamKind>, audio: bool, video: bool) -> (Box<dyn MediaStream>, Arc<StreamProbe>) {
    let probe = Arc::new(StreamProbe {
        id: id.to_string(),
        kind,
        released: AtomicBool::new(false),
        stops: AtomicUsize::new(0),
        sink: Mutex::new(None),
    });
    let mut tracks = Vec::new();
    if video {
        tracks.push(TrackInfo::new(format!("{}/video", id), TrackKind::Video, id));
    }
    if audio {
        tracks.push(TrackInfo::new(format!("{}/audio", id), TrackKind::Audio, id));
    }
    let stream = FakeStream {
        probe: Arc::clone(&probe),
        tracks,
    };
    (Box::new(stream), probe)
}

pub fn fake_stream(id: &str, audio: bool, video: bool) -> (Box<dyn MediaStream>, Arc<StreamProbe>) {
    build_stream(id, None, audio, video)
}

#[derive(Default)]
struct ProviderState {
    sources: Vec<CaptureSource>,
    failures: HashMap<StreamKind, CaptureError>,
    acquired: Vec<Arc<StreamProbe>>,
    enumerations: usize,
    silent_microphone: bool,
    silent_screens: bool,
}

/// Capture provider backed by shared state, so a test can keep a clone
/// after moving the provider into a recorder.
#[derive(Clone, Default)]
pub struct FakeProvider {
    state: Arc<Mutex<ProviderState>>,
}

impl FakeProvider {
    pub fn with_sources(ids: &[&str]) -> Self {
        let provider = Self::default();
        provider.set_sources(ids);
        provider
    }

    pub fn set_sources(&self, ids: &[&str]) {
        self.state.lock().sources = ids
            .iter()
            .map(|id| CaptureSource::new(*id, format!("Source {}", id)))
            .collect();
    }

    pub fn fail(&self, kind: StreamKind, error: CaptureError) {
        self.state.lock().failures.insert(kind, error);
    }

    pub fn clear_failure(&self, kind: StreamKind) {
        self.state.lock().failures.remove(&kind);
    }

    /// Microphone streams come back without an audio track.
    pub fn set_silent_microphone(&self, silent: bool) {
        self.state.lock().silent_microphone = silent;
    }

    /// Screen streams never carry system audio.
    pub fn set_silent_screens(&self, silent: bool) {
        self.state.lock().silent_screens = silent;
    }

    pub fn enumerations(&self) -> usize {
        self.state.lock().enumerations
    }

    pub fn acquired(&self) -> Vec<Arc<StreamProbe>> {
        self.state.lock().acquired.clone()
    }

    pub fn acquired_of(&self, kind: StreamKind) -> Vec<Arc<StreamProbe>> {
        self.acquired()
            .into_iter()
            .filter(|p| p.kind == Some(kind))
            .collect()
    }

    /// Streams acquired and not yet released.
    pub fn live(&self) -> Vec<Arc<StreamProbe>> {
        self.acquired().into_iter().filter(|p| !p.is_released()).collect()
    }

    /// The most recent live stream of `kind`.
    pub fn live_of(&self, kind: StreamKind) -> Option<Arc<StreamProbe>> {
        self.live().into_iter().rev().find(|p| p.kind == Some(kind))
    }
}

impl CaptureProvider for FakeProvider {
    fn enumerate_sources(&self) -> Result<Vec<CaptureSource>, CaptureError> {
        let mut state = self.state.lock();
        state.enumerations += 1;
        Ok(state.sources.clone())
    }

    fn acquire(&mut self, request: &CaptureRequest) -> Result<Box<dyn MediaStream>, CaptureError> {
        let mut state = self.state.lock();
        let kind = request.kind();
        if let Some(error) = state.failures.get(&kind) {
            return Err(error.clone());
        }

        let serial = state.acquired.len() + 1;
        let (id, audio, video) = match request {
            CaptureRequest::Screen {
                source_id,
                system_audio,
            } => {
                if !state.sources.iter().any(|s| &s.id == source_id) {
                    return Err(CaptureError::DeviceUnavailable(format!("{} is gone", source_id)));
                }
                (
                    format!("{}#{}", source_id, serial),
                    *system_audio && !state.silent_screens,
                    true,
                )
            }
            CaptureRequest::Camera => (format!("camera#{}", serial), false, true),
            CaptureRequest::Microphone(_) => (format!("mic#{}", serial), !state.silent_microphone, false),
        };

        let (stream, probe) = build_stream(&id, Some(kind), audio, video);
        state.acquired.push(probe);
        Ok(stream)
    }
}

#[derive(Default)]
struct EncoderState {
    events: Option<EncoderEvents>,
    inputs: Vec<CombinedStream>,
    settings: Option<EncoderSettings>,
    paused: bool,
    stopped: bool,
    aborted: bool,
    starts: usize,
    stops: usize,
    fail_start: Option<CaptureError>,
    fail_stop: Option<CaptureError>,
    fail_retarget: Option<CaptureError>,
    flush: Vec<u8>,
    hold_completion: bool,
}

/// Encoder that emits only what the test tells it to.
#[derive(Clone, Default)]
pub struct FakeEncoder {
    state: Arc<Mutex<EncoderState>>,
}

impl FakeEncoder {
    /// Emit a chunk as if a timeslice elapsed. Returns false when the
    /// encoder is idle, paused, or stopped.
    pub fn emit_chunk(&self, data: &[u8]) -> bool {
        let state = self.state.lock();
        match &state.events {
            Some(events) if !state.paused && !state.stopped => {
                events.chunk(data.to_vec());
                true
            }
            _ => false,
        }
    }

    pub fn emit_error(&self, message: &str) {
        if let Some(events) = &self.state.lock().events {
            events.error(message);
        }
    }

    pub fn emit_completed(&self) {
        if let Some(events) = &self.state.lock().events {
            events.completed();
        }
    }

    /// Bytes emitted as the final chunk on stop.
    pub fn set_flush(&self, data: &[u8]) {
        self.state.lock().flush = data.to_vec();
    }

    /// Stop without emitting `Completed`; the test emits it later.
    pub fn hold_completion(&self) {
        self.state.lock().hold_completion = true;
    }

    pub fn fail_next_start(&self, error: CaptureError) {
        self.state.lock().fail_start = Some(error);
    }

    pub fn fail_next_stop(&self, error: CaptureError) {
        self.state.lock().fail_stop = Some(error);
    }

    pub fn fail_next_retarget(&self, error: CaptureError) {
        self.state.lock().fail_retarget = Some(error);
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    pub fn is_aborted(&self) -> bool {
        self.state.lock().aborted
    }

    pub fn start_count(&self) -> usize {
        self.state.lock().starts
    }

    pub fn stop_count(&self) -> usize {
        self.state.lock().stops
    }

    pub fn settings(&self) -> Option<EncoderSettings> {
        self.state.lock().settings.clone()
    }

    /// Every input handed over by start and retarget, in order.
    pub fn inputs(&self) -> Vec<CombinedStream> {
        self.state.lock().inputs.clone()
    }

    pub fn current_input(&self) -> Option<CombinedStream> {
        self.state.lock().inputs.last().cloned()
    }
}

impl Encoder for FakeEncoder {
    fn start(
        &mut self,
        input: CombinedStream,
        settings: &EncoderSettings,
        events: EncoderEvents,
    ) -> Result<(), CaptureError> {
        let mut state = self.state.lock();
        if let Some(error) = state.fail_start.take() {
            return Err(error);
        }
        state.events = Some(events);
        state.inputs = vec![input];
        state.settings = Some(settings.clone());
        state.paused = false;
        state.stopped = false;
        state.aborted = false;
        state.starts += 1;
        Ok(())
    }

    fn pause(&mut self) -> Result<(), CaptureError> {
        self.state.lock().paused = true;
        Ok(())
    }

    fn resume(&mut self) -> Result<(), CaptureError> {
        self.state.lock().paused = false;
        Ok(())
    }

    fn retarget(&mut self, input: CombinedStream) -> Result<(), CaptureError> {
        let mut state = self.state.lock();
        if let Some(error) = state.fail_retarget.take() {
            return Err(error);
        }
        state.inputs.push(input);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        let mut state = self.state.lock();
        state.stops += 1;
        if let Some(error) = state.fail_stop.take() {
            return Err(error);
        }
        state.stopped = true;
        if let Some(events) = &state.events {
            if !state.flush.is_empty() {
                events.chunk(state.flush.clone());
            }
            if !state.hold_completion {
                events.completed();
            }
        }
        Ok(())
    }

    fn abort(&mut self) {
        let mut state = self.state.lock();
        state.aborted = true;
        state.events = None;
    }
}

/// Delegate that records every notification.
#[derive(Default)]
pub struct CollectingDelegate {
    pub states: Mutex<Vec<RecordingState>>,
    pub levels: Mutex<Vec<AudioLevels>>,
    pub errors: Mutex<Vec<CaptureError>>,
    pub artifacts: Mutex<Vec<RecordingArtifact>>,
}

impl RecorderDelegate for CollectingDelegate {
    fn on_state_changed(&self, state: RecordingState) {
        self.states.lock().push(state);
    }

    fn on_levels_updated(&self, levels: &AudioLevels) {
        self.levels.lock().push(*levels);
    }

    fn on_error(&self, error: &CaptureError) {
        self.errors.lock().push(error.clone());
    }

    fn on_artifact_ready(&self, artifact: &RecordingArtifact) {
        self.artifacts.lock().push(artifact.clone());
    }
}

/// Fresh directory under the system temp dir.
pub fn temp_output_dir() -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("media-capture-test-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}
