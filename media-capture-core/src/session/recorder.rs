use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, TryRecvError};

use crate::capture::acquisition::{acquire_stream, choose_source};
use crate::capture::handle::MediaStreamHandle;
use crate::models::config::{validate_gain, MixSettings, RecorderConfiguration};
use crate::models::error::CaptureError;
use crate::models::media::{AudioLevels, AudioRole, CaptureRequest};
use crate::models::recording_result::{RecordingArtifact, SessionSummary};
use crate::models::state::RecordingState;
use crate::processing::mix_graph::{MixGraph, MixInput};
use crate::session::chunks::ChunkSequence;
use crate::storage::artifact_writer::ArtifactWriter;
use crate::traits::capture_provider::CaptureProvider;
use crate::traits::delegate::RecorderDelegate;
use crate::traits::encoder::{CombinedStream, Encoder, EncoderEvent, EncoderEvents};
use crate::traits::source_selector::{SelectionPurpose, SourceChoice, SourceSelector};

/// Result of an operation that first asks the user to pick a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionOutcome {
    Applied,
    /// The user dismissed the picker; nothing was acquired or changed.
    Cancelled,
}

/// Per-role gains of a session. Survive graph rebuilds.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Gains {
    system: f32,
    microphone: f32,
    microphone_enabled: bool,
}

impl Gains {
    fn from_config(config: &RecorderConfiguration) -> Self {
        Self {
            system: config.system_gain,
            microphone: config.microphone_gain,
            microphone_enabled: true,
        }
    }

    fn configured(&self, role: AudioRole) -> f32 {
        match role {
            AudioRole::SystemAudio => self.system,
            AudioRole::Microphone => self.microphone,
        }
    }

    /// Gain actually applied to the graph: a disabled microphone is muted.
    fn effective(&self, role: AudioRole) -> f32 {
        match role {
            AudioRole::Microphone if !self.microphone_enabled => 0.0,
            _ => self.configured(role),
        }
    }

    fn set(&mut self, role: AudioRole, gain: f32) {
        match role {
            AudioRole::SystemAudio => self.system = gain,
            AudioRole::Microphone => self.microphone = gain,
        }
    }
}

/// Every stream a session holds.
struct SessionStreams {
    screen: MediaStreamHandle,
    microphone: Option<MediaStreamHandle>,
    camera: Option<MediaStreamHandle>,
}

impl SessionStreams {
    /// The screen stream always gets a tap (silent when it carries no
    /// audio); the microphone gets one when present.
    fn build_graph(&mut self, gains: &Gains, settings: &MixSettings) -> MixGraph {
        let mut inputs = vec![MixInput {
            stream: &mut self.screen,
            role: AudioRole::SystemAudio,
            gain: gains.effective(AudioRole::SystemAudio),
        }];
        if let Some(microphone) = self.microphone.as_mut() {
            inputs.push(MixInput {
                stream: microphone,
                role: AudioRole::Microphone,
                gain: gains.effective(AudioRole::Microphone),
            });
        }
        MixGraph::build(inputs, settings)
    }

    fn release_all(&mut self) {
        self.screen.release();
        if let Some(microphone) = self.microphone.as_mut() {
            microphone.release();
        }
        if let Some(camera) = self.camera.as_mut() {
            camera.release();
        }
    }
}

struct ActiveSession {
    id: String,
    source_id: String,
    streams: SessionStreams,
    graph: MixGraph,
    gains: Gains,
    chunks: ChunkSequence,
    events: Receiver<EncoderEvent>,
    /// The encoder raised `Completed` before a stop was requested.
    encoder_completed: bool,
    started_at: Instant,
    paused_total: Duration,
    paused_at: Option<Instant>,
    source_ids: Vec<String>,
    source_switches: u32,
}

impl ActiveSession {
    fn elapsed(&self) -> Duration {
        let paused_now = self.paused_at.map(|at| at.elapsed()).unwrap_or_default();
        self.started_at
            .elapsed()
            .saturating_sub(self.paused_total + paused_now)
    }

    fn mark_paused(&mut self) {
        if self.paused_at.is_none() {
            self.paused_at = Some(Instant::now());
        }
    }

    fn mark_resumed(&mut self) {
        if let Some(at) = self.paused_at.take() {
            self.paused_total += at.elapsed();
        }
    }

    /// Swap in a new screen stream and rebuild the graph around it.
    fn replace_screen(
        &mut self,
        replacement: MediaStreamHandle,
        source_id: &str,
        settings: &MixSettings,
    ) -> Result<CombinedStream, CaptureError> {
        self.graph.disconnect();
        let mut previous = std::mem::replace(&mut self.streams.screen, replacement);
        previous.release();

        self.graph = self.streams.build_graph(&self.gains, settings);
        self.source_id = source_id.to_string();
        self.source_ids.push(self.source_id.clone());
        self.source_switches += 1;

        combined_stream(&self.streams.screen, &self.graph)
    }

    /// Block until the encoder reports completion, appending the final chunks.
    ///
    /// Returns the error that ended the flush early, if any.
    fn drain_until_completed(&mut self) -> Option<CaptureError> {
        loop {
            match self.events.recv() {
                Ok(EncoderEvent::Chunk(data)) => {
                    self.chunks.push(data);
                }
                Ok(EncoderEvent::Completed) => return None,
                Ok(EncoderEvent::Error(message)) => return Some(CaptureError::EncoderFault(message)),
                Err(_) => {
                    return Some(CaptureError::EncoderFault(
                        "encoder closed before completing".into(),
                    ))
                }
            }
        }
    }

    /// Apply whatever is still queued without waiting for more.
    ///
    /// Used when the encoder has already completed and will emit nothing else.
    fn drain_pending(&mut self) -> Option<CaptureError> {
        loop {
            match self.events.try_recv() {
                Ok(EncoderEvent::Chunk(data)) => {
                    self.chunks.push(data);
                }
                Ok(EncoderEvent::Completed) => {}
                Ok(EncoderEvent::Error(message)) => return Some(CaptureError::EncoderFault(message)),
                Err(_) => return None,
            }
        }
    }

    fn teardown(&mut self) {
        self.graph.disconnect();
        self.streams.release_all();
    }

    fn summary(&self, mime_type: &str) -> SessionSummary {
        SessionSummary {
            session_id: self.id.clone(),
            mime_type: mime_type.to_string(),
            duration_secs: self.elapsed().as_secs_f64(),
            source_ids: self.source_ids.clone(),
            source_switches: self.source_switches,
        }
    }
}

fn combined_stream(screen: &MediaStreamHandle, graph: &MixGraph) -> Result<CombinedStream, CaptureError> {
    let video_track = screen.video_track().ok_or_else(|| {
        CaptureError::DeviceUnavailable(format!("screen stream {} has no video track", screen.id()))
    })?;
    Ok(CombinedStream {
        video_stream_id: screen.id().to_string(),
        video_track,
        audio: graph.output(),
    })
}

fn no_session() -> CaptureError {
    CaptureError::InvalidState("no active recording session".into())
}

/// The single owner of a recording session.
///
/// Generic over the platform capture backend and the media encoder.
/// Owns at most one session; every stream, the mixing graph, and the
/// chunk sequence live and die with it.
///
/// ```text
/// [Screen stream] → [Tap] → [Gain] ─┐
///                                   ├→ [Destination] ─┐
/// [Mic stream]    → [Tap] → [Gain] ─┘                 ├→ Encoder → EncoderEvents → ChunkSequence → ArtifactWriter
/// [Screen video] ─────────────────────────────────────┘
/// ```
///
/// Encoder events are queued and applied in emission order by
/// [`dispatch_events`](Self::dispatch_events) and [`stop`](Self::stop), both
/// called from the thread that owns the recorder.
pub struct Recorder<P: CaptureProvider, E: Encoder> {
    provider: P,
    encoder: E,
    config: RecorderConfiguration,
    delegate: Option<Arc<dyn RecorderDelegate>>,
    state: RecordingState,
    session: Option<ActiveSession>,
}

impl<P: CaptureProvider, E: Encoder> Recorder<P, E> {
    pub fn new(provider: P, encoder: E) -> Self {
        Self {
            provider,
            encoder,
            config: RecorderConfiguration::default(),
            delegate: None,
            state: RecordingState::Idle,
            session: None,
        }
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn RecorderDelegate>) {
        self.delegate = Some(delegate);
    }

    /// Apply configuration for the next session. Only valid while idle.
    pub fn configure(&mut self, config: RecorderConfiguration) -> Result<(), CaptureError> {
        if !self.state.is_idle() {
            return Err(CaptureError::InvalidState(
                "can only configure while idle".into(),
            ));
        }
        config.validate().map_err(CaptureError::ConfigurationFailed)?;
        self.config = config;
        Ok(())
    }

    pub fn configuration(&self) -> &RecorderConfiguration {
        &self.config
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.id.as_str())
    }

    /// Chunks collected so far in the current session.
    pub fn chunk_count(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.chunks.len())
    }

    /// Source id of the screen or window currently recorded.
    pub fn active_source_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.source_id.as_str())
    }

    /// Recorded time excluding pauses.
    pub fn duration_secs(&self) -> f64 {
        self.session.as_ref().map_or(0.0, |s| s.elapsed().as_secs_f64())
    }

    pub fn mix_graph(&self) -> Option<&MixGraph> {
        self.session.as_ref().map(|s| &s.graph)
    }

    pub fn levels(&self) -> AudioLevels {
        self.session.as_ref().map(|s| s.graph.levels()).unwrap_or_default()
    }

    /// Render the next block of mixed audio, for hosts that drive the
    /// encoder's audio input themselves.
    pub fn render_mix_block(&self) -> Option<Vec<f32>> {
        self.session.as_ref().map(|s| s.graph.output().render_block())
    }

    /// Configured gain for `role`; unaffected by the microphone toggle.
    pub fn gain(&self, role: AudioRole) -> f32 {
        match &self.session {
            Some(session) => session.gains.configured(role),
            None => self.config.initial_gain(role),
        }
    }

    pub fn microphone_enabled(&self) -> bool {
        self.session.as_ref().map_or(true, |s| s.gains.microphone_enabled)
    }

    pub fn camera_active(&self) -> bool {
        self.session
            .as_ref()
            .map_or(false, |s| s.streams.camera.as_ref().is_some_and(|c| !c.is_released()))
    }

    /// Start recording `source_id`. Transitions: idle → starting → recording.
    ///
    /// Any failure releases every stream acquired so far and returns to idle.
    pub fn start(&mut self, source_id: &str) -> Result<(), CaptureError> {
        if !self.state.is_idle() {
            return Err(CaptureError::InvalidState(format!(
                "cannot start while {}",
                self.state
            )));
        }

        self.set_state(RecordingState::Starting);
        match self.open_session(source_id) {
            Ok(session) => {
                log::info!("Recording session {} started on {}", session.id, source_id);
                self.session = Some(session);
                self.set_state(RecordingState::Recording);
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to start recording: {}", e);
                self.set_state(RecordingState::Idle);
                Err(e)
            }
        }
    }

    /// Ask the user for a source, then start. Cancelling leaves the recorder idle.
    pub fn start_with_selector(&mut self, selector: &dyn SourceSelector) -> Result<SelectionOutcome, CaptureError> {
        if !self.state.is_idle() {
            return Err(CaptureError::InvalidState(format!(
                "cannot start while {}",
                self.state
            )));
        }
        match choose_source(&self.provider, selector, SelectionPurpose::StartRecording)? {
            SourceChoice::Cancelled => Ok(SelectionOutcome::Cancelled),
            SourceChoice::Selected(id) => {
                self.start(&id)?;
                Ok(SelectionOutcome::Applied)
            }
        }
    }

    /// Transitions: recording → paused.
    pub fn pause(&mut self) -> Result<(), CaptureError> {
        if !self.state.is_recording() {
            return Err(CaptureError::InvalidState(format!(
                "can only pause while recording, not {}",
                self.state
            )));
        }
        if let Err(e) = self.encoder.pause() {
            return Err(self.fail_session(e));
        }
        self.enter_paused();
        Ok(())
    }

    /// Transitions: paused → recording.
    pub fn resume(&mut self) -> Result<(), CaptureError> {
        if !self.state.is_paused() {
            return Err(CaptureError::InvalidState(format!(
                "can only resume while paused, not {}",
                self.state
            )));
        }
        if let Err(e) = self.encoder.resume() {
            return Err(self.fail_session(e));
        }
        self.enter_recording();
        Ok(())
    }

    pub fn toggle_pause(&mut self) -> Result<(), CaptureError> {
        match self.state {
            RecordingState::Recording => self.pause(),
            RecordingState::Paused => self.resume(),
            other => Err(CaptureError::InvalidState(format!(
                "cannot toggle pause while {}",
                other
            ))),
        }
    }

    /// Replace the recorded screen or window without ending the session.
    ///
    /// The replacement is acquired first; if that fails the session is
    /// untouched. Chunks recorded before and after the switch form one
    /// sequence. A paused session stays paused.
    pub fn switch_source(&mut self, source_id: &str) -> Result<(), CaptureError> {
        if !self.state.is_active() || self.session.is_none() {
            return Err(CaptureError::InvalidState(format!(
                "can only switch source during a session, not {}",
                self.state
            )));
        }

        let request = CaptureRequest::Screen {
            source_id: source_id.to_string(),
            system_audio: self.config.capture_system_audio,
        };
        let mut replacement = acquire_stream(&mut self.provider, &request)?;

        let was_recording = self.state.is_recording();
        if was_recording {
            if let Err(e) = self.encoder.pause() {
                replacement.release();
                return Err(self.fail_session(e));
            }
            self.enter_paused();
        }

        let settings = self.config.mix.clone();
        let retargeted = self
            .session_mut()
            .and_then(|session| session.replace_screen(replacement, source_id, &settings))
            .and_then(|input| self.encoder.retarget(input));
        if let Err(e) = retargeted {
            return Err(self.fail_session(e));
        }

        if was_recording {
            if let Err(e) = self.encoder.resume() {
                return Err(self.fail_session(e));
            }
            self.enter_recording();
        }

        log::info!("Switched capture source to {}", source_id);
        Ok(())
    }

    /// Ask the user for a new source, then switch. Cancelling changes nothing.
    pub fn switch_source_with_selector(
        &mut self,
        selector: &dyn SourceSelector,
    ) -> Result<SelectionOutcome, CaptureError> {
        if !self.state.is_active() {
            return Err(CaptureError::InvalidState(format!(
                "can only switch source during a session, not {}",
                self.state
            )));
        }
        match choose_source(&self.provider, selector, SelectionPurpose::SwitchSource)? {
            SourceChoice::Cancelled => Ok(SelectionOutcome::Cancelled),
            SourceChoice::Selected(id) => {
                self.switch_source(&id)?;
                Ok(SelectionOutcome::Applied)
            }
        }
    }

    /// Set the gain of `role`; the next rendered block uses it.
    ///
    /// Setting the microphone gain also re-enables a disabled microphone.
    /// A role with no input in this session is `InvalidState`.
    pub fn set_gain(&mut self, role: AudioRole, gain: f32) -> Result<(), CaptureError> {
        validate_gain(gain).map_err(|e| CaptureError::ConfigurationFailed(format!("{:?} gain {}", role, e)))?;
        let session = self.session_mut()?;
        if session.graph.gain_handle(role).is_none() {
            return Err(CaptureError::InvalidState(format!("session has no {:?} input", role)));
        }
        session.gains.set(role, gain);
        if role == AudioRole::Microphone {
            session.gains.microphone_enabled = true;
        }
        session.graph.set_gain(role, session.gains.effective(role));
        log::debug!("{:?} gain set to {}", role, gain);
        Ok(())
    }

    /// Mute or restore the microphone, keeping its configured gain.
    pub fn set_microphone_enabled(&mut self, enabled: bool) -> Result<(), CaptureError> {
        let session = self.session_mut()?;
        if session.streams.microphone.is_none() {
            return Err(CaptureError::InvalidState("session has no microphone input".into()));
        }
        session.gains.microphone_enabled = enabled;
        session
            .graph
            .set_gain(AudioRole::Microphone, session.gains.effective(AudioRole::Microphone));
        log::debug!("Microphone {}", if enabled { "enabled" } else { "muted" });
        Ok(())
    }

    /// Acquire or release the camera mid-session. The mix is unaffected.
    pub fn set_camera_enabled(&mut self, enabled: bool) -> Result<(), CaptureError> {
        if !self.state.is_active() {
            return Err(no_session());
        }
        if enabled {
            if self.camera_active() {
                return Ok(());
            }
            let camera = acquire_stream(&mut self.provider, &CaptureRequest::Camera)?;
            let session = self.session_mut()?;
            if let Some(mut previous) = session.streams.camera.replace(camera) {
                previous.release();
            }
        } else if let Some(mut camera) = self.session_mut()?.streams.camera.take() {
            camera.release();
        }
        Ok(())
    }

    /// Apply every queued encoder event in emission order.
    ///
    /// Returns the number of events applied. An encoder error ends the
    /// session: every stream is released and the unflushed chunks are
    /// discarded.
    pub fn dispatch_events(&mut self) -> Result<usize, CaptureError> {
        let Some(session) = self.session.as_mut() else {
            return Ok(0);
        };

        let mut applied = 0;
        let mut fault = None;
        loop {
            match session.events.try_recv() {
                Ok(EncoderEvent::Chunk(data)) => {
                    session.chunks.push(data);
                    applied += 1;
                }
                Ok(EncoderEvent::Completed) => {
                    if !session.encoder_completed {
                        log::warn!("Encoder completed without a stop request, session {} awaits stop", session.id);
                    }
                    session.encoder_completed = true;
                    applied += 1;
                }
                Ok(EncoderEvent::Error(message)) => {
                    fault = Some(CaptureError::EncoderFault(message));
                    break;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    fault = Some(CaptureError::EncoderFault("encoder event queue closed".into()));
                    break;
                }
            }
        }

        if let Some(error) = fault {
            return Err(self.fail_session(error));
        }

        let levels = session.graph.levels();
        if let Some(ref delegate) = self.delegate {
            delegate.on_levels_updated(&levels);
        }
        Ok(applied)
    }

    /// Stop recording and finalize the artifact.
    ///
    /// Transitions: recording/paused → stopping → idle. Blocks until the
    /// encoder has flushed. Stopping an idle recorder does nothing and
    /// returns `Ok(None)`, as does a session that produced no data.
    pub fn stop(&mut self) -> Result<Option<RecordingArtifact>, CaptureError> {
        let Some(mut session) = self.session.take() else {
            log::debug!("Stop ignored: no active session");
            return Ok(None);
        };

        self.set_state(RecordingState::Stopping);
        session.mark_resumed();

        let flush_error = if session.encoder_completed {
            // A finished encoder emits nothing more, so waiting would block forever.
            log::debug!("Encoder already completed, finalizing session {}", session.id);
            session.drain_pending()
        } else {
            if let Err(e) = self.encoder.stop() {
                self.session = Some(session);
                return Err(self.fail_session(e));
            }
            session.drain_until_completed()
        };
        session.teardown();

        let finalized = if session.chunks.is_empty() {
            None
        } else {
            let summary = session.summary(&self.config.encoder.mime_type);
            let writer = ArtifactWriter::new(&self.config.output_directory);
            Some(writer.finalize(
                &session.chunks,
                &summary,
                &self.config.artifact_kind,
                &self.config.artifact_extension,
            ))
        };

        self.set_state(RecordingState::Idle);

        if let Some(ref error) = flush_error {
            log::error!("Encoder failed while flushing session {}: {}", session.id, error);
            self.notify_error(error);
        }

        match finalized {
            Some(Ok(artifact)) => {
                if let Some(ref delegate) = self.delegate {
                    delegate.on_artifact_ready(&artifact);
                }
                Ok(Some(artifact))
            }
            Some(Err(e)) => {
                log::error!("Failed to finalize session {}: {}", session.id, e);
                self.notify_error(&e);
                Err(e)
            }
            None => match flush_error {
                Some(error) => Err(error),
                None => {
                    log::info!("Session {} stopped without recorded data", session.id);
                    Ok(None)
                }
            },
        }
    }

    // --- Internal helpers ---

    fn open_session(&mut self, source_id: &str) -> Result<ActiveSession, CaptureError> {
        let screen = acquire_stream(
            &mut self.provider,
            &CaptureRequest::Screen {
                source_id: source_id.to_string(),
                system_audio: self.config.capture_system_audio,
            },
        )?;
        let mut streams = SessionStreams {
            screen,
            microphone: None,
            camera: None,
        };

        if let Err(e) = Self::acquire_companions(&mut self.provider, &self.config, &mut streams) {
            streams.release_all();
            return Err(e);
        }

        let gains = Gains::from_config(&self.config);
        let graph = streams.build_graph(&gains, &self.config.mix);
        let (events, receiver) = EncoderEvents::channel();

        let started = combined_stream(&streams.screen, &graph)
            .and_then(|input| self.encoder.start(input, &self.config.encoder, events));
        if let Err(e) = started {
            graph.disconnect();
            streams.release_all();
            return Err(e);
        }

        Ok(ActiveSession {
            id: uuid::Uuid::new_v4().to_string(),
            source_id: source_id.to_string(),
            streams,
            graph,
            gains,
            chunks: ChunkSequence::new(),
            events: receiver,
            encoder_completed: false,
            started_at: Instant::now(),
            paused_total: Duration::ZERO,
            paused_at: None,
            source_ids: vec![source_id.to_string()],
            source_switches: 0,
        })
    }

    /// Microphone and camera, as configured.
    fn acquire_companions(
        provider: &mut P,
        config: &RecorderConfiguration,
        streams: &mut SessionStreams,
    ) -> Result<(), CaptureError> {
        if let Some(constraints) = config.microphone {
            streams.microphone = Some(acquire_stream(provider, &CaptureRequest::Microphone(constraints))?);
        }
        if config.capture_camera {
            streams.camera = Some(acquire_stream(provider, &CaptureRequest::Camera)?);
        }
        Ok(())
    }

    fn session_mut(&mut self) -> Result<&mut ActiveSession, CaptureError> {
        self.session.as_mut().ok_or_else(no_session)
    }

    fn enter_paused(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.mark_paused();
        }
        self.set_state(RecordingState::Paused);
    }

    fn enter_recording(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.mark_resumed();
        }
        self.set_state(RecordingState::Recording);
    }

    /// End the session after an unrecoverable failure: abort the encoder,
    /// release everything, discard the chunks, return to idle.
    fn fail_session(&mut self, error: CaptureError) -> CaptureError {
        log::error!("Recording failed: {}", error);
        self.encoder.abort();
        if let Some(mut session) = self.session.take() {
            session.teardown();
            if !session.chunks.is_empty() {
                log::warn!(
                    "Discarding {} chunks of session {}",
                    session.chunks.len(),
                    session.id
                );
            }
        }
        self.set_state(RecordingState::Idle);
        self.notify_error(&error);
        error
    }

    fn notify_error(&self, error: &CaptureError) {
        if let Some(ref delegate) = self.delegate {
            delegate.on_error(error);
        }
    }

    fn set_state(&mut self, state: RecordingState) {
        log::debug!("Recorder state {} → {}", self.state, state);
        self.state = state;
        if let Some(ref delegate) = self.delegate {
            delegate.on_state_changed(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::media::{CaptureSource, StreamKind};
    use crate::test_support::{temp_output_dir, CollectingDelegate, FakeEncoder, FakeProvider};
    use approx::assert_abs_diff_eq;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::thread;

    struct Harness {
        recorder: Recorder<FakeProvider, FakeEncoder>,
        provider: FakeProvider,
        encoder: FakeEncoder,
        delegate: Arc<CollectingDelegate>,
        dir: PathBuf,
    }

    impl Drop for Harness {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.dir);
        }
    }

    fn harness(tweak: impl FnOnce(&mut RecorderConfiguration)) -> Harness {
        let provider = FakeProvider::with_sources(&["screen:1", "window:7"]);
        let encoder = FakeEncoder::default();
        let delegate = Arc::new(CollectingDelegate::default());
        let dir = temp_output_dir();

        let mut config = RecorderConfiguration {
            output_directory: dir.clone(),
            ..Default::default()
        };
        tweak(&mut config);

        let mut recorder = Recorder::new(provider.clone(), encoder.clone());
        recorder.configure(config).unwrap();
        recorder.set_delegate(delegate.clone());

        Harness {
            recorder,
            provider,
            encoder,
            delegate,
            dir,
        }
    }

    fn artifacts_on_disk(dir: &Path) -> usize {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "webm"))
            .count()
    }

    #[test]
    fn screen_and_microphone_scenario() {
        let mut h = harness(|c| {
            c.capture_system_audio = false;
            c.system_gain = 1.0;
            c.microphone_gain = 0.5;
        });
        h.recorder.start("screen:1").unwrap();

        let graph = h.recorder.mix_graph().unwrap();
        let roles: Vec<AudioRole> = graph.topology().into_iter().map(|(_, role)| role).collect();
        assert_eq!(roles, vec![AudioRole::SystemAudio, AudioRole::Microphone]);
        assert_eq!(h.encoder.current_input().unwrap().audio.tap_count(), 2);
        assert_eq!(graph.gain_handle(AudioRole::SystemAudio).unwrap().get(), 1.0);
        assert_eq!(graph.gain_handle(AudioRole::Microphone).unwrap().get(), 0.5);

        let mic = h.provider.live_of(StreamKind::Microphone).unwrap();
        mic.feed(&[1.0; 480]);
        let block = h.recorder.render_mix_block().unwrap();
        assert_abs_diff_eq!(block[0], 0.5, epsilon = 1e-6);

        for chunk in [b"c1", b"c2", b"c3"] {
            assert!(h.encoder.emit_chunk(chunk));
        }
        assert_eq!(h.recorder.dispatch_events().unwrap(), 3);

        let artifact = h.recorder.stop().unwrap().unwrap();
        assert_eq!(fs::read(&artifact.file_path).unwrap(), b"c1c2c3".to_vec());
        assert_eq!(artifact.chunk_count, 3);
        assert_eq!(h.recorder.state(), RecordingState::Idle);
        assert!(h.provider.live().is_empty());
    }

    #[test]
    fn start_hands_combined_stream_to_encoder() {
        let mut h = harness(|_| {});
        h.recorder.start("screen:1").unwrap();

        let input = h.encoder.current_input().unwrap();
        assert!(input.video_stream_id.starts_with("screen:1"));
        assert_eq!(input.audio.tap_count(), 2);
        let settings = h.encoder.settings().unwrap();
        assert_eq!(settings.mime_type, "video/webm;codecs=vp8,opus");
        assert_eq!(settings.video_bits_per_second, 2_500_000);
        assert_eq!(h.recorder.active_source_id(), Some("screen:1"));
        assert!(h.recorder.session_id().is_some());
    }

    #[test]
    fn second_start_is_invalid() {
        let mut h = harness(|_| {});
        h.recorder.start("screen:1").unwrap();
        let err = h.recorder.start("window:7").unwrap_err();
        assert!(matches!(err, CaptureError::InvalidState(_)));
        assert_eq!(h.provider.acquired_of(StreamKind::Screen).len(), 1);
    }

    #[test]
    fn failed_microphone_releases_screen() {
        let mut h = harness(|_| {});
        h.provider
            .fail(StreamKind::Microphone, CaptureError::DeviceDenied("microphone".into()));

        let err = h.recorder.start("screen:1").unwrap_err();

        assert_eq!(err, CaptureError::DeviceDenied("microphone".into()));
        assert_eq!(h.recorder.state(), RecordingState::Idle);
        assert_eq!(h.provider.acquired().len(), 1);
        assert!(h.provider.live().is_empty());
        assert_eq!(
            *h.delegate.states.lock(),
            vec![RecordingState::Starting, RecordingState::Idle]
        );
    }

    #[test]
    fn failed_camera_releases_screen_and_microphone() {
        let mut h = harness(|c| c.capture_camera = true);
        h.provider
            .fail(StreamKind::Camera, CaptureError::DeviceUnavailable("camera".into()));

        assert!(h.recorder.start("screen:1").is_err());
        assert_eq!(h.provider.acquired().len(), 2);
        assert!(h.provider.live().is_empty());
    }

    #[test]
    fn failed_encoder_start_releases_everything() {
        let mut h = harness(|_| {});
        h.encoder
            .fail_next_start(CaptureError::EncoderFault("unsupported codec".into()));

        let err = h.recorder.start("screen:1").unwrap_err();

        assert!(matches!(err, CaptureError::EncoderFault(_)));
        assert!(h.provider.live().is_empty());
        assert_eq!(h.recorder.state(), RecordingState::Idle);

        h.recorder.start("screen:1").unwrap();
        assert_eq!(h.recorder.state(), RecordingState::Recording);
    }

    #[test]
    fn stale_source_fails_start() {
        let mut h = harness(|_| {});
        let err = h.recorder.start("window:closed").unwrap_err();
        assert!(matches!(err, CaptureError::DeviceUnavailable(_)));
        assert!(h.provider.acquired().is_empty());
    }

    #[test]
    fn stop_when_idle_is_noop() {
        let mut h = harness(|_| {});
        assert_eq!(h.recorder.stop().unwrap(), None);
        assert_eq!(h.recorder.state(), RecordingState::Idle);
        assert!(h.delegate.states.lock().is_empty());
        assert_eq!(h.encoder.stop_count(), 0);
    }

    #[test]
    fn full_lifecycle_notifies_delegate() {
        let mut h = harness(|_| {});
        h.recorder.start("screen:1").unwrap();
        h.encoder.emit_chunk(b"data");
        h.recorder.dispatch_events().unwrap();

        let artifact = h.recorder.stop().unwrap().unwrap();

        assert_eq!(
            *h.delegate.states.lock(),
            vec![
                RecordingState::Starting,
                RecordingState::Recording,
                RecordingState::Stopping,
                RecordingState::Idle,
            ]
        );
        assert_eq!(h.delegate.artifacts.lock().as_slice(), &[artifact.clone()]);
        assert_eq!(h.delegate.levels.lock().len(), 1);
        assert!(h.delegate.errors.lock().is_empty());
        assert_eq!(artifact.metadata.source_ids, vec!["screen:1".to_string()]);
        assert!(artifact
            .file_path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("recording-"));
    }

    #[test]
    fn stop_includes_flushed_chunk() {
        let mut h = harness(|_| {});
        h.recorder.start("screen:1").unwrap();
        h.encoder.emit_chunk(b"body-");
        h.encoder.set_flush(b"tail");

        let artifact = h.recorder.stop().unwrap().unwrap();

        assert_eq!(fs::read(&artifact.file_path).unwrap(), b"body-tail".to_vec());
        assert_eq!(artifact.chunk_count, 2);
    }

    #[test]
    fn stop_without_data_writes_nothing() {
        let mut h = harness(|_| {});
        h.recorder.start("screen:1").unwrap();
        h.encoder.emit_chunk(b"");

        assert_eq!(h.recorder.stop().unwrap(), None);
        assert_eq!(artifacts_on_disk(&h.dir), 0);
        assert!(h.provider.live().is_empty());
    }

    #[test]
    fn stop_waits_for_late_completion() {
        let mut h = harness(|_| {});
        h.recorder.start("screen:1").unwrap();
        h.encoder.emit_chunk(b"early-");
        h.encoder.set_flush(b"late");
        h.encoder.hold_completion();

        let encoder = h.encoder.clone();
        let completer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            encoder.emit_completed();
        });

        let artifact = h.recorder.stop().unwrap().unwrap();
        completer.join().unwrap();

        assert_eq!(fs::read(&artifact.file_path).unwrap(), b"early-late".to_vec());
    }

    #[test]
    fn pause_resume_is_gap_free() {
        let mut h = harness(|_| {});
        h.recorder.start("screen:1").unwrap();
        h.encoder.emit_chunk(b"a");

        h.recorder.pause().unwrap();
        assert_eq!(h.recorder.state(), RecordingState::Paused);
        assert!(h.encoder.is_paused());
        assert!(!h.encoder.emit_chunk(b"x"));

        h.recorder.resume().unwrap();
        assert_eq!(h.recorder.state(), RecordingState::Recording);
        h.encoder.emit_chunk(b"b");
        h.encoder.set_flush(b"c");

        let artifact = h.recorder.stop().unwrap().unwrap();
        assert_eq!(fs::read(&artifact.file_path).unwrap(), b"abc".to_vec());
        assert_eq!(h.provider.acquired().len(), 2);
        assert_eq!(h.encoder.start_count(), 1);
    }

    #[test]
    fn pause_and_resume_require_matching_state() {
        let mut h = harness(|_| {});
        assert!(matches!(h.recorder.pause(), Err(CaptureError::InvalidState(_))));
        assert!(matches!(h.recorder.resume(), Err(CaptureError::InvalidState(_))));

        h.recorder.start("screen:1").unwrap();
        assert!(matches!(h.recorder.resume(), Err(CaptureError::InvalidState(_))));
        h.recorder.pause().unwrap();
        assert!(matches!(h.recorder.pause(), Err(CaptureError::InvalidState(_))));
    }

    #[test]
    fn toggle_pause_flips_state() {
        let mut h = harness(|_| {});
        assert!(h.recorder.toggle_pause().is_err());
        h.recorder.start("screen:1").unwrap();
        h.recorder.toggle_pause().unwrap();
        assert_eq!(h.recorder.state(), RecordingState::Paused);
        h.recorder.toggle_pause().unwrap();
        assert_eq!(h.recorder.state(), RecordingState::Recording);
    }

    #[test]
    fn switch_source_keeps_chunk_order() {
        let mut h = harness(|_| {});
        h.recorder.start("screen:1").unwrap();
        h.encoder.emit_chunk(b"1");
        h.encoder.emit_chunk(b"2");
        let old_screen = h.provider.live_of(StreamKind::Screen).unwrap();

        h.recorder.switch_source("window:7").unwrap();

        assert!(old_screen.is_released());
        assert_eq!(h.recorder.state(), RecordingState::Recording);
        assert_eq!(h.recorder.active_source_id(), Some("window:7"));
        let inputs = h.encoder.inputs();
        assert_eq!(inputs.len(), 2);
        assert!(inputs[1].video_stream_id.starts_with("window:7"));
        assert_eq!(h.encoder.start_count(), 1);

        h.encoder.emit_chunk(b"3");
        let artifact = h.recorder.stop().unwrap().unwrap();

        assert_eq!(fs::read(&artifact.file_path).unwrap(), b"123".to_vec());
        assert_eq!(
            artifact.metadata.source_ids,
            vec!["screen:1".to_string(), "window:7".to_string()]
        );
        assert_eq!(artifact.metadata.source_switches, 1);
        assert!(h.provider.live().is_empty());
    }

    #[test]
    fn switch_source_pauses_around_swap() {
        let mut h = harness(|_| {});
        h.recorder.start("screen:1").unwrap();
        h.recorder.switch_source("window:7").unwrap();

        assert_eq!(
            *h.delegate.states.lock(),
            vec![
                RecordingState::Starting,
                RecordingState::Recording,
                RecordingState::Paused,
                RecordingState::Recording,
            ]
        );
        assert!(!h.encoder.is_paused());
    }

    #[test]
    fn switch_while_paused_stays_paused() {
        let mut h = harness(|_| {});
        h.recorder.start("screen:1").unwrap();
        h.recorder.pause().unwrap();

        h.recorder.switch_source("window:7").unwrap();

        assert_eq!(h.recorder.state(), RecordingState::Paused);
        assert!(h.encoder.is_paused());
    }

    #[test]
    fn failed_switch_leaves_session_untouched() {
        let mut h = harness(|_| {});
        h.recorder.start("screen:1").unwrap();
        h.encoder.emit_chunk(b"kept");
        let screen = h.provider.live_of(StreamKind::Screen).unwrap();

        let err = h.recorder.switch_source("window:closed").unwrap_err();

        assert!(matches!(err, CaptureError::DeviceUnavailable(_)));
        assert_eq!(h.recorder.state(), RecordingState::Recording);
        assert_eq!(h.recorder.active_source_id(), Some("screen:1"));
        assert!(!screen.is_released());
        assert!(screen.has_sink());
        assert_eq!(h.encoder.inputs().len(), 1);
        assert_eq!(h.recorder.dispatch_events().unwrap(), 1);
    }

    #[test]
    fn failed_retarget_is_fatal() {
        let mut h = harness(|_| {});
        h.recorder.start("screen:1").unwrap();
        h.encoder
            .fail_next_retarget(CaptureError::EncoderFault("retarget".into()));

        let err = h.recorder.switch_source("window:7").unwrap_err();

        assert!(matches!(err, CaptureError::EncoderFault(_)));
        assert_eq!(h.recorder.state(), RecordingState::Idle);
        assert!(h.provider.live().is_empty());
        assert!(h.encoder.is_aborted());
    }

    #[test]
    fn switch_requires_session() {
        let mut h = harness(|_| {});
        let err = h.recorder.switch_source("window:7").unwrap_err();
        assert!(matches!(err, CaptureError::InvalidState(_)));
        assert!(h.provider.acquired().is_empty());
    }

    #[test]
    fn switch_rebuilds_graph_and_keeps_gains() {
        let mut h = harness(|_| {});
        h.recorder.start("screen:1").unwrap();
        h.recorder.set_gain(AudioRole::Microphone, 0.3).unwrap();
        h.recorder.set_gain(AudioRole::SystemAudio, 0.8).unwrap();

        h.recorder.switch_source("window:7").unwrap();

        let graph = h.recorder.mix_graph().unwrap();
        assert_eq!(graph.tap_count(), 2);
        let new_screen = h.provider.live_of(StreamKind::Screen).unwrap();
        assert!(new_screen.has_sink());
        assert_eq!(graph.topology()[0].0, new_screen.id);
        assert_eq!(graph.gain_handle(AudioRole::Microphone).unwrap().get(), 0.3);
        assert_eq!(graph.gain_handle(AudioRole::SystemAudio).unwrap().get(), 0.8);
        assert_eq!(h.encoder.current_input().unwrap().audio.tap_count(), 2);
    }

    #[test]
    fn switch_without_system_audio_still_rebuilds() {
        let mut h = harness(|c| c.capture_system_audio = false);
        h.recorder.start("screen:1").unwrap();
        let old_screen = h.provider.live_of(StreamKind::Screen).unwrap();

        h.recorder.switch_source("window:7").unwrap();

        assert!(!old_screen.has_sink());
        let graph = h.recorder.mix_graph().unwrap();
        assert!(graph.topology()[0].0.starts_with("window:7"));
    }

    #[test]
    fn selector_cancel_changes_nothing() {
        let mut h = harness(|_| {});
        let cancel = |_: &[CaptureSource], _: SelectionPurpose| SourceChoice::Cancelled;

        assert_eq!(
            h.recorder.start_with_selector(&cancel).unwrap(),
            SelectionOutcome::Cancelled
        );
        assert_eq!(h.recorder.state(), RecordingState::Idle);
        assert!(h.provider.acquired().is_empty());

        let first = |sources: &[CaptureSource], _: SelectionPurpose| SourceChoice::Selected(sources[0].id.clone());
        assert_eq!(
            h.recorder.start_with_selector(&first).unwrap(),
            SelectionOutcome::Applied
        );

        assert_eq!(
            h.recorder.switch_source_with_selector(&cancel).unwrap(),
            SelectionOutcome::Cancelled
        );
        assert_eq!(h.recorder.active_source_id(), Some("screen:1"));
        assert_eq!(h.provider.acquired_of(StreamKind::Screen).len(), 1);
    }

    #[test]
    fn switch_with_selector_enumerates_fresh() {
        let mut h = harness(|_| {});
        h.recorder.start("screen:1").unwrap();
        h.provider.set_sources(&["screen:1", "window:9"]);
        let last = |sources: &[CaptureSource], purpose: SelectionPurpose| {
            assert_eq!(purpose, SelectionPurpose::SwitchSource);
            SourceChoice::Selected(sources[sources.len() - 1].id.clone())
        };

        assert_eq!(
            h.recorder.switch_source_with_selector(&last).unwrap(),
            SelectionOutcome::Applied
        );
        assert_eq!(h.recorder.active_source_id(), Some("window:9"));
    }

    #[test]
    fn most_recent_gain_wins() {
        let mut h = harness(|_| {});
        h.recorder.start("screen:1").unwrap();

        for gain in [0.1, 2.0, 0.0, 0.75] {
            h.recorder.set_gain(AudioRole::Microphone, gain).unwrap();
        }

        assert_eq!(h.recorder.gain(AudioRole::Microphone), 0.75);
        let mic = h.provider.live_of(StreamKind::Microphone).unwrap();
        mic.feed(&[1.0; 480]);
        let block = h.recorder.render_mix_block().unwrap();
        assert_abs_diff_eq!(block[0], 0.75, epsilon = 1e-6);
    }

    #[test]
    fn invalid_gain_is_rejected() {
        let mut h = harness(|_| {});
        h.recorder.start("screen:1").unwrap();
        assert!(matches!(
            h.recorder.set_gain(AudioRole::Microphone, -1.0),
            Err(CaptureError::ConfigurationFailed(_))
        ));
        assert!(h.recorder.set_gain(AudioRole::SystemAudio, f32::NAN).is_err());
        assert_eq!(h.recorder.gain(AudioRole::Microphone), 1.0);
    }

    #[test]
    fn set_gain_requires_session() {
        let mut h = harness(|_| {});
        assert!(matches!(
            h.recorder.set_gain(AudioRole::Microphone, 0.5),
            Err(CaptureError::InvalidState(_))
        ));
        assert_eq!(h.recorder.gain(AudioRole::SystemAudio), 0.5);
    }

    #[test]
    fn microphone_toggle_restores_gain() {
        let mut h = harness(|c| c.microphone_gain = 0.8);
        h.recorder.start("screen:1").unwrap();

        h.recorder.set_microphone_enabled(false).unwrap();
        let handle = h.recorder.mix_graph().unwrap().gain_handle(AudioRole::Microphone).unwrap();
        assert_eq!(handle.get(), 0.0);
        assert_eq!(h.recorder.gain(AudioRole::Microphone), 0.8);
        assert!(!h.recorder.microphone_enabled());

        h.recorder.set_microphone_enabled(true).unwrap();
        assert_eq!(handle.get(), 0.8);

        h.recorder.set_microphone_enabled(false).unwrap();
        h.recorder.set_gain(AudioRole::Microphone, 0.4).unwrap();
        assert!(h.recorder.microphone_enabled());
        assert_eq!(handle.get(), 0.4);
    }

    #[test]
    fn muted_microphone_survives_switch() {
        let mut h = harness(|_| {});
        h.recorder.start("screen:1").unwrap();
        h.recorder.set_microphone_enabled(false).unwrap();

        h.recorder.switch_source("window:7").unwrap();

        let graph = h.recorder.mix_graph().unwrap();
        assert_eq!(graph.gain_handle(AudioRole::Microphone).unwrap().get(), 0.0);
        assert!(!h.recorder.microphone_enabled());
    }

    #[test]
    fn recording_without_microphone_has_one_tap() {
        let mut h = harness(|c| c.microphone = None);
        h.recorder.start("screen:1").unwrap();
        assert_eq!(h.recorder.mix_graph().unwrap().tap_count(), 1);
        assert!(h.provider.acquired_of(StreamKind::Microphone).is_empty());
    }

    #[test]
    fn microphone_controls_need_a_microphone() {
        let mut h = harness(|c| c.microphone = None);
        h.recorder.start("screen:1").unwrap();

        assert!(matches!(
            h.recorder.set_gain(AudioRole::Microphone, 0.3),
            Err(CaptureError::InvalidState(_))
        ));
        assert!(matches!(
            h.recorder.set_microphone_enabled(false),
            Err(CaptureError::InvalidState(_))
        ));
        assert!(h.recorder.microphone_enabled());
        assert_eq!(h.recorder.gain(AudioRole::Microphone), 1.0);
        h.recorder.set_gain(AudioRole::SystemAudio, 0.2).unwrap();
        assert_eq!(h.recorder.state(), RecordingState::Recording);
    }

    #[test]
    fn camera_toggle_mid_session() {
        let mut h = harness(|_| {});
        h.recorder.start("screen:1").unwrap();
        assert!(!h.recorder.camera_active());

        h.recorder.set_camera_enabled(true).unwrap();
        h.recorder.set_camera_enabled(true).unwrap();
        assert!(h.recorder.camera_active());
        assert_eq!(h.provider.acquired_of(StreamKind::Camera).len(), 1);
        assert_eq!(h.recorder.mix_graph().unwrap().tap_count(), 2);

        h.recorder.set_camera_enabled(false).unwrap();
        assert!(!h.recorder.camera_active());
        assert!(h.provider.acquired_of(StreamKind::Camera)[0].is_released());
    }

    #[test]
    fn camera_denied_keeps_session() {
        let mut h = harness(|_| {});
        h.recorder.start("screen:1").unwrap();
        h.provider
            .fail(StreamKind::Camera, CaptureError::DeviceDenied("camera".into()));

        assert!(h.recorder.set_camera_enabled(true).is_err());
        assert_eq!(h.recorder.state(), RecordingState::Recording);
        assert!(!h.recorder.camera_active());
    }

    #[test]
    fn camera_from_configuration_is_released_on_stop() {
        let mut h = harness(|c| c.capture_camera = true);
        h.recorder.start("screen:1").unwrap();
        assert!(h.recorder.camera_active());

        h.recorder.stop().unwrap();
        assert!(h.provider.live().is_empty());
    }

    #[test]
    fn encoder_error_discards_session() {
        let mut h = harness(|_| {});
        h.recorder.start("screen:1").unwrap();
        h.encoder.emit_chunk(b"lost");
        h.encoder.emit_error("gpu reset");

        let err = h.recorder.dispatch_events().unwrap_err();

        assert_eq!(err, CaptureError::EncoderFault("gpu reset".into()));
        assert_eq!(h.recorder.state(), RecordingState::Idle);
        assert_eq!(h.recorder.chunk_count(), 0);
        assert!(h.provider.live().is_empty());
        assert!(h.encoder.is_aborted());
        assert_eq!(artifacts_on_disk(&h.dir), 0);
        assert_eq!(h.delegate.errors.lock().as_slice(), &[err]);
        assert_eq!(h.recorder.stop().unwrap(), None);
    }

    #[test]
    fn encoder_error_while_paused_discards_session() {
        let mut h = harness(|_| {});
        h.recorder.start("screen:1").unwrap();
        h.encoder.emit_chunk(b"before pause");
        h.recorder.pause().unwrap();
        h.encoder.emit_error("disk full");

        let err = h.recorder.dispatch_events().unwrap_err();

        assert_eq!(err, CaptureError::EncoderFault("disk full".into()));
        assert_eq!(h.recorder.state(), RecordingState::Idle);
        assert!(h.provider.live().is_empty());
        assert!(h.encoder.is_aborted());
        assert_eq!(artifacts_on_disk(&h.dir), 0);
        assert_eq!(h.recorder.stop().unwrap(), None);
    }

    #[test]
    fn early_completion_finalizes_on_stop() {
        let mut h = harness(|_| {});
        h.recorder.start("screen:1").unwrap();
        h.encoder.emit_chunk(b"data");
        h.encoder.emit_completed();
        assert_eq!(h.recorder.dispatch_events().unwrap(), 2);
        assert_eq!(h.recorder.state(), RecordingState::Recording);

        // A finished encoder never completes a second time.
        h.encoder.hold_completion();
        let artifact = h.recorder.stop().unwrap().unwrap();

        assert_eq!(fs::read(&artifact.file_path).unwrap(), b"data".to_vec());
        assert_eq!(h.encoder.stop_count(), 0);
        assert_eq!(h.recorder.state(), RecordingState::Idle);
        assert!(h.provider.live().is_empty());
        assert_eq!(artifacts_on_disk(&h.dir), 1);
        assert_eq!(h.delegate.artifacts.lock().len(), 1);
    }

    #[test]
    fn chunks_queued_after_early_completion_are_kept() {
        let mut h = harness(|_| {});
        h.recorder.start("screen:1").unwrap();
        h.encoder.emit_chunk(b"a");
        h.encoder.emit_completed();
        h.recorder.dispatch_events().unwrap();
        h.encoder.emit_chunk(b"b");
        h.encoder.hold_completion();

        let artifact = h.recorder.stop().unwrap().unwrap();

        assert_eq!(fs::read(&artifact.file_path).unwrap(), b"ab".to_vec());
        assert!(h.provider.live().is_empty());
        assert_eq!(artifacts_on_disk(&h.dir), 1);
    }

    #[test]
    fn encoder_error_while_flushing_keeps_data() {
        let mut h = harness(|_| {});
        h.recorder.start("screen:1").unwrap();
        h.encoder.emit_chunk(b"saved");
        h.encoder.hold_completion();

        let encoder = h.encoder.clone();
        let failer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            encoder.emit_error("muxer closed");
        });

        let artifact = h.recorder.stop().unwrap().unwrap();
        failer.join().unwrap();

        assert_eq!(fs::read(&artifact.file_path).unwrap(), b"saved".to_vec());
        assert_eq!(
            h.delegate.errors.lock().as_slice(),
            &[CaptureError::EncoderFault("muxer closed".into())]
        );
        assert_eq!(h.recorder.state(), RecordingState::Idle);
    }

    #[test]
    fn encoder_stop_failure_discards() {
        let mut h = harness(|_| {});
        h.recorder.start("screen:1").unwrap();
        h.encoder.emit_chunk(b"x");
        h.encoder
            .fail_next_stop(CaptureError::EncoderFault("stop".into()));

        assert!(h.recorder.stop().is_err());
        assert_eq!(h.recorder.state(), RecordingState::Idle);
        assert!(h.provider.live().is_empty());
        assert_eq!(artifacts_on_disk(&h.dir), 0);
    }

    #[test]
    fn configure_only_while_idle() {
        let mut h = harness(|_| {});
        let bad = RecorderConfiguration {
            microphone_gain: f32::INFINITY,
            ..Default::default()
        };
        assert!(matches!(
            h.recorder.configure(bad),
            Err(CaptureError::ConfigurationFailed(_))
        ));

        h.recorder.start("screen:1").unwrap();
        assert!(matches!(
            h.recorder.configure(RecorderConfiguration::default()),
            Err(CaptureError::InvalidState(_))
        ));
    }

    #[test]
    fn idle_accessors() {
        let h = harness(|_| {});
        assert_eq!(h.recorder.chunk_count(), 0);
        assert_eq!(h.recorder.active_source_id(), None);
        assert_eq!(h.recorder.duration_secs(), 0.0);
        assert!(h.recorder.render_mix_block().is_none());
        assert_eq!(h.recorder.levels(), AudioLevels::default());
    }
}
