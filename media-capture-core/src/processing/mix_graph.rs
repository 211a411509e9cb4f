use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::capture::handle::MediaStreamHandle;
use crate::models::config::MixSettings;
use crate::models::media::{AudioLevels, AudioRole};
use crate::processing::gain_mixer::GainMixer;
use crate::processing::tap_buffer::TapBuffer;
use crate::traits::capture_provider::AudioBufferCallback;

/// Shared gain value for one route of the graph.
///
/// Updates are lock-free and visible to the next rendered block.
#[derive(Debug, Clone)]
pub struct GainHandle {
    role: AudioRole,
    bits: Arc<AtomicU32>,
}

impl GainHandle {
    fn new(role: AudioRole, gain: f32) -> Self {
        Self {
            role,
            bits: Arc::new(AtomicU32::new(gain.to_bits())),
        }
    }

    pub fn role(&self) -> AudioRole {
        self.role
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Acquire))
    }

    pub fn set(&self, gain: f32) {
        self.bits.store(gain.to_bits(), Ordering::Release);
    }
}

/// Buffers one stream's audio for the render pass.
struct SourceTap {
    stream_id: String,
    buffer: Arc<Mutex<TapBuffer>>,
    connected: Arc<AtomicBool>,
}

struct GainNode {
    gain: GainHandle,
}

/// A tap and the single gain node it feeds.
struct Route {
    tap: SourceTap,
    gain: GainNode,
}

/// The single mix destination every gain node feeds.
struct MixDestination {
    routes: Vec<Route>,
    block_frames: usize,
    sample_rate: f64,
    levels: Mutex<AudioLevels>,
    blocks_rendered: AtomicU64,
}

impl MixDestination {
    fn render_block(&self) -> Vec<f32> {
        let mut block = vec![0.0f32; self.block_frames];
        let mut levels = AudioLevels::default();

        for route in &self.routes {
            let samples = route.tap.buffer.lock().pull_block(self.block_frames);
            let gain = route.gain.gain.get();
            levels.set(
                route.gain.gain.role(),
                GainMixer::rms_level(&samples) * gain,
                GainMixer::peak_level(&samples) * gain,
            );
            GainMixer::accumulate(&mut block, &samples, gain);
        }

        *self.levels.lock() = levels;
        self.blocks_rendered.fetch_add(1, Ordering::Relaxed);
        block
    }
}

/// One audio input of the graph.
pub struct MixInput<'a> {
    pub stream: &'a mut MediaStreamHandle,
    pub role: AudioRole,
    pub gain: f32,
}

/// Audio mixing graph: source tap → gain node → shared destination.
///
/// ```text
/// [Screen stream] → [Tap] → [Gain 0.5] ─┐
///                                       ├→ [Destination] → MixOutput (encoder pulls blocks)
/// [Mic stream]    → [Tap] → [Gain 1.0] ─┘
/// ```
///
/// The graph is never patched: replacing a stream means building a new graph.
/// Dropping the graph disconnects every tap, so late callbacks from a
/// stream that still points at an old tap are ignored.
pub struct MixGraph {
    destination: Arc<MixDestination>,
}

impl MixGraph {
    /// Build a graph over `inputs`, attaching a tap to each stream.
    ///
    /// With no inputs the destination renders silence.
    pub fn build(inputs: Vec<MixInput<'_>>, settings: &MixSettings) -> Self {
        let mixer = GainMixer::new(settings.sample_rate);
        let capacity = settings.tap_capacity();

        let routes = inputs
            .into_iter()
            .map(|input| {
                let buffer = Arc::new(Mutex::new(TapBuffer::new(capacity)));
                let connected = Arc::new(AtomicBool::new(true));

                let sink_buffer = Arc::clone(&buffer);
                let sink_connected = Arc::clone(&connected);
                let mixer = mixer.clone();
                let callback: AudioBufferCallback = Arc::new(move |samples: &[f32], sample_rate: f64, channels: u16| {
                    if !sink_connected.load(Ordering::Acquire) {
                        return;
                    }
                    let mono = mixer.condition(samples, sample_rate, channels);
                    sink_buffer.lock().push(&mono);
                });
                input.stream.attach_audio_sink(callback);

                log::debug!(
                    "mix tap on stream {} ({:?}, gain {})",
                    input.stream.id(),
                    input.role,
                    input.gain
                );

                Route {
                    tap: SourceTap {
                        stream_id: input.stream.id().to_string(),
                        buffer,
                        connected,
                    },
                    gain: GainNode {
                        gain: GainHandle::new(input.role, input.gain),
                    },
                }
            })
            .collect();

        Self {
            destination: Arc::new(MixDestination {
                routes,
                block_frames: settings.block_frames,
                sample_rate: settings.sample_rate,
                levels: Mutex::new(AudioLevels::default()),
                blocks_rendered: AtomicU64::new(0),
            }),
        }
    }

    /// Pull side of the destination, handed to the encoder.
    pub fn output(&self) -> MixOutput {
        MixOutput {
            destination: Arc::clone(&self.destination),
        }
    }

    /// Gain handle of the first route with `role`.
    pub fn gain_handle(&self, role: AudioRole) -> Option<GainHandle> {
        self.destination
            .routes
            .iter()
            .find(|r| r.gain.gain.role() == role)
            .map(|r| r.gain.gain.clone())
    }

    /// Set the gain of every route with `role`. Returns false if none exists.
    pub fn set_gain(&self, role: AudioRole, gain: f32) -> bool {
        let mut found = false;
        for route in self.destination.routes.iter().filter(|r| r.gain.gain.role() == role) {
            route.gain.gain.set(gain);
            found = true;
        }
        found
    }

    /// (stream id, role) of every tap, in build order.
    pub fn topology(&self) -> Vec<(String, AudioRole)> {
        self.destination
            .routes
            .iter()
            .map(|r| (r.tap.stream_id.clone(), r.gain.gain.role()))
            .collect()
    }

    pub fn tap_count(&self) -> usize {
        self.destination.routes.len()
    }

    pub fn levels(&self) -> AudioLevels {
        *self.destination.levels.lock()
    }

    pub fn is_connected(&self) -> bool {
        self.destination
            .routes
            .iter()
            .all(|r| r.tap.connected.load(Ordering::Acquire))
    }

    /// Disconnect every tap and discard buffered audio.
    pub fn disconnect(&self) {
        for route in &self.destination.routes {
            route.tap.connected.store(false, Ordering::Release);
            route.tap.buffer.lock().clear();
        }
    }
}

impl Drop for MixGraph {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Pull side of a graph's destination.
///
/// Cloneable and `Send`; outlives its graph, rendering silence once the
/// graph is disconnected.
#[derive(Clone)]
pub struct MixOutput {
    destination: Arc<MixDestination>,
}

impl MixOutput {
    /// Render the next block: every tap's next `block_frames` samples,
    /// scaled by the current gain, summed.
    pub fn render_block(&self) -> Vec<f32> {
        self.destination.render_block()
    }

    pub fn block_frames(&self) -> usize {
        self.destination.block_frames
    }

    pub fn sample_rate(&self) -> f64 {
        self.destination.sample_rate
    }

    pub fn tap_count(&self) -> usize {
        self.destination.routes.len()
    }

    pub fn blocks_rendered(&self) -> u64 {
        self.destination.blocks_rendered.load(Ordering::Relaxed)
    }
}
