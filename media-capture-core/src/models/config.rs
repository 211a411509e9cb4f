use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::media::{AudioConstraints, AudioRole};

/// Settings handed to the encoder when a session starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderSettings {
    /// Container and codec identifier (default: `video/webm;codecs=vp8,opus`).
    pub mime_type: String,

    /// Target video bitrate in bits per second (default: 2.5 Mbit/s).
    pub video_bits_per_second: u32,

    /// Target audio bitrate in bits per second (default: 128 kbit/s).
    pub audio_bits_per_second: u32,

    /// Chunk emission interval in milliseconds (default: 1000).
    pub timeslice_ms: u64,
}

impl EncoderSettings {
    pub fn timeslice(&self) -> Duration {
        Duration::from_millis(self.timeslice_ms)
    }
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            mime_type: "video/webm;codecs=vp8,opus".into(),
            video_bits_per_second: 2_500_000,
            audio_bits_per_second: 128_000,
            timeslice_ms: 1000,
        }
    }
}

/// Mixing graph processing parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixSettings {
    /// Mix sample rate in Hz (default: 48000).
    pub sample_rate: f64,

    /// Frames rendered per block (default: 480, i.e. 10 ms at 48 kHz).
    pub block_frames: usize,

    /// Seconds of audio buffered per source tap before the oldest is dropped.
    pub tap_buffer_secs: f64,
}

impl MixSettings {
    pub fn tap_capacity(&self) -> usize {
        ((self.sample_rate * self.tap_buffer_secs) as usize).max(self.block_frames)
    }
}

impl Default for MixSettings {
    fn default() -> Self {
        Self {
            sample_rate: 48000.0,
            block_frames: 480,
            tap_buffer_secs: 2.0,
        }
    }
}

/// Configuration for a recorder.
///
/// Applied at `start`; changing it mid-session has no effect until the next one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfiguration {
    /// Directory where finalized artifacts are written.
    pub output_directory: PathBuf,

    /// Artifact name prefix; files are named `<kind>-<epoch-millis>.<ext>`.
    pub artifact_kind: String,

    /// Artifact file extension (default: `webm`).
    pub artifact_extension: String,

    /// Capture the desktop audio alongside the screen (default: true).
    pub capture_system_audio: bool,

    /// Acquire the camera when the session starts (default: false).
    pub capture_camera: bool,

    /// Microphone capture constraints, or None to record without a microphone.
    pub microphone: Option<AudioConstraints>,

    /// Initial microphone gain (default: 1.0).
    pub microphone_gain: f32,

    /// Initial system/screen audio gain (default: 0.5).
    pub system_gain: f32,

    pub encoder: EncoderSettings,

    pub mix: MixSettings,
}

impl RecorderConfiguration {
    pub fn initial_gain(&self, role: AudioRole) -> f32 {
        match role {
            AudioRole::SystemAudio => self.system_gain,
            AudioRole::Microphone => self.microphone_gain,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        validate_gain(self.microphone_gain).map_err(|e| format!("microphone gain {}", e))?;
        validate_gain(self.system_gain).map_err(|e| format!("system gain {}", e))?;
        if self.mix.sample_rate <= 0.0 {
            return Err("mix sample rate must be positive".into());
        }
        if self.mix.block_frames == 0 {
            return Err("mix block size must be non-zero".into());
        }
        if self.encoder.timeslice_ms == 0 {
            return Err("encoder timeslice must be non-zero".into());
        }
        if self.encoder.video_bits_per_second == 0 || self.encoder.audio_bits_per_second == 0 {
            return Err("encoder bitrates must be positive".into());
        }
        if self.encoder.mime_type.trim().is_empty() {
            return Err("encoder mime type is empty".into());
        }
        for (name, value) in [
            ("artifact kind", &self.artifact_kind),
            ("artifact extension", &self.artifact_extension),
        ] {
            if value.is_empty() || value.contains(['/', '\\', '.']) {
                return Err(format!("invalid {}: {:?}", name, value));
            }
        }
        Ok(())
    }

    /// Load a configuration preset from JSON. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, String> {
        let config: Self = serde_json::from_str(json).map_err(|e| format!("invalid configuration: {}", e))?;
        config.validate()?;
        Ok(config)
    }
}

/// A gain is a finite real number, 0 muted, 1.0 unity.
pub fn validate_gain(value: f32) -> Result<(), String> {
    if !value.is_finite() || value < 0.0 {
        return Err(format!("must be a finite non-negative number, got {}", value));
    }
    Ok(())
}

impl Default for RecorderConfiguration {
    fn default() -> Self {
        Self {
            output_directory: PathBuf::from("."),
            artifact_kind: "recording".into(),
            artifact_extension: "webm".into(),
            capture_system_audio: true,
            capture_camera: false,
            microphone: Some(AudioConstraints::default()),
            microphone_gain: 1.0,
            system_gain: 0.5,
            encoder: EncoderSettings::default(),
            mix: MixSettings::default(),
        }
    }
}
