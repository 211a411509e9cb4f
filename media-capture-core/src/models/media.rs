use serde::{Deserialize, Serialize};

/// A selectable screen or application window available for video capture.
///
/// Enumerated fresh immediately before every selection and never cached.
/// The id goes stale if the window or screen closes mid-selection, in which
/// case acquisition fails with `DeviceUnavailable`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureSource {
    pub id: String,
    pub name: String,
    /// Encoded thumbnail image (PNG), if the platform supplied one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<Vec<u8>>,
}

impl CaptureSource {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            thumbnail: None,
        }
    }

    pub fn with_thumbnail(mut self, png: Vec<u8>) -> Self {
        self.thumbnail = Some(png);
        self
    }
}

/// Processing flags for a microphone capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioConstraints {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
}

impl Default for AudioConstraints {
    fn default() -> Self {
        Self {
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: false,
        }
    }
}

/// What a capture provider is asked to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureRequest {
    /// Screen or window video, optionally with the desktop audio mix.
    Screen { source_id: String, system_audio: bool },
    /// Camera video.
    Camera,
    /// Microphone audio.
    Microphone(AudioConstraints),
}

impl CaptureRequest {
    pub fn kind(&self) -> StreamKind {
        match self {
            Self::Screen { .. } => StreamKind::Screen,
            Self::Camera => StreamKind::Camera,
            Self::Microphone(_) => StreamKind::Microphone,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Screen,
    Camera,
    Microphone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
}

/// One track of an active stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackInfo {
    pub id: String,
    pub kind: TrackKind,
    pub label: String,
}

impl TrackInfo {
    pub fn new(id: impl Into<String>, kind: TrackKind, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            label: label.into(),
        }
    }
}

/// Role of an audio input in the mixing graph. Gains are configured per role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioRole {
    SystemAudio,
    Microphone,
}

/// An opaque fragment of encoded output.
///
/// `sequence` is assigned on arrival and is the concatenation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputChunk {
    pub sequence: u64,
    pub data: Vec<u8>,
}

/// Audio level metering per mix role (RMS and peak, 0.0–1.0).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AudioLevels {
    pub system_level: f32,
    pub microphone_level: f32,
    pub peak_system_level: f32,
    pub peak_microphone_level: f32,
}

impl AudioLevels {
    pub(crate) fn set(&mut self, role: AudioRole, rms: f32, peak: f32) {
        match role {
            AudioRole::SystemAudio => {
                self.system_level = rms;
                self.peak_system_level = peak;
            }
            AudioRole::Microphone => {
                self.microphone_level = rms;
                self.peak_microphone_level = peak;
            }
        }
    }
}
