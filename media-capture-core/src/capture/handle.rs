use std::fmt;

use crate::models::media::{StreamKind, TrackInfo, TrackKind};
use crate::traits::capture_provider::{AudioBufferCallback, MediaStream};

/// Exclusive owner of an acquired capture stream.
///
/// The device stays locked by the process until [`release`](Self::release)
/// is called. Release is idempotent; a handle dropped without release is
/// released on drop and logged, since that indicates a missed cleanup path.
pub struct MediaStreamHandle {
    stream: Box<dyn MediaStream>,
    kind: StreamKind,
    id: String,
    released: bool,
}

impl MediaStreamHandle {
    pub fn new(kind: StreamKind, stream: Box<dyn MediaStream>) -> Self {
        let id = stream.id().to_string();
        Self {
            stream,
            kind,
            id,
            released: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    pub fn tracks(&self) -> Vec<TrackInfo> {
        if self.released {
            return Vec::new();
        }
        self.stream.tracks()
    }

    pub fn has_audio(&self) -> bool {
        !self.released && self.stream.has_audio()
    }

    pub fn has_video(&self) -> bool {
        !self.released && self.stream.has_video()
    }

    /// First video track, if any.
    pub fn video_track(&self) -> Option<TrackInfo> {
        self.tracks().into_iter().find(|t| t.kind == TrackKind::Video)
    }

    pub fn attach_audio_sink(&mut self, callback: AudioBufferCallback) {
        if self.released {
            log::debug!("ignoring audio sink for released stream {}", self.id);
            return;
        }
        self.stream.attach_audio_sink(callback);
    }

    pub fn detach_audio_sink(&mut self) {
        if !self.released {
            self.stream.detach_audio_sink();
        }
    }

    /// Stop every track and unlock the device.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.stream.detach_audio_sink();
        self.stream.stop();
        self.released = true;
        log::info!("Released {:?} stream {}", self.kind, self.id);
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl Drop for MediaStreamHandle {
    fn drop(&mut self) {
        if !self.released {
            log::warn!("{:?} stream {} dropped without release; releasing", self.kind, self.id);
            self.release();
        }
    }
}

impl fmt::Debug for MediaStreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaStreamHandle")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("released", &self.released)
            .finish()
    }
}
