use std::path::PathBuf;

use media_capture_core::transcode::progress::FALLBACK_REFERENCE_SECS;

/// Configuration for the ffmpeg backend.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscoderConfig {
    /// ffmpeg executable, resolved through `PATH` when relative (default: `ffmpeg`).
    pub program: PathBuf,

    /// ffprobe executable (default: `ffprobe`).
    pub probe_program: PathBuf,

    /// Probe the input duration before starting so progress is relative to
    /// the real length (default: true).
    pub probe_duration: bool,

    /// Progress reference used when the duration is unknown (default: 600 s).
    pub reference_duration_secs: f64,

    /// How often `wait` checks whether the process has exited, in milliseconds.
    pub poll_interval_ms: u64,
}

impl TranscoderConfig {
    /// Use an ffmpeg binary at `program`, looking for ffprobe next to it.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        let program = program.into();
        let probe_program = match program.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.join(probe_name()),
            _ => PathBuf::from(probe_name()),
        };
        Self {
            program,
            probe_program,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.program.as_os_str().is_empty() {
            return Err("ffmpeg program path is empty".into());
        }
        if !(self.reference_duration_secs.is_finite() && self.reference_duration_secs > 0.0) {
            return Err(format!(
                "reference duration must be positive, got {}",
                self.reference_duration_secs
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err("poll interval must be non-zero".into());
        }
        Ok(())
    }
}

fn probe_name() -> &'static str {
    if cfg!(windows) {
        "ffprobe.exe"
    } else {
        "ffprobe"
    }
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("ffmpeg"),
            probe_program: PathBuf::from("ffprobe"),
            probe_duration: true,
            reference_duration_secs: FALLBACK_REFERENCE_SECS,
            poll_interval_ms: 50,
        }
    }
}
