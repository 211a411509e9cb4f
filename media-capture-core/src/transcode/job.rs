use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::config::validate_gain;
use crate::models::error::CaptureError;

/// Container a conversion produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Mp4,
    Webm,
    Mkv,
    Avi,
    Mov,
    Gif,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 6] = [Self::Mp4, Self::Webm, Self::Mkv, Self::Avi, Self::Mov, Self::Gif];

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Webm => "webm",
            Self::Mkv => "mkv",
            Self::Avi => "avi",
            Self::Mov => "mov",
            Self::Gif => "gif",
        }
    }

    pub fn video_codec(&self) -> &'static str {
        match self {
            Self::Mp4 | Self::Mkv | Self::Mov => "libx264",
            Self::Webm => "libvpx",
            Self::Avi => "mpeg4",
            Self::Gif => "gif",
        }
    }

    /// None for formats without an audio stream.
    pub fn audio_codec(&self) -> Option<&'static str> {
        match self {
            Self::Mp4 | Self::Mkv | Self::Mov => Some("aac"),
            Self::Webm => Some("libopus"),
            Self::Avi => Some("libmp3lame"),
            Self::Gif => None,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    /// Accepts `mp4`, `MP4` and `.mp4`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().trim_start_matches('.').to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.extension() == wanted)
            .ok_or_else(|| format!("unsupported output format: {}", s))
    }
}

/// Bitrate and scaling applied by a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityPreset {
    High,
    #[default]
    Medium,
    Low,
}

/// Output frame size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scale {
    Original,
    /// Scale to this height, width following the aspect ratio.
    Height(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualitySettings {
    pub video_bitrate_kbps: u32,
    pub audio_bitrate_kbps: u32,
    pub scale: Scale,
}

impl QualitySettings {
    /// Bitrate argument as the transcoder expects it, e.g. `2500k`.
    pub fn video_bitrate(&self) -> String {
        format!("{}k", self.video_bitrate_kbps)
    }

    pub fn audio_bitrate(&self) -> String {
        format!("{}k", self.audio_bitrate_kbps)
    }
}

impl QualityPreset {
    pub fn settings(&self) -> QualitySettings {
        match self {
            Self::High => QualitySettings {
                video_bitrate_kbps: 5000,
                audio_bitrate_kbps: 192,
                scale: Scale::Original,
            },
            Self::Medium => QualitySettings {
                video_bitrate_kbps: 2500,
                audio_bitrate_kbps: 128,
                scale: Scale::Height(720),
            },
            Self::Low => QualitySettings {
                video_bitrate_kbps: 1000,
                audio_bitrate_kbps: 96,
                scale: Scale::Height(480),
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for QualityPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QualityPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            _ => Err(format!("unknown quality preset: {}", s)),
        }
    }
}

/// What the transcoder does with the input.
#[derive(Debug, Clone, PartialEq)]
pub enum TranscodeTask {
    /// Re-encode into another container at a quality preset.
    Convert { format: OutputFormat, quality: QualityPreset },
    /// Drop the video and write the audio track as 16-bit PCM WAV.
    ExtractAudio,
    /// Mix a second audio file under the video's own audio.
    ///
    /// Gains are linear: 0 silent, 1.0 unchanged.
    MergeAudio {
        audio_input: PathBuf,
        video_gain: f32,
        audio_gain: f32,
    },
}

/// One transcoder invocation: input file, output file, task.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeJob {
    pub input: PathBuf,
    pub output: PathBuf,
    pub task: TranscodeTask,
}

impl TranscodeJob {
    /// `<output_dir>/<input stem>_converted_<epoch-millis>.<ext>`.
    pub fn convert(
        input: impl Into<PathBuf>,
        output_dir: &Path,
        format: OutputFormat,
        quality: QualityPreset,
    ) -> Result<Self, CaptureError> {
        let input = input.into();
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| CaptureError::ConfigurationFailed(format!("input has no file name: {}", input.display())))?;
        let output = output_dir.join(converted_name(&stem, now_millis(), format));
        Ok(Self {
            input,
            output,
            task: TranscodeTask::Convert { format, quality },
        })
    }

    /// `<output_dir>/extracted-audio-<epoch-millis>.wav`.
    pub fn extract_audio(input: impl Into<PathBuf>, output_dir: &Path) -> Self {
        Self {
            input: input.into(),
            output: output_dir.join(format!("extracted-audio-{}.wav", now_millis())),
            task: TranscodeTask::ExtractAudio,
        }
    }

    /// `<output_dir>/merged-video-<epoch-millis>.webm`.
    pub fn merge(
        video: impl Into<PathBuf>,
        audio: impl Into<PathBuf>,
        output_dir: &Path,
        video_gain: f32,
        audio_gain: f32,
    ) -> Result<Self, CaptureError> {
        let job = Self {
            input: video.into(),
            output: output_dir.join(format!("merged-video-{}.webm", now_millis())),
            task: TranscodeTask::MergeAudio {
                audio_input: audio.into(),
                video_gain,
                audio_gain,
            },
        };
        job.validate()?;
        Ok(job)
    }

    /// Short task label for logs.
    pub fn describe(&self) -> &'static str {
        match self.task {
            TranscodeTask::Convert { .. } => "convert",
            TranscodeTask::ExtractAudio => "extract-audio",
            TranscodeTask::MergeAudio { .. } => "merge",
        }
    }

    /// Every file the job reads.
    pub fn inputs(&self) -> Vec<&Path> {
        let mut inputs = vec![self.input.as_path()];
        if let TranscodeTask::MergeAudio { audio_input, .. } = &self.task {
            inputs.push(audio_input.as_path());
        }
        inputs
    }

    pub fn validate(&self) -> Result<(), CaptureError> {
        if self.output.as_os_str().is_empty() {
            return Err(CaptureError::ConfigurationFailed("output path is empty".into()));
        }
        for input in self.inputs() {
            if input.as_os_str().is_empty() {
                return Err(CaptureError::ConfigurationFailed("input path is empty".into()));
            }
            if input == self.output {
                return Err(CaptureError::ConfigurationFailed(format!(
                    "output would overwrite input {}",
                    input.display()
                )));
            }
        }
        if let TranscodeTask::MergeAudio {
            video_gain, audio_gain, ..
        } = self.task
        {
            validate_gain(video_gain).map_err(|e| CaptureError::ConfigurationFailed(format!("video volume {}", e)))?;
            validate_gain(audio_gain).map_err(|e| CaptureError::ConfigurationFailed(format!("audio volume {}", e)))?;
        }
        Ok(())
    }
}

fn converted_name(stem: &str, epoch_millis: i64, format: OutputFormat) -> String {
    format!("{}_converted_{}.{}", stem, epoch_millis, format.extension())
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
