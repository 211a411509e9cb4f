//! # media-capture-ffmpeg
//!
//! ffmpeg backend for media-capture-kit transcoding.
//!
//! Provides:
//! - `FfmpegTranscoder`: [`Transcoder`](media_capture_core::Transcoder) that runs one
//!   `ffmpeg` child process per job and reports `time=` progress from its stderr
//! - `probe_duration`: input duration via `ffprobe`, used to scale progress
//! - `build_args`: the ffmpeg command line for a `TranscodeJob`
//!
//! ## Usage
//! ```ignore
//! use std::sync::Arc;
//! use media_capture_core::{OutputFormat, QualityPreset, TranscodeJob, Transcoder};
//! use media_capture_ffmpeg::{FfmpegTranscoder, TranscoderConfig};
//!
//! let transcoder = FfmpegTranscoder::new(TranscoderConfig::default());
//! transcoder.verify()?;
//! let job = TranscodeJob::convert("in.webm", out_dir, OutputFormat::Mp4, QualityPreset::Medium)?;
//! let handle = transcoder.start(job, Arc::new(|p| println!("{}%", p.percent)))?;
//! let outcome = transcoder.wait(handle);
//! ```

pub mod args;
pub mod config;
pub mod error;
pub mod probe;
pub mod transcoder;

pub use args::build_args;
pub use config::TranscoderConfig;
pub use error::FfmpegError;
pub use probe::probe_duration;
pub use transcoder::FfmpegTranscoder;
