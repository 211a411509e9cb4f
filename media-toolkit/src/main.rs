//! media-toolkit: convert, extract audio from, and merge audio into
//! recordings with ffmpeg.
//!
//! Usage:
//!   media-toolkit verify                          Check that ffmpeg runs
//!   media-toolkit convert <INPUT> [-f mp4]        Re-encode to another format
//!   media-toolkit extract-audio <INPUT>           Write the audio track as WAV
//!   media-toolkit merge <VIDEO> <AUDIO>           Mix an audio file into a video

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

use media_capture_core::{
    OutputFormat, ProgressCallback, QualityPreset, TranscodeHandle, TranscodeJob, TranscodeOutcome, TranscodeProgress,
    Transcoder,
};
use media_capture_ffmpeg::{FfmpegTranscoder, TranscoderConfig};

const OUTPUT_FOLDER: &str = "Video Conversions";

#[derive(Parser)]
#[command(
    name = "media-toolkit",
    about = "Convert, extract and merge screen recordings",
    version
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// ffmpeg executable (ffprobe is looked up next to it)
    #[arg(long, global = true, default_value = "ffmpeg")]
    ffmpeg: PathBuf,

    /// Output directory [default: ~/Downloads/Video Conversions]
    #[arg(short, long, global = true)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that ffmpeg can be launched
    Verify,

    /// Re-encode a video into another container
    Convert {
        input: PathBuf,

        /// mp4, webm, mkv, avi, mov or gif
        #[arg(short, long, default_value = "mp4")]
        format: OutputFormat,

        /// high, medium or low
        #[arg(short, long, default_value = "medium")]
        quality: QualityPreset,
    },

    /// Extract the audio track as 16-bit PCM WAV
    ExtractAudio { input: PathBuf },

    /// Mix an audio file into a video's soundtrack
    Merge {
        video: PathBuf,
        audio: PathBuf,

        /// Original soundtrack volume in percent
        #[arg(long, default_value = "100")]
        video_volume: u32,

        /// Added audio volume in percent
        #[arg(long, default_value = "100")]
        audio_volume: u32,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let transcoder = Arc::new(FfmpegTranscoder::new(TranscoderConfig::with_program(&cli.ffmpeg)));

    if let Commands::Verify = cli.command {
        let banner = transcoder.verify().context("ffmpeg is not usable")?;
        println!("{}", banner);
        return Ok(());
    }

    let output_dir = match cli.output_dir {
        Some(dir) => dir,
        None => default_output_dir()?,
    };

    let job = match cli.command {
        Commands::Verify => return Ok(()),
        Commands::Convert { input, format, quality } => {
            TranscodeJob::convert(input, &output_dir, format, quality)?
        }
        Commands::ExtractAudio { input } => TranscodeJob::extract_audio(input, &output_dir),
        Commands::Merge {
            video,
            audio,
            video_volume,
            audio_volume,
        } => TranscodeJob::merge(
            video,
            audio,
            &output_dir,
            percent_to_gain(video_volume),
            percent_to_gain(audio_volume),
        )?,
    };

    let interrupt = Arc::new(Interrupt::default());
    {
        let transcoder = Arc::clone(&transcoder);
        let interrupt = Arc::clone(&interrupt);
        ctrlc::set_handler(move || {
            log::warn!("Interrupted, cancelling");
            interrupt.trigger(&*transcoder);
        })
        .context("failed to install Ctrl-C handler")?;
    }

    let output = run(&*transcoder, &interrupt, job)?;
    println!("{}", output.display());
    Ok(())
}

/// Ctrl-C state shared with the signal handler.
#[derive(Default)]
struct Interrupt {
    /// Id of the running transcode, 0 when none.
    current: AtomicU64,
    requested: AtomicBool,
}

impl Interrupt {
    fn track(&self, handle: Option<TranscodeHandle>) {
        self.current.store(handle.map_or(0, |h| h.id()), Ordering::SeqCst);
    }

    fn trigger(&self, transcoder: &dyn Transcoder) {
        self.requested.store(true, Ordering::SeqCst);
        self.cancel_current(transcoder);
    }

    fn cancel_current(&self, transcoder: &dyn Transcoder) {
        let id = self.current.load(Ordering::SeqCst);
        if id == 0 {
            return;
        }
        if let Err(e) = transcoder.cancel(TranscodeHandle::new(id)) {
            log::warn!("Failed to cancel transcode {}: {}", id, e);
        }
    }

    fn requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

/// Start `job` and block until it ends, logging each new percent.
fn run(transcoder: &dyn Transcoder, interrupt: &Interrupt, job: TranscodeJob) -> anyhow::Result<PathBuf> {
    let task = job.describe();
    let last_percent = Arc::new(AtomicU8::new(u8::MAX));
    let on_progress: ProgressCallback = Arc::new(move |p: &TranscodeProgress| {
        if last_percent.swap(p.percent, Ordering::Relaxed) != p.percent {
            log::info!("{}: {}% ({})", task, p.percent, p.timemark);
        }
    });

    let output_path = job.output.clone();
    let handle = transcoder.start(job, on_progress)?;
    interrupt.track(Some(handle));
    if interrupt.requested() {
        interrupt.cancel_current(transcoder);
    }
    let outcome = transcoder.wait(handle);
    interrupt.track(None);

    match outcome {
        TranscodeOutcome::Completed { output } => Ok(output),
        TranscodeOutcome::Cancelled => bail!("{} was cancelled", task),
        // ffmpeg shares the terminal's process group and can exit on the
        // signal before the cancel lands.
        TranscodeOutcome::Failed(_) if interrupt.requested() => {
            if output_path.exists() {
                if let Err(e) = fs::remove_file(&output_path) {
                    log::warn!("Failed to remove partial output {}: {}", output_path.display(), e);
                }
            }
            bail!("{} was interrupted", task)
        }
        TranscodeOutcome::Failed(e) => Err(e).with_context(|| format!("{} failed", task)),
    }
}

fn default_output_dir() -> anyhow::Result<PathBuf> {
    let downloads = dirs_next::download_dir()
        .or_else(|| dirs_next::home_dir().map(|home| home.join("Downloads")))
        .context("could not determine a Downloads directory, pass --output-dir")?;
    Ok(conversions_dir(&downloads))
}

fn conversions_dir(downloads: &Path) -> PathBuf {
    downloads.join(OUTPUT_FOLDER)
}

fn percent_to_gain(percent: u32) -> f32 {
    percent as f32 / 100.0
}
