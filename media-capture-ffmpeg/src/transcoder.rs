use std::collections::HashMap;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;

use media_capture_core::transcode::progress::parse_progress_line;
use media_capture_core::{CaptureError, ProgressCallback, TranscodeHandle, TranscodeJob, TranscodeOutcome, Transcoder};

use crate::args::build_args;
use crate::config::TranscoderConfig;
use crate::error::FfmpegError;
use crate::probe::probe_duration;

struct RunningJob {
    child: Child,
    output: PathBuf,
    cancelled: Arc<AtomicBool>,
    stderr_reader: Option<JoinHandle<Option<String>>>,
}

/// Runs each [`TranscodeJob`] as its own ffmpeg child process.
///
/// Progress is parsed from the child's stderr on a dedicated thread and
/// forwarded to the job's callback. Several jobs may run at once; each is
/// addressed by the [`TranscodeHandle`] returned from `start`.
pub struct FfmpegTranscoder {
    config: TranscoderConfig,
    jobs: Mutex<HashMap<u64, RunningJob>>,
    next_id: AtomicU64,
}

impl FfmpegTranscoder {
    pub fn new(config: TranscoderConfig) -> Self {
        Self {
            config,
            jobs: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> &TranscoderConfig {
        &self.config
    }

    /// Check that ffmpeg can be launched. Returns its version banner line.
    pub fn verify(&self) -> Result<String, CaptureError> {
        let program = self.program_name();
        let output = Command::new(&self.config.program)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .map_err(|source| FfmpegError::Spawn {
                program: program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(FfmpegError::Exited {
                program,
                status: output.status,
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let banner = stdout.lines().next().unwrap_or_default().trim().to_string();
        log::info!("Using {}", banner);
        Ok(banner)
    }

    /// Number of jobs started and not yet waited on.
    pub fn pending_jobs(&self) -> usize {
        self.jobs.lock().len()
    }

    fn program_name(&self) -> String {
        self.config.program.to_string_lossy().into_owned()
    }

    /// Progress reference for `input`: the probed duration when available.
    fn reference_secs(&self, input: &Path) -> f64 {
        if !self.config.probe_duration {
            return self.config.reference_duration_secs;
        }
        match probe_duration(&self.config.probe_program, input) {
            Ok(secs) => {
                log::debug!("{} is {:.2}s long", input.display(), secs);
                secs
            }
            Err(e) => {
                log::warn!(
                    "Could not probe {}, progress assumes {}s: {}",
                    input.display(),
                    self.config.reference_duration_secs,
                    e
                );
                self.config.reference_duration_secs
            }
        }
    }

    fn finish(&self, id: u64, mut job: RunningJob, status: io::Result<std::process::ExitStatus>) -> TranscodeOutcome {
        let last_message = job
            .stderr_reader
            .take()
            .and_then(|reader| reader.join().ok())
            .flatten();

        if job.cancelled.load(Ordering::SeqCst) {
            if job.output.exists() {
                if let Err(e) = fs::remove_file(&job.output) {
                    log::warn!("Failed to remove partial output {}: {}", job.output.display(), e);
                }
            }
            log::info!("Transcode {} cancelled", id);
            return TranscodeOutcome::Cancelled;
        }

        let status = match status {
            Ok(status) => status,
            Err(e) => return TranscodeOutcome::Failed(FfmpegError::Io(e).into()),
        };

        if status.success() {
            log::info!("Transcode {} finished: {}", id, job.output.display());
            TranscodeOutcome::Completed { output: job.output }
        } else {
            let err = FfmpegError::Exited {
                program: self.program_name(),
                status,
                message: last_message.unwrap_or_else(|| "no diagnostic output".into()),
            };
            log::warn!("Transcode {} failed: {}", id, err);
            TranscodeOutcome::Failed(err.into())
        }
    }
}

impl Transcoder for FfmpegTranscoder {
    fn start(&self, job: TranscodeJob, on_progress: ProgressCallback) -> Result<TranscodeHandle, CaptureError> {
        self.config.validate().map_err(CaptureError::ConfigurationFailed)?;
        job.validate()?;
        for input in job.inputs() {
            if !input.is_file() {
                return Err(CaptureError::ConfigurationFailed(format!(
                    "input not found: {}",
                    input.display()
                )));
            }
        }
        if let Some(dir) = job.output.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .map_err(|e| CaptureError::StorageError(format!("failed to create {}: {}", dir.display(), e)))?;
        }

        let reference = self.reference_secs(&job.input);
        let args = build_args(&job);
        log::info!(
            "Starting {}: {} -> {}",
            job.describe(),
            job.input.display(),
            job.output.display()
        );
        log::debug!("{} {}", self.program_name(), args.join(" "));

        let mut child = Command::new(&self.config.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| FfmpegError::Spawn {
                program: self.program_name(),
                source,
            })?;

        let stderr_reader = match child.stderr.take() {
            Some(stderr) => {
                let spawned = thread::Builder::new()
                    .name("ffmpeg-progress".into())
                    .spawn(move || read_progress(stderr, Some(reference), &on_progress));
                match spawned {
                    Ok(reader) => Some(reader),
                    Err(e) => {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(FfmpegError::Io(e).into());
                    }
                }
            }
            None => None,
        };

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.jobs.lock().insert(
            id,
            RunningJob {
                child,
                output: job.output,
                cancelled: Arc::new(AtomicBool::new(false)),
                stderr_reader,
            },
        );
        Ok(TranscodeHandle::new(id))
    }

    fn cancel(&self, handle: TranscodeHandle) -> Result<(), CaptureError> {
        let mut jobs = self.jobs.lock();
        let Some(job) = jobs.get_mut(&handle.id()) else {
            return Ok(());
        };
        job.cancelled.store(true, Ordering::SeqCst);
        // The process may already have exited; wait() still reports Cancelled.
        if let Err(e) = job.child.kill() {
            log::debug!("Kill of transcode {} ignored: {}", handle.id(), e);
        }
        Ok(())
    }

    fn wait(&self, handle: TranscodeHandle) -> TranscodeOutcome {
        let poll = Duration::from_millis(self.config.poll_interval_ms.max(1));
        loop {
            let finished = {
                let mut jobs = self.jobs.lock();
                let Some(job) = jobs.get_mut(&handle.id()) else {
                    return TranscodeOutcome::Failed(CaptureError::InvalidState(format!(
                        "unknown transcode {}",
                        handle.id()
                    )));
                };
                match job.child.try_wait() {
                    Ok(Some(status)) => jobs.remove(&handle.id()).map(|job| (job, Ok(status))),
                    Ok(None) => None,
                    Err(e) => jobs.remove(&handle.id()).map(|job| (job, Err(e))),
                }
            };

            if let Some((job, status)) = finished {
                return self.finish(handle.id(), job, status);
            }
            thread::sleep(poll);
        }
    }
}

impl Drop for FfmpegTranscoder {
    fn drop(&mut self) {
        for (id, mut job) in self.jobs.lock().drain() {
            log::warn!("Killing unfinished transcode {}", id);
            let _ = job.child.kill();
            let _ = job.child.wait();
        }
    }
}

/// Read ffmpeg's stderr until EOF, reporting every status line.
///
/// ffmpeg rewrites its status line with `\r`, so both `\r` and `\n` end a
/// line. Returns the last non-status line, which on failure is usually the
/// error message.
fn read_progress<R: Read>(mut stderr: R, reference_secs: Option<f64>, on_progress: &ProgressCallback) -> Option<String> {
    let mut buf = [0u8; 4096];
    let mut line = Vec::new();
    let mut last_message = None;

    loop {
        let n = match stderr.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                log::debug!("Stopped reading ffmpeg output: {}", e);
                break;
            }
        };
        for &byte in &buf[..n] {
            if byte == b'\r' || byte == b'\n' {
                handle_line(&line, reference_secs, on_progress, &mut last_message);
                line.clear();
            } else {
                line.push(byte);
            }
        }
    }
    handle_line(&line, reference_secs, on_progress, &mut last_message);
    last_message
}

fn handle_line(
    raw: &[u8],
    reference_secs: Option<f64>,
    on_progress: &ProgressCallback,
    last_message: &mut Option<String>,
) {
    let text = String::from_utf8_lossy(raw);
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    match parse_progress_line(text, reference_secs) {
        Some(progress) => on_progress(&progress),
        None => *last_message = Some(text.to_string()),
    }
}
