use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::FfmpegError;

/// Container duration of `input` in seconds, as reported by ffprobe.
pub fn probe_duration(probe_program: &Path, input: &Path) -> Result<f64, FfmpegError> {
    let program = probe_program.to_string_lossy().into_owned();
    let output = Command::new(probe_program)
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(input)
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
        });
    }

    parse_duration_output(&String::from_utf8_lossy(&output.stdout))
}

/// ffprobe prints a bare number, or `N/A` for streams without a duration.
fn parse_duration_output(stdout: &str) -> Result<f64, FfmpegError> {
    let text = stdout.trim();
    match text.lines().next().map(str::trim).and_then(|l| l.parse::<f64>().ok()) {
        Some(secs) if secs.is_finite() && secs > 0.0 => Ok(secs),
        _ => Err(FfmpegError::ProbeOutput(text.to_string())),
    }
}
