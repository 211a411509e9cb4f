use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

/// Percent reference used when the input duration is unknown.
pub const FALLBACK_REFERENCE_SECS: f64 = 600.0;

static TIMECODE: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();

fn timecode_regex() -> Option<&'static Regex> {
    TIMECODE
        .get_or_init(|| Regex::new(r"(\d\d):(\d\d):(\d\d)\.(\d\d)"))
        .as_ref()
        .ok()
}

/// Elapsed position reported by the transcoder, `HH:MM:SS.hh`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timecode {
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
    pub hundredths: u32,
}

impl Timecode {
    /// Find the first `HH:MM:SS.hh` in `text`.
    pub fn parse(text: &str) -> Option<Self> {
        let caps = timecode_regex()?.captures(text)?;
        let field = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
        Some(Self {
            hours: field(1)?,
            minutes: field(2)?,
            seconds: field(3)?,
            hundredths: field(4)?,
        })
    }

    /// Whole seconds, hundredths dropped.
    pub fn whole_seconds(&self) -> u64 {
        self.hours as u64 * 3600 + self.minutes as u64 * 60 + self.seconds as u64
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.whole_seconds() as f64 + self.hundredths as f64 / 100.0
    }

    pub fn as_duration(&self) -> Duration {
        Duration::from_millis(self.whole_seconds() * 1000 + self.hundredths as u64 * 10)
    }
}

impl fmt::Display for Timecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}.{:02}",
            self.hours, self.minutes, self.seconds, self.hundredths
        )
    }
}

/// One progress report of a running transcode.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeProgress {
    pub timemark: Timecode,
    /// 0–100, rounded.
    pub percent: u8,
    pub fps: Option<f32>,
    pub bitrate_kbps: Option<f32>,
}

impl TranscodeProgress {
    /// Percent is elapsed whole seconds over `reference_secs`, capped at 100.
    /// A missing or non-positive reference falls back to 600 s.
    pub fn from_timemark(timemark: Timecode, reference_secs: Option<f64>) -> Self {
        let reference = reference_secs
            .filter(|r| r.is_finite() && *r > 0.0)
            .unwrap_or(FALLBACK_REFERENCE_SECS);
        let percent = (timemark.whole_seconds() as f64 / reference * 100.0).round().min(100.0);
        Self {
            timemark,
            percent: percent as u8,
            fps: None,
            bitrate_kbps: None,
        }
    }
}

/// Parse one ffmpeg status line, e.g.
/// `frame=  240 fps= 60 q=28.0 size=  512kB time=00:00:04.00 bitrate=1048.6kbits/s speed=2x`.
///
/// Lines without a `time=` field yield None.
pub fn parse_progress_line(line: &str, reference_secs: Option<f64>) -> Option<TranscodeProgress> {
    let time = field_value(line, "time=")?;
    let timemark = Timecode::parse(time)?;
    let mut progress = TranscodeProgress::from_timemark(timemark, reference_secs);
    progress.fps = field_value(line, "fps=").and_then(|v| v.parse().ok());
    progress.bitrate_kbps = field_value(line, "bitrate=")
        .map(|v| v.trim_end_matches("kbits/s"))
        .and_then(|v| v.parse().ok());
    Some(progress)
}

/// Value following `key`, allowing the padding ffmpeg puts after `=`.
fn field_value<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let start = line.find(key)? + key.len();
    line[start..].split_whitespace().next()
}
