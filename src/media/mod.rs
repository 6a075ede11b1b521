//! Media adapters around the external ffmpeg toolchain.
//!
//! - [`transcoder`]: container/codec input to canonical PCM WAV
//! - [`prober`]: duration lookup with a fixed fallback

pub mod prober;
pub mod transcoder;

pub use prober::{parse_duration, DurationProber, FfprobeProber, DEFAULT_DURATION_SECS};
pub use transcoder::{FfmpegTranscoder, Transcoder};

/// Maximum number of stderr lines kept in a tool diagnostic.
const DIAGNOSTIC_LINES: usize = 20;

/// Returns the last lines of a tool's stderr as a single diagnostic string.
///
/// Tools such as ffmpeg print a banner and progress before the actual error,
/// so only the tail is useful to a caller.
pub(crate) fn diagnostic_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .collect();
    let start = lines.len().saturating_sub(DIAGNOSTIC_LINES);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_keeps_tail() {
        let stderr: String = (0..30).map(|i| format!("line {}\n", i)).collect();
        let tail = diagnostic_tail(stderr.as_bytes());
        assert!(tail.starts_with("line 10"));
        assert!(tail.ends_with("line 29"));
        assert_eq!(tail.lines().count(), DIAGNOSTIC_LINES);
    }

    #[test]
    fn diagnostic_skips_blank_lines() {
        let tail = diagnostic_tail(b"\n\nInvalid data found\n\n");
        assert_eq!(tail, "Invalid data found");
        assert_eq!(diagnostic_tail(b""), "");
    }
}
