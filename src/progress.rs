//! Progress extraction from the encoder's diagnostic stream.
//!
//! ffmpeg announces the input duration once (`Duration: 00:01:30.00`) and
//! then prints the current position (`time=00:00:45.00`) while encoding.
//! The parser is a small per-job state machine: it waits for the duration
//! announcement, then derives a percentage from each time marker. Parsing is
//! best-effort and line-independent; a chunk with no match simply produces
//! no sample.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use uuid::Uuid;

static DURATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Duration:\s*(\d+):(\d{2}):(\d{2})\.(\d+)").unwrap());

static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"time=(\d+):(\d{2}):(\d{2})\.(\d+)").unwrap());

/// A single progress observation for an in-flight job. Transient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressSample {
    pub job_id: Uuid,
    pub elapsed_seconds: f64,
    pub total_duration_seconds: f64,
    /// 0.0 to 100.0, clamped.
    pub percent: f64,
}

/// Parse an `H:MM:SS.cc` match into seconds.
fn timestamp_seconds(caps: &regex::Captures<'_>) -> f64 {
    let hours: f64 = caps[1].parse().unwrap_or(0.0);
    let minutes: f64 = caps[2].parse().unwrap_or(0.0);
    let seconds: f64 = caps[3].parse().unwrap_or(0.0);
    let centis: f64 = caps[4].parse().unwrap_or(0.0);
    hours * 3600.0 + minutes * 60.0 + seconds + centis / 100.0
}

/// Extract the announced total duration from a chunk, if present.
pub fn parse_duration(chunk: &str) -> Option<f64> {
    DURATION_RE.captures(chunk).map(|caps| timestamp_seconds(&caps))
}

/// Extract the current time position from a chunk, if present.
pub fn parse_time_position(chunk: &str) -> Option<f64> {
    TIME_RE.captures(chunk).map(|caps| timestamp_seconds(&caps))
}

/// Per-job streaming parser state.
#[derive(Debug)]
enum ParserState {
    AwaitingDuration,
    Streaming { total_seconds: f64 },
}

/// Incremental parser over a job's diagnostic text chunks.
#[derive(Debug)]
pub struct ProgressParser {
    job_id: Uuid,
    state: ParserState,
}

impl ProgressParser {
    pub fn new(job_id: Uuid) -> Self {
        Self {
            job_id,
            state: ParserState::AwaitingDuration,
        }
    }

    /// The announced total duration, once discovered.
    pub fn total_duration(&self) -> Option<f64> {
        match self.state {
            ParserState::AwaitingDuration => None,
            ParserState::Streaming { total_seconds } => Some(total_seconds),
        }
    }

    /// Feed one chunk of diagnostic text.
    ///
    /// Returns a sample when the chunk contains a usable time marker; `None`
    /// is the normal outcome for chunks without progress information.
    pub fn feed(&mut self, chunk: &str) -> Option<ProgressSample> {
        match self.state {
            ParserState::AwaitingDuration => {
                let total = parse_duration(chunk)?;
                self.state = ParserState::Streaming {
                    total_seconds: total,
                };
                // The duration line itself carries no position marker.
                None
            }
            ParserState::Streaming { total_seconds } => {
                let elapsed = parse_time_position(chunk)?;
                let percent = if total_seconds > 0.0 {
                    (elapsed / total_seconds * 100.0).min(100.0)
                } else {
                    0.0
                };
                Some(ProgressSample {
                    job_id: self.job_id,
                    elapsed_seconds: elapsed,
                    total_duration_seconds: total_seconds,
                    percent,
                })
            }
        }
    }
}
