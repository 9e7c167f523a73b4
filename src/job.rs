use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::error::ConvertError;

/// The kind of work a job performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Audio,
    Video,
    AudioExtraction,
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobKind::Audio => write!(f, "audio"),
            JobKind::Video => write!(f, "video"),
            JobKind::AudioExtraction => write!(f, "audio_extraction"),
        }
    }
}

/// An in-flight conversion job.
///
/// A job exists in the registry exactly while its encoder process has been
/// spawned and has not yet reached a terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub kind: JobKind,
    pub started_at: DateTime<Utc>,
    /// Total media duration in seconds, once discovered from the encoder's
    /// diagnostic stream.
    pub duration_hint: Option<f64>,
}

impl Job {
    pub fn new(input_path: PathBuf, output_path: PathBuf, kind: JobKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            input_path,
            output_path,
            kind,
            started_at: Utc::now(),
            duration_hint: None,
        }
    }
}

/// Payload of a successful conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOutput {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    /// Size of the output file in bytes, from the post-exit stat.
    pub output_size: u64,
    pub processing_time_ms: u64,
    pub kind: JobKind,
}

/// Terminal value returned to the caller for every job.
///
/// Failures never propagate as errors past the orchestration boundary; they
/// arrive here with `success == false` and a human-readable message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub success: bool,
    pub data: Option<JobOutput>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl JobResult {
    pub fn ok(data: JobOutput) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn failed(err: &ConvertError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(err.to_string()),
            timestamp: Utc::now(),
        }
    }
}
