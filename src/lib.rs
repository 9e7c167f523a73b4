//! Transforge - Media transcoding job orchestrator
//!
//! Drives external ffmpeg processes per conversion request, tracks their
//! lifecycle, extracts live progress from the diagnostic stream, enforces
//! timeouts and cooperative cancellation, and aggregates statistics.

pub mod command;
pub mod config;
pub mod error;
pub mod events;
pub mod formats;
pub mod job;
pub mod media_info;
pub mod options;
pub mod progress;
pub mod registry;
pub mod service;
pub mod stats;
pub mod supervisor;

pub use config::{load_config, load_config_or_default, Config};
pub use error::{ConvertError, Result};
pub use events::ConvertEvent;
pub use formats::{FormatSupport, MediaKind};
pub use job::{Job, JobKind, JobOutput, JobResult};
pub use media_info::{AudioStreamInfo, MediaInfo, VideoStreamInfo};
pub use options::ConversionOptions;
pub use progress::ProgressSample;
pub use service::TranscodeService;
pub use stats::Statistics;
