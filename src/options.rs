//! Per-request conversion options.

use serde::{Deserialize, Serialize};

/// Options for a single conversion request.
///
/// A request merges caller-supplied options over the service-wide defaults;
/// the caller value wins on every field it sets. Immutable once merged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionOptions {
    #[serde(default)]
    pub audio_codec: Option<String>,

    /// Audio bitrate, e.g. "192k".
    #[serde(default)]
    pub audio_bitrate: Option<String>,

    /// Audio sample rate in Hz, e.g. 44100.
    #[serde(default)]
    pub audio_sample_rate: Option<u32>,

    #[serde(default)]
    pub audio_channels: Option<u32>,

    #[serde(default)]
    pub video_codec: Option<String>,

    /// Video bitrate, e.g. "1000k".
    #[serde(default)]
    pub video_bitrate: Option<String>,

    /// Output resolution, e.g. "1280x720".
    #[serde(default)]
    pub video_resolution: Option<String>,

    #[serde(default)]
    pub video_frame_rate: Option<u32>,

    /// Encoder preset, e.g. "medium". Applied only to preset-capable codecs.
    #[serde(default)]
    pub preset: Option<String>,

    /// Constant rate factor. Applied only to CRF-capable codec families.
    #[serde(default)]
    pub crf: Option<u32>,

    #[serde(default)]
    pub overwrite: Option<bool>,

    #[serde(default)]
    pub report_progress: Option<bool>,

    /// Job timeout in seconds. 0 disables the timeout.
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Raw ffmpeg video filter chain, e.g. "scale=640:-1".
    #[serde(default)]
    pub video_filters: Option<String>,
}

impl ConversionOptions {
    /// Merge these caller options over service defaults. The caller value
    /// wins on every field it sets.
    pub fn merge_over(&self, defaults: &ConversionOptions) -> ConversionOptions {
        ConversionOptions {
            audio_codec: self.audio_codec.clone().or_else(|| defaults.audio_codec.clone()),
            audio_bitrate: self
                .audio_bitrate
                .clone()
                .or_else(|| defaults.audio_bitrate.clone()),
            audio_sample_rate: self.audio_sample_rate.or(defaults.audio_sample_rate),
            audio_channels: self.audio_channels.or(defaults.audio_channels),
            video_codec: self.video_codec.clone().or_else(|| defaults.video_codec.clone()),
            video_bitrate: self
                .video_bitrate
                .clone()
                .or_else(|| defaults.video_bitrate.clone()),
            video_resolution: self
                .video_resolution
                .clone()
                .or_else(|| defaults.video_resolution.clone()),
            video_frame_rate: self.video_frame_rate.or(defaults.video_frame_rate),
            preset: self.preset.clone().or_else(|| defaults.preset.clone()),
            crf: self.crf.or(defaults.crf),
            overwrite: self.overwrite.or(defaults.overwrite),
            report_progress: self.report_progress.or(defaults.report_progress),
            timeout_secs: self.timeout_secs.or(defaults.timeout_secs),
            video_filters: self
                .video_filters
                .clone()
                .or_else(|| defaults.video_filters.clone()),
        }
    }

    /// Whether progress events should be emitted for this request.
    pub fn progress_enabled(&self) -> bool {
        self.report_progress.unwrap_or(true)
    }

    /// Whether the output file may be overwritten.
    pub fn overwrite_enabled(&self) -> bool {
        self.overwrite.unwrap_or(true)
    }

    /// Effective timeout. `None` means the job may run indefinitely.
    pub fn effective_timeout(&self) -> Option<u64> {
        match self.timeout_secs {
            Some(0) | None => None,
            Some(secs) => Some(secs),
        }
    }
}
