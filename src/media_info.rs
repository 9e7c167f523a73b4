//! Media analysis via the encoder's stream-description output.
//!
//! ffmpeg run with an input and no output prints the container duration and
//! per-stream descriptions to stderr and then exits nonzero. The probe
//! captures that transcript and parses it; the exit status is deliberately
//! ignored.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use std::sync::LazyLock;
use tokio::process::Command;
use tracing::debug;

use crate::command::build_info_args;
use crate::error::{ConvertError, Result};
use crate::progress::parse_duration;

static BITRATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"bitrate:\s*(\d+)\s*kb/s").unwrap());

static VIDEO_CODEC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Stream #[^\n]*Video:\s*([^,\s(]+)").unwrap());

static PIX_FMT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Video:[^,]+,\s*(\w+)").unwrap());

static RESOLUTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{2,5})x(\d{2,5})").unwrap());

static FPS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"([\d.]+)\s*fps").unwrap());

static AUDIO_CODEC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Stream #[^\n]*Audio:\s*([^,\s(]+)").unwrap());

static SAMPLE_RATE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)\s*Hz").unwrap());

static CHANNEL_LAYOUT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Hz,\s*([^,\n]+)").unwrap());

/// First video stream of an analyzed file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoStreamInfo {
    pub codec: String,
    pub pix_fmt: Option<String>,
    pub width: u32,
    pub height: u32,
    pub fps: Option<f64>,
}

/// First audio stream of an analyzed file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioStreamInfo {
    pub codec: String,
    pub sample_rate_hz: Option<u32>,
    pub channel_layout: Option<String>,
}

/// Container-level description of a media file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaInfo {
    pub duration_seconds: f64,
    pub bitrate_kbps: Option<u64>,
    pub video: Option<VideoStreamInfo>,
    pub audio: Option<AudioStreamInfo>,
}

/// Run the encoder in analysis mode and parse its stream descriptions.
pub async fn probe(encoder_path: &Path, input: &Path) -> Result<MediaInfo> {
    let args = build_info_args(input);
    debug!(input = %input.display(), "Probing media file");

    let output = Command::new(encoder_path)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| ConvertError::spawn(format!("{}: {e}", encoder_path.display())))?;

    let transcript = String::from_utf8_lossy(&output.stderr);
    parse_media_info(&transcript)
}

/// Parse an analysis-mode transcript into [`MediaInfo`].
///
/// A transcript without a duration line means the input was not a readable
/// media file.
pub fn parse_media_info(transcript: &str) -> Result<MediaInfo> {
    let duration_seconds = parse_duration(transcript).ok_or_else(|| {
        ConvertError::Parse("no duration found in analysis output".to_string())
    })?;

    let bitrate_kbps = BITRATE_RE
        .captures(transcript)
        .and_then(|c| c[1].parse().ok());

    let video = VIDEO_CODEC_RE.captures(transcript).and_then(|codec_caps| {
        let line = transcript
            .lines()
            .find(|l| l.contains("Video:"))
            .unwrap_or("");
        let (width, height) = RESOLUTION_RE
            .captures(line)
            .and_then(|c| Some((c[1].parse().ok()?, c[2].parse().ok()?)))?;
        Some(VideoStreamInfo {
            codec: codec_caps[1].to_string(),
            pix_fmt: PIX_FMT_RE.captures(line).map(|c| c[1].to_string()),
            width,
            height,
            fps: FPS_RE.captures(line).and_then(|c| c[1].parse().ok()),
        })
    });

    let audio = AUDIO_CODEC_RE.captures(transcript).map(|codec_caps| {
        let line = transcript
            .lines()
            .find(|l| l.contains("Audio:"))
            .unwrap_or("");
        AudioStreamInfo {
            codec: codec_caps[1].to_string(),
            sample_rate_hz: SAMPLE_RATE_RE.captures(line).and_then(|c| c[1].parse().ok()),
            channel_layout: CHANNEL_LAYOUT_RE
                .captures(line)
                .map(|c| c[1].trim().to_string()),
        }
    });

    Ok(MediaInfo {
        duration_seconds,
        bitrate_kbps,
        video,
        audio,
    })
}
