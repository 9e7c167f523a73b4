//! Static format and codec tables.
//!
//! Container-to-codec preference tables and supported-extension lists
//! consumed by the descriptor builder and the format-support queries.

use serde::{Deserialize, Serialize};

/// Media kind used by format-support queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

/// Answer to an `is_format_supported` query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatSupport {
    pub supported: bool,
    pub kind: Option<MediaKind>,
}

/// File extensions accepted as audio output containers.
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "aac", "m4a", "flac", "ogg", "opus", "wma"];

/// File extensions accepted as video output containers.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "avi", "mov", "webm", "flv", "wmv", "m4v"];

/// Fallback video codec for unrecognized containers.
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";

/// Fallback audio codec for unrecognized containers.
pub const DEFAULT_AUDIO_CODEC: &str = "aac";

/// Ordered video codec preferences per container.
pub fn video_codec_preferences(container: &str) -> &'static [&'static str] {
    match container.to_lowercase().as_str() {
        "mp4" | "m4v" | "mov" => &["libx264", "libx265"],
        "mkv" => &["libx264", "libx265", "libvpx-vp9"],
        "webm" => &["libvpx-vp9", "libvpx"],
        "avi" => &["mpeg4", "libx264"],
        "flv" => &["libx264"],
        "wmv" => &["wmv2"],
        _ => &["libx264"],
    }
}

/// Ordered audio codec preferences per container.
pub fn audio_codec_preferences(container: &str) -> &'static [&'static str] {
    match container.to_lowercase().as_str() {
        "mp3" => &["libmp3lame"],
        "m4a" | "aac" | "mp4" | "m4v" | "mov" => &["aac"],
        "ogg" => &["libvorbis"],
        "opus" => &["libopus"],
        "flac" => &["flac"],
        "wav" => &["pcm_s16le"],
        "webm" | "mkv" => &["libopus", "libvorbis", "aac"],
        "wma" => &["wmav2"],
        _ => &["aac"],
    }
}

/// Pick the video codec for a container when the caller supplied none.
///
/// Takes the container's first preference, upgraded to a hardware-accelerated
/// variant only on platforms known to expose one.
pub fn preferred_video_codec(container: &str) -> &'static str {
    let software = video_codec_preferences(container)[0];
    if software == "libx264" && cfg!(target_os = "macos") {
        return "h264_videotoolbox";
    }
    software
}

/// Pick the audio codec for a container when the caller supplied none.
pub fn preferred_audio_codec(container: &str) -> &'static str {
    audio_codec_preferences(container)[0]
}

/// Whether the codec belongs to a constant-rate-factor-capable family.
///
/// CRF mode is used only when a rate-factor value is set AND the codec is in
/// the x264/x265 family; everything else falls back to target bitrate.
pub fn is_crf_capable(codec: &str) -> bool {
    let codec = codec.to_lowercase();
    codec.contains("x264") || codec.contains("x265")
}

/// Whether the codec accepts an encoding `-preset` flag.
pub fn supports_preset(codec: &str) -> bool {
    let codec = codec.to_lowercase();
    codec.contains("x264") || codec.contains("x265")
}

/// Check whether an output extension is supported for the given kind.
pub fn is_format_supported(extension: &str, kind: MediaKind) -> FormatSupport {
    let ext = extension.trim_start_matches('.').to_lowercase();
    let supported = match kind {
        MediaKind::Audio => AUDIO_EXTENSIONS.contains(&ext.as_str()),
        MediaKind::Video => VIDEO_EXTENSIONS.contains(&ext.as_str()),
    };
    FormatSupport {
        supported,
        kind: supported.then_some(kind),
    }
}

/// List the acceptable codecs for a container, best first.
pub fn supported_codecs(container: &str, kind: MediaKind) -> Vec<String> {
    let prefs = match kind {
        MediaKind::Audio => audio_codec_preferences(container),
        MediaKind::Video => video_codec_preferences(container),
    };
    prefs.iter().map(|c| c.to_string()).collect()
}

/// Extract a lowercase extension from a path-like string.
pub fn extension_of(path: &str) -> Option<String> {
    std::path::Path::new(path)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
}
