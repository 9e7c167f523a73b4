//! Encoder argument-list construction.
//!
//! Pure translation of a conversion request into the ffmpeg argument vector.
//! Flags are emitted in a fixed order: input, stream selection, codecs,
//! bitrate/quality, sample-rate/channels, resolution/frame-rate/filters,
//! progress reporting, overwrite, output last.

use std::path::Path;

use crate::formats::{
    extension_of, is_crf_capable, preferred_audio_codec, preferred_video_codec, supports_preset,
};
use crate::options::ConversionOptions;

/// Build the argument list for an audio conversion.
pub fn build_audio_args(input: &Path, output: &Path, opts: &ConversionOptions) -> Vec<String> {
    let mut args = input_section(input);
    push_audio_flags(&mut args, output, opts);
    push_tail(&mut args, output, opts);
    args
}

/// Build the argument list for a video conversion.
pub fn build_video_args(input: &Path, output: &Path, opts: &ConversionOptions) -> Vec<String> {
    let mut args = input_section(input);

    let container = extension_of(&output.to_string_lossy()).unwrap_or_default();
    let codec = opts
        .video_codec
        .clone()
        .unwrap_or_else(|| preferred_video_codec(&container).to_string());

    // Codec flags: video first, then audio.
    args.push("-c:v".to_string());
    args.push(codec.clone());
    if let Some(ref acodec) = opts.audio_codec {
        args.push("-c:a".to_string());
        args.push(acodec.clone());
    }

    // Quality: CRF only for a set rate factor on a CRF-capable codec,
    // otherwise explicit target bitrate.
    match opts.crf {
        Some(crf) if is_crf_capable(&codec) => {
            args.push("-crf".to_string());
            args.push(crf.to_string());
        }
        _ => {
            if let Some(ref bitrate) = opts.video_bitrate {
                args.push("-b:v".to_string());
                args.push(bitrate.clone());
            }
        }
    }
    if let Some(ref bitrate) = opts.audio_bitrate {
        args.push("-b:a".to_string());
        args.push(bitrate.clone());
    }
    if let Some(ref preset) = opts.preset {
        if supports_preset(&codec) {
            args.push("-preset".to_string());
            args.push(preset.clone());
        }
    }

    // Sample-rate / channel flags.
    if let Some(rate) = opts.audio_sample_rate {
        args.push("-ar".to_string());
        args.push(rate.to_string());
    }
    if let Some(channels) = opts.audio_channels {
        args.push("-ac".to_string());
        args.push(channels.to_string());
    }

    // Resolution / frame-rate / filters.
    if let Some(ref resolution) = opts.video_resolution {
        args.push("-s".to_string());
        args.push(resolution.clone());
    }
    if let Some(fps) = opts.video_frame_rate {
        args.push("-r".to_string());
        args.push(fps.to_string());
    }
    if let Some(ref filters) = opts.video_filters {
        args.push("-vf".to_string());
        args.push(filters.clone());
    }

    push_tail(&mut args, output, opts);
    args
}

/// Build the argument list for extracting the audio track of a video file.
pub fn build_extract_args(input: &Path, output: &Path, opts: &ConversionOptions) -> Vec<String> {
    let mut args = input_section(input);

    // Drop the video stream entirely.
    args.push("-vn".to_string());

    push_audio_flags(&mut args, output, opts);
    push_tail(&mut args, output, opts);
    args
}

/// Build the argument list for a no-output media analysis run.
///
/// ffmpeg prints the stream descriptions to stderr and exits nonzero because
/// no output is given; the caller parses the transcript regardless.
pub fn build_info_args(input: &Path) -> Vec<String> {
    vec![
        "-hide_banner".to_string(),
        "-i".to_string(),
        input.to_string_lossy().to_string(),
    ]
}

fn input_section(input: &Path) -> Vec<String> {
    vec!["-i".to_string(), input.to_string_lossy().to_string()]
}

fn push_audio_flags(args: &mut Vec<String>, output: &Path, opts: &ConversionOptions) {
    let container = extension_of(&output.to_string_lossy()).unwrap_or_default();
    let codec = opts
        .audio_codec
        .clone()
        .unwrap_or_else(|| preferred_audio_codec(&container).to_string());

    args.push("-c:a".to_string());
    args.push(codec);

    if let Some(ref bitrate) = opts.audio_bitrate {
        args.push("-b:a".to_string());
        args.push(bitrate.clone());
    }
    if let Some(rate) = opts.audio_sample_rate {
        args.push("-ar".to_string());
        args.push(rate.to_string());
    }
    if let Some(channels) = opts.audio_channels {
        args.push("-ac".to_string());
        args.push(channels.to_string());
    }
}

fn push_tail(args: &mut Vec<String>, output: &Path, opts: &ConversionOptions) {
    if opts.progress_enabled() {
        args.push("-stats".to_string());
    }
    args.push(if opts.overwrite_enabled() { "-y" } else { "-n" }.to_string());
    args.push(output.to_string_lossy().to_string());
}
