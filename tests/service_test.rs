//! End-to-end service tests against fake encoder scripts.
//!
//! Each scenario installs a small shell script as the encoder binary so the
//! full spawn / stderr-parse / finalize path runs without ffmpeg installed.

#![cfg(unix)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use assert_matches::assert_matches;
use tempfile::TempDir;
use tokio::time::timeout;

use transforge::{
    Config, ConversionOptions, ConvertEvent, JobKind, TranscodeService,
};

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn write_input(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"fake media bytes").unwrap();
    path
}

fn service_with(encoder: PathBuf) -> TranscodeService {
    init_tracing();
    let mut config = Config::default();
    config.tools.ffmpeg_path = Some(encoder);
    TranscodeService::new(config)
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Script that announces a 10s duration, reports two progress markers, and
/// writes the output file (the last argument).
const SUCCESS_SCRIPT: &str = r#"
for a in "$@"; do out="$a"; done
echo "Duration: 00:00:10.00, start: 0.000000, bitrate: 128 kb/s" >&2
echo "frame= 100 fps= 30 time=00:00:05.00 bitrate= 128.0kbits/s" >&2
echo "frame= 200 fps= 30 time=00:00:10.00 bitrate= 128.0kbits/s" >&2
echo "converted" > "$out"
"#;

#[tokio::test]
async fn test_successful_conversion_events_and_stats() {
    let dir = TempDir::new().unwrap();
    let encoder = write_script(dir.path(), "encoder.sh", SUCCESS_SCRIPT);
    let input = write_input(dir.path(), "in.wav");
    let output = dir.path().join("out.mp3");

    let svc = service_with(encoder);
    let mut rx = svc.subscribe();

    let result = svc.convert_audio(&input, &output, None).await;
    assert!(result.success, "unexpected failure: {:?}", result.error);

    let data = result.data.unwrap();
    assert_eq!(data.kind, JobKind::Audio);
    assert_eq!(data.output_path, output);
    assert!(data.output_size > 0);
    assert!(output.exists());

    // started, two progress samples, completed, in that order.
    let job_id = assert_matches!(
        rx.recv().await.unwrap(),
        ConvertEvent::Started { job_id, kind: JobKind::Audio, .. } => job_id
    );
    let first = assert_matches!(
        rx.recv().await.unwrap(),
        ConvertEvent::Progress { sample } => sample
    );
    assert_eq!(first.job_id, job_id);
    assert_eq!(first.percent, 50.0);
    let second = assert_matches!(
        rx.recv().await.unwrap(),
        ConvertEvent::Progress { sample } => sample
    );
    assert_eq!(second.percent, 100.0);
    assert_matches!(
        rx.recv().await.unwrap(),
        ConvertEvent::Completed { job_id: id, .. } if id == job_id
    );

    // Registry drained and counters updated.
    assert!(svc.get_active_processes().is_empty());
    let stats = svc.get_statistics();
    assert_eq!(stats.total_processed, 1);
    assert_eq!(stats.successful, 1);
    assert_eq!(stats.failed, 0);
}

#[tokio::test]
async fn test_progress_suppressed_when_disabled() {
    let dir = TempDir::new().unwrap();
    let encoder = write_script(dir.path(), "encoder.sh", SUCCESS_SCRIPT);
    let input = write_input(dir.path(), "in.wav");
    let output = dir.path().join("out.mp3");

    let svc = service_with(encoder);
    let mut rx = svc.subscribe();

    let opts = ConversionOptions {
        report_progress: Some(false),
        ..Default::default()
    };
    let result = svc.convert_audio(&input, &output, Some(opts)).await;
    assert!(result.success);

    assert_matches!(rx.recv().await.unwrap(), ConvertEvent::Started { .. });
    // Straight to the terminal event, no progress in between.
    assert_matches!(rx.recv().await.unwrap(), ConvertEvent::Completed { .. });
}

#[tokio::test]
async fn test_nonzero_exit_preserves_stderr() {
    let dir = TempDir::new().unwrap();
    let encoder = write_script(
        dir.path(),
        "encoder.sh",
        "echo \"Unknown encoder 'libfoo'\" >&2\nexit 1",
    );
    let input = write_input(dir.path(), "in.wav");

    let svc = service_with(encoder);
    let mut rx = svc.subscribe();

    let result = svc
        .convert_audio(&input, dir.path().join("out.mp3"), None)
        .await;
    assert!(!result.success);
    let message = result.error.unwrap();
    assert!(message.contains("status 1"), "message: {message}");
    assert!(message.contains("Unknown encoder 'libfoo'"));

    assert_matches!(rx.recv().await.unwrap(), ConvertEvent::Started { .. });
    assert_matches!(
        rx.recv().await.unwrap(),
        ConvertEvent::Failed { error, .. } if error.contains("libfoo")
    );
    assert_eq!(svc.get_statistics().failed, 1);
}

#[tokio::test]
async fn test_timeout_kills_and_reports() {
    let dir = TempDir::new().unwrap();
    let encoder = write_script(dir.path(), "encoder.sh", "sleep 30");
    let input = write_input(dir.path(), "in.mp4");

    let svc = service_with(encoder);
    let opts = ConversionOptions {
        timeout_secs: Some(1),
        ..Default::default()
    };

    let result = timeout(
        Duration::from_secs(10),
        svc.convert_video(&input, dir.path().join("out.mp4"), Some(opts)),
    )
    .await
    .expect("timed-out job should finish promptly");

    assert!(!result.success);
    assert!(result.error.unwrap().contains("timed out after 1 seconds"));
    assert!(svc.get_active_processes().is_empty());
    assert_eq!(svc.get_statistics().failed, 1);
}

#[tokio::test]
async fn test_cancellation_mid_flight() {
    let dir = TempDir::new().unwrap();
    let encoder = write_script(
        dir.path(),
        "encoder.sh",
        "echo \"Duration: 00:01:00.00\" >&2\nsleep 30",
    );
    let input = write_input(dir.path(), "in.mp4");
    let output = dir.path().join("out.mp4");

    let svc = service_with(encoder);
    let mut rx = svc.subscribe();

    let runner = {
        let svc = svc.clone();
        let input = input.clone();
        let output = output.clone();
        tokio::spawn(async move { svc.convert_video(&input, &output, None).await })
    };

    let job_id = assert_matches!(
        rx.recv().await.unwrap(),
        ConvertEvent::Started { job_id, .. } => job_id
    );

    assert!(svc.cancel_processing(job_id));
    // Already claimed; a second request finds nothing.
    assert!(!svc.cancel_processing(job_id));

    let result = timeout(Duration::from_secs(10), runner)
        .await
        .expect("cancelled job should finish promptly")
        .unwrap();
    assert!(!result.success);
    assert!(result.error.unwrap().contains("cancelled"));
    assert!(svc.get_active_processes().is_empty());
}

#[tokio::test]
async fn test_racing_cancel_requests_claim_once() {
    let dir = TempDir::new().unwrap();
    let encoder = write_script(dir.path(), "encoder.sh", "sleep 30");
    let input = write_input(dir.path(), "in.mp4");
    let output = dir.path().join("out.mp4");

    let svc = service_with(encoder);
    let mut rx = svc.subscribe();

    let runner = {
        let svc = svc.clone();
        let input = input.clone();
        tokio::spawn(async move { svc.convert_video(&input, &output, None).await })
    };

    let job_id = assert_matches!(
        rx.recv().await.unwrap(),
        ConvertEvent::Started { job_id, .. } => job_id
    );

    // Two concurrent requests for the same job; exactly one claims it.
    let first = {
        let svc = svc.clone();
        tokio::spawn(async move { svc.cancel_processing(job_id) })
    };
    let second = {
        let svc = svc.clone();
        tokio::spawn(async move { svc.cancel_processing(job_id) })
    };
    let (first, second) = (first.await.unwrap(), second.await.unwrap());
    assert!(first != second, "exactly one cancel must claim the job");

    let result = timeout(Duration::from_secs(10), runner)
        .await
        .expect("cancelled job should finish promptly")
        .unwrap();
    assert!(!result.success);
}

#[tokio::test]
async fn test_cancel_all_claims_every_active_job() {
    let dir = TempDir::new().unwrap();
    let encoder = write_script(dir.path(), "encoder.sh", "sleep 30");
    let input = write_input(dir.path(), "in.mp4");

    let svc = service_with(encoder);
    let mut rx = svc.subscribe();

    let mut runners = Vec::new();
    for i in 0..3 {
        let svc = svc.clone();
        let input = input.clone();
        let output = dir.path().join(format!("out{i}.mp4"));
        runners.push(tokio::spawn(async move {
            svc.convert_video(&input, &output, None).await
        }));
    }
    for _ in 0..3 {
        assert_matches!(rx.recv().await.unwrap(), ConvertEvent::Started { .. });
    }

    assert_eq!(svc.cancel_all_processing(), 3);
    for runner in runners {
        let result = timeout(Duration::from_secs(10), runner).await.unwrap().unwrap();
        assert!(!result.success);
    }
    assert_eq!(svc.cancel_all_processing(), 0);
}

#[tokio::test]
async fn test_missing_output_after_clean_exit() {
    let dir = TempDir::new().unwrap();
    // Exits 0 without ever creating the output file.
    let encoder = write_script(dir.path(), "encoder.sh", "exit 0");
    let input = write_input(dir.path(), "in.wav");

    let svc = service_with(encoder);
    let result = svc
        .convert_audio(&input, dir.path().join("out.mp3"), None)
        .await;
    assert!(!result.success);
    assert!(result.error.unwrap().contains("output file missing"));
}

#[tokio::test]
async fn test_spawn_failure_surfaces_as_error_event() {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), "in.wav");

    let svc = service_with(dir.path().join("no-such-encoder"));
    assert!(!svc.encoder_available());
    let mut rx = svc.subscribe();

    let result = svc
        .convert_audio(&input, dir.path().join("out.mp3"), None)
        .await;
    assert!(!result.success);
    assert!(result.error.unwrap().contains("failed to spawn"));

    assert_matches!(rx.recv().await.unwrap(), ConvertEvent::Started { .. });
    assert_matches!(
        rx.recv().await.unwrap(),
        ConvertEvent::Error { job_id: Some(_), .. }
    );
    assert_eq!(svc.get_statistics().failed, 1);
}

#[tokio::test]
async fn test_warning_event_for_deprecated_option() {
    let dir = TempDir::new().unwrap();
    let script = r#"
for a in "$@"; do out="$a"; done
echo "Duration: 00:00:02.00" >&2
echo "The -vsync option is deprecated, use -fps_mode" >&2
echo "done" > "$out"
"#;
    let encoder = write_script(dir.path(), "encoder.sh", script);
    let input = write_input(dir.path(), "in.mp4");

    let svc = service_with(encoder);
    let mut rx = svc.subscribe();

    let result = svc
        .convert_video(&input, dir.path().join("out.mp4"), None)
        .await;
    assert!(result.success);

    assert_matches!(rx.recv().await.unwrap(), ConvertEvent::Started { .. });
    assert_matches!(
        rx.recv().await.unwrap(),
        ConvertEvent::Warning { message, .. } if message.contains("deprecated")
    );
    assert_matches!(rx.recv().await.unwrap(), ConvertEvent::Completed { .. });
}

#[tokio::test]
async fn test_non_utf8_diagnostics_do_not_wedge_the_job() {
    let dir = TempDir::new().unwrap();
    // Emits raw bytes that are not valid UTF-8 before finishing cleanly.
    let script = r#"
for a in "$@"; do out="$a"; done
printf '\377\376 mangled \375\n' >&2
echo "still here" > "$out"
"#;
    let encoder = write_script(dir.path(), "encoder.sh", script);
    let input = write_input(dir.path(), "in.wav");
    let output = dir.path().join("out.mp3");

    let svc = service_with(encoder);
    let result = timeout(
        Duration::from_secs(10),
        svc.convert_audio(&input, &output, None),
    )
    .await
    .expect("job should finish despite unreadable diagnostics");
    assert!(result.success, "unexpected failure: {:?}", result.error);
    assert!(svc.get_active_processes().is_empty());
}

#[tokio::test]
async fn test_audio_extraction_end_to_end() {
    let dir = TempDir::new().unwrap();
    // Refuses to run unless the video stream was dropped.
    let script = r#"
found=0
for a in "$@"; do
  [ "$a" = "-vn" ] && found=1
  out="$a"
done
if [ "$found" = "0" ]; then
  echo "expected -vn" >&2
  exit 1
fi
echo "Duration: 00:00:05.00" >&2
echo "audio" > "$out"
"#;
    let encoder = write_script(dir.path(), "encoder.sh", script);
    let input = write_input(dir.path(), "movie.mp4");
    let output = dir.path().join("track.m4a");

    let svc = service_with(encoder);
    let result = svc.extract_audio(&input, &output, None).await;
    assert!(result.success, "unexpected failure: {:?}", result.error);
    assert_eq!(result.data.unwrap().kind, JobKind::AudioExtraction);
}

#[tokio::test]
async fn test_media_info_probe() {
    let dir = TempDir::new().unwrap();
    let script = r#"
cat >&2 <<'EOF'
Input #0, mov,mp4,m4a,3gp,3g2,mj2, from 'clip.mp4':
  Duration: 00:01:30.00, start: 0.000000, bitrate: 5113 kb/s
  Stream #0:0(und): Video: h264 (High) (avc1 / 0x31637661), yuv420p(tv, bt709), 1280x720 [SAR 1:1 DAR 16:9], 4985 kb/s, 30 fps, 30 tbr, 30k tbn (default)
  Stream #0:1(und): Audio: aac (LC) (mp4a / 0x6134706D), 44100 Hz, stereo, fltp, 128 kb/s (default)
At least one output file must be specified
EOF
exit 1
"#;
    let encoder = write_script(dir.path(), "encoder.sh", script);
    let input = write_input(dir.path(), "clip.mp4");

    let svc = service_with(encoder);
    // Nonzero exit is expected in analysis mode; the transcript still parses.
    let info = svc.get_media_info(&input).await.unwrap();
    assert_eq!(info.duration_seconds, 90.0);
    assert_eq!(info.bitrate_kbps, Some(5113));
    let video = info.video.unwrap();
    assert_eq!((video.width, video.height), (1280, 720));
    assert_eq!(info.audio.unwrap().sample_rate_hz, Some(44100));
}

#[tokio::test]
async fn test_statistics_across_many_jobs() {
    let dir = TempDir::new().unwrap();
    let good = write_script(dir.path(), "good.sh", SUCCESS_SCRIPT);
    let input = write_input(dir.path(), "in.wav");

    let svc = service_with(good);
    for i in 0..3 {
        let result = svc
            .convert_audio(&input, dir.path().join(format!("out{i}.mp3")), None)
            .await;
        assert!(result.success);
    }
    // One rejected request joins the failure count.
    let result = svc
        .convert_audio(dir.path().join("missing.wav"), dir.path().join("x.mp3"), None)
        .await;
    assert!(!result.success);

    let stats = svc.get_statistics();
    assert_eq!(stats.total_processed, 4);
    assert_eq!(stats.successful, 3);
    assert_eq!(stats.failed, 1);
    assert_eq!(
        stats.average_processing_time_ms,
        stats.total_processing_time_ms / 4
    );
}
