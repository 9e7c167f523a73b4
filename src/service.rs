//! Service facade tying the components together.

use std::path::{Path, PathBuf};

use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::command::{build_audio_args, build_extract_args, build_video_args};
use crate::config::Config;
use crate::error::{ConvertError, Result};
use crate::events::{ConvertEvent, EventNotifier};
use crate::formats::{self, FormatSupport, MediaKind};
use crate::job::{Job, JobKind, JobResult};
use crate::media_info::{self, MediaInfo};
use crate::options::ConversionOptions;
use crate::registry::JobRegistry;
use crate::stats::{Statistics, StatsTracker};
use crate::supervisor::ProcessSupervisor;

/// Conversion orchestrator.
///
/// Explicitly constructed from a [`Config`]; holds the job registry, the
/// statistics tracker, and the event channel, and delegates process
/// lifecycle to a [`ProcessSupervisor`]. Cheap to clone.
#[derive(Clone)]
pub struct TranscodeService {
    config: Config,
    encoder_path: PathBuf,
    registry: JobRegistry,
    stats: StatsTracker,
    notifier: EventNotifier,
    supervisor: ProcessSupervisor,
}

impl TranscodeService {
    pub fn new(config: Config) -> Self {
        let encoder_path = resolve_encoder(&config);
        let registry = JobRegistry::new();
        let stats = StatsTracker::new();
        let notifier = EventNotifier::new(config.events.capacity);
        let supervisor = ProcessSupervisor::new(
            encoder_path.clone(),
            registry.clone(),
            stats.clone(),
            notifier.clone(),
        );

        Self {
            config,
            encoder_path,
            registry,
            stats,
            notifier,
            supervisor,
        }
    }

    /// Whether the encoder binary was found at construction time.
    ///
    /// A missing binary is not fatal here; jobs submitted anyway fail with a
    /// spawn error.
    pub fn encoder_available(&self) -> bool {
        self.encoder_path.is_absolute() && self.encoder_path.exists()
    }

    /// Subscribe to lifecycle events emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<ConvertEvent> {
        self.notifier.subscribe()
    }

    /// Convert an audio file. Never returns an error; failures arrive as an
    /// unsuccessful [`JobResult`].
    pub async fn convert_audio(
        &self,
        input: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        opts: Option<ConversionOptions>,
    ) -> JobResult {
        self.convert(JobKind::Audio, input.into(), output.into(), opts)
            .await
    }

    /// Convert a video file.
    pub async fn convert_video(
        &self,
        input: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        opts: Option<ConversionOptions>,
    ) -> JobResult {
        self.convert(JobKind::Video, input.into(), output.into(), opts)
            .await
    }

    /// Extract the audio track of a video file.
    pub async fn extract_audio(
        &self,
        input: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        opts: Option<ConversionOptions>,
    ) -> JobResult {
        self.convert(JobKind::AudioExtraction, input.into(), output.into(), opts)
            .await
    }

    async fn convert(
        &self,
        kind: JobKind,
        input: PathBuf,
        output: PathBuf,
        opts: Option<ConversionOptions>,
    ) -> JobResult {
        let opts = self.effective_options(opts);

        if let Err(err) = validate_request(&input, &output) {
            warn!(kind = %kind, error = %err, "Rejecting conversion request");
            self.stats.record(false, 0);
            self.notifier
                .emit(ConvertEvent::error(None, err.to_string()));
            return JobResult::failed(&err);
        }

        let args = match kind {
            JobKind::Audio => build_audio_args(&input, &output, &opts),
            JobKind::Video => build_video_args(&input, &output, &opts),
            JobKind::AudioExtraction => build_extract_args(&input, &output, &opts),
        };

        let job = Job::new(input, output, kind);
        self.supervisor.execute(job, args, &opts).await
    }

    /// Analyze a media file without producing output.
    pub async fn get_media_info(&self, input: impl AsRef<Path>) -> Result<MediaInfo> {
        let input = input.as_ref();
        if !input.exists() {
            return Err(ConvertError::validation(format!(
                "input file does not exist: {}",
                input.display()
            )));
        }
        media_info::probe(&self.encoder_path, input).await
    }

    /// Request cancellation of one active job. Returns whether the job was
    /// found and claimed.
    pub fn cancel_processing(&self, id: uuid::Uuid) -> bool {
        let claimed = self.registry.cancel(id);
        if claimed {
            info!(job_id = %id, "Cancellation requested");
        }
        claimed
    }

    /// Cancel every active job. Returns how many were claimed.
    pub fn cancel_all_processing(&self) -> usize {
        let count = self.registry.cancel_all();
        if count > 0 {
            info!(count, "Cancelled all active jobs");
        }
        count
    }

    /// Snapshot of the cumulative statistics.
    pub fn get_statistics(&self) -> Statistics {
        self.stats.snapshot()
    }

    /// Snapshots of the currently active jobs.
    pub fn get_active_processes(&self) -> Vec<Job> {
        self.registry.active_jobs()
    }

    /// Check whether an output extension is supported for the given kind.
    pub fn is_format_supported(&self, extension: &str, kind: MediaKind) -> FormatSupport {
        formats::is_format_supported(extension, kind)
    }

    /// List the acceptable codecs for a container, best first.
    pub fn get_supported_codecs(&self, container: &str, kind: MediaKind) -> Vec<String> {
        formats::supported_codecs(container, kind)
    }

    /// Merge caller options over the configured defaults, filling in the
    /// service-wide timeout when the caller set none.
    fn effective_options(&self, opts: Option<ConversionOptions>) -> ConversionOptions {
        let mut merged = opts
            .unwrap_or_default()
            .merge_over(&self.config.conversion.defaults);
        if merged.timeout_secs.is_none() {
            merged.timeout_secs = Some(self.config.conversion.timeout_secs);
        }
        merged
    }
}

fn resolve_encoder(config: &Config) -> PathBuf {
    if let Some(path) = &config.tools.ffmpeg_path {
        info!(path = %path.display(), "Using configured ffmpeg binary");
        return path.clone();
    }
    match which::which("ffmpeg") {
        Ok(path) => {
            info!(path = %path.display(), "Found ffmpeg on PATH");
            path
        }
        Err(_) => {
            warn!("ffmpeg not found on PATH; conversions will fail to spawn");
            PathBuf::from("ffmpeg")
        }
    }
}

fn validate_request(input: &Path, output: &Path) -> Result<()> {
    if input.as_os_str().is_empty() {
        return Err(ConvertError::validation("input path is empty"));
    }
    if output.as_os_str().is_empty() {
        return Err(ConvertError::validation("output path is empty"));
    }
    if !input.exists() {
        return Err(ConvertError::validation(format!(
            "input file does not exist: {}",
            input.display()
        )));
    }
    Ok(())
}
