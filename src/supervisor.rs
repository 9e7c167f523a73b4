//! Encoder process supervision.
//!
//! One supervisor execution per job: spawn the encoder, consume its stderr
//! incrementally, race completion against the timeout and the cancellation
//! signal, then finalize exactly once (registry removal is the guard).

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::error::ConvertError;
use crate::events::{ConvertEvent, EventNotifier};
use crate::job::{Job, JobOutput, JobResult};
use crate::options::ConversionOptions;
use crate::progress::ProgressParser;
use crate::registry::JobRegistry;
use crate::stats::StatsTracker;

/// How a supervised process left the running state.
enum Outcome {
    Exited(std::process::ExitStatus),
    TimedOut(u64),
    Cancelled,
}

/// Runs encoder processes to completion on behalf of the service.
///
/// Cheap to clone; all clones share the registry, stats, and notifier.
#[derive(Clone)]
pub struct ProcessSupervisor {
    encoder_path: PathBuf,
    registry: JobRegistry,
    stats: StatsTracker,
    notifier: EventNotifier,
}

impl ProcessSupervisor {
    pub fn new(
        encoder_path: PathBuf,
        registry: JobRegistry,
        stats: StatsTracker,
        notifier: EventNotifier,
    ) -> Self {
        Self {
            encoder_path,
            registry,
            stats,
            notifier,
        }
    }

    /// Execute one job to its terminal state.
    ///
    /// Always returns a [`JobResult`]; every failure mode (spawn error,
    /// nonzero exit, timeout, cancellation, missing output) arrives as
    /// `success == false` with the error message. Statistics are recorded and
    /// the terminal event emitted exactly once per job, here.
    pub async fn execute(
        &self,
        job: Job,
        args: Vec<String>,
        opts: &ConversionOptions,
    ) -> JobResult {
        let job_id = job.id;
        let output_path = job.output_path.clone();
        let started = Instant::now();
        let cancel_rx = self.registry.register(job.clone());

        info!(
            job_id = %job_id,
            kind = %job.kind,
            input = %job.input_path.display(),
            output = %output_path.display(),
            "Starting conversion job"
        );
        self.notifier.emit(ConvertEvent::started(
            job_id,
            job.input_path.clone(),
            output_path.clone(),
            job.kind,
        ));

        let result = self.run(&job, args, opts, cancel_rx).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        // Whoever removes the registry entry finalizes. A false return means
        // a cancel request claimed the job while the process was winding
        // down; the cancel wins.
        let claimed = self.registry.remove(job_id);
        let result = match result {
            Ok(_) if !claimed => Err(ConvertError::Cancelled),
            other => other,
        };

        match result {
            Ok(output_size) => {
                let output = JobOutput {
                    input_path: job.input_path,
                    output_path: output_path.clone(),
                    output_size,
                    processing_time_ms: elapsed_ms,
                    kind: job.kind,
                };
                self.stats.record(true, elapsed_ms);
                info!(
                    job_id = %job_id,
                    output_size,
                    elapsed_ms,
                    "Conversion job completed"
                );
                self.notifier.emit(ConvertEvent::completed(
                    job_id,
                    output_path,
                    output_size,
                    elapsed_ms,
                ));
                JobResult::ok(output)
            }
            Err(err) => {
                self.stats.record(false, elapsed_ms);
                error!(job_id = %job_id, elapsed_ms, error = %err, "Conversion job failed");
                match err {
                    ConvertError::Spawn { .. } => {
                        self.notifier
                            .emit(ConvertEvent::error(Some(job_id), err.to_string()));
                    }
                    _ => {
                        self.notifier
                            .emit(ConvertEvent::failed(job_id, err.to_string()));
                    }
                }
                JobResult::failed(&err)
            }
        }
    }

    /// Spawn and drive the process. Returns the output file size on success.
    async fn run(
        &self,
        job: &Job,
        args: Vec<String>,
        opts: &ConversionOptions,
        mut cancel_rx: watch::Receiver<bool>,
    ) -> Result<u64, ConvertError> {
        debug!(job_id = %job.id, encoder = %self.encoder_path.display(), ?args, "Spawning encoder");

        let mut child = Command::new(&self.encoder_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ConvertError::spawn(format!("{}: {e}", self.encoder_path.display()))
            })?;

        let stderr = child.stderr.take().ok_or_else(|| {
            ConvertError::spawn("encoder process has no stderr handle".to_string())
        })?;

        let stderr_task = {
            let job_id = job.id;
            let registry = self.registry.clone();
            let notifier = self.notifier.clone();
            let report_progress = opts.progress_enabled();
            tokio::spawn(async move {
                let mut parser = ProgressParser::new(job_id);
                let mut transcript = String::new();
                let mut warned = false;
                let mut hint_stored = false;
                let mut lines = BufReader::new(stderr).lines();
                loop {
                    let line = match lines.next_line().await {
                        Ok(Some(line)) => line,
                        Ok(None) => break,
                        Err(e) => {
                            warn!(job_id = %job_id, error = %e, "Error reading encoder diagnostics");
                            break;
                        }
                    };
                    if let Some(sample) = parser.feed(&line) {
                        debug!(job_id = %job_id, percent = sample.percent, "Conversion progress");
                        if report_progress {
                            notifier.emit(ConvertEvent::progress(sample));
                        }
                    }
                    if !hint_stored {
                        if let Some(total) = parser.total_duration() {
                            registry.set_duration_hint(job_id, total);
                            hint_stored = true;
                        }
                    }
                    if !warned && line.contains("deprecated") {
                        warned = true;
                        warn!(job_id = %job_id, line = %line, "Encoder warning");
                        notifier.emit(ConvertEvent::warning(job_id, line.clone()));
                    }
                    transcript.push_str(&line);
                    transcript.push('\n');
                }
                transcript
            })
        };

        let timeout = opts.effective_timeout();
        let timer = async {
            match timeout {
                Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(timer);

        let mut cancel_closed = false;
        let outcome = loop {
            tokio::select! {
                status = child.wait() => {
                    break Outcome::Exited(status?);
                }
                _ = &mut timer => {
                    warn!(job_id = %job.id, timeout_secs = timeout.unwrap_or(0), "Job timed out, killing encoder");
                    let _ = child.kill().await;
                    let _ = child.wait().await;
                    break Outcome::TimedOut(timeout.unwrap_or(0));
                }
                changed = cancel_rx.changed(), if !cancel_closed => {
                    match changed {
                        Ok(()) if *cancel_rx.borrow() => {
                            info!(job_id = %job.id, "Cancellation requested, killing encoder");
                            let _ = child.kill().await;
                            let _ = child.wait().await;
                            break Outcome::Cancelled;
                        }
                        Ok(()) => {}
                        Err(_) => cancel_closed = true,
                    }
                }
            }
        };

        // The pipe closes with the process; join for the full transcript.
        let transcript = stderr_task.await.unwrap_or_default();

        match outcome {
            Outcome::Exited(status) if status.success() => {
                match tokio::fs::metadata(&job.output_path).await {
                    Ok(meta) => Ok(meta.len()),
                    Err(_) => Err(ConvertError::output_missing(job.output_path.clone())),
                }
            }
            Outcome::Exited(status) => {
                Err(ConvertError::process(status.code(), transcript))
            }
            Outcome::TimedOut(secs) => Err(ConvertError::Timeout { secs }),
            Outcome::Cancelled => Err(ConvertError::Cancelled),
        }
    }
}
