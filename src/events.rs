//! Lifecycle event broadcasting.
//!
//! Subscribers observe events in the exact order the supervisor and the
//! progress extractor produce them for a given job: started, zero or more
//! progress samples, then exactly one of completed/failed. There is no
//! replay; subscribers added after an emission never see it.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::job::JobKind;
use crate::progress::ProgressSample;

/// A lifecycle event emitted while orchestrating conversion jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum ConvertEvent {
    /// A job's encoder process has been spawned.
    Started {
        job_id: Uuid,
        input_path: PathBuf,
        output_path: PathBuf,
        kind: JobKind,
    },
    /// A progress sample was extracted from the diagnostic stream.
    Progress {
        #[serde(flatten)]
        sample: ProgressSample,
    },
    /// A job finished successfully.
    Completed {
        job_id: Uuid,
        output_path: PathBuf,
        output_size: u64,
        processing_time_ms: u64,
    },
    /// A job reached a failed terminal state (process failure, timeout,
    /// cancellation, missing output).
    Failed { job_id: Uuid, error: String },
    /// A non-fatal anomaly was observed in the diagnostic stream.
    Warning { job_id: Uuid, message: String },
    /// A job could not be started at all (spawn failure, validation).
    Error {
        job_id: Option<Uuid>,
        message: String,
    },
}

impl ConvertEvent {
    pub fn started(job_id: Uuid, input: PathBuf, output: PathBuf, kind: JobKind) -> Self {
        ConvertEvent::Started {
            job_id,
            input_path: input,
            output_path: output,
            kind,
        }
    }

    pub fn progress(sample: ProgressSample) -> Self {
        ConvertEvent::Progress { sample }
    }

    pub fn completed(
        job_id: Uuid,
        output_path: PathBuf,
        output_size: u64,
        processing_time_ms: u64,
    ) -> Self {
        ConvertEvent::Completed {
            job_id,
            output_path,
            output_size,
            processing_time_ms,
        }
    }

    pub fn failed(job_id: Uuid, error: impl Into<String>) -> Self {
        ConvertEvent::Failed {
            job_id,
            error: error.into(),
        }
    }

    pub fn warning(job_id: Uuid, message: impl Into<String>) -> Self {
        ConvertEvent::Warning {
            job_id,
            message: message.into(),
        }
    }

    pub fn error(job_id: Option<Uuid>, message: impl Into<String>) -> Self {
        ConvertEvent::Error {
            job_id,
            message: message.into(),
        }
    }
}

/// Publisher for [`ConvertEvent`]s.
///
/// Cheap to clone; all clones share the same channel.
#[derive(Clone)]
pub struct EventNotifier {
    event_tx: broadcast::Sender<ConvertEvent>,
}

impl EventNotifier {
    pub fn new(capacity: usize) -> Self {
        let (event_tx, _) = broadcast::channel(capacity);
        Self { event_tx }
    }

    /// Subscribe to events emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<ConvertEvent> {
        self.event_tx.subscribe()
    }

    /// Emit an event to all current subscribers.
    pub fn emit(&self, event: ConvertEvent) {
        if self.event_tx.send(event).is_err() {
            tracing::debug!("No subscribers for conversion event");
        }
    }
}

impl Default for EventNotifier {
    fn default() -> Self {
        Self::new(256)
    }
}
