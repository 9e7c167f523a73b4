//! Registry of in-flight jobs.
//!
//! The registry is the single source of truth for which jobs are active and
//! the coordination point for cancellation. Removing an entry is the
//! finalize-once guard: whichever path removes the entry first (normal
//! completion or a cancel request) owns finalization for that job.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

use crate::job::Job;

/// A registered job plus its cancellation signal.
struct ActiveJob {
    job: Job,
    cancel_tx: watch::Sender<bool>,
}

/// Concurrent map of active jobs.
///
/// Cheap to clone; all clones share the same map.
#[derive(Clone, Default)]
pub struct JobRegistry {
    jobs: Arc<DashMap<Uuid, ActiveJob>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job, returning the receiver its supervisor watches for
    /// cancellation.
    pub fn register(&self, job: Job) -> watch::Receiver<bool> {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        self.jobs.insert(job.id, ActiveJob { job, cancel_tx });
        cancel_rx
    }

    /// Snapshot of one active job, if still registered.
    pub fn get(&self, id: Uuid) -> Option<Job> {
        self.jobs.get(&id).map(|entry| entry.job.clone())
    }

    /// Snapshots of all active jobs.
    pub fn active_jobs(&self) -> Vec<Job> {
        self.jobs.iter().map(|entry| entry.job.clone()).collect()
    }

    pub fn active_count(&self) -> usize {
        self.jobs.len()
    }

    /// Store the media duration discovered from the encoder's diagnostics.
    pub fn set_duration_hint(&self, id: Uuid, seconds: f64) {
        if let Some(mut entry) = self.jobs.get_mut(&id) {
            entry.job.duration_hint = Some(seconds);
        }
    }

    /// Remove a job after it reached a terminal state.
    ///
    /// Returns whether the entry was still present. Under a race with a
    /// concurrent cancel, exactly one caller sees `true`.
    pub fn remove(&self, id: Uuid) -> bool {
        self.jobs.remove(&id).is_some()
    }

    /// Request cancellation of one job.
    ///
    /// The entry is removed first so that duplicate cancel calls and the
    /// normal completion path cannot both claim it; the supervisor is then
    /// signalled to kill the process. Returns whether this call claimed the
    /// job.
    pub fn cancel(&self, id: Uuid) -> bool {
        match self.jobs.remove(&id) {
            Some((_, active)) => {
                // Receiver may already be gone if the process just exited.
                let _ = active.cancel_tx.send(true);
                true
            }
            None => false,
        }
    }

    /// Cancel every active job. Returns how many were claimed.
    pub fn cancel_all(&self) -> usize {
        let ids: Vec<Uuid> = self.jobs.iter().map(|entry| *entry.key()).collect();
        ids.into_iter().filter(|id| self.cancel(*id)).count()
    }
}
