use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tracing::warn;
use fm_core::{JobId, JobStatus};

struct Entry {
    started_at: DateTime<Utc>,
    cancel: watch::Sender<bool>,
    done: watch::Receiver<Option<JobStatus>>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RunningJob {
    pub identifier: String,
    pub started_at: DateTime<Utc>,
}

/// In-flight reconstruction runs, keyed by job id. Process-local.
#[derive(Default)]
pub struct JobRegistry {
    jobs: Mutex<HashMap<JobId, Entry>>,
}

impl JobRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<JobId, Entry>> {
        // Every critical section leaves the map consistent, so a poisoned lock is still usable.
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark `id` running unless a run for it is already in flight.
    pub fn try_admit(self: &Arc<Self>, id: &JobId) -> Option<JobGuard> {
        let mut jobs = self.lock();
        if jobs.contains_key(id) {
            return None;
        }
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (done_tx, done_rx) = watch::channel(None);
        jobs.insert(
            id.clone(),
            Entry {
                started_at: Utc::now(),
                cancel: cancel_tx,
                done: done_rx,
            },
        );
        Some(JobGuard {
            registry: Arc::clone(self),
            id: id.clone(),
            cancel: cancel_rx,
            done: done_tx,
            released: false,
        })
    }

    pub fn is_running(&self, id: &JobId) -> bool {
        self.lock().contains_key(id)
    }

    pub fn running(&self) -> Vec<RunningJob> {
        let mut jobs: Vec<RunningJob> = self
            .lock()
            .iter()
            .map(|(id, entry)| RunningJob {
                identifier: id.to_string(),
                started_at: entry.started_at,
            })
            .collect();
        jobs.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        jobs
    }

    /// Ask the run for `id` to stop. Returns false if nothing is in flight.
    pub fn cancel(&self, id: &JobId) -> bool {
        match self.lock().get(id) {
            Some(entry) => {
                entry.cancel.send_replace(true);
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&self) -> usize {
        let jobs = self.lock();
        for entry in jobs.values() {
            entry.cancel.send_replace(true);
        }
        jobs.len()
    }

    /// Resolve once every run admitted so far has been released.
    pub async fn wait_idle(&self) {
        let pending: Vec<watch::Receiver<Option<JobStatus>>> =
            self.lock().values().map(|e| e.done.clone()).collect();
        futures::future::join_all(pending.into_iter().map(|mut rx| async move {
            // A dropped sender means the guard is gone, which also counts as done.
            let _ = rx.wait_for(Option::is_some).await;
        }))
        .await;
    }

    fn remove(&self, id: &JobId) {
        self.lock().remove(id);
    }
}

/// Proof of admission for one run. Releasing (or dropping) it frees the id.
pub struct JobGuard {
    registry: Arc<JobRegistry>,
    id: JobId,
    cancel: watch::Receiver<bool>,
    done: watch::Sender<Option<JobStatus>>,
    released: bool,
}

impl JobGuard {
    pub fn id(&self) -> &JobId {
        &self.id
    }

    /// Receiver that flips to `true` when cancellation is requested.
    pub fn cancel_signal(&self) -> watch::Receiver<bool> {
        self.cancel.clone()
    }

    pub fn release(mut self, status: JobStatus) {
        self.finish(status);
    }

    fn finish(&mut self, status: JobStatus) {
        if self.released {
            return;
        }
        self.released = true;
        self.registry.remove(&self.id);
        self.done.send_replace(Some(status));
    }
}

impl Drop for JobGuard {
    fn drop(&mut self) {
        if !self.released {
            warn!("Job {} dropped without a final status", self.id);
            self.finish(JobStatus::Exception);
        }
    }
}
