use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::AbortHandle;
use tracing::debug;

use huddle_store::Target;
use huddle_types::models::{ChannelId, MessageId};

/// Identifies a piece of delayed work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKey {
    /// A scheduled send, keyed by its reserved message id
    Send(MessageId),

    /// The end of a channel's active standup
    StandupFinish(ChannelId),
}

struct Job {
    parent: Target,
    handle: AbortHandle,
}

/// One-shot timers for scheduled sends and standups.
///
/// Jobs live only in memory; a restart drops them. A job's task calls
/// [`Scheduler::finish`] when it fires, and only proceeds if that returns
/// `true`, so a job that was cancelled never runs its body.
#[derive(Default)]
pub struct Scheduler {
    jobs: Mutex<HashMap<JobKey, Job>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn jobs(&self) -> MutexGuard<'_, HashMap<JobKey, Job>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `task` once `delay` has elapsed. Replaces any job already
    /// registered under `key`.
    pub fn schedule<F>(&self, key: JobKey, parent: Target, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        // Held across the spawn so the task cannot finish before it is registered.
        let mut jobs = self.jobs();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        })
        .abort_handle();

        if let Some(previous) = jobs.insert(key, Job { parent, handle }) {
            previous.handle.abort();
        }
        debug!(?key, ?parent, delay_secs = delay.as_secs(), "job scheduled");
    }

    /// Claim a fired job. `false` means it was cancelled in the meantime.
    pub fn finish(&self, key: JobKey) -> bool {
        self.jobs().remove(&key).is_some()
    }

    pub fn cancel(&self, key: JobKey) -> bool {
        match self.jobs().remove(&key) {
            Some(job) => {
                job.handle.abort();
                debug!(?key, "job cancelled");
                true
            }
            None => false,
        }
    }

    /// Cancel every job that would write into `parent`.
    pub fn cancel_parent(&self, parent: Target) -> usize {
        let mut jobs = self.jobs();
        let before = jobs.len();
        jobs.retain(|key, job| {
            if job.parent != parent {
                return true;
            }
            job.handle.abort();
            debug!(?key, "job cancelled with its parent");
            false
        });
        before - jobs.len()
    }

    pub fn cancel_all(&self) -> usize {
        let mut jobs = self.jobs();
        let count = jobs.len();
        for (_, job) in jobs.drain() {
            job.handle.abort();
        }
        count
    }

    pub fn is_pending(&self, key: JobKey) -> bool {
        self.jobs().contains_key(&key)
    }

    pub fn pending(&self) -> usize {
        self.jobs().len()
    }
}
