//! Job progress monitor — polls a job and publishes derived view-state.
//!
//! DESIGN
//! ======
//! One `JobMonitor` owns at most one poll task at a time. Watching a new job
//! aborts the previous task and starts from fresh state; the old task's
//! state is a separate allocation, so nothing it does can leak into the new
//! job. Every processed poll publishes a [`MonitorView`] on a watch channel.
//!
//! Each spawn carries a generation number. Aborting a task bumps the
//! current generation, and a poll whose generation is stale never reaches
//! the channel, even if it was past its last await when the abort landed.
//!
//! ERROR HANDLING
//! ==============
//! A failed poll is recorded on the view and the loop carries on; the next
//! successful poll clears it. Only a terminal snapshot ends the loop.

pub mod state;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::api::ProgressApi;
use crate::error::CypherError;
use crate::types::now_ms;

pub use state::{LOG_CAP, MonitorState, MonitorView, TerminalSummary, format_eta};

/// Caller-supplied status labels meaning "the backend is working on it".
pub const ACTIVE_STATUS_HINTS: [&str; 7] =
    ["pending", "queued", "processing", "running", "extracting", "synthesizing", "critiquing"];

/// Whether a caller's status label means the job should be polled continuously.
#[must_use]
pub fn is_active_hint(hint: &str) -> bool {
    let hint = hint.trim().to_ascii_lowercase();
    ACTIVE_STATUS_HINTS.contains(&hint.as_str())
}

type SharedState = Arc<Mutex<MonitorState>>;

pub struct JobMonitor {
    api: Arc<dyn ProgressApi>,
    interval: Duration,
    state: SharedState,
    tx: watch::Sender<MonitorView>,
    /// `None` until the first `watch`.
    job_id: Option<String>,
    task: Option<PollTask>,
    generation: Arc<AtomicU64>,
}

struct PollTask {
    handle: JoinHandle<()>,
    continuous: bool,
}

impl JobMonitor {
    pub fn new(api: Arc<dyn ProgressApi>, interval: Duration) -> Self {
        let state = MonitorState::new("");
        let (tx, _rx) = watch::channel(state.view());
        Self {
            api,
            interval,
            state: Arc::new(Mutex::new(state)),
            tx,
            job_id: None,
            task: None,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Start monitoring `job_id`.
    ///
    /// A different job id cancels the current poll task and resets all
    /// derived state. With an active `status_hint` the job is polled now and
    /// then every interval until terminal; otherwise it is polled once.
    /// Re-watching the same job keeps its derived state. It only starts a
    /// new loop when the hint is active and the job is neither terminal nor
    /// already polled continuously; a one-shot poll still in flight is
    /// replaced by a continuous one.
    pub fn watch(&mut self, job_id: &str, status_hint: Option<&str>) {
        let continuous = status_hint.is_some_and(is_active_hint);

        if self.job_id.as_deref() == Some(job_id) {
            if lock(&self.state).is_terminal() || !continuous {
                return;
            }
            let polling_continuously = self
                .task
                .as_ref()
                .is_some_and(|t| t.continuous && !t.handle.is_finished());
            if polling_continuously {
                return;
            }
            self.stop();
        } else {
            self.stop();
            self.job_id = Some(job_id.to_string());
            self.state = Arc::new(Mutex::new(MonitorState::new(job_id)));
            self.tx.send_replace(lock(&self.state).view());
        }

        info!(job_id, continuous, "monitor: started");
        let publisher = Publisher {
            tx: self.tx.clone(),
            current: Arc::clone(&self.generation),
            generation: self.generation.load(Ordering::SeqCst),
        };
        let handle = tokio::spawn(run_poll_loop(
            Arc::clone(&self.api),
            job_id.to_string(),
            Arc::clone(&self.state),
            publisher,
            self.interval,
            continuous,
        ));
        self.task = Some(PollTask { handle, continuous });
    }

    /// Cancel the poll task, if any. Derived state is kept for display.
    pub fn stop(&mut self) {
        // Invalidate before aborting so a late poll cannot publish.
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.handle.abort();
            debug!(job_id = lock(&self.state).job_id(), "monitor: poll task cancelled");
        }
    }

    #[must_use]
    pub fn is_polling(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.handle.is_finished())
    }

    #[must_use]
    pub fn view(&self) -> MonitorView {
        lock(&self.state).view()
    }

    /// Receiver updated after every processed poll.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<MonitorView> {
        self.tx.subscribe()
    }
}

impl Drop for JobMonitor {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.handle.abort();
        }
    }
}

fn lock(state: &SharedState) -> std::sync::MutexGuard<'_, MonitorState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// POLL LOOP
// =============================================================================

/// Sending half of the view channel, bound to the spawn that owns it.
struct Publisher {
    tx: watch::Sender<MonitorView>,
    current: Arc<AtomicU64>,
    generation: u64,
}

impl Publisher {
    /// Publish `view` unless this spawn has been superseded. The generation
    /// is read under the channel's lock, so it orders against the reset
    /// published by `watch`.
    fn publish(&self, view: MonitorView) -> bool {
        self.tx.send_if_modified(|slot| {
            if self.current.load(Ordering::SeqCst) != self.generation {
                return false;
            }
            *slot = view;
            true
        })
    }
}

async fn run_poll_loop(
    api: Arc<dyn ProgressApi>,
    job_id: String,
    state: SharedState,
    publisher: Publisher,
    interval: Duration,
    continuous: bool,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        // First tick completes immediately.
        ticker.tick().await;
        let terminal = poll_once(api.as_ref(), &job_id, &state, &publisher).await;
        if terminal {
            info!(job_id = %job_id, "monitor: job reached terminal status");
            break;
        }
        if !continuous {
            break;
        }
    }
}

/// Fetch one snapshot and fold it in. Returns `true` when polling should stop.
async fn poll_once(
    api: &dyn ProgressApi,
    job_id: &str,
    state: &SharedState,
    publisher: &Publisher,
) -> bool {
    let result = api.get_progress(job_id).await;
    let (view, terminal) = {
        let mut state = lock(state);
        let terminal = match result {
            Ok(snapshot) => state.apply_snapshot_at(&snapshot, Instant::now(), now_ms()),
            Err(e) => {
                let err = CypherError::PollTransportFailure(e);
                warn!(job_id, error = %err, "monitor: poll failed");
                state.record_poll_error(err.to_string());
                false
            }
        };
        (state.view(), terminal)
    };
    if !publisher.publish(view) {
        debug!(job_id, "monitor: superseded poll discarded");
    }
    terminal
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
