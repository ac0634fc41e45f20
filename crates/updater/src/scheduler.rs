//! Periodic action scheduler
//!
//! One spawned task per action: it runs the pipeline once immediately on
//! start, then loops sleeping `interval` seconds between runs. The sleep
//! is raced against a cancellation token so `stop()` wakes the task
//! without waiting out the interval; an in-flight run is never preempted,
//! `stop()` returns only after it finishes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::action::ActionInner;

/// Periodic trigger driving one action's pipeline
pub struct Scheduler {
    topic: String,
    interval_secs: Arc<AtomicU64>,
    interval_changed: Arc<Notify>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl Scheduler {
    pub(crate) fn new(topic: String) -> Self {
        Self {
            topic,
            interval_secs: Arc::new(AtomicU64::new(0)),
            interval_changed: Arc::new(Notify::new()),
            cancel: CancellationToken::new(),
            task: None,
        }
    }

    /// Whether the scheduler task is currently spawned
    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Start the periodic loop, running the pipeline once immediately
    pub(crate) fn start(&mut self, interval_secs: u64, inner: Arc<ActionInner>) {
        if self.task.is_some() {
            warn!(topic = %self.topic, "scheduler already running, start ignored");
            return;
        }
        // A stopped scheduler can be started again with a fresh token.
        if self.cancel.is_cancelled() {
            self.cancel = CancellationToken::new();
        }

        self.interval_secs
            .store(interval_secs.max(1), Ordering::Relaxed);

        let topic = self.topic.clone();
        let interval = Arc::clone(&self.interval_secs);
        let changed = Arc::clone(&self.interval_changed);
        let cancel = self.cancel.clone();

        info!(topic = %topic, interval_secs, "scheduler started");
        self.task = Some(tokio::spawn(async move {
            // Run on start, independently of the interval.
            inner.run_scheduled().await;

            loop {
                let secs = interval.load(Ordering::Relaxed);
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    // Interval changed; re-arm the sleep with the new value.
                    _ = changed.notified() => continue,
                    _ = tokio::time::sleep(Duration::from_secs(secs)) => {
                        inner.run_scheduled().await;
                    }
                }
            }
            debug!(topic = %topic, "scheduler loop exited");
        }));
    }

    /// Stop the periodic loop
    ///
    /// Idempotent; returns after the in-flight run, if any, completes.
    pub async fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if task.await.is_err() {
                warn!(topic = %self.topic, "scheduler task ended abnormally");
            }
        }
        info!(topic = %self.topic, "scheduler stopped");
    }

    /// Change the interval; takes effect on the next sleep
    pub fn change_interval(&self, interval_secs: u64) {
        self.interval_secs
            .store(interval_secs.max(1), Ordering::Relaxed);
        self.interval_changed.notify_one();
        debug!(topic = %self.topic, interval_secs, "scheduler interval changed");
    }

    /// Request the loop to wind down without waiting for it
    pub(crate) fn request_stop(&self) {
        self.cancel.cancel();
    }
}
