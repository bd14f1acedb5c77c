//! Async completion watcher
//!
//! Runs a long-lived tokio task that follows one pending result at a time.
//! The coordinating context hands it a [`Promise`]; when the promise
//! resolves, the final status is sent back over a channel and the
//! coordinating context delivers it (see `CommandDispatcher::pump_completions`).
//! Callbacks never run on the watcher's runtime.
//!
//! ```text
//! coordinator ──Promise──▶ watcher task ──ExecStatus──▶ coordinator
//!      │                  (awaits / polls)                  │
//!      └── busy flag set ─────────────────────── callback, busy flag cleared
//! ```
//!
//! The watcher either owns a small runtime (`AsyncWatcher::spawn`) or runs on
//! one it is given (`AsyncWatcher::spawn_on`). Use the shutdown flag (or drop
//! the watcher) to stop the task.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use tokio::runtime::{Handle, Runtime};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::config::DispatcherConfig;
use crate::error::CommandError;
use crate::status::{ExecStatus, Promise};

const THREAD_NAME: &str = "async-watcher";

/// Background follower for the single outstanding asynchronous command
#[derive(Debug)]
pub struct AsyncWatcher {
    jobs: Option<UnboundedSender<Promise>>,
    completions: Receiver<ExecStatus>,
    busy: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
    /// Present when the watcher built its own runtime
    runtime: Option<Runtime>,
}

impl AsyncWatcher {
    /// Start the watcher on a dedicated single-worker runtime
    pub fn spawn(config: &DispatcherConfig) -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name(THREAD_NAME)
            .enable_time()
            .build()?;
        let mut watcher = Self::spawn_on(config, runtime.handle());
        watcher.runtime = Some(runtime);
        Ok(watcher)
    }

    /// Start the watcher as a task on an existing runtime
    pub fn spawn_on(config: &DispatcherConfig, handle: &Handle) -> Self {
        let (job_tx, job_rx) = mpsc::unbounded_channel::<Promise>();
        let (done_tx, done_rx) = crossbeam_channel::unbounded::<ExecStatus>();
        let shutdown = Arc::new(AtomicBool::new(false));

        let task = handle.spawn(run_watch_loop(
            job_rx,
            done_tx,
            shutdown.clone(),
            config.wait_timeout,
            config.poll_interval,
        ));

        info!(
            "Async watcher started (shutdown check {:?}, poll interval {:?})",
            config.wait_timeout, config.poll_interval
        );

        Self {
            jobs: Some(job_tx),
            completions: done_rx,
            busy: Arc::new(AtomicBool::new(false)),
            shutdown,
            task: Some(task),
            runtime: None,
        }
    }

    /// Whether a watch is active
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Claim the single watch slot. `false` when already taken.
    pub fn try_acquire(&self) -> bool {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Free the watch slot
    pub fn release(&self) {
        self.busy.store(false, Ordering::Release);
    }

    /// Hand a pending result to the watcher task
    pub fn watch(&self, promise: Promise) -> Result<(), CommandError> {
        let jobs = self.jobs.as_ref().ok_or(CommandError::WatcherStopped)?;
        jobs.send(promise).map_err(|_| CommandError::WatcherStopped)
    }

    /// A resolved status, if one is waiting. Never blocks.
    pub fn try_completion(&self) -> Option<ExecStatus> {
        self.completions.try_recv().ok()
    }

    /// Block up to `timeout` for a resolved status
    pub fn wait_completion(&self, timeout: Duration) -> Option<ExecStatus> {
        self.completions.recv_timeout(timeout).ok()
    }

    /// Whether the watcher still accepts promises
    pub fn is_running(&self) -> bool {
        self.jobs.is_some()
            && self
                .task
                .as_ref()
                .map(|task| !task.is_finished())
                .unwrap_or(false)
    }

    /// Signal the task to exit. An owned runtime is shut down without
    /// blocking, so this is safe to call from async code.
    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        self.jobs.take();
        if self.task.take().is_some() {
            info!("Async watcher stopped");
        }
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

impl Drop for AsyncWatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn run_watch_loop(
    mut jobs: UnboundedReceiver<Promise>,
    completions: Sender<ExecStatus>,
    shutdown: Arc<AtomicBool>,
    shutdown_check: Duration,
    poll_interval: Duration,
) {
    while let Some(promise) = jobs.recv().await {
        debug!("Watching {:?}", promise);

        // A panicking poll function only takes down its own task
        let mut follow = tokio::spawn(follow_promise(promise, poll_interval));
        let status = tokio::select! {
            joined = &mut follow => match joined {
                Ok(status) => status,
                Err(e) => {
                    error!("Pending result failed while resolving: {}", e);
                    ExecStatus::Error(CommandError::PromisePanicked)
                }
            },
            _ = async {
                while !shutdown.load(Ordering::Acquire) {
                    tokio::time::sleep(shutdown_check).await;
                }
            } => {
                debug!("Async watcher shutting down with a pending result");
                follow.abort();
                return;
            }
        };

        debug!("Pending result resolved: {}", status.kind());
        if completions.send(status).is_err() {
            return;
        }
    }
}

/// Resolve `promise`, following chained pending results
async fn follow_promise(mut promise: Promise, poll_interval: Duration) -> ExecStatus {
    loop {
        match promise.resolve(poll_interval).await {
            ExecStatus::Pending(next) => promise = next,
            status => return status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> DispatcherConfig {
        DispatcherConfig {
            wait_timeout: Duration::from_millis(10),
            ..DispatcherConfig::default()
        }
    }

    #[test]
    fn test_single_slot() {
        let watcher = AsyncWatcher::spawn(&config()).unwrap();
        assert!(!watcher.is_busy());
        assert!(watcher.try_acquire());
        assert!(watcher.is_busy());
        assert!(!watcher.try_acquire());
        watcher.release();
        assert!(watcher.try_acquire());
    }

    #[test]
    fn test_channel_promise_completes() {
        let watcher = AsyncWatcher::spawn(&config()).unwrap();
        let (resolver, promise) = Promise::channel();
        watcher.watch(promise).unwrap();
        assert!(watcher.try_completion().is_none());

        resolver.resolve(ExecStatus::ok("done"));
        let status = watcher.wait_completion(Duration::from_secs(5)).unwrap();
        assert_eq!(status.message(), "done");
    }

    #[test]
    fn test_chained_pending_is_followed() {
        let watcher = AsyncWatcher::spawn(&config()).unwrap();
        let (outer, promise) = Promise::channel();
        let (inner, next) = Promise::channel();
        watcher.watch(promise).unwrap();

        outer.resolve(ExecStatus::pending(next));
        assert!(watcher.wait_completion(Duration::from_millis(50)).is_none());
        inner.resolve(ExecStatus::ok("second stage"));
        let status = watcher.wait_completion(Duration::from_secs(5)).unwrap();
        assert_eq!(status.message(), "second stage");
    }

    #[test]
    fn test_panicking_poll_reports_error_and_keeps_running() {
        let watcher = AsyncWatcher::spawn(&config()).unwrap();
        watcher
            .watch(Promise::from_poll(|| panic!("render device lost")))
            .unwrap();
        let status = watcher.wait_completion(Duration::from_secs(5)).unwrap();
        assert_eq!(status.as_error(), Some(&CommandError::PromisePanicked));
        assert!(watcher.is_running());

        let (resolver, promise) = Promise::channel();
        watcher.watch(promise).unwrap();
        resolver.resolve(ExecStatus::ok("recovered"));
        let status = watcher.wait_completion(Duration::from_secs(5)).unwrap();
        assert_eq!(status.message(), "recovered");
    }

    #[test]
    fn test_spawn_on_existing_runtime() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let mut watcher = AsyncWatcher::spawn_on(&config(), runtime.handle());
        let (resolver, promise) = Promise::channel();
        watcher.watch(promise).unwrap();
        resolver.resolve(ExecStatus::ok("shared runtime"));
        let status = watcher.wait_completion(Duration::from_secs(5)).unwrap();
        assert_eq!(status.message(), "shared runtime");
        watcher.shutdown();
        assert!(!watcher.is_running());
    }

    #[test]
    fn test_shutdown_stops_watcher() {
        let mut watcher = AsyncWatcher::spawn(&config()).unwrap();
        assert!(watcher.is_running());
        watcher.shutdown();
        assert!(!watcher.is_running());

        let (_resolver, promise) = Promise::channel();
        assert_eq!(watcher.watch(promise), Err(CommandError::WatcherStopped));
    }

    #[test]
    fn test_shutdown_while_watching() {
        let mut watcher = AsyncWatcher::spawn(&config()).unwrap();
        let (_resolver, promise) = Promise::channel();
        watcher.watch(promise).unwrap();
        watcher.shutdown();
        assert!(!watcher.is_running());
    }
}
