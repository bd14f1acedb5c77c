//! Execution status returned by every dispatch
//!
//! `ExecStatus` is the dispatcher's universal return type. A handler that
//! cannot finish synchronously returns `ExecStatus::Pending` carrying a
//! [`Promise`]; the async watcher owns the promise until it resolves.
//!
//! Promises come in two flavours:
//!
//! - **oneshot-backed** (`Promise::channel`, `Promise::from_oneshot`) - the
//!   producer keeps the sending half; the watcher awaits the value.
//! - **poll-backed** (`Promise::from_poll`) - the watcher can only ask
//!   "done yet?" and re-checks at the poll interval.

use std::fmt;
use std::time::Duration;

use dispatch_types::ExecStatusKind;
use tokio::sync::oneshot::{self, error::TryRecvError};

use crate::error::CommandError;

// =============================================================================
// EXEC STATUS
// =============================================================================

/// Result of dispatching one command
pub enum ExecStatus {
    /// Command completed, with a message for the caller
    Success(String),
    /// Command failed
    Error(CommandError),
    /// Command is still running; the promise resolves to the final status
    Pending(Promise),
}

impl ExecStatus {
    pub fn ok(message: impl Into<String>) -> Self {
        ExecStatus::Success(message.into())
    }

    /// Handler-reported failure
    pub fn error(message: impl Into<String>) -> Self {
        ExecStatus::Error(CommandError::failed(message))
    }

    pub fn pending(promise: Promise) -> Self {
        ExecStatus::Pending(promise)
    }

    pub fn kind(&self) -> ExecStatusKind {
        match self {
            ExecStatus::Success(_) => ExecStatusKind::Success,
            ExecStatus::Error(_) => ExecStatusKind::Error,
            ExecStatus::Pending(_) => ExecStatusKind::Pending,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ExecStatus::Success(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ExecStatus::Error(_))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, ExecStatus::Pending(_))
    }

    /// Message carried by the status. Empty for `Pending`.
    pub fn message(&self) -> String {
        match self {
            ExecStatus::Success(message) => message.clone(),
            ExecStatus::Error(err) => err.to_string(),
            ExecStatus::Pending(_) => String::new(),
        }
    }

    /// The error, if this status is `Error`
    pub fn as_error(&self) -> Option<&CommandError> {
        match self {
            ExecStatus::Error(err) => Some(err),
            _ => None,
        }
    }
}

impl PartialEq<ExecStatusKind> for ExecStatus {
    fn eq(&self, other: &ExecStatusKind) -> bool {
        self.kind() == *other
    }
}

impl From<CommandError> for ExecStatus {
    fn from(err: CommandError) -> Self {
        ExecStatus::Error(err)
    }
}

impl<S: Into<String>> From<Result<S, CommandError>> for ExecStatus {
    fn from(result: Result<S, CommandError>) -> Self {
        match result {
            Ok(message) => ExecStatus::Success(message.into()),
            Err(err) => ExecStatus::Error(err),
        }
    }
}

impl fmt::Debug for ExecStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecStatus::Success(message) => f.debug_tuple("Success").field(message).finish(),
            ExecStatus::Error(err) => f.debug_tuple("Error").field(err).finish(),
            ExecStatus::Pending(promise) => f.debug_tuple("Pending").field(promise).finish(),
        }
    }
}

impl fmt::Display for ExecStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

// =============================================================================
// PROMISE
// =============================================================================

type PollFn = Box<dyn FnMut() -> Option<ExecStatus> + Send>;

enum PromiseSource {
    Oneshot(oneshot::Receiver<ExecStatus>),
    Poll(PollFn),
}

/// Handle to the eventual status of a pending command
pub struct Promise {
    source: PromiseSource,
}

/// Producer side of a [`Promise`] made by `Promise::channel`
#[derive(Debug)]
pub struct PromiseResolver {
    tx: oneshot::Sender<ExecStatus>,
}

impl PromiseResolver {
    /// Deliver the final status. Resolving with another `Pending` status
    /// hands the watcher a new promise to follow.
    pub fn resolve(self, status: ExecStatus) {
        // The receiver is gone only when the watcher already shut down.
        let _ = self.tx.send(status);
    }
}

impl Promise {
    /// Promise with its own resolver. Dropping the resolver without
    /// resolving resolves the promise to `CommandError::PromiseDropped`.
    pub fn channel() -> (PromiseResolver, Promise) {
        let (tx, rx) = oneshot::channel();
        (PromiseResolver { tx }, Promise::from_oneshot(rx))
    }

    /// Poll-backed promise. `check` returns `None` while the work is still
    /// running.
    pub fn from_poll<F>(check: F) -> Self
    where
        F: FnMut() -> Option<ExecStatus> + Send + 'static,
    {
        Promise {
            source: PromiseSource::Poll(Box::new(check)),
        }
    }

    /// Promise fed by a tokio oneshot, e.g. from a spawned task.
    pub fn from_oneshot(rx: oneshot::Receiver<ExecStatus>) -> Self {
        Promise {
            source: PromiseSource::Oneshot(rx),
        }
    }

    /// Whether the watcher awaits this promise instead of polling it
    pub fn is_awaitable(&self) -> bool {
        matches!(self.source, PromiseSource::Oneshot(_))
    }

    /// Non-blocking status check. `None` while still pending.
    pub fn check(&mut self) -> Option<ExecStatus> {
        match &mut self.source {
            PromiseSource::Oneshot(rx) => match rx.try_recv() {
                Ok(status) => Some(status),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Closed) => {
                    Some(ExecStatus::Error(CommandError::PromiseDropped))
                }
            },
            PromiseSource::Poll(check) => check(),
        }
    }

    /// Wait for the result. Oneshot-backed promises are awaited; poll-backed
    /// promises are checked every `poll_interval`.
    pub async fn resolve(self, poll_interval: Duration) -> ExecStatus {
        match self.source {
            PromiseSource::Oneshot(rx) => rx
                .await
                .unwrap_or_else(|_| ExecStatus::Error(CommandError::PromiseDropped)),
            PromiseSource::Poll(mut check) => loop {
                if let Some(status) = check() {
                    return status;
                }
                if poll_interval.is_zero() {
                    tokio::task::yield_now().await;
                } else {
                    tokio::time::sleep(poll_interval).await;
                }
            },
        }
    }
}

impl fmt::Debug for Promise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match self.source {
            PromiseSource::Oneshot(_) => "oneshot",
            PromiseSource::Poll(_) => "poll",
        };
        f.debug_struct("Promise").field("source", &source).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_status_kind_comparison() {
        let (_resolver, promise) = Promise::channel();
        assert!(ExecStatus::pending(promise) == ExecStatusKind::Pending);
        assert!(ExecStatus::ok("done") != ExecStatusKind::Pending);
        assert!(ExecStatus::error("boom") == ExecStatusKind::Error);
    }

    #[test]
    fn test_message_per_kind() {
        assert_eq!(ExecStatus::ok("moved").message(), "moved");
        assert_eq!(ExecStatus::error("boom").message(), "boom");
        let (_resolver, promise) = Promise::channel();
        assert_eq!(ExecStatus::pending(promise).message(), "");
    }

    #[test]
    fn test_from_result() {
        let ok: ExecStatus = Ok::<_, CommandError>("fine").into();
        assert!(ok.is_ok());
        let err: ExecStatus = Err::<String, _>(CommandError::WatcherBusy).into();
        assert_eq!(err.as_error(), Some(&CommandError::WatcherBusy));
    }

    fn block_on<F: std::future::Future>(future: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap()
            .block_on(future)
    }

    #[test]
    fn test_channel_promise_resolves() {
        let (resolver, mut promise) = Promise::channel();
        assert!(promise.is_awaitable());
        assert!(promise.check().is_none());
        resolver.resolve(ExecStatus::ok("rendered"));
        let status = promise.check().unwrap();
        assert_eq!(status.message(), "rendered");
    }

    #[test]
    fn test_dropped_resolver_reports_error() {
        let (resolver, promise) = Promise::channel();
        drop(resolver);
        let status = block_on(promise.resolve(Duration::ZERO));
        assert_eq!(status.as_error(), Some(&CommandError::PromiseDropped));
    }

    #[test]
    fn test_resolve_awaits_value_sent_later() {
        let (resolver, promise) = Promise::channel();
        let sender = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            resolver.resolve(ExecStatus::ok("late"));
        });
        let status = block_on(promise.resolve(Duration::from_millis(1)));
        sender.join().unwrap();
        assert_eq!(status.message(), "late");
    }

    #[test]
    fn test_poll_promise_checks_until_ready() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut promise = Promise::from_poll(move || {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                None
            } else {
                Some(ExecStatus::ok("ready"))
            }
        });
        assert!(!promise.is_awaitable());
        assert!(promise.check().is_none());
        assert!(promise.check().is_none());
        assert_eq!(promise.check().unwrap().message(), "ready");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_poll_promise_resolve_repolls() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let promise = Promise::from_poll(move || {
            (counter.fetch_add(1, Ordering::SeqCst) >= 3).then(|| ExecStatus::ok("ready"))
        });
        let status = block_on(promise.resolve(Duration::from_millis(1)));
        assert_eq!(status.message(), "ready");
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_oneshot_promise() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let mut promise = Promise::from_oneshot(rx);
        assert!(promise.check().is_none());
        tx.send(ExecStatus::ok("frame 12")).unwrap();
        assert_eq!(promise.check().unwrap().message(), "frame 12");
    }

    #[test]
    fn test_oneshot_closed_reports_error() {
        let (tx, rx) = tokio::sync::oneshot::channel::<ExecStatus>();
        drop(tx);
        let mut promise = Promise::from_oneshot(rx);
        assert!(promise.check().unwrap().is_error());
    }
}
