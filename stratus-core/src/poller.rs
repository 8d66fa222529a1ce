//! Long-running operation polling
//!
//! Mutating calls return an operation handle. [`wait_for_completion`] polls
//! it until it reaches a terminal state, the deadline passes, or the caller
//! cancels. The clock is injectable so tests can simulate slow operations
//! without real delays.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::provider::{BoxFuture, ProviderError, ProviderResult};

/// Status reported by one poll of a long-running operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationStatus {
    InProgress { retry_after: Option<Duration> },
    Succeeded,
    Failed(String),
    Canceled,
}

/// Handle to a remote operation that completes asynchronously
pub trait LongRunningOperation: Send + Sync {
    fn poll(&self) -> BoxFuture<'_, ProviderResult<OperationStatus>>;
}

/// An operation that finished with the initial response
#[derive(Debug, Default, Clone, Copy)]
pub struct Completed;

impl LongRunningOperation for Completed {
    fn poll(&self) -> BoxFuture<'_, ProviderResult<OperationStatus>> {
        Box::pin(async { Ok(OperationStatus::Succeeded) })
    }
}

/// Time source for the poll loop
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration) -> BoxFuture<'_, ()>;
}

/// Clock backed by the tokio timer
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'_, ()> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Clock whose sleeps return immediately and advance virtual time
#[derive(Debug)]
pub struct ManualClock {
    start: Instant,
    elapsed: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            elapsed: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, duration: Duration) {
        let mut elapsed = self
            .elapsed
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *elapsed += duration;
    }

    pub fn elapsed(&self) -> Duration {
        *self
            .elapsed
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + self.elapsed()
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'_, ()> {
        self.advance(duration);
        Box::pin(tokio::task::yield_now())
    }
}

/// Polling cadence and deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    /// Delay between polls when the server gives no Retry-After hint
    pub interval: Duration,
    /// Total time allowed before the operation is treated as failed
    pub timeout: Duration,
}

impl PollOptions {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            timeout: Duration::from_secs(30 * 60),
        }
    }
}

/// Block until `operation` reaches a terminal state
pub async fn wait_for_completion(
    operation: &dyn LongRunningOperation,
    options: PollOptions,
    clock: &dyn Clock,
    cancel: &CancellationToken,
) -> ProviderResult<()> {
    let deadline = clock.now() + options.timeout;
    let mut attempts: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(ProviderError::cancelled(
                "Operation cancelled while waiting for completion",
            ));
        }

        attempts += 1;
        let retry_after = match operation.poll().await? {
            OperationStatus::Succeeded => {
                log::debug!("operation completed after {} poll(s)", attempts);
                return Ok(());
            }
            OperationStatus::Failed(message) => {
                return Err(ProviderError::api(format!("Operation failed: {}", message)));
            }
            OperationStatus::Canceled => {
                return Err(ProviderError::api("Operation was canceled by the server"));
            }
            OperationStatus::InProgress { retry_after } => retry_after,
        };

        let now = clock.now();
        if now >= deadline {
            return Err(ProviderError::timeout(format!(
                "Operation did not complete within {:?}",
                options.timeout
            )));
        }

        let delay = retry_after
            .unwrap_or(options.interval)
            .min(deadline.saturating_duration_since(now));
        tokio::select! {
            _ = cancel.cancelled() => {
                return Err(ProviderError::cancelled(
                    "Operation cancelled while waiting for completion",
                ));
            }
            _ = clock.sleep(delay) => {}
        }
    }
}
