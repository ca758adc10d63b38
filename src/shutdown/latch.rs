//! Drain-completion latches.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

/// Outcome of waiting on a [`DrainLatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The latch reached zero before the deadline.
    Completed,
    /// The deadline elapsed, or the wait failed, with the latch still
    /// open.
    TimedOut,
}

/// Count-initialized synchronization object signalling "all in-flight
/// undeploys finished".
///
/// The local implementation lives for one shutdown sequence and is owned
/// by the shutting-down process. Cluster-backed implementations are
/// shared by every member observing the same shutdown: any member may
/// decrement, and the first decrement to zero unblocks all waiters.
///
/// Implementations must report any internal wait failure as
/// [`WaitOutcome::TimedOut`]; the shutdown path never escalates it.
#[async_trait]
pub trait DrainLatch: Send + Sync {
    /// Initialize the count. Succeeds only when the latch is currently at
    /// zero.
    fn try_set_count(&self, count: u32) -> bool;

    /// Decrement the count by one, saturating at zero.
    fn count_down(&self);

    /// Current count. Zero means all waiters are released.
    fn count(&self) -> u32;

    /// Wait until the count reaches zero or `timeout` elapses.
    async fn wait(&self, timeout: Duration) -> WaitOutcome;
}

/// Process-local latch backing the standalone shutdown path.
pub struct LocalDrainLatch {
    count: watch::Sender<u32>,
}

impl LocalDrainLatch {
    /// Create a latch pre-initialized to `count`.
    #[must_use]
    pub fn new(count: u32) -> Self {
        Self {
            count: watch::channel(count).0,
        }
    }
}

#[async_trait]
impl DrainLatch for LocalDrainLatch {
    fn try_set_count(&self, count: u32) -> bool {
        self.count.send_if_modified(|current| {
            if *current == 0 && count > 0 {
                *current = count;
                true
            } else {
                false
            }
        })
    }

    fn count_down(&self) {
        self.count.send_if_modified(|current| {
            if *current > 0 {
                *current -= 1;
                true
            } else {
                false
            }
        });
    }

    fn count(&self) -> u32 {
        *self.count.borrow()
    }

    async fn wait(&self, timeout: Duration) -> WaitOutcome {
        let mut rx = self.count.subscribe();
        let outcome = match tokio::time::timeout(timeout, rx.wait_for(|count| *count == 0)).await {
            Ok(Ok(_)) => WaitOutcome::Completed,
            Ok(Err(_)) | Err(_) => WaitOutcome::TimedOut,
        };
        outcome
    }
}
