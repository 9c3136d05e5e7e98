//! Context implementation for request-scoped cancellation
//!
//! This module provides the Context type which carries a cancellation signal
//! and an optional deadline across async boundaries. Every wait and retry
//! loop in this crate observes it at each suspension point.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{self, Instant};

/// Context carries a cancellation signal and an optional deadline
/// CRITICAL: Pass this to every wait and retry helper
/// Cancelling a context also cancels every context derived from it
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    deadline: Option<Instant>,
    done: watch::Receiver<bool>,
    done_tx: watch::Sender<bool>,
}

impl Context {
    pub fn new() -> Self {
        let (done_tx, done_rx) = watch::channel(false);

        Self {
            inner: Arc::new(ContextInner {
                deadline: None,
                done: done_rx,
                done_tx,
            }),
        }
    }

    /// Derive a context that is cancelled after `timeout`, or earlier if
    /// this context is cancelled. Must be called inside a tokio runtime.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        self.with_deadline(deadline)
    }

    /// Derive a context that is cancelled at `deadline`, or earlier if this
    /// context is cancelled. A parent deadline that comes first wins.
    pub fn with_deadline(self, deadline: Instant) -> Self {
        let deadline = match self.inner.deadline {
            Some(parent) if parent < deadline => parent,
            _ => deadline,
        };

        let (done_tx, done_rx) = watch::channel(self.is_cancelled());

        let done_tx_clone = done_tx.clone();
        let parent = self;
        tokio::spawn(async move {
            tokio::select! {
                _ = time::sleep_until(deadline) => {}
                _ = parent.cancelled() => {}
                // every receiver is gone, nobody is listening anymore
                _ = done_tx_clone.closed() => return,
            }
            let _ = done_tx_clone.send(true);
        });

        Self {
            inner: Arc::new(ContextInner {
                deadline: Some(deadline),
                done: done_rx,
                done_tx,
            }),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.done.borrow()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Time left until the deadline, `None` when the context has no deadline
    pub fn remaining(&self) -> Option<Duration> {
        self.inner
            .deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// True once the deadline has passed
    pub fn deadline_exceeded(&self) -> bool {
        self.inner
            .deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Returns a channel that flips to `true` when work done on behalf of
    /// this context should be cancelled
    pub fn done(&self) -> watch::Receiver<bool> {
        self.inner.done.clone()
    }

    /// Resolves once the context is cancelled. Never resolves otherwise.
    pub async fn cancelled(&self) {
        let mut done = self.inner.done.clone();
        if done.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }

    pub fn cancel(&self) {
        let _ = self.inner.done_tx.send(true);
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("deadline", &self.inner.deadline)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test(start_paused = true)]
    async fn context_timeout_cancels() {
        let ctx = Context::new().with_timeout(Duration::from_millis(100));

        assert!(!ctx.is_cancelled());

        sleep(Duration::from_millis(150)).await;

        assert!(ctx.is_cancelled());
        assert!(ctx.deadline_exceeded());
    }

    #[tokio::test]
    async fn context_manual_cancel() {
        let ctx = Context::new();

        assert!(!ctx.is_cancelled());

        ctx.cancel();

        assert!(ctx.is_cancelled());
        assert!(!ctx.deadline_exceeded());
    }

    #[tokio::test]
    async fn context_deadline() {
        let ctx = Context::new();
        assert!(ctx.deadline().is_none());
        assert!(ctx.remaining().is_none());

        let ctx_with_timeout = ctx.with_timeout(Duration::from_secs(1));
        assert!(ctx_with_timeout.deadline().is_some());
        assert!(ctx_with_timeout.remaining().unwrap() <= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn parent_cancel_propagates_to_child() {
        let parent = Context::new();
        let child = parent.clone().with_timeout(Duration::from_secs(60));

        parent.cancel();
        child.cancelled().await;

        assert!(child.is_cancelled());
        assert!(!child.deadline_exceeded());
    }

    #[tokio::test(start_paused = true)]
    async fn child_keeps_earlier_parent_deadline() {
        let parent = Context::new().with_timeout(Duration::from_secs(1));
        let parent_deadline = parent.deadline().unwrap();

        let child = parent.with_timeout(Duration::from_secs(30));
        assert_eq!(child.deadline(), Some(parent_deadline));
    }

    #[tokio::test]
    async fn child_of_cancelled_context_starts_cancelled() {
        let parent = Context::new();
        parent.cancel();

        let child = parent.with_timeout(Duration::from_secs(30));
        assert!(child.is_cancelled());
    }
}
