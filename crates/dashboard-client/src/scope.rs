//! Request-scoped cancellation and deadline

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};

/// Cancellation scope of one inbound request
///
/// Work spawned on behalf of a request (list tasks, policy checks) observes
/// both the token and the deadline. Child scopes are cancelled with their
/// parent but can be cancelled on their own.
#[derive(Debug, Clone)]
pub struct RequestScope {
    cancel: CancellationToken,
    deadline: Instant,
}

impl RequestScope {
    /// Scope expiring `timeout` from now
    pub fn new(timeout: Duration) -> Self {
        Self {
            cancel: CancellationToken::new(),
            deadline: Instant::now() + timeout,
        }
    }

    /// Child scope sharing the deadline
    pub fn child(&self) -> Self {
        Self {
            cancel: self.cancel.child_token(),
            deadline: self.deadline,
        }
    }

    /// Deadline of this scope
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Time left until the deadline (zero once passed)
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Cancel this scope and its children
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether the scope was cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves when the scope is cancelled
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    /// Guard that cancels this scope when dropped
    pub fn drop_guard(&self) -> DropGuard {
        self.cancel.clone().drop_guard()
    }
}
