//! Graceful drain of live connections.

use std::{future::Future, time::Duration};

use tokio_util::{
    sync::CancellationToken,
    task::{TaskTracker, task_tracker::TrackedFuture},
};

/// Tracks every connection task and tells them when the server is going away.
#[derive(Debug, Clone, Default)]
pub struct ConnectionDrain {
    token: CancellationToken,
    tracker: TaskTracker,
}

impl ConnectionDrain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token cancelled once shutdown begins; connections derive theirs from it.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_draining(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn track<F: Future>(&self, connection: F) -> TrackedFuture<F> {
        self.tracker.track_future(connection)
    }

    pub fn active(&self) -> usize {
        self.tracker.len()
    }

    /// Cancel all connections and wait up to `deadline` for them to finish.
    ///
    /// Returns `false` when the deadline elapsed with connections still open.
    pub async fn drain(&self, deadline: Duration) -> bool {
        self.token.cancel();
        self.tracker.close();

        tracing::info!(
            "Draining {} connection(s), waiting up to {:?}",
            self.tracker.len(),
            deadline
        );

        if tokio::time::timeout(deadline, self.tracker.wait())
            .await
            .is_err()
        {
            tracing::warn!(
                "Shutdown timed out after {:?}, {} connection(s) still open",
                deadline,
                self.tracker.len()
            );
            return false;
        }
        true
    }
}
