//! Commit throttling.
//!
//! Rate-limits store commits of streamed text so the UI is not redrawn for
//! every chunk. Uses the tokio clock so paused-time tests control it.

use std::time::Duration;

use tokio::time::Instant;

/// Default window between two commits of the same session.
pub const DEFAULT_THROTTLE_WINDOW: Duration = Duration::from_millis(50);

/// Rate-limiter for streamed content commits.
#[derive(Debug, Clone)]
pub struct CommitThrottle {
    last_commit: Option<Instant>,
    window: Duration,
}

impl CommitThrottle {
    pub const fn new(window: Duration) -> Self {
        Self {
            last_commit: None,
            window,
        }
    }

    /// Check whether a commit may happen now; records it if so.
    pub fn should_commit(&mut self) -> bool {
        let now = Instant::now();
        match self.last_commit {
            Some(last) if now.duration_since(last) < self.window => false,
            _ => {
                self.last_commit = Some(now);
                true
            }
        }
    }

    /// Record a commit that bypassed [`Self::should_commit`].
    pub fn mark_committed(&mut self) {
        self.last_commit = Some(Instant::now());
    }

    /// Earliest instant the next commit is allowed.
    pub fn next_allowed(&self) -> Option<Instant> {
        self.last_commit.map(|last| last + self.window)
    }

    /// Force the next check to return true.
    pub const fn reset(&mut self) {
        self.last_commit = None;
    }

    pub const fn window(&self) -> Duration {
        self.window
    }
}

impl Default for CommitThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_THROTTLE_WINDOW)
    }
}
