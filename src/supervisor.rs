//! Silence/timeout supervision
//!
//! A capture session runs two independent deadlines: a short silence timer
//! that is re-armed on every transcript chunk, and a hard ceiling that is
//! armed once and never fed. Both are instances of [`Supervisor`].

use std::time::Duration;

use tokio::time::Instant;

/// A single re-armable deadline with at most one firing per arm cycle.
///
/// While disarmed, [`Supervisor::expired`] never resolves, which makes it
/// safe to poll unconditionally inside a `tokio::select!` loop.
#[derive(Debug)]
pub struct Supervisor {
    deadline: Option<Instant>,
    delay: Duration,
}

impl Supervisor {
    /// Create a disarmed supervisor
    #[must_use]
    pub const fn new() -> Self {
        Self {
            deadline: None,
            delay: Duration::ZERO,
        }
    }

    /// Arm the deadline `delay` from now, replacing any pending deadline
    pub fn arm(&mut self, delay: Duration) {
        self.delay = delay;
        self.deadline = Some(Instant::now() + delay);
    }

    /// Push the deadline out by the armed delay; no-op while disarmed
    pub fn feed_activity(&mut self) {
        if self.deadline.is_some() {
            self.deadline = Some(Instant::now() + self.delay);
        }
    }

    /// Cancel the pending deadline
    pub fn disarm(&mut self) {
        self.deadline = None;
    }

    /// Whether a deadline is pending
    #[must_use]
    pub const fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Resolve when the armed deadline passes; pending forever while
    /// disarmed. Disarms itself on expiry so each arm cycle fires once.
    pub async fn expired(&mut self) {
        match self.deadline {
            Some(deadline) => {
                tokio::time::sleep_until(deadline).await;
                self.deadline = None;
            }
            None => std::future::pending().await,
        }
    }
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}
