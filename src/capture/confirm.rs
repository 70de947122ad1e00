//! Confirmation gate
//!
//! Optional human-in-the-loop step between "recognized" and "accepted".
//! Holds at most one pending transcript; presenting a new one overwrites
//! the old (last session wins).

/// Holds recognized text until the user accepts or discards it
#[derive(Debug, Default)]
pub struct ConfirmationGate {
    pending: Option<String>,
}

impl ConfirmationGate {
    /// Create an empty gate
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store recognized text for confirmation, replacing any pending one
    pub fn present(&mut self, text: impl Into<String>) {
        let text = text.into();
        if self.pending.is_some() {
            tracing::debug!("overwriting pending confirmation");
        }
        self.pending = Some(text);
    }

    /// Accept the pending text, forwarding it downstream exactly once
    pub fn accept(&mut self) -> Option<String> {
        self.pending.take()
    }

    /// Discard the pending text; the caller is expected to start a new
    /// capture attempt
    pub fn discard(&mut self) {
        self.pending = None;
    }

    /// Peek at the pending text without consuming it
    #[must_use]
    pub fn pending(&self) -> Option<&str> {
        self.pending.as_deref()
    }
}
