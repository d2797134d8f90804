//! Notification messages surfaced to the user during navigation.
//!
//! The navigation core queues at most one pending message per programmatic
//! navigation; it is delivered on the next render and then cleared. The
//! center also keeps a short transient slot (the message bar) that a plain
//! navigation wipes, since the user has moved on.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub severity: Severity,
    pub text: String,
}

impl Message {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            text: text.into(),
        }
    }
}

/// Collects notifications for the host UI to drain.
#[derive(Debug, Default)]
pub struct MessageCenter {
    queue: Vec<Message>,
    transient: Option<Message>,
}

impl MessageCenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notify(&mut self, message: Message) {
        tracing::debug!(severity = ?message.severity, text = %message.text, "Message posted");
        self.queue.push(message);
    }

    /// Sets the transient message-bar slot, replacing any previous one.
    pub fn set_transient(&mut self, message: Message) {
        self.transient = Some(message);
    }

    /// Clears the transient slot; called when the user navigates away.
    pub fn clear_transient(&mut self) {
        self.transient = None;
    }

    pub fn transient(&self) -> Option<&Message> {
        self.transient.as_ref()
    }

    /// Drains queued notifications for display.
    pub fn drain(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.queue)
    }

    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    /// Drops all state, e.g. on logout so the next user starts clean.
    pub fn reset(&mut self) {
        self.queue.clear();
        self.transient = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_empties_the_queue() {
        let mut center = MessageCenter::new();
        center.notify(Message::info("saved"));
        center.notify(Message::error("boom"));
        assert_eq!(center.drain().len(), 2);
        assert_eq!(center.pending_count(), 0);
    }

    #[test]
    fn reset_clears_everything() {
        let mut center = MessageCenter::new();
        center.notify(Message::info("saved"));
        center.set_transient(Message::warning("stale"));
        center.reset();
        assert_eq!(center.pending_count(), 0);
        assert!(center.transient().is_none());
    }
}
