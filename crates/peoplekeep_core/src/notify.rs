//! Notification side-channel for operation outcomes.
//!
//! The store reports each mutation and backend write outcome once; sinks
//! decide how (or whether) to present it.

use log::{info, warn};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

/// One discrete outcome event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub outcome: Outcome,
    /// Stable operation name, e.g. `add_person` or `load_people`.
    pub operation: &'static str,
    pub message: String,
}

impl Notification {
    pub fn success(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Success,
            operation,
            message: message.into(),
        }
    }

    pub fn failure(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Failure,
            operation,
            message: message.into(),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.outcome == Outcome::Failure
    }
}

/// Receiver of outcome events.
pub trait NotificationSink {
    fn notify(&self, notification: Notification);
}

/// Sink that forwards outcomes to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn notify(&self, notification: Notification) {
        match notification.outcome {
            Outcome::Success => info!(
                "event=notification module=notify status=ok operation={}",
                notification.operation
            ),
            Outcome::Failure => warn!(
                "event=notification module=notify status=error operation={} message={}",
                notification.operation, notification.message
            ),
        }
    }
}

/// Sink that records outcomes in memory; clones share one buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<Notification>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Notification> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn failures(&self) -> Vec<Notification> {
        self.events()
            .into_iter()
            .filter(Notification::is_failure)
            .collect()
    }

    pub fn clear(&self) {
        match self.events.lock() {
            Ok(mut events) => events.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }
}

impl NotificationSink for MemorySink {
    fn notify(&self, notification: Notification) {
        match self.events.lock() {
            Ok(mut events) => events.push(notification),
            Err(poisoned) => poisoned.into_inner().push(notification),
        }
    }
}
