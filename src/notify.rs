//! User-Facing Notifications
//!
//! The sync core reports user-visible events (final request failures, pass
//! summaries) through a [`Notifier`] rather than rendering anything itself.
//! The host application decides how messages reach the user.

use std::sync::Mutex;

/// Severity of a user-visible message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Success,
    Error,
}

/// Sink for user-visible messages emitted by the sync core.
///
/// Intermediate retry failures are never sent here; only outcomes the user
/// should act on (a request giving up, a pass summary) are.
pub trait Notifier: Send + Sync {
    fn notify(&self, level: MessageLevel, message: &str);
}

/// Notifier that forwards messages to the tracing subscriber.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, level: MessageLevel, message: &str) {
        match level {
            MessageLevel::Info => tracing::info!("{message}"),
            MessageLevel::Success => tracing::info!("{message}"),
            MessageLevel::Error => tracing::error!("{message}"),
        }
    }
}

/// Notifier that buffers messages in memory.
///
/// Used by tests and tools that want to inspect what the core reported.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    messages: Mutex<Vec<(MessageLevel, String)>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages recorded so far.
    pub fn messages(&self) -> Vec<(MessageLevel, String)> {
        match self.messages.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Messages recorded at the given level.
    pub fn messages_at(&self, level: MessageLevel) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m)
            .collect()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, level: MessageLevel, message: &str) {
        if let Ok(mut guard) = self.messages.lock() {
            guard.push((level, message.to_string()));
        }
    }
}
