//! Port for structured session event logging.
//!
//! Defines the [`SessionEventLogger`] trait for recording session lifecycle
//! events (formation, votes, resets, teardowns) to a structured audit log.
//!
//! This is separate from `tracing`-based operation logs: tracing handles
//! human-readable diagnostic messages, while this port captures the session
//! history in a machine-readable format (JSONL).

use serde_json::Value;

/// A structured session event for logging.
pub struct SessionEvent {
    /// Event type identifier (e.g., "session_started", "vote_cast").
    pub event_type: &'static str,
    /// JSON payload with event-specific data.
    pub payload: Value,
}

impl SessionEvent {
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }
}

/// Port for logging session events to a structured log.
///
/// The `log` method is synchronous and non-fallible; logging failures never
/// disturb session handling.
pub trait SessionEventLogger: Send + Sync {
    fn log(&self, event: SessionEvent);
}

/// No-op implementation for tests and when logging is disabled.
pub struct NoSessionLogger;

impl SessionEventLogger for NoSessionLogger {
    fn log(&self, _event: SessionEvent) {}
}
