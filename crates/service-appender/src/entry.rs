//! Log entry data model.
//!
//! Every buffered entry carries two representations of the same event:
//!
//! - [`NativeEvent`]: the event exactly as the logging front-end produced it.
//!   Kept untouched so the fallback sink can receive it with full fidelity.
//! - [`LogRecord`]: the structured record bound for the remote collector,
//!   fully resolved on the producer's thread at append time.
//!
//! Context values (session, identity, request address) are only reliably
//! available in the calling thread's execution context, which is why the
//! wire record is never built on a worker thread.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::SystemTime;

/// A log event as produced by the logging front-end.
///
/// The appender treats this as opaque except for re-emitting it to the
/// fallback sink when remote delivery fails or the wire copy was trimmed.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeEvent {
    /// When the event was produced.
    pub timestamp: SystemTime,
    /// Severity as rendered by the front-end (e.g. "INFO", "ERROR").
    pub level: String,
    /// Name of the logger that produced the event.
    pub logger: String,
    /// Rendered message text.
    pub message: String,
    /// Rendered exception text, if the event carries one.
    pub exception: Option<String>,
}

impl NativeEvent {
    pub fn new(level: impl Into<String>, logger: impl Into<String>, message: impl Into<String>) -> Self {
        NativeEvent {
            timestamp: SystemTime::now(),
            level: level.into(),
            logger: logger.into(),
            message: message.into(),
            exception: None,
        }
    }
}

/// Caller-supplied execution context captured at append time.
///
/// The original design resolved these values from thread-ambient state.
/// Passing them explicitly keeps context capture on the producer's thread
/// and testable without thread-local tricks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogContext {
    /// Correlation id spanning one logical operation.
    pub logging_id: String,
    /// Session identifier of the calling user, if any.
    pub session_id: String,
    /// Address the current request originated from.
    pub request_address: String,
    /// Identity of the calling user.
    pub user_identity: String,
    /// Free-form additional values attached to the wire record.
    pub custom_data: HashMap<String, String>,
}

/// The structured record sent to the remote collector.
///
/// All fields are resolved at append time. `message` is the only field the
/// trimmer may rewrite; everything else is immutable after conversion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogRecord {
    /// Assigned by the collector, always 0 on this side.
    pub id: i64,
    pub application: String,
    pub created_on: SystemTime,
    pub level: String,
    pub logger: String,
    pub logging_id: String,
    pub session_id: String,
    pub thread_id: String,
    pub message: String,
    pub request_address: String,
    pub machine_address: String,
    pub user_identity: String,
    pub custom_data: HashMap<String, String>,
}

/// A queued entry: the untouched native event paired with its resolved wire
/// record. Owned by the buffer until a worker drains it, then by that worker
/// until dispatch completes or the item is handed to the fallback sink.
#[derive(Debug, Clone)]
pub struct BufferedItem {
    pub native: NativeEvent,
    pub wire: LogRecord,
}
