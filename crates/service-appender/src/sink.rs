//! Collaborator boundaries for remote and local delivery.
//!
//! The appender core does not know how entries travel to the collector or
//! how the fallback file is written; both are injected behind these traits.

use async_trait::async_trait;

use crate::entry::{LogRecord, NativeEvent};

/// Remote collector boundary.
///
/// `Ok(false)` and `Err(_)` are treated identically as delivery failure, in
/// which case the dispatcher routes the batch to the fallback sink. Writes
/// happen on worker tasks only, never on a producer thread.
#[async_trait]
pub trait RemoteSink: Send + Sync {
    async fn write(&self, batch: &[LogRecord]) -> anyhow::Result<bool>;
}

/// Local fallback boundary, typically a rolling file writer.
///
/// Implementations are assumed not to be thread-safe; the appender
/// serializes every call behind a sink-private lock. An error from this sink
/// is terminal for the affected entries and is only traced.
pub trait FallbackSink: Send {
    fn append(&mut self, events: &[NativeEvent]) -> anyhow::Result<()>;
}
