//! Flush scheduling and batch dispatch.
//!
//! The dispatcher owns the extract, trim, remote-write, fallback sequence.
//! Scheduling is deliberately skip-don't-lose: when the worker pool rejects
//! a flush the queued entries simply stay buffered and the next trigger
//! (threshold or timer) tries again.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use tracing::{debug, error, warn};

use crate::appender::buffer::Buffer;
use crate::appender::pool::WorkerPool;
use crate::appender::trim::trim_message;
use crate::config::AppenderConfig;
use crate::entry::{BufferedItem, NativeEvent};
use crate::sink::{FallbackSink, RemoteSink};

/// Schedules flush work on the worker pool, tracks the in-flight worker
/// count, and performs the actual batch dispatch.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    config: Arc<AppenderConfig>,
    buffer: Arc<Buffer>,
    remote: Arc<dyn RemoteSink>,
    /// The fallback sink is assumed not to be thread-safe, so every call is
    /// serialized behind this lock. It is independent of the buffer lock.
    fallback: Mutex<Box<dyn FallbackSink>>,
    pool: Arc<dyn WorkerPool>,
    /// Scheduled flushes that have not finished yet. Updated with plain
    /// atomics, never under the buffer lock.
    workers: AtomicI64,
}

/// Decrements the worker counter when the flush body finishes, whatever the
/// exit path, including a panic unwinding through the worker.
struct WorkerGuard(Arc<DispatcherInner>);

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        self.0.workers.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Dispatcher {
    pub fn new(
        config: Arc<AppenderConfig>,
        buffer: Arc<Buffer>,
        remote: Arc<dyn RemoteSink>,
        fallback: Box<dyn FallbackSink>,
        pool: Arc<dyn WorkerPool>,
    ) -> Self {
        Dispatcher {
            inner: Arc::new(DispatcherInner {
                config,
                buffer,
                remote,
                fallback: Mutex::new(fallback),
                pool,
                workers: AtomicI64::new(0),
            }),
        }
    }

    /// Number of scheduled flushes that have not finished yet.
    pub fn active_workers(&self) -> i64 {
        self.inner.workers.load(Ordering::SeqCst)
    }

    /// Tries to schedule one flush on the worker pool. Returns false when
    /// the pool rejects the work; the buffer is left untouched so the
    /// entries get picked up by the next trigger.
    pub fn request_flush(&self) -> bool {
        let slot = match self.inner.pool.try_reserve() {
            Ok(slot) => slot,
            Err(err) => {
                error!("flush scheduling failed, entries stay buffered: {err}");
                return false;
            }
        };

        // Counted as in flight from the moment it is scheduled, so
        // wait_for_finish observes the worker before its body starts.
        self.inner.workers.fetch_add(1, Ordering::SeqCst);
        let inner = Arc::clone(&self.inner);
        slot.spawn(Box::pin(async move {
            DispatcherInner::process_buffer(inner).await;
        }));
        true
    }
}

impl DispatcherInner {
    /// Worker body: extract a batch and dispatch it.
    async fn process_buffer(inner: Arc<Self>) {
        let _guard = WorkerGuard(Arc::clone(&inner));

        let threshold = inner.buffer.threshold();
        let queued = inner.buffer.len();
        // A flush never dispatches more than `threshold` items so one
        // remote write stays bounded when the backlog is larger.
        let batch = if queued > threshold {
            debug!("{threshold} entries of {queued} to dump");
            inner.buffer.drain_up_to(threshold)
        } else {
            inner.buffer.drain_all()
        };

        if batch.is_empty() {
            // A racing trigger already drained everything.
            return;
        }

        inner.dump(batch).await;
    }

    /// Trims oversized entries, writes the batch to the remote sink and
    /// routes failures and oversized originals to the fallback sink.
    async fn dump(&self, batch: Vec<BufferedItem>) {
        let max_length = self.config.effective_max_entry_length();

        // Split the batch into wire copies (trimmed where needed) and the
        // oversized originals that must reach the fallback sink in full.
        let mut wire_batch = Vec::with_capacity(batch.len());
        let mut oversized = Vec::new();
        for item in &batch {
            match trim_message(&item.wire.message, max_length) {
                Some(trimmed) => {
                    warn!(
                        "entry length {} exceeds the {max_length} limit",
                        item.wire.message.chars().count()
                    );
                    let mut wire = item.wire.clone();
                    wire.message = trimmed;
                    wire_batch.push(wire);
                    oversized.push(item.native.clone());
                }
                None => wire_batch.push(item.wire.clone()),
            }
        }

        debug!(
            "writing batch of {} entries to the remote sink (workers: {})",
            wire_batch.len(),
            self.workers.load(Ordering::SeqCst)
        );
        let failure = match self.remote.write(&wire_batch).await {
            Ok(true) => None,
            Ok(false) => Some("remote sink reported failure".to_string()),
            Err(err) => Some(format!("{err:#}")),
        };

        if let Some(reason) = failure {
            error!(
                "cannot write {} entries to the remote sink: {reason}",
                batch.len()
            );
            // One alert entry summarizing the failure, then the raw batch.
            let mut events = Vec::with_capacity(batch.len() + 1);
            events.push(self.alert_event(batch.len(), &reason));
            events.extend(batch.iter().map(|item| item.native.clone()));
            self.write_fallback(&events);
        }

        // Oversized originals always reach the fallback sink, whatever the
        // remote outcome, because their remote copy lost content.
        if !oversized.is_empty() {
            debug!(
                "writing {} oversized entries of {} to the fallback sink",
                oversized.len(),
                batch.len()
            );
            self.write_fallback(&oversized);
        }
    }

    fn alert_event(&self, batch_len: usize, reason: &str) -> NativeEvent {
        NativeEvent {
            timestamp: SystemTime::now(),
            level: "ALERT".to_string(),
            logger: "ServiceAppender-fallback".to_string(),
            message: format!(
                "Cannot write {batch_len} entries to the remote sink (application: {})",
                self.config.application_name
            ),
            exception: Some(reason.to_string()),
        }
    }

    fn write_fallback(&self, events: &[NativeEvent]) {
        let mut sink = self.fallback.lock().expect("fallback lock poisoned");
        if let Err(err) = sink.append(events) {
            // Last line of defense failed; the entries are lost.
            error!("fallback sink failed, {} entries lost: {err:#}", events.len());
        }
    }
}
