//! Buffered asynchronous log shipping.
//!
//! Events appended from producer threads are converted to wire records up
//! front and queued in a shared FIFO buffer. A flush is triggered either by
//! the buffer reaching its count threshold or by a recurring timer, and runs
//! on a bounded worker pool. Batches that the remote sink refuses are routed
//! to a local fallback sink together with an alert entry, so a remote outage
//! degrades to local logging instead of losing entries.

pub mod buffer;
pub mod dispatcher;
pub mod pool;
pub mod scheduler;
pub mod trim;

use std::sync::Arc;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::AppenderConfig;
use crate::entry::{BufferedItem, LogContext, LogRecord, NativeEvent};
use crate::error::AppenderError;
use crate::sink::{FallbackSink, RemoteSink};

use buffer::Buffer;
use dispatcher::Dispatcher;
use pool::{TokioWorkerPool, WorkerPool};
use scheduler::FlushTimer;

/// Buffered appender shipping log events to a remote sink in batches.
///
/// `append` is synchronous and cheap: it converts the event and enqueues it,
/// and at most schedules a flush. All sink traffic happens on pool workers.
/// Call [`shutdown`](ServiceAppender::shutdown) before dropping the appender
/// or entries queued since the last flush stay unshipped.
pub struct ServiceAppender {
    config: Arc<AppenderConfig>,
    buffer: Arc<Buffer>,
    dispatcher: Dispatcher,
    timer: FlushTimer,
}

impl ServiceAppender {
    /// Creates an appender backed by a tokio worker pool sized from the
    /// configuration. Must be called from within a tokio runtime.
    pub fn new(
        config: AppenderConfig,
        remote: Arc<dyn RemoteSink>,
        fallback: Box<dyn FallbackSink>,
    ) -> Result<Self, AppenderError> {
        let pool = Arc::new(TokioWorkerPool::new(config.max_workers));
        Self::with_pool(config, remote, fallback, pool)
    }

    /// Same as [`new`](ServiceAppender::new) with an explicit worker pool.
    pub fn with_pool(
        config: AppenderConfig,
        remote: Arc<dyn RemoteSink>,
        fallback: Box<dyn FallbackSink>,
        pool: Arc<dyn WorkerPool>,
    ) -> Result<Self, AppenderError> {
        config.validate()?;
        let config = Arc::new(config);
        let buffer = Arc::new(Buffer::new(
            config.effective_capacity(),
            config.buffer_threshold,
        ));
        let dispatcher = Dispatcher::new(
            Arc::clone(&config),
            Arc::clone(&buffer),
            remote,
            fallback,
            pool,
        );
        let timer = FlushTimer::start(
            Arc::clone(&buffer),
            dispatcher.clone(),
            config.effective_period(),
        );
        debug!(
            "service appender started (threshold: {}, workers: {})",
            config.buffer_threshold, config.max_workers
        );
        Ok(ServiceAppender {
            config,
            buffer,
            dispatcher,
            timer,
        })
    }

    /// Converts and enqueues one event. Never blocks on sink traffic.
    pub fn append(&self, event: NativeEvent, ctx: &LogContext) {
        let item = self.convert(event, ctx);
        let threshold_reached = self.buffer.append(item);
        self.maybe_flush(threshold_reached);
    }

    /// Converts and enqueues a batch of events under one buffer lock.
    pub fn append_batch(&self, events: Vec<NativeEvent>, ctx: &LogContext) {
        let items: Vec<BufferedItem> = events
            .into_iter()
            .map(|event| self.convert(event, ctx))
            .collect();
        let threshold_reached = self.buffer.append_all(items);
        self.maybe_flush(threshold_reached);
    }

    fn maybe_flush(&self, threshold_reached: bool) {
        if threshold_reached && self.dispatcher.request_flush() {
            // Count-triggered flush just happened; push the periodic one out
            // to a full period.
            self.timer.reset();
        }
    }

    /// Builds the wire record on the calling thread so the event snapshot
    /// (thread id included) reflects the append site, not the flush worker.
    fn convert(&self, event: NativeEvent, ctx: &LogContext) -> BufferedItem {
        let mut message = event.message.clone();
        if let Some(exception) = &event.exception {
            message.push('\n');
            message.push_str(exception);
        }
        let wire = LogRecord {
            id: 0,
            application: self.config.application_name.clone(),
            created_on: event.timestamp,
            level: event.level.clone(),
            logger: event.logger.clone(),
            logging_id: ctx.logging_id.clone(),
            session_id: ctx.session_id.clone(),
            thread_id: format!("{:?}", std::thread::current().id()),
            message,
            request_address: ctx.request_address.clone(),
            machine_address: self.config.machine_address.clone(),
            user_identity: ctx.user_identity.clone(),
            custom_data: ctx.custom_data.clone(),
        };
        BufferedItem {
            native: event,
            wire,
        }
    }

    /// Entries currently queued, not counting batches already handed to
    /// workers.
    pub fn items_in_buffer(&self) -> usize {
        self.buffer.len()
    }

    /// Flushes still in flight.
    pub fn active_workers(&self) -> i64 {
        self.dispatcher.active_workers()
    }

    /// Stops the periodic flush timer. Threshold-triggered flushes keep
    /// working.
    pub fn stop_timer(&self) {
        self.timer.stop();
    }

    /// Polls until the buffer is empty and every in-flight flush has
    /// finished. Relies on the timer (or new appends) to drain a partial
    /// buffer, so do not stop the timer before calling this.
    pub async fn wait_for_finish(&self) {
        let poll = self.config.poll_interval();
        loop {
            let queued = self.buffer.len();
            if queued == 0 {
                break;
            }
            warn!("waiting for {queued} queued entries to flush");
            sleep(poll).await;
        }
        while self.dispatcher.active_workers() > 0 {
            sleep(poll).await;
        }
    }

    /// Stops the timer, drains the remaining buffer and waits for all
    /// workers to finish. The appender accepts further appends afterwards
    /// but nothing flushes them until the threshold is reached.
    pub async fn shutdown(&self) {
        self.timer.stop();
        let poll = self.config.poll_interval();
        while !self.buffer.is_empty() {
            // The pool may be saturated; keep retrying until a slot frees.
            self.dispatcher.request_flush();
            sleep(poll).await;
        }
        while self.dispatcher.active_workers() > 0 {
            sleep(poll).await;
        }
        debug!("service appender drained");
    }
}
