//! Periodic flush trigger.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::appender::buffer::Buffer;
use crate::appender::dispatcher::Dispatcher;

/// Recurring timer that flushes a non-empty buffer once per period.
///
/// The timer exists so a buffer that fills slowly, or not at all, is still
/// flushed within one period. [`reset`](FlushTimer::reset) re-arms it to the
/// full period; the appender calls it after every threshold-triggered flush
/// so a burst does not also cause a near-immediate timer-driven duplicate.
pub struct FlushTimer {
    rearm: Arc<Notify>,
    cancel: CancellationToken,
}

impl FlushTimer {
    /// Spawns the timer task. Must be called from within a tokio runtime.
    pub fn start(buffer: Arc<Buffer>, dispatcher: Dispatcher, period: Duration) -> Self {
        let rearm = Arc::new(Notify::new());
        let cancel = CancellationToken::new();

        let task_rearm = Arc::clone(&rearm);
        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = sleep(period) => {
                        let queued = buffer.len();
                        if queued > 0 {
                            debug!("flush timer fired with {queued} entries queued");
                            dispatcher.request_flush();
                        }
                    }
                    () = task_rearm.notified() => {
                        // Restart the sleep from a full period.
                    }
                    () = task_cancel.cancelled() => {
                        debug!("flush timer stopped");
                        break;
                    }
                }
            }
        });

        FlushTimer { rearm, cancel }
    }

    /// Re-arms the timer to a full period.
    pub fn reset(&self) {
        self.rearm.notify_one();
    }

    /// Stops the timer permanently. No timer-driven flushes happen
    /// afterwards; required before waiting for the appender to drain.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appender::pool::WorkerPool;
    use crate::config::AppenderConfig;
    use crate::entry::{BufferedItem, LogRecord, NativeEvent};
    use crate::sink::{FallbackSink, RemoteSink};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingRemote {
        writes: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl RemoteSink for CountingRemote {
        async fn write(&self, _batch: &[LogRecord]) -> anyhow::Result<bool> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(true)
        }
    }

    struct NullFallback;

    impl FallbackSink for NullFallback {
        fn append(&mut self, _events: &[NativeEvent]) -> anyhow::Result<()> {
            Ok(())
        }
    }

    /// Runs jobs inline on the current task via spawn, without any bound.
    struct UnboundedPool;

    struct UnboundedSlot;

    impl crate::appender::pool::WorkerSlot for UnboundedSlot {
        fn spawn(self: Box<Self>, job: futures::future::BoxFuture<'static, ()>) {
            tokio::spawn(job);
        }
    }

    impl WorkerPool for UnboundedPool {
        fn try_reserve(
            &self,
        ) -> Result<Box<dyn crate::appender::pool::WorkerSlot>, crate::error::AppenderError>
        {
            Ok(Box::new(UnboundedSlot))
        }
    }

    fn item(message: &str) -> BufferedItem {
        let native = NativeEvent::new("INFO", "test", message);
        let wire = LogRecord {
            id: 0,
            application: "test".to_string(),
            created_on: native.timestamp,
            level: native.level.clone(),
            logger: native.logger.clone(),
            logging_id: String::new(),
            session_id: String::new(),
            thread_id: String::new(),
            message: message.to_string(),
            request_address: String::new(),
            machine_address: String::new(),
            user_identity: String::new(),
            custom_data: HashMap::new(),
        };
        BufferedItem { native, wire }
    }

    fn fixture() -> (Arc<Buffer>, Dispatcher, Arc<AtomicUsize>) {
        let buffer = Arc::new(Buffer::new(16, 100));
        let writes = Arc::new(AtomicUsize::new(0));
        let dispatcher = Dispatcher::new(
            Arc::new(AppenderConfig::default()),
            Arc::clone(&buffer),
            Arc::new(CountingRemote {
                writes: Arc::clone(&writes),
            }),
            Box::new(NullFallback),
            Arc::new(UnboundedPool),
        );
        (buffer, dispatcher, writes)
    }

    #[tokio::test]
    async fn test_timer_flushes_non_empty_buffer() {
        let (buffer, dispatcher, writes) = fixture();
        buffer.append(item("queued"));

        let timer = FlushTimer::start(
            Arc::clone(&buffer),
            dispatcher,
            Duration::from_millis(20),
        );

        tokio::time::sleep(Duration::from_millis(120)).await;
        timer.stop();

        assert!(writes.load(Ordering::SeqCst) >= 1);
        assert_eq!(buffer.len(), 0);
    }

    #[tokio::test]
    async fn test_timer_skips_empty_buffer() {
        let (buffer, dispatcher, writes) = fixture();

        let timer = FlushTimer::start(
            Arc::clone(&buffer),
            dispatcher,
            Duration::from_millis(20),
        );

        tokio::time::sleep(Duration::from_millis(100)).await;
        timer.stop();

        assert_eq!(writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stopped_timer_never_fires() {
        let (buffer, dispatcher, writes) = fixture();
        buffer.append(item("queued"));

        let timer = FlushTimer::start(
            Arc::clone(&buffer),
            dispatcher,
            Duration::from_millis(20),
        );
        timer.stop();
        assert!(timer.is_stopped());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(writes.load(Ordering::SeqCst), 0);
        assert_eq!(buffer.len(), 1);
    }

    #[tokio::test]
    async fn test_reset_defers_the_next_tick() {
        let (buffer, dispatcher, writes) = fixture();
        buffer.append(item("queued"));

        let timer = FlushTimer::start(
            Arc::clone(&buffer),
            dispatcher,
            Duration::from_millis(80),
        );

        // Keep re-arming faster than the period; the timer must never fire.
        for _ in 0..5 {
            tokio::time::sleep(Duration::from_millis(30)).await;
            timer.reset();
        }
        assert_eq!(writes.load(Ordering::SeqCst), 0);

        // Once the resets stop, the next full period flushes.
        tokio::time::sleep(Duration::from_millis(200)).await;
        timer.stop();
        assert!(writes.load(Ordering::SeqCst) >= 1);
    }
}
