#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use service_appender::{
    AppenderConfig, AppenderError, FallbackSink, LogContext, LogRecord, NativeEvent, RemoteSink,
    WorkerPool, WorkerSlot,
};

/// How the recording remote sink answers each write.
#[derive(Clone, Copy)]
pub enum RemoteMode {
    Succeed,
    ReportFalse,
    Fail,
}

/// Remote sink that records every batch it is offered.
pub struct RecordingRemote {
    mode: RemoteMode,
    batches: Mutex<Vec<Vec<LogRecord>>>,
}

impl RecordingRemote {
    pub fn new(mode: RemoteMode) -> Arc<Self> {
        Arc::new(RecordingRemote {
            mode,
            batches: Mutex::new(Vec::new()),
        })
    }

    pub fn batches(&self) -> Vec<Vec<LogRecord>> {
        self.batches.lock().unwrap().clone()
    }

    /// All records across all batches, in delivery order.
    pub fn records(&self) -> Vec<LogRecord> {
        self.batches.lock().unwrap().iter().flatten().cloned().collect()
    }
}

#[async_trait]
impl RemoteSink for RecordingRemote {
    async fn write(&self, batch: &[LogRecord]) -> anyhow::Result<bool> {
        self.batches.lock().unwrap().push(batch.to_vec());
        match self.mode {
            RemoteMode::Succeed => Ok(true),
            RemoteMode::ReportFalse => Ok(false),
            RemoteMode::Fail => Err(anyhow::anyhow!("collector unreachable")),
        }
    }
}

/// Remote sink that blocks each write until a permit is released, so tests
/// can hold a flush in flight deliberately.
pub struct GatedRemote {
    gate: Arc<Semaphore>,
    writes: AtomicUsize,
}

impl GatedRemote {
    pub fn new() -> (Arc<Self>, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let remote = Arc::new(GatedRemote {
            gate: Arc::clone(&gate),
            writes: AtomicUsize::new(0),
        });
        (remote, gate)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteSink for GatedRemote {
    async fn write(&self, _batch: &[LogRecord]) -> anyhow::Result<bool> {
        let permit = self.gate.acquire().await?;
        permit.forget();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }
}

/// Shared view into what a [`RecordingFallback`] has received. The sink
/// itself is moved into the appender, so tests observe it through this.
#[derive(Clone, Default)]
pub struct FallbackView {
    events: Arc<Mutex<Vec<NativeEvent>>>,
    calls: Arc<AtomicUsize>,
}

impl FallbackView {
    pub fn events(&self) -> Vec<NativeEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Fallback sink recording everything it is handed.
pub struct RecordingFallback {
    view: FallbackView,
    fail: bool,
}

impl RecordingFallback {
    pub fn new() -> (Box<Self>, FallbackView) {
        let view = FallbackView::default();
        let sink = Box::new(RecordingFallback {
            view: view.clone(),
            fail: false,
        });
        (sink, view)
    }

    /// A fallback that records and then reports failure for every call.
    pub fn failing() -> (Box<Self>, FallbackView) {
        let view = FallbackView::default();
        let sink = Box::new(RecordingFallback {
            view: view.clone(),
            fail: true,
        });
        (sink, view)
    }
}

impl FallbackSink for RecordingFallback {
    fn append(&mut self, events: &[NativeEvent]) -> anyhow::Result<()> {
        self.view.calls.fetch_add(1, Ordering::SeqCst);
        self.view.events.lock().unwrap().extend(events.iter().cloned());
        if self.fail {
            anyhow::bail!("disk full");
        }
        Ok(())
    }
}

/// Worker pool with no capacity at all; every reservation fails.
pub struct RejectingPool;

impl WorkerPool for RejectingPool {
    fn try_reserve(&self) -> Result<Box<dyn WorkerSlot>, AppenderError> {
        Err(AppenderError::PoolSaturated)
    }
}

/// Config tuned for tests: small threshold, fast timer and polling.
pub fn test_config(threshold: usize) -> AppenderConfig {
    AppenderConfig {
        buffer_capacity: 32,
        buffer_threshold: threshold,
        time_threshold_ms: 50,
        max_entry_length: 8 * 1024,
        max_workers: 4,
        poll_interval_ms: 10,
        application_name: "appender-tests".to_string(),
        machine_address: "127.0.0.1".to_string(),
    }
}

pub fn test_event(message: &str) -> NativeEvent {
    NativeEvent::new("INFO", "tests.logger", message)
}

pub fn test_context() -> LogContext {
    LogContext {
        logging_id: "op-42".to_string(),
        session_id: "session-7".to_string(),
        request_address: "10.1.2.3".to_string(),
        user_identity: "tester".to_string(),
        ..LogContext::default()
    }
}
