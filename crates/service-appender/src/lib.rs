//! Buffered appender that ships log events to a remote collector in
//! batches, with a local fallback sink for anything the collector refuses.
//!
//! ```no_run
//! use std::sync::Arc;
//! use service_appender::{
//!     AppenderConfig, FallbackSink, LogContext, LogRecord, NativeEvent,
//!     RemoteSink, ServiceAppender,
//! };
//!
//! # struct Collector;
//! # #[async_trait::async_trait]
//! # impl RemoteSink for Collector {
//! #     async fn write(&self, _batch: &[LogRecord]) -> anyhow::Result<bool> { Ok(true) }
//! # }
//! # struct LocalFile;
//! # impl FallbackSink for LocalFile {
//! #     fn append(&mut self, _events: &[NativeEvent]) -> anyhow::Result<()> { Ok(()) }
//! # }
//! # async fn run() -> anyhow::Result<()> {
//! let appender = ServiceAppender::new(
//!     AppenderConfig::from_env()?,
//!     Arc::new(Collector),
//!     Box::new(LocalFile),
//! )?;
//!
//! appender.append(
//!     NativeEvent::new("INFO", "app.startup", "ready"),
//!     &LogContext::default(),
//! );
//!
//! appender.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod appender;
pub mod config;
pub mod entry;
pub mod error;
pub mod sink;

pub use appender::pool::{TokioWorkerPool, WorkerPool, WorkerSlot};
pub use appender::ServiceAppender;
pub use config::AppenderConfig;
pub use entry::{BufferedItem, LogContext, LogRecord, NativeEvent};
pub use error::AppenderError;
pub use sink::{FallbackSink, RemoteSink};
