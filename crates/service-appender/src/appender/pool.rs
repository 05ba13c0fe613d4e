//! Bounded, injectable scheduling of flush work.
//!
//! The dispatcher never spawns tasks directly; it goes through
//! [`WorkerPool`] so tests can substitute a deterministic implementation
//! and production code gets a hard bound on concurrent flushes.

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::runtime::Handle;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};

use crate::error::AppenderError;

/// A claimed slot on a worker pool. Spawning consumes the slot; dropping it
/// without spawning releases the reservation.
pub trait WorkerSlot: Send {
    fn spawn(self: Box<Self>, job: BoxFuture<'static, ()>);
}

/// Bounded scheduling abstraction for flush work.
///
/// Reservation is a separate step from spawning so the dispatcher can update
/// its in-flight bookkeeping between the two without racing the worker body.
pub trait WorkerPool: Send + Sync {
    /// Claims a slot for one flush job. Fails when the pool is saturated or
    /// shutting down; the caller is expected to skip the flush and leave the
    /// data buffered for the next trigger.
    fn try_reserve(&self) -> Result<Box<dyn WorkerSlot>, AppenderError>;
}

/// Worker pool running flush jobs as tokio tasks, bounded by a semaphore.
pub struct TokioWorkerPool {
    handle: Handle,
    permits: Arc<Semaphore>,
}

impl TokioWorkerPool {
    /// Must be called from within a tokio runtime. The captured handle lets
    /// producer threads outside the runtime schedule flush work later.
    pub fn new(max_workers: usize) -> Self {
        TokioWorkerPool {
            handle: Handle::current(),
            permits: Arc::new(Semaphore::new(max_workers)),
        }
    }
}

impl WorkerPool for TokioWorkerPool {
    fn try_reserve(&self) -> Result<Box<dyn WorkerSlot>, AppenderError> {
        match Arc::clone(&self.permits).try_acquire_owned() {
            Ok(permit) => Ok(Box::new(TokioWorkerSlot {
                handle: self.handle.clone(),
                permit,
            })),
            Err(TryAcquireError::NoPermits) => Err(AppenderError::PoolSaturated),
            Err(TryAcquireError::Closed) => Err(AppenderError::PoolClosed),
        }
    }
}

struct TokioWorkerSlot {
    handle: Handle,
    permit: OwnedSemaphorePermit,
}

impl WorkerSlot for TokioWorkerSlot {
    fn spawn(self: Box<Self>, job: BoxFuture<'static, ()>) {
        let permit = self.permit;
        self.handle.spawn(async move {
            job.await;
            drop(permit);
        });
    }
}
