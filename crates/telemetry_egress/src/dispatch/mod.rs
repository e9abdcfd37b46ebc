//! Dispatch Engine
//!
//! Accepts [`SendCommand`]s without ever blocking the caller and executes them
//! against the sender on tokio tasks. Capacity is a hard bound on accepted but
//! unfinished commands: when it is exhausted the command is dropped and the
//! matching drop counter is bumped. Nothing is ever retried.
//!
//! # Realizations
//!
//! | Mode | Module | Execution | Capacity |
//! |------|--------|-----------|----------|
//! | [`DispatchMode::Slots`] | `slots.rs` | one task per command | `Semaphore` permits |
//! | [`DispatchMode::Worker`] | `worker.rs` | one long-lived worker, retired when idle | CAS on outstanding count |
//!
//! An engine runs exactly one realization for its whole lifetime.

mod slots;
mod worker;

use crate::command::SendCommand;
use crate::config::{DispatchMode, ExporterConfig};
use crate::counters::Counters;
use crate::error::{DispatchError, SendError};
use crate::sender::SenderBoxed;
use slots::SlotPool;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tracing::{debug, warn};
use worker::WorkerQueue;

/// Runs commands against the sender and records the outcome.
pub(crate) struct Executor {
    sender: Arc<dyn SenderBoxed>,
    counters: Arc<Counters>,
    verbose: bool,
}

impl Executor {
    /// Executes a command, counting and logging a failure.
    pub(crate) async fn execute(&self, cmd: SendCommand) -> Result<(), SendError> {
        let kind = cmd.kind();
        let result = cmd.execute(self.sender.as_ref()).await;
        if let Err(err) = &result {
            self.counters.record_sender_error();
            if self.verbose {
                warn!(command = %kind, sender = self.sender.name(), error = %err, "send failed");
            } else {
                debug!(command = %kind, sender = self.sender.name(), error = %err, "send failed");
            }
        }
        result
    }

    pub(crate) async fn run(&self, cmd: SendCommand) {
        // failures are already counted
        let _ = self.execute(cmd).await;
    }
}

enum Realization {
    Slots(SlotPool),
    Worker(Arc<WorkerQueue>),
}

/// Bounded, non-blocking executor of send commands.
pub struct DispatchEngine {
    executor: Arc<Executor>,
    realization: Realization,
    runtime: Handle,
    capacity: usize,
}

impl DispatchEngine {
    /// Creates an engine whose tasks run on `runtime`.
    pub fn new(sender: Arc<dyn SenderBoxed>, config: &ExporterConfig, runtime: Handle) -> Self {
        let executor = Arc::new(Executor {
            sender,
            counters: Arc::new(Counters::default()),
            verbose: config.verbose_logging,
        });

        let capacity = max_capacity().min(config.queue_size);
        let realization = match config.dispatch_mode {
            DispatchMode::Slots => Realization::Slots(SlotPool::new(capacity)),
            DispatchMode::Worker => Realization::Worker(WorkerQueue::new(
                capacity,
                config.idle_timeout,
                Arc::clone(&executor),
                runtime.clone(),
            )),
        };

        Self {
            executor,
            realization,
            runtime,
            capacity,
        }
    }

    /// Offers a command for asynchronous execution.
    ///
    /// Never blocks. On rejection the command is discarded and counted as a
    /// dropped span or metric; only the first drop of the engine's lifetime
    /// is logged.
    pub fn dispatch(&self, cmd: SendCommand) -> Result<(), DispatchError> {
        let kind = cmd.kind();
        let accepted = match &self.realization {
            Realization::Slots(pool) => pool.try_dispatch(cmd, &self.executor, &self.runtime),
            Realization::Worker(queue) => queue.try_dispatch(cmd),
        };
        if accepted {
            return Ok(());
        }

        if self.executor.counters.record_dropped(kind) {
            warn!(
                command = %kind,
                capacity = self.capacity,
                "dispatch queue full, dropping telemetry; further drops are only counted"
            );
        }
        Err(DispatchError::Full(kind))
    }

    /// Executes a command on the caller's task, bypassing the capacity bound.
    ///
    /// Outcome accounting matches dispatched commands.
    pub(crate) async fn execute_now(&self, cmd: SendCommand) -> Result<(), SendError> {
        self.executor.execute(cmd).await
    }

    /// Waits for every previously accepted command, then flushes the sender.
    ///
    /// Commands offered while draining may be rejected; they are never waited
    /// on indefinitely by a caller that stops submitting.
    pub async fn flush(&self) {
        match &self.realization {
            Realization::Slots(pool) => pool.drain().await,
            Realization::Worker(queue) => queue.drain().await,
        }

        if let Err(err) = self.executor.sender.flush_boxed().await {
            self.executor.counters.record_sender_error();
            warn!(sender = self.executor.sender.name(), error = %err, "sender flush failed");
        }

        let counters = self.executor.counters.snapshot();
        if counters.spans_dropped > 0 {
            warn!(total = counters.spans_dropped, "spans dropped because the dispatch queue was full");
        }
        if counters.metrics_dropped > 0 {
            warn!(total = counters.metrics_dropped, "metrics dropped because the dispatch queue was full");
        }
    }

    pub fn counters(&self) -> &Arc<Counters> {
        &self.executor.counters
    }

    /// The runtime this engine spawns its tasks on.
    pub(crate) fn runtime(&self) -> &Handle {
        &self.runtime
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn mode(&self) -> DispatchMode {
        match self.realization {
            Realization::Slots(_) => DispatchMode::Slots,
            Realization::Worker(_) => DispatchMode::Worker,
        }
    }

    /// Whether a worker currently owns the queue. Always `false` in slots mode.
    pub fn has_active_worker(&self) -> bool {
        match &self.realization {
            Realization::Slots(_) => false,
            Realization::Worker(queue) => queue.is_active(),
        }
    }

    /// Total workers started so far. Always zero in slots mode.
    pub fn workers_spawned(&self) -> u64 {
        match &self.realization {
            Realization::Slots(_) => 0,
            Realization::Worker(queue) => queue.workers_spawned(),
        }
    }
}

/// Largest bound either realization can enforce: a tokio semaphore's
/// permit limit, and the `u32` that `acquire_many` takes when draining.
fn max_capacity() -> usize {
    Semaphore::MAX_PERMITS.min(u32::MAX as usize)
}
