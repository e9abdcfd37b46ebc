//! Self-managing worker over a bounded queue.
//!
//! At most one worker is active per queue. It is started on demand by the
//! first push that finds no active worker and retires after sitting idle for
//! `idle_timeout`.
//!
//! # Hand-off
//!
//! ```text
//!  producer                              retiring worker
//!  --------                              ---------------
//!  push(cmd)                             active = false
//!  fence(SeqCst)                         fence(SeqCst)
//!  CAS active false -> true              while !active: try_recv -> run
//!    ok  => spawn new worker
//!    err => the retiring worker (or
//!           the one that won) sees cmd
//! ```
//!
//! The two fences order each side's write before its read, so either the
//! producer sees `active == false` and spawns, or the retiring worker sees the
//! pushed command. A freshly spawned worker may overlap a retiring one for a
//! moment; the retiring one stops as soon as it observes `active == true`.

use super::Executor;
use crate::command::SendCommand;
use crate::invariants::{debug_assert_had_outstanding, debug_assert_within_capacity};
use std::sync::atomic::{fence, AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, Mutex, Notify, Semaphore};

pub(super) struct WorkerQueue {
    tx: mpsc::Sender<SendCommand>,
    rx: Mutex<mpsc::Receiver<SendCommand>>,
    /// Set while some worker owns the queue.
    active: AtomicBool,
    /// Accepted commands not yet completed, queued or running.
    outstanding: AtomicUsize,
    /// Woken when `outstanding` drops to zero.
    idle: Notify,
    workers_spawned: AtomicU64,
    capacity: usize,
    idle_timeout: Duration,
    executor: Arc<Executor>,
    runtime: Handle,
}

impl WorkerQueue {
    pub(super) fn new(
        capacity: usize,
        idle_timeout: Duration,
        executor: Arc<Executor>,
        runtime: Handle,
    ) -> Arc<Self> {
        let capacity = capacity.min(Semaphore::MAX_PERMITS);
        // tokio channels need room for at least one item; a zero capacity is
        // enforced by `reserve` instead
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Arc::new(Self {
            tx,
            rx: Mutex::new(rx),
            active: AtomicBool::new(false),
            outstanding: AtomicUsize::new(0),
            idle: Notify::new(),
            workers_spawned: AtomicU64::new(0),
            capacity,
            idle_timeout,
            executor,
            runtime,
        })
    }

    pub(super) fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub(super) fn workers_spawned(&self) -> u64 {
        self.workers_spawned.load(Ordering::Relaxed)
    }

    /// Queues a command without waiting, starting a worker if none is active.
    pub(super) fn try_dispatch(self: &Arc<Self>, cmd: SendCommand) -> bool {
        if !self.reserve() {
            return false;
        }
        if self.tx.try_send(cmd).is_err() {
            self.complete_one();
            return false;
        }

        fence(Ordering::SeqCst);
        if self
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.spawn_worker();
        }
        true
    }

    /// Waits until every accepted command has completed.
    pub(super) async fn drain(&self) {
        loop {
            let idle = self.idle.notified();
            tokio::pin!(idle);
            // register before checking so a completion in between is not missed
            idle.as_mut().enable();
            if self.outstanding.load(Ordering::Acquire) == 0 {
                return;
            }
            idle.await;
        }
    }

    fn reserve(&self) -> bool {
        let reserved = self
            .outstanding
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.capacity).then_some(n + 1)
            });
        match reserved {
            Ok(previous) => {
                debug_assert_within_capacity!(previous + 1, self.capacity);
                true
            }
            Err(_) => false,
        }
    }

    fn complete_one(&self) {
        let previous = self.outstanding.fetch_sub(1, Ordering::AcqRel);
        debug_assert_had_outstanding!(previous);
        if previous == 1 {
            self.idle.notify_waiters();
        }
    }

    fn spawn_worker(self: &Arc<Self>) {
        self.workers_spawned.fetch_add(1, Ordering::Relaxed);
        let queue = Arc::clone(self);
        self.runtime.spawn(queue.work());
    }

    async fn run(&self, cmd: SendCommand) {
        let _done = Completion(self);
        self.executor.run(cmd).await;
    }

    async fn work(self: Arc<Self>) {
        let _retire = RetireOnPanic(&self.active);

        loop {
            let next = {
                let mut rx = self.rx.lock().await;
                tokio::time::timeout(self.idle_timeout, rx.recv())
                    .await
                    .ok()
                    .flatten()
            };
            match next {
                Some(cmd) => self.run(cmd).await,
                None => break,
            }
        }

        self.active.store(false, Ordering::SeqCst);
        fence(Ordering::SeqCst);
        self.drain_retiring().await;
    }

    /// Runs leftovers while no other worker is known to be active. A held
    /// receiver lock means another worker is servicing the queue.
    async fn drain_retiring(&self) {
        while !self.active.load(Ordering::SeqCst) {
            let next = match self.rx.try_lock() {
                Ok(mut rx) => rx.try_recv().ok(),
                Err(_) => None,
            };
            match next {
                Some(cmd) => self.run(cmd).await,
                None => return,
            }
        }
    }
}

/// Marks one outstanding command complete when dropped, even on panic.
struct Completion<'a>(&'a WorkerQueue);

impl Drop for Completion<'_> {
    fn drop(&mut self) {
        self.0.complete_one();
    }
}

/// Clears the active flag if a worker dies mid-command so the next push
/// starts a replacement.
struct RetireOnPanic<'a>(&'a AtomicBool);

impl Drop for RetireOnPanic<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.store(false, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counters::Counters;
    use crate::sender::{GatedSender, RecordingSender, SenderBoxed};
    use crate::wire::MetricPoint;
    use std::collections::HashMap;

    fn cmd(i: usize) -> SendCommand {
        SendCommand::Metric(MetricPoint {
            name: format!("m{i}"),
            value: 0.0,
            timestamp_millis: 0,
            source: String::new(),
            tags: HashMap::new(),
        })
    }

    fn queue(sender: Arc<dyn SenderBoxed>, capacity: usize, idle: Duration) -> Arc<WorkerQueue> {
        let executor = Arc::new(Executor {
            sender,
            counters: Arc::new(Counters::default()),
            verbose: false,
        });
        WorkerQueue::new(capacity, idle, executor, Handle::current())
    }

    #[tokio::test]
    async fn test_outstanding_is_hard_bound() {
        let sender = Arc::new(GatedSender::new());
        let queue = queue(sender.clone(), 3, Duration::from_secs(5));

        for i in 0..3 {
            assert!(queue.try_dispatch(cmd(i)));
        }
        // let the worker pick one up; that must not free a slot
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(sender.started(), 1);
        assert!(!queue.try_dispatch(cmd(3)));

        sender.open();
        queue.drain().await;
        assert_eq!(sender.completed(), 3);
        assert_eq!(queue.outstanding.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_worker_retires_when_idle_and_restarts() {
        let sender = Arc::new(RecordingSender::new());
        let queue = queue(sender.clone(), 10, Duration::from_millis(10));

        assert!(queue.try_dispatch(cmd(0)));
        queue.drain().await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!queue.is_active());
        assert_eq!(queue.workers_spawned(), 1);

        assert!(queue.try_dispatch(cmd(1)));
        assert!(queue.is_active());
        queue.drain().await;

        assert_eq!(sender.metrics().len(), 2);
        assert_eq!(queue.workers_spawned(), 2);
    }

    #[tokio::test]
    async fn test_retiring_worker_drains_leftovers() {
        let sender = Arc::new(RecordingSender::new());
        let queue = queue(sender.clone(), 10, Duration::from_secs(5));

        // Simulate a push that raced a retiring worker: the command is queued
        // but no worker was spawned for it.
        assert!(queue.reserve());
        queue.tx.try_send(cmd(0)).unwrap();
        assert!(!queue.is_active());

        queue.drain_retiring().await;
        queue.drain().await;

        assert_eq!(sender.metrics().len(), 1);
        assert!(!queue.is_active());
    }
}
