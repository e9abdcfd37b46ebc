use crate::command::CommandKind;
use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Engine health counters, shared by every dispatch task.
///
/// Each counter only ever grows and sits on its own cache line so producers
/// dropping spans do not contend with workers recording sender errors.
///
/// Ordering contract: increments and reads are `Relaxed`. A reader sees every
/// increment eventually, but no ordering between the three counters is implied.
#[derive(Debug, Default)]
pub struct Counters {
    spans_dropped: CachePadded<AtomicU64>,
    metrics_dropped: CachePadded<AtomicU64>,
    sender_errors: CachePadded<AtomicU64>,
    /// Set by the first drop of either kind.
    any_drop_seen: AtomicBool,
}

/// A point-in-time copy of [`Counters`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CounterSnapshot {
    pub sender_errors: u64,
    pub metrics_dropped: u64,
    pub spans_dropped: u64,
}

impl CounterSnapshot {
    pub fn any_dropped(&self) -> bool {
        self.metrics_dropped > 0 || self.spans_dropped > 0
    }
}

impl Counters {
    pub fn spans_dropped(&self) -> u64 {
        self.spans_dropped.load(Ordering::Relaxed)
    }

    pub fn metrics_dropped(&self) -> u64 {
        self.metrics_dropped.load(Ordering::Relaxed)
    }

    pub fn sender_errors(&self) -> u64 {
        self.sender_errors.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            sender_errors: self.sender_errors(),
            metrics_dropped: self.metrics_dropped(),
            spans_dropped: self.spans_dropped(),
        }
    }

    /// Counts one dropped command. Returns `true` for exactly one call over
    /// the lifetime of these counters: the first drop of either kind.
    pub(crate) fn record_dropped(&self, kind: CommandKind) -> bool {
        let counter = if kind.is_span() {
            &self.spans_dropped
        } else {
            &self.metrics_dropped
        };
        counter.fetch_add(1, Ordering::Relaxed);
        !self.any_drop_seen.swap(true, Ordering::Relaxed)
    }

    pub(crate) fn record_sender_error(&self) {
        self.sender_errors.fetch_add(1, Ordering::Relaxed);
    }
}
