//! Observability surface of the dispatcher.
//!
//! The dispatcher reports into an injected [`MetricsSink`] scoped to the
//! instance; there is no process-wide registry. Gauges track the current
//! buffer, and are reset to zero after each successful flush.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

pub trait MetricsSink: Send + Sync {
    /// Number of entries currently buffered and pending flush.
    fn set_entries_buffered(&self, count: usize);

    /// Byte size of the current batch, per the dispatcher's accounting.
    fn set_batch_size_bytes(&self, bytes: usize);

    /// Round-trip latency of a flush call, recorded for successful and
    /// failed sends alike.
    fn observe_flush_duration(&self, elapsed: Duration);
}

/// Discards every observation. The default when the caller does not care.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn set_entries_buffered(&self, _count: usize) {}
    fn set_batch_size_bytes(&self, _bytes: usize) {}
    fn observe_flush_duration(&self, _elapsed: Duration) {}
}

/// Atomic gauges readable from any thread; handy for scraping and for
/// watching a stuck batch from the outside.
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    entries_buffered: AtomicU64,
    batch_size_bytes: AtomicU64,
    flush_count: AtomicU64,
    last_flush_duration_micros: AtomicU64,
}

impl InMemoryMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn entries_buffered(&self) -> u64 {
        self.entries_buffered.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn batch_size_bytes(&self) -> u64 {
        self.batch_size_bytes.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn flush_count(&self) -> u64 {
        self.flush_count.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn last_flush_duration(&self) -> Duration {
        Duration::from_micros(self.last_flush_duration_micros.load(Ordering::Relaxed))
    }
}

#[allow(clippy::cast_possible_truncation)]
impl MetricsSink for InMemoryMetrics {
    fn set_entries_buffered(&self, count: usize) {
        self.entries_buffered.store(count as u64, Ordering::Relaxed);
    }

    fn set_batch_size_bytes(&self, bytes: usize) {
        self.batch_size_bytes.store(bytes as u64, Ordering::Relaxed);
    }

    fn observe_flush_duration(&self, elapsed: Duration) {
        self.flush_count.fetch_add(1, Ordering::Relaxed);
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.last_flush_duration_micros
            .store(micros, Ordering::Relaxed);
    }
}
