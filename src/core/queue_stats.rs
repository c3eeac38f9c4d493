//! Queue counters for observability
//!
//! Tracks how many entries went through an async queue and how many were
//! lost to overflow or transport failures.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one async queue
///
/// # Example
///
/// ```
/// use logdash::QueueStats;
///
/// let stats = QueueStats::new();
///
/// stats.record_enqueued();
/// stats.record_delivered();
///
/// assert_eq!(stats.delivered(), 1);
/// assert_eq!(stats.pending(), 0);
/// ```
#[derive(Debug)]
pub struct QueueStats {
    /// Entries accepted into the queue
    enqueued: AtomicU64,

    /// Entries the processing function handled successfully
    delivered: AtomicU64,

    /// Entries whose processing function returned an error
    failed: AtomicU64,

    /// Entries discarded because the queue was full
    dropped: AtomicU64,

    /// Number of times a producer had to wait for space
    block_events: AtomicU64,
}

impl QueueStats {
    pub const fn new() -> Self {
        Self {
            enqueued: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            block_events: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn enqueued(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn block_events(&self) -> u64 {
        self.block_events.load(Ordering::Relaxed)
    }

    /// Entries accepted but not yet processed (or discarded by a close)
    pub fn pending(&self) -> u64 {
        self.enqueued()
            .saturating_sub(self.delivered() + self.failed())
    }

    #[inline]
    pub fn record_enqueued(&self) -> u64 {
        self.enqueued.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_delivered(&self) -> u64 {
        self.delivered.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_failed(&self) -> u64 {
        self.failed.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_dropped(&self) -> u64 {
        self.dropped.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_block(&self) -> u64 {
        self.block_events.fetch_add(1, Ordering::Relaxed)
    }

    /// Share of offered entries lost to overflow, as a percentage (0.0 - 100.0)
    pub fn drop_rate(&self) -> f64 {
        let dropped = self.dropped() as f64;
        let total = self.enqueued() as f64 + dropped;
        if total == 0.0 {
            0.0
        } else {
            (dropped / total) * 100.0
        }
    }
}

impl Default for QueueStats {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for QueueStats {
    /// Create a snapshot of the current counter values
    fn clone(&self) -> Self {
        Self {
            enqueued: AtomicU64::new(self.enqueued()),
            delivered: AtomicU64::new(self.delivered()),
            failed: AtomicU64::new(self.failed()),
            dropped: AtomicU64::new(self.dropped()),
            block_events: AtomicU64::new(self.block_events()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = QueueStats::new();
        assert_eq!(stats.enqueued(), 0);
        assert_eq!(stats.delivered(), 0);
        assert_eq!(stats.failed(), 0);
        assert_eq!(stats.dropped(), 0);
        assert_eq!(stats.block_events(), 0);
    }

    #[test]
    fn test_record_returns_previous_value() {
        let stats = QueueStats::new();
        assert_eq!(stats.record_dropped(), 0);
        assert_eq!(stats.record_dropped(), 1);
        assert_eq!(stats.dropped(), 2);
    }

    #[test]
    fn test_pending() {
        let stats = QueueStats::new();
        for _ in 0..5 {
            stats.record_enqueued();
        }
        stats.record_delivered();
        stats.record_failed();
        assert_eq!(stats.pending(), 3);
    }

    #[test]
    fn test_drop_rate() {
        let stats = QueueStats::new();
        assert_eq!(stats.drop_rate(), 0.0);

        for _ in 0..90 {
            stats.record_enqueued();
        }
        for _ in 0..10 {
            stats.record_dropped();
        }

        let rate = stats.drop_rate();
        assert!((9.9..=10.1).contains(&rate), "Drop rate was {}", rate);
    }

    #[test]
    fn test_clone_is_snapshot() {
        let stats = QueueStats::new();
        stats.record_enqueued();

        let snapshot = stats.clone();
        stats.record_enqueued();

        assert_eq!(snapshot.enqueued(), 1);
        assert_eq!(stats.enqueued(), 2);
    }
}
