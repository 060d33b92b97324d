//! Cache Statistics Module
//!
//! Tracks catalog lookup metrics: hits, misses and best-effort write failures.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Cache Counters ==
/// Lock-free counters shared by concurrent requests.
#[derive(Debug, Default)]
pub struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    write_failures: AtomicU64,
}

impl CacheCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a cache write that was logged and dropped.
    pub fn record_write_failure(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    // == Snapshot ==
    /// Captures the current counters together with the backend's key count.
    pub fn snapshot(&self, total_entries: usize) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        CacheStats {
            hits,
            misses,
            write_failures: self.write_failures.load(Ordering::Relaxed),
            total_entries,
            hit_rate: hit_rate(hits, misses),
        }
    }
}

// == Cache Stats ==
/// Point-in-time view of the catalog cache, served by `/api/cache/stats`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that fell back to the store (absent, expired, or cache failure)
    pub misses: u64,
    /// Cache writes that failed and were skipped
    pub write_failures: u64,
    /// Live keys held by the backend
    pub total_entries: usize,
    pub hit_rate: f64,
}

/// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
fn hit_rate(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_starts_at_zero() {
        let stats = CacheCounters::new().snapshot(0);
        assert_eq!(stats, CacheStats::default());
    }

    #[test]
    fn test_hit_rate_no_requests() {
        assert_eq!(hit_rate(0, 0), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let counters = CacheCounters::new();
        counters.record_hit();
        counters.record_hit();
        counters.record_hit();
        counters.record_miss();

        let stats = counters.snapshot(4);
        assert_eq!(stats.hits, 3);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_rate, 0.75);
        assert_eq!(stats.total_entries, 4);
    }

    #[test]
    fn test_write_failures_counted() {
        let counters = CacheCounters::new();
        counters.record_write_failure();
        counters.record_write_failure();
        assert_eq!(counters.snapshot(0).write_failures, 2);
    }
}
