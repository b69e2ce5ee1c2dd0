//! Statistics tracking for bus dispatch

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Maximum latency samples kept before the oldest half is discarded
const MAX_LATENCY_SAMPLES: usize = 1000;

/// Snapshot of bus activity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BusStats {
    pub messages_published: u64,
    pub deliveries: u64,
    /// Publishes that found no subscriber for their topic
    pub undelivered: u64,
    pub handler_failures: u64,
    pub dispatch_p50_us: f64,
    pub dispatch_p99_us: f64,
}

/// Thread-safe statistics collector
#[derive(Clone, Default)]
pub struct StatsCollector {
    messages_published: Arc<AtomicU64>,
    deliveries: Arc<AtomicU64>,
    undelivered: Arc<AtomicU64>,
    handler_failures: Arc<AtomicU64>,
    latencies: Arc<Mutex<Vec<f64>>>,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_publish(&self) {
        self.messages_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delivery(&self) {
        self.deliveries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_undelivered(&self) {
        self.undelivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.handler_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record how long one publish took to run every handler (microseconds)
    pub fn record_dispatch(&self, micros: f64) {
        let mut latencies = self.latencies.lock();
        latencies.push(micros);
        if latencies.len() > MAX_LATENCY_SAMPLES {
            latencies.drain(0..MAX_LATENCY_SAMPLES / 2);
        }
    }

    pub fn snapshot(&self) -> BusStats {
        let (p50, p99) = {
            let mut latencies = self.latencies.lock().clone();
            if latencies.is_empty() {
                (0.0, 0.0)
            } else {
                latencies.sort_by(|a, b| a.total_cmp(b));
                let last = latencies.len() - 1;
                let p50_idx = ((latencies.len() as f64 * 0.50) as usize).min(last);
                let p99_idx = ((latencies.len() as f64 * 0.99) as usize).min(last);
                (latencies[p50_idx], latencies[p99_idx])
            }
        };

        BusStats {
            messages_published: self.messages_published.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            undelivered: self.undelivered.load(Ordering::Relaxed),
            handler_failures: self.handler_failures.load(Ordering::Relaxed),
            dispatch_p50_us: p50,
            dispatch_p99_us: p99,
        }
    }

    pub fn reset(&self) {
        self.messages_published.store(0, Ordering::Relaxed);
        self.deliveries.store(0, Ordering::Relaxed);
        self.undelivered.store(0, Ordering::Relaxed);
        self.handler_failures.store(0, Ordering::Relaxed);
        self.latencies.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collector_counts() {
        let collector = StatsCollector::new();
        collector.record_publish();
        collector.record_publish();
        collector.record_delivery();
        collector.record_undelivered();
        collector.record_failure();

        let stats = collector.snapshot();
        assert_eq!(stats.messages_published, 2);
        assert_eq!(stats.deliveries, 1);
        assert_eq!(stats.undelivered, 1);
        assert_eq!(stats.handler_failures, 1);
    }

    #[test]
    fn test_dispatch_percentiles() {
        let collector = StatsCollector::new();
        for i in 1..=100 {
            collector.record_dispatch(i as f64);
        }

        let stats = collector.snapshot();
        assert!(stats.dispatch_p50_us >= 49.0 && stats.dispatch_p50_us <= 51.0);
        assert!(stats.dispatch_p99_us >= 98.0 && stats.dispatch_p99_us <= 100.0);
    }

    #[test]
    fn test_latency_samples_are_bounded() {
        let collector = StatsCollector::new();
        for i in 0..(MAX_LATENCY_SAMPLES + 1) {
            collector.record_dispatch(i as f64);
        }
        assert!(collector.latencies.lock().len() <= MAX_LATENCY_SAMPLES);
    }

    #[test]
    fn test_clone_shares_counters() {
        let first = StatsCollector::new();
        first.record_publish();

        let second = first.clone();
        second.record_publish();

        assert_eq!(first.snapshot().messages_published, 2);
    }

    #[test]
    fn test_reset() {
        let collector = StatsCollector::new();
        collector.record_publish();
        collector.record_dispatch(12.0);
        collector.reset();

        assert_eq!(collector.snapshot(), BusStats::default());
    }
}
