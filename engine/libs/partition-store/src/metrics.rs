//! Store metrics for observability

use crate::keys::LogicalKey;
use prometheus::{CounterVec, Opts, Registry};
use std::sync::OnceLock;

static METRICS: OnceLock<StoreMetricsInner> = OnceLock::new();

struct StoreMetricsInner {
    reads: CounterVec,
    misses: CounterVec,
    writes: CounterVec,
    corrupt: CounterVec,
    partition_scans: CounterVec,
    errors: CounterVec,
}

impl StoreMetricsInner {
    fn new() -> Self {
        Self {
            reads: CounterVec::new(
                Opts::new("feed_store_reads_total", "Total partition reads"),
                &["logical_key"],
            )
            .expect("valid metric definition"),
            misses: CounterVec::new(
                Opts::new(
                    "feed_store_misses_total",
                    "Partition reads that found no value",
                ),
                &["logical_key"],
            )
            .expect("valid metric definition"),
            writes: CounterVec::new(
                Opts::new("feed_store_writes_total", "Total partition writes"),
                &["logical_key"],
            )
            .expect("valid metric definition"),
            corrupt: CounterVec::new(
                Opts::new(
                    "feed_store_corrupt_values_total",
                    "Stored values that failed to parse and were replaced by defaults",
                ),
                &["logical_key"],
            )
            .expect("valid metric definition"),
            partition_scans: CounterVec::new(
                Opts::new(
                    "feed_store_partition_scans_total",
                    "Total prefix scans across partitions",
                ),
                &["logical_key"],
            )
            .expect("valid metric definition"),
            errors: CounterVec::new(
                Opts::new("feed_store_errors_total", "Total backend errors"),
                &["logical_key", "error_type"],
            )
            .expect("valid metric definition"),
        }
    }

    fn register(&self, registry: &Registry) -> Result<(), prometheus::Error> {
        registry.register(Box::new(self.reads.clone()))?;
        registry.register(Box::new(self.misses.clone()))?;
        registry.register(Box::new(self.writes.clone()))?;
        registry.register(Box::new(self.corrupt.clone()))?;
        registry.register(Box::new(self.partition_scans.clone()))?;
        registry.register(Box::new(self.errors.clone()))?;
        Ok(())
    }
}

fn get_metrics() -> &'static StoreMetricsInner {
    METRICS.get_or_init(StoreMetricsInner::new)
}

/// Store metrics wrapper
#[derive(Clone, Default)]
pub struct StoreMetrics;

impl StoreMetrics {
    pub fn new() -> Self {
        Self
    }

    /// Register metrics with a Prometheus registry
    pub fn register(registry: &Registry) -> Result<(), prometheus::Error> {
        get_metrics().register(registry)
    }

    pub fn record_read(&self, key: LogicalKey) {
        get_metrics().reads.with_label_values(&[key.as_str()]).inc();
    }

    pub fn record_miss(&self, key: LogicalKey) {
        get_metrics().misses.with_label_values(&[key.as_str()]).inc();
    }

    pub fn record_write(&self, key: LogicalKey) {
        get_metrics().writes.with_label_values(&[key.as_str()]).inc();
    }

    pub fn record_corrupt(&self, key: LogicalKey) {
        get_metrics().corrupt.with_label_values(&[key.as_str()]).inc();
    }

    pub fn record_scan(&self, key: LogicalKey) {
        get_metrics()
            .partition_scans
            .with_label_values(&[key.as_str()])
            .inc();
    }

    pub fn record_error(&self, key: LogicalKey, error_type: &str) {
        get_metrics()
            .errors
            .with_label_values(&[key.as_str(), error_type])
            .inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_exposes_store_metrics() {
        let registry = Registry::new();
        StoreMetrics::register(&registry).expect("register metrics");

        let metrics = StoreMetrics::new();
        metrics.record_read(LogicalKey::UserPosts);
        metrics.record_corrupt(LogicalKey::LikedPosts);

        let names: Vec<String> = registry
            .gather()
            .iter()
            .map(|family| family.get_name().to_string())
            .collect();
        assert!(names.contains(&"feed_store_reads_total".to_string()));
        assert!(names.contains(&"feed_store_corrupt_values_total".to_string()));
    }
}
