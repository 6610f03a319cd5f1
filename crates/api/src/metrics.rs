use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use serde::Serialize;

pub struct Metrics {
    total_requests: AtomicUsize,
    successful_requests: AtomicUsize,
    failed_requests: AtomicUsize,
    total_query_time_us: AtomicU64,
    total_results_returned: AtomicUsize,
}

impl Metrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            total_requests: AtomicUsize::new(0),
            successful_requests: AtomicUsize::new(0),
            failed_requests: AtomicUsize::new(0),
            total_query_time_us: AtomicU64::new(0),
            total_results_returned: AtomicUsize::new(0),
        })
    }

    pub fn record_query(&self, duration: std::time::Duration, results: usize, success: bool) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if success {
            self.successful_requests.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_requests.fetch_add(1, Ordering::Relaxed);
        }
        self.total_query_time_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        self.total_results_returned
            .fetch_add(results, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let total = self.total_requests.load(Ordering::Relaxed);
        let total_us = self.total_query_time_us.load(Ordering::Relaxed) as f64;
        MetricsSnapshot {
            total_requests: total,
            successful_requests: self.successful_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            avg_query_time_ms: if total > 0 {
                total_us / total as f64 / 1000.0
            } else {
                0.0
            },
            total_results_returned: self.total_results_returned.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: usize,
    pub successful_requests: usize,
    pub failed_requests: usize,
    pub avg_query_time_ms: f64,
    pub total_results_returned: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn snapshot_averages_over_all_requests() {
        let metrics = Metrics::new();
        metrics.record_query(Duration::from_millis(10), 3, true);
        metrics.record_query(Duration::from_millis(30), 0, false);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_requests, 2);
        assert_eq!(snapshot.successful_requests, 1);
        assert_eq!(snapshot.failed_requests, 1);
        assert_eq!(snapshot.total_results_returned, 3);
        assert!((snapshot.avg_query_time_ms - 20.0).abs() < 0.5);
    }
}
