//! Lock-free request metrics and periodic reporting
//!
//! Counters are atomics updated on the request path. Only `report()` resets
//! anything (the per-interval latency sum/max and request count).
//!
//! NOTE: All atomics use Relaxed ordering; these are statistical counters only.

use crate::domain::TrackingError;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Exponential request latency buckets (microseconds)
/// Buckets: ≤100, ≤200, ≤400, ≤800, ≤1600, ≤3200, ≤6400, ≤12800, ≤25600, ≤51200, >51200
pub const METRICS_BUCKET_BOUNDS: [u64; 10] =
    [100, 200, 400, 800, 1600, 3200, 6400, 12800, 25600, 51200];
pub const METRICS_NUM_BUCKETS: usize = 11;

#[inline]
fn bucket_index(latency_us: u64) -> usize {
    METRICS_BUCKET_BOUNDS.partition_point(|&bound| bound < latency_us)
}

#[inline]
fn update_atomic_max(atomic_max: &AtomicU64, new_value: u64) {
    let mut current_max = atomic_max.load(Ordering::Relaxed);
    while new_value > current_max {
        match atomic_max.compare_exchange_weak(
            current_max,
            new_value,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => break,
            Err(actual) => current_max = actual,
        }
    }
}

#[inline]
fn load_buckets(buckets: &[AtomicU64; METRICS_NUM_BUCKETS]) -> [u64; METRICS_NUM_BUCKETS] {
    let mut result = [0u64; METRICS_NUM_BUCKETS];
    for (i, bucket) in buckets.iter().enumerate() {
        result[i] = bucket.load(Ordering::Relaxed);
    }
    result
}

/// Upper bound of the bucket holding the given percentile
fn percentile_from_buckets(buckets: &[u64; METRICS_NUM_BUCKETS], percentile: f64) -> u64 {
    let total: u64 = buckets.iter().sum();
    if total == 0 {
        return 0;
    }

    let target = ((total as f64 * percentile) as u64).max(1);
    let mut cumulative = 0u64;

    // Last bucket uses 2x the previous bound
    const BUCKET_UPPER_BOUNDS: [u64; METRICS_NUM_BUCKETS] =
        [100, 200, 400, 800, 1600, 3200, 6400, 12800, 25600, 51200, 102400];

    for (i, &count) in buckets.iter().enumerate() {
        cumulative += count;
        if cumulative >= target {
            return BUCKET_UPPER_BOUNDS[i];
        }
    }
    BUCKET_UPPER_BOUNDS[METRICS_NUM_BUCKETS - 1]
}

pub struct Metrics {
    /// Total requests ever handled (monotonic)
    requests_total: AtomicU64,
    /// Requests since last report (reset on report)
    requests_since_report: AtomicU64,
    /// Latency sum / max since last report
    latency_sum_us: AtomicU64,
    latency_max_us: AtomicU64,
    /// Request latency histogram (monotonic, for Prometheus)
    latency_buckets: [AtomicU64; METRICS_NUM_BUCKETS],
    latency_total_sum_us: AtomicU64,
    validation_errors: AtomicU64,
    not_found_errors: AtomicU64,
    conflict_errors: AtomicU64,
    internal_errors: AtomicU64,
    allocations_total: AtomicU64,
    allocation_collisions: AtomicU64,
    derivations_total: AtomicU64,
    last_report: Mutex<Instant>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            requests_total: AtomicU64::new(0),
            requests_since_report: AtomicU64::new(0),
            latency_sum_us: AtomicU64::new(0),
            latency_max_us: AtomicU64::new(0),
            latency_buckets: std::array::from_fn(|_| AtomicU64::new(0)),
            latency_total_sum_us: AtomicU64::new(0),
            validation_errors: AtomicU64::new(0),
            not_found_errors: AtomicU64::new(0),
            conflict_errors: AtomicU64::new(0),
            internal_errors: AtomicU64::new(0),
            allocations_total: AtomicU64::new(0),
            allocation_collisions: AtomicU64::new(0),
            derivations_total: AtomicU64::new(0),
            last_report: Mutex::new(Instant::now()),
        }
    }

    #[inline]
    pub fn record_request(&self, latency_us: u64) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        self.requests_since_report.fetch_add(1, Ordering::Relaxed);
        self.latency_sum_us.fetch_add(latency_us, Ordering::Relaxed);
        self.latency_total_sum_us.fetch_add(latency_us, Ordering::Relaxed);
        update_atomic_max(&self.latency_max_us, latency_us);
        self.latency_buckets[bucket_index(latency_us)].fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self, err: &TrackingError) {
        let counter = match err {
            TrackingError::Validation(_) => &self.validation_errors,
            TrackingError::NotFound(_) => &self.not_found_errors,
            TrackingError::Conflict(_) => &self.conflict_errors,
            TrackingError::Internal(_) => &self.internal_errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_allocation(&self) {
        self.allocations_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_allocation_collision(&self) {
        self.allocation_collisions.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_derivation(&self) {
        self.derivations_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot without resetting anything (used by the /metrics endpoint)
    pub fn snapshot(&self) -> MetricsSummary {
        let buckets = load_buckets(&self.latency_buckets);
        let requests_total = self.requests_total.load(Ordering::Relaxed);
        let total_sum = self.latency_total_sum_us.load(Ordering::Relaxed);
        MetricsSummary {
            requests_total,
            requests_per_sec: 0.0,
            avg_latency_us: if requests_total > 0 { total_sum / requests_total } else { 0 },
            max_latency_us: self.latency_max_us.load(Ordering::Relaxed),
            latency_sum_us: total_sum,
            latency_p50_us: percentile_from_buckets(&buckets, 0.50),
            latency_p99_us: percentile_from_buckets(&buckets, 0.99),
            latency_buckets: buckets,
            validation_errors: self.validation_errors.load(Ordering::Relaxed),
            not_found_errors: self.not_found_errors.load(Ordering::Relaxed),
            conflict_errors: self.conflict_errors.load(Ordering::Relaxed),
            internal_errors: self.internal_errors.load(Ordering::Relaxed),
            allocations_total: self.allocations_total.load(Ordering::Relaxed),
            allocation_collisions: self.allocation_collisions.load(Ordering::Relaxed),
            derivations_total: self.derivations_total.load(Ordering::Relaxed),
        }
    }

    /// Interval report: resets per-interval counters
    pub fn report(&self) -> MetricsSummary {
        let mut summary = self.snapshot();

        let elapsed = {
            let mut last = self.last_report.lock();
            let elapsed = last.elapsed();
            *last = Instant::now();
            elapsed
        };

        let requests = self.requests_since_report.swap(0, Ordering::Relaxed);
        let sum = self.latency_sum_us.swap(0, Ordering::Relaxed);
        summary.max_latency_us = self.latency_max_us.swap(0, Ordering::Relaxed);
        summary.avg_latency_us = if requests > 0 { sum / requests } else { 0 };
        summary.requests_per_sec = if elapsed.as_secs_f64() > 0.0 {
            requests as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };
        summary
    }
}

#[derive(Debug, Clone)]
pub struct MetricsSummary {
    pub requests_total: u64,
    pub requests_per_sec: f64,
    pub avg_latency_us: u64,
    pub max_latency_us: u64,
    pub latency_sum_us: u64,
    pub latency_p50_us: u64,
    pub latency_p99_us: u64,
    pub latency_buckets: [u64; METRICS_NUM_BUCKETS],
    pub validation_errors: u64,
    pub not_found_errors: u64,
    pub conflict_errors: u64,
    pub internal_errors: u64,
    pub allocations_total: u64,
    pub allocation_collisions: u64,
    pub derivations_total: u64,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            requests_total = %self.requests_total,
            requests_per_sec = %format!("{:.2}", self.requests_per_sec),
            avg_latency_us = %self.avg_latency_us,
            max_latency_us = %self.max_latency_us,
            p99_latency_us = %self.latency_p99_us,
            allocations = %self.allocations_total,
            derivations = %self.derivations_total,
            validation_errors = %self.validation_errors,
            not_found_errors = %self.not_found_errors,
            internal_errors = %self.internal_errors,
            "metrics"
        );
    }
}
