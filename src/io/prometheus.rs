//! Prometheus text exposition for the tracker's counters
//!
//! Served by the HTTP layer at GET /metrics.

use crate::infra::metrics::{MetricsSummary, METRICS_BUCKET_BOUNDS, METRICS_NUM_BUCKETS};
use std::fmt::Write;

pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Prometheus metric type
enum MetricType {
    Counter,
    Gauge,
}

impl MetricType {
    fn as_str(&self) -> &'static str {
        match self {
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
        }
    }
}

fn write_metric(output: &mut String, name: &str, help: &str, typ: MetricType, val: u64) {
    let _ = writeln!(output, "# HELP {name} {help}");
    let _ = writeln!(output, "# TYPE {name} {}", typ.as_str());
    let _ = writeln!(output, "{name} {val}");
}

/// Cumulative buckets, then `_sum` and `_count`
fn write_histogram(
    output: &mut String,
    name: &str,
    help: &str,
    buckets: &[u64; METRICS_NUM_BUCKETS],
    sum: u64,
) {
    let _ = writeln!(output, "# HELP {name} {help}");
    let _ = writeln!(output, "# TYPE {name} histogram");

    let mut cumulative = 0u64;
    for (i, &bound) in METRICS_BUCKET_BOUNDS.iter().enumerate() {
        cumulative += buckets[i];
        let _ = writeln!(output, "{name}_bucket{{le=\"{bound}\"}} {cumulative}");
    }
    cumulative += buckets[METRICS_NUM_BUCKETS - 1];
    let _ = writeln!(output, "{name}_bucket{{le=\"+Inf\"}} {cumulative}");
    let _ = writeln!(output, "{name}_sum {sum}");
    let _ = writeln!(output, "{name}_count {cumulative}");
}

pub fn format_prometheus_metrics(summary: &MetricsSummary, shipments_stored: usize) -> String {
    let mut output = String::with_capacity(4096);

    write_metric(
        &mut output,
        "tracker_requests_total",
        "Total HTTP requests handled",
        MetricType::Counter,
        summary.requests_total,
    );
    write_histogram(
        &mut output,
        "tracker_request_latency_us",
        "Request handling latency in microseconds",
        &summary.latency_buckets,
        summary.latency_sum_us,
    );
    write_metric(
        &mut output,
        "tracker_request_latency_p99_us",
        "99th percentile request latency",
        MetricType::Gauge,
        summary.latency_p99_us,
    );

    let _ = writeln!(output, "# HELP tracker_errors_total Requests rejected, by error kind");
    let _ = writeln!(output, "# TYPE tracker_errors_total counter");
    for (kind, count) in [
        ("validation", summary.validation_errors),
        ("not_found", summary.not_found_errors),
        ("conflict", summary.conflict_errors),
        ("internal", summary.internal_errors),
    ] {
        let _ = writeln!(output, "tracker_errors_total{{kind=\"{kind}\"}} {count}");
    }

    write_metric(
        &mut output,
        "tracker_allocations_total",
        "Tracking numbers allocated and stored",
        MetricType::Counter,
        summary.allocations_total,
    );
    write_metric(
        &mut output,
        "tracker_allocation_collisions_total",
        "Allocation draws that hit an existing tracking number",
        MetricType::Counter,
        summary.allocation_collisions,
    );
    write_metric(
        &mut output,
        "tracker_derivations_total",
        "Successful status derivations",
        MetricType::Counter,
        summary.derivations_total,
    );
    write_metric(
        &mut output,
        "tracker_shipments_stored",
        "Shipments currently held by the repository",
        MetricType::Gauge,
        shipments_stored as u64,
    );

    output
}
