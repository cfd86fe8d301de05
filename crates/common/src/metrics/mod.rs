//! Metrics and observability utilities
//!
//! Prometheus metrics for the forwarder with latency histograms sized for
//! a slow upstream and standardized naming conventions.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};

/// Metrics prefix for all ClinBridge metrics
pub const METRICS_PREFIX: &str = "clinbridge";

/// Histogram buckets for upstream workflow latency (in seconds). Workflow
/// runs routinely take tens of seconds; the client timeout is 90s.
pub const UPSTREAM_BUCKETS: &[f64] = &[
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
    10.00,  // 10s
    30.00,  // 30s
    60.00,  // 60s
    90.00,  // 90s - client timeout
];

/// Full name of the upstream latency histogram, for exporter bucket setup
pub fn upstream_duration_metric() -> String {
    format!("{}_upstream_duration_seconds", METRICS_PREFIX)
}

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_ask_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total questions forwarded upstream, by answer source"
    );

    describe_histogram!(
        upstream_duration_metric(),
        Unit::Seconds,
        "Upstream workflow request latency in seconds"
    );

    describe_counter!(
        format!("{}_validation_rejections_total", METRICS_PREFIX),
        Unit::Count,
        "Submissions rejected before any upstream call"
    );

    describe_counter!(
        format!("{}_upstream_errors_total", METRICS_PREFIX),
        Unit::Count,
        "Failed upstream calls, by error code"
    );

    tracing::info!("Metrics registered");
}

/// Record one completed forward, labelled with the answer source
/// ("data.outputs.text", "answer", "raw_body", or "none" on shape mismatch)
pub fn record_ask(latency_secs: f64, source: &str) {
    counter!(
        format!("{}_ask_requests_total", METRICS_PREFIX),
        "source" => source.to_string()
    )
    .increment(1);

    histogram!(upstream_duration_metric()).record(latency_secs);
}

/// Record a submission rejected by validation
pub fn record_rejection(field: &str) {
    counter!(
        format!("{}_validation_rejections_total", METRICS_PREFIX),
        "field" => field.to_string()
    )
    .increment(1);
}

/// Record a failed upstream call
pub fn record_upstream_error(code: &str) {
    counter!(
        format!("{}_upstream_errors_total", METRICS_PREFIX),
        "code" => code.to_string()
    )
    .increment(1);
}
