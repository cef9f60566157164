//! Prometheus metrics for sync passes and outbound requests
//!
//! This module tracks:
//! - Sync passes: count per trigger, duration, selections
//! - Download submissions by outcome
//! - Outbound request retries and exhausted requests per API
//!
//! # Usage
//!
//! Call `init_metrics()` at application startup to register all metrics.
//! If initialization fails, metrics operations become no-ops.

use prometheus::{
    register_counter, register_counter_vec, register_histogram, Counter, CounterVec, Encoder,
    Histogram, TextEncoder,
};
use std::sync::OnceLock;

// ============================================================================
// Metrics Storage
// ============================================================================

/// Container for sync pass metrics
struct SyncMetrics {
    passes: CounterVec,
    pass_duration: Histogram,
    selections: Counter,
    submissions: CounterVec,
}

/// Container for outbound request metrics
struct RequestMetrics {
    retries: CounterVec,
    failures: CounterVec,
}

static SYNC_METRICS: OnceLock<SyncMetrics> = OnceLock::new();

static REQUEST_METRICS: OnceLock<RequestMetrics> = OnceLock::new();

/// Flag to track if initialization was attempted
static METRICS_INIT_ATTEMPTED: OnceLock<bool> = OnceLock::new();

// ============================================================================
// Initialization
// ============================================================================

/// Initialize all Prometheus metrics
///
/// Safe to call more than once; only the first call registers anything.
pub fn init_metrics() -> Result<(), Box<dyn std::error::Error>> {
    if METRICS_INIT_ATTEMPTED.get().is_some() {
        return Ok(());
    }
    METRICS_INIT_ATTEMPTED.set(true).ok();

    let sync = SyncMetrics {
        passes: register_counter_vec!(
            "seadex_monitor_passes_total",
            "Completed sync passes by trigger",
            &["trigger"]
        )?,
        pass_duration: register_histogram!(
            "seadex_monitor_pass_duration_seconds",
            "Duration of a full sync pass in seconds",
            vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0, 3600.0]
        )?,
        selections: register_counter!(
            "seadex_monitor_selections_total",
            "Releases newly selected as best"
        )?,
        submissions: register_counter_vec!(
            "seadex_monitor_submissions_total",
            "Download submissions by outcome",
            &["outcome"]
        )?,
    };

    let requests = RequestMetrics {
        retries: register_counter_vec!(
            "seadex_monitor_request_retries_total",
            "Request retries by API and failure reason",
            &["api", "reason"]
        )?,
        failures: register_counter_vec!(
            "seadex_monitor_request_failures_total",
            "Requests that exhausted all retries, by API",
            &["api"]
        )?,
    };

    SYNC_METRICS.set(sync).map_err(|_| "Sync metrics already initialized")?;
    REQUEST_METRICS.set(requests).map_err(|_| "Request metrics already initialized")?;

    tracing::info!("Prometheus metrics initialized successfully");
    Ok(())
}

/// Check if metrics have been initialized
pub fn metrics_initialized() -> bool {
    SYNC_METRICS.get().is_some() && REQUEST_METRICS.get().is_some()
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Record a finished pass
pub fn record_pass(trigger: &str, duration_secs: f64, selections: usize) {
    let Some(m) = SYNC_METRICS.get() else {
        return;
    };

    m.passes.with_label_values(&[trigger]).inc();
    m.pass_duration.observe(duration_secs);
    if selections > 0 {
        m.selections.inc_by(selections as f64);
    }
}

/// Record a download submission outcome (`sent`, `declined`, `failed`)
pub fn record_submission(outcome: &str) {
    if let Some(m) = SYNC_METRICS.get() {
        m.submissions.with_label_values(&[outcome]).inc();
    }
}

/// Record a retried request
pub fn record_retry(api: &str, reason: &str) {
    if let Some(m) = REQUEST_METRICS.get() {
        m.retries.with_label_values(&[api, reason]).inc();
    }
}

/// Record a request that ran out of attempts
pub fn record_request_failure(api: &str) {
    if let Some(m) = REQUEST_METRICS.get() {
        m.failures.with_label_values(&[api]).inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ensure_metrics_initialized() {
        let _ = init_metrics();
    }

    #[test]
    fn test_init_metrics_idempotent() {
        assert!(init_metrics().is_ok());
        assert!(init_metrics().is_ok());
    }

    #[test]
    fn test_encode_metrics() {
        ensure_metrics_initialized();
        record_pass("manual", 1.5, 1);
        let text = encode_metrics().unwrap();
        assert!(text.contains("seadex_monitor_") || text.is_empty());
    }

    #[test]
    fn test_recording_does_not_panic() {
        ensure_metrics_initialized();
        record_submission("sent");
        record_retry("anilist", "rate_limited");
        record_request_failure("seadex");
    }
}
