//! # Metrics
//!
//! Prometheus metrics for monitoring the issuer.
//!
//! ## Metrics Exposed
//!
//! - `origin_ca_issuer_reconciliations_total` - Reconciliations by resource kind
//! - `origin_ca_issuer_reconciliation_errors_total` - Reconciliation errors by resource kind
//! - `origin_ca_issuer_reconciliation_duration_seconds` - Duration of reconciliations
//! - `origin_ca_issuer_certificates_issued_total` - Certificates issued by request type
//! - `origin_ca_issuer_sign_errors_total` - Failed signing calls by error class
//! - `origin_ca_issuer_sign_duration_seconds` - Duration of Origin CA API calls

use anyhow::Result;
use prometheus::{Histogram, HistogramVec, IntCounterVec, Registry};
use std::sync::LazyLock;

// Metrics
pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "origin_ca_issuer_reconciliations_total",
            "Total number of reconciliations by resource kind",
        ),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "origin_ca_issuer_reconciliation_errors_total",
            "Total number of reconciliation errors by resource kind",
        ),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "origin_ca_issuer_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static CERTIFICATES_ISSUED_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "origin_ca_issuer_certificates_issued_total",
            "Total number of certificates issued by the Origin CA",
        ),
        &["request_type"],
    )
    .expect("Failed to create CERTIFICATES_ISSUED_TOTAL metric - this should never happen")
});

static SIGN_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "origin_ca_issuer_sign_errors_total",
            "Total number of failed signing calls by error class",
        ),
        &["class"],
    )
    .expect("Failed to create SIGN_ERRORS_TOTAL metric - this should never happen")
});

static SIGN_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "origin_ca_issuer_sign_duration_seconds",
            "Duration of Origin CA API signing calls in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
    )
    .expect("Failed to create SIGN_DURATION metric - this should never happen")
});

#[allow(
    clippy::missing_errors_doc,
    reason = "Error documentation is provided in doc comments"
)]
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(CERTIFICATES_ISSUED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SIGN_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SIGN_DURATION.clone()))?;

    Ok(())
}

pub fn increment_reconciliations(kind: &str) {
    RECONCILIATIONS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn increment_reconciliation_errors(kind: &str) {
    RECONCILIATION_ERRORS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn observe_reconciliation_duration(kind: &str, duration: f64) {
    RECONCILIATION_DURATION
        .with_label_values(&[kind])
        .observe(duration);
}

pub fn increment_certificates_issued(request_type: &str) {
    CERTIFICATES_ISSUED_TOTAL
        .with_label_values(&[request_type])
        .inc();
}

/// `class` is `retryable` or `terminal`
pub fn increment_sign_errors(class: &str) {
    SIGN_ERRORS_TOTAL.with_label_values(&[class]).inc();
}

pub fn observe_sign_duration(duration: f64) {
    SIGN_DURATION.observe(duration);
}
