//! Prometheus metrics for the Sluice server.
//!
//! The `/metrics` route is only mounted when `server.metrics_enabled` is set,
//! since every other path belongs to the document namespace.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{self, Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::{LazyLock, Once};

/// Global Prometheus registry for all metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

pub static DOCUMENTS_SERVED: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "sluice_documents_served_total",
            "Total document responses by source (cache or store)",
        ),
        &["source"],
    )
    .expect("metric creation failed")
});

pub static FRAGMENTS_SERVED: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "sluice_fragments_served_total",
            "Total fragments served by status and body encoding",
        ),
        &["status", "encoding"],
    )
    .expect("metric creation failed")
});

pub static FRAGMENT_BYTES: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "sluice_fragment_bytes_total",
        "Total encoded body bytes sent in fragments",
    )
    .expect("metric creation failed")
});

pub static ARCHIVE_LOADS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "sluice_archive_loads_total",
            "Archive load attempts by result",
        ),
        &["result"],
    )
    .expect("metric creation failed")
});

pub static ARCHIVE_FALLBACK_HITS: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "sluice_archive_fallback_hits_total",
        "Archive hits found only after stripping leading path segments",
    )
    .expect("metric creation failed")
});

pub static NOT_FOUND_RESPONSES: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "sluice_not_found_responses_total",
        "Total not-found responses",
    )
    .expect("metric creation failed")
});

static REGISTER_ONCE: Once = Once::new();

/// Register all metrics with the global registry.
pub fn register_metrics() {
    REGISTER_ONCE.call_once(|| {
        REGISTRY
            .register(Box::new(DOCUMENTS_SERVED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(FRAGMENTS_SERVED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(FRAGMENT_BYTES.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(ARCHIVE_LOADS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(ARCHIVE_FALLBACK_HITS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(NOT_FOUND_RESPONSES.clone()))
            .expect("metric registration failed");
    });
}

/// GET /metrics - Prometheus metrics endpoint.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {e}").into_bytes(),
        ),
    }
}

/// Record a delivered fragment.
pub fn record_fragment(source: &str, status: &str, encoding: &str, bytes: usize) {
    DOCUMENTS_SERVED.with_label_values(&[source]).inc();
    FRAGMENTS_SERVED.with_label_values(&[status, encoding]).inc();
    FRAGMENT_BYTES.inc_by(bytes as u64);
}

/// Record the outcome of an archive load.
pub fn record_archive_load(ok: bool) {
    let result = if ok { "ok" } else { "error" };
    ARCHIVE_LOADS.with_label_values(&[result]).inc();
}
