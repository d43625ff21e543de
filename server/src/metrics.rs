//! # Prometheus Metrics
//!
//! Operational metrics for the VaultLink service, scraped at `/metrics`
//! on the configured metrics port.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] so
//! they do not collide with any default global registry consumers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};
use std::sync::Arc;

/// Holds all Prometheus metric handles for the service.
///
/// Clone-friendly (wraps `Arc` internally via prometheus handles) so it
/// can be shared across request handlers.
#[derive(Clone)]
pub struct ServiceMetrics {
    /// Prometheus registry that owns all metrics below.
    registry: Registry,
    /// Total link requests initiated.
    pub link_requests_initiated_total: IntCounter,
    /// Total credentials revealed (one per successfully claimed request).
    pub credentials_claimed_total: IntCounter,
    /// Total status polls that found the credential already claimed.
    pub claims_already_claimed_total: IntCounter,
    /// Total link requests that resolved to expired.
    pub link_requests_expired_total: IntCounter,
    /// Total vaults provisioned end to end.
    pub vaults_provisioned_total: IntCounter,
    /// Total provisioning attempts that failed after name reservation.
    pub provisioning_failures_total: IntCounter,
    /// Histogram of end-to-end provisioning latency in seconds
    /// (dominated by salt mining at higher prefix difficulties).
    pub provision_seconds: Histogram,
}

impl ServiceMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("vaultlink".into()), None)
            .expect("failed to create prometheus registry");

        let link_requests_initiated_total = IntCounter::new(
            "link_requests_initiated_total",
            "Total wallet-link requests created",
        )
        .expect("metric creation");
        registry
            .register(Box::new(link_requests_initiated_total.clone()))
            .expect("metric registration");

        let credentials_claimed_total = IntCounter::new(
            "credentials_claimed_total",
            "Total one-time credentials revealed",
        )
        .expect("metric creation");
        registry
            .register(Box::new(credentials_claimed_total.clone()))
            .expect("metric registration");

        let claims_already_claimed_total = IntCounter::new(
            "claims_already_claimed_total",
            "Total status polls answered with ALREADY_CLAIMED",
        )
        .expect("metric creation");
        registry
            .register(Box::new(claims_already_claimed_total.clone()))
            .expect("metric registration");

        let link_requests_expired_total = IntCounter::new(
            "link_requests_expired_total",
            "Total link requests that expired unclaimed",
        )
        .expect("metric creation");
        registry
            .register(Box::new(link_requests_expired_total.clone()))
            .expect("metric registration");

        let vaults_provisioned_total = IntCounter::new(
            "vaults_provisioned_total",
            "Total vault contracts provisioned and verified",
        )
        .expect("metric creation");
        registry
            .register(Box::new(vaults_provisioned_total.clone()))
            .expect("metric registration");

        let provisioning_failures_total = IntCounter::new(
            "provisioning_failures_total",
            "Total provisioning attempts failed after reservation",
        )
        .expect("metric creation");
        registry
            .register(Box::new(provisioning_failures_total.clone()))
            .expect("metric registration");

        let provision_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "provision_seconds",
                "End-to-end vault provisioning latency in seconds",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        )
        .expect("metric creation");
        registry
            .register(Box::new(provision_seconds.clone()))
            .expect("metric registration");

        Self {
            registry,
            link_requests_initiated_total,
            credentials_claimed_total,
            claims_already_claimed_total,
            link_requests_expired_total,
            vaults_provisioned_total,
            provisioning_failures_total,
            provision_seconds,
        }
    }

    /// Encodes all registered metrics into the Prometheus text exposition
    /// format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        prometheus::Encoder::encode(&encoder, &metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer).expect("prometheus output is valid utf-8"))
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<ServiceMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
///
/// Returns HTTP 500 if encoding fails (should never happen in practice).
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
