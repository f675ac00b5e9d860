//! # Prometheus Metrics
//!
//! Operational metrics for the registry node, scraped at `/metrics` on the
//! configured metrics port.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] so they
//! do not collide with any default global registry consumers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::Arc;

/// Holds all Prometheus metric handles for the node.
#[derive(Clone)]
pub struct NodeMetrics {
    /// Prometheus registry that owns all metrics below.
    registry: Registry,
    /// Accepted star submissions.
    pub stars_submitted_total: IntCounter,
    /// Star submissions rejected for any reason.
    pub submissions_rejected_total: IntCounter,
    /// Height of the chain tip.
    pub chain_height: IntGauge,
    /// Issues reported by the most recent full-chain validation.
    pub validation_issues: IntGauge,
}

impl NodeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("star_registry".into()), None)?;

        let stars_submitted_total =
            IntCounter::new("stars_submitted_total", "Total number of accepted star submissions")?;
        registry.register(Box::new(stars_submitted_total.clone()))?;

        let submissions_rejected_total = IntCounter::new(
            "submissions_rejected_total",
            "Total number of rejected star submissions",
        )?;
        registry.register(Box::new(submissions_rejected_total.clone()))?;

        let chain_height = IntGauge::new("chain_height", "Height of the chain tip")?;
        registry.register(Box::new(chain_height.clone()))?;

        let validation_issues = IntGauge::new(
            "validation_issues",
            "Number of issues found by the last full-chain validation",
        )?;
        registry.register(Box::new(validation_issues.clone()))?;

        Ok(Self {
            registry,
            stars_submitted_total,
            submissions_rejected_total,
            chain_height,
            validation_issues,
        })
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<NodeMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_registered_metrics() {
        let metrics = NodeMetrics::new().unwrap();
        metrics.stars_submitted_total.inc();
        metrics.chain_height.set(3);

        let text = metrics.encode().unwrap();
        assert!(text.contains("star_registry_stars_submitted_total 1"));
        assert!(text.contains("star_registry_chain_height 3"));
        assert!(text.contains("star_registry_submissions_rejected_total 0"));
    }
}
