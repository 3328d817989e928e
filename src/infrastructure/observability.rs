//! Prometheus metrics for the HTTP surface.
//!
//! All metrics use the `stockcast_` prefix. Rendered in text format by the
//! unauthenticated `/metrics` route.

use prometheus::{CounterVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

#[derive(Clone)]
pub struct HttpMetrics {
    registry: Arc<Registry>,
    /// Total HTTP requests by method, path and response status
    requests_total: CounterVec,
    /// Request latency in seconds by method and path
    request_duration_seconds: HistogramVec,
}

impl HttpMetrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let requests_total = CounterVec::new(
            Opts::new(
                "stockcast_http_requests_total",
                "Total HTTP requests by method, path and status",
            ),
            &["method", "path", "status"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "stockcast_http_request_duration_seconds",
                "HTTP request latency in seconds",
            )
            .buckets(vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
            ]),
            &["method", "path"],
        )?;
        registry.register(Box::new(request_duration_seconds.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            requests_total,
            request_duration_seconds,
        })
    }

    /// Record one finished request.
    pub fn observe_request(&self, method: &str, path: &str, status: u16, latency: f64) {
        self.requests_total
            .with_label_values(&[method, path, &status.to_string()])
            .inc();
        self.request_duration_seconds
            .with_label_values(&[method, path])
            .observe(latency);
    }

    /// Render all metrics in Prometheus text format.
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observed_requests_show_up_in_the_rendered_output() {
        let metrics = HttpMetrics::new().unwrap();
        metrics.observe_request("GET", "/predict", 200, 0.012);
        metrics.observe_request("GET", "/predict", 404, 0.003);

        let rendered = metrics.render();
        assert!(rendered.contains("stockcast_http_requests_total"));
        assert!(rendered.contains("stockcast_http_request_duration_seconds"));
        assert!(rendered.contains("status=\"404\""));
    }

    #[test]
    fn fresh_registry_renders_without_samples() {
        let metrics = HttpMetrics::new().unwrap();
        // vec metrics emit nothing until the first observation
        assert!(!metrics.render().contains("stockcast_http_requests_total{"));
    }
}
