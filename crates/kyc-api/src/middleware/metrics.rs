//! # Prometheus Metrics
//!
//! HTTP request counts and latency are recorded by [`metrics_middleware`].
//! Pipeline outcomes (per step, per provider operation, per finalize call)
//! are pushed by the pipeline as they happen. Everything is scraped from
//! `/metrics` through [`ApiMetrics::gather_and_encode`].

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use kyc_core::Step;
use prometheus::core::Collector;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

/// Shared metrics state backed by a Prometheus registry.
#[derive(Clone)]
pub struct ApiMetrics {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,

    // -- HTTP middleware metrics --
    http_requests_total: IntCounterVec,
    http_request_duration_seconds: HistogramVec,

    // -- Pipeline metrics --
    step_outcomes_total: IntCounterVec,
    provider_failures_total: IntCounterVec,
    finalize_outcomes_total: IntCounterVec,
}

impl std::fmt::Debug for ApiMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiMetrics")
            .field("requests", &self.requests())
            .finish()
    }
}

impl ApiMetrics {
    /// Create a metrics instance with a fresh registry.
    pub fn try_new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("kyc_http_requests_total", "Total HTTP requests"),
            &["method", "route", "status"],
        )?;

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "kyc_http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 15.0,
            ]),
            &["method", "route"],
        )?;

        let step_outcomes_total = IntCounterVec::new(
            Opts::new(
                "kyc_step_outcomes_total",
                "Verification step attempts by outcome",
            ),
            &["step", "outcome"],
        )?;

        let provider_failures_total = IntCounterVec::new(
            Opts::new(
                "kyc_provider_failures_total",
                "Failed verification provider calls",
            ),
            &["operation"],
        )?;

        let finalize_outcomes_total = IntCounterVec::new(
            Opts::new(
                "kyc_finalize_outcomes_total",
                "Onboarding finalization attempts by outcome",
            ),
            &["outcome"],
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(step_outcomes_total.clone()))?;
        registry.register(Box::new(provider_failures_total.clone()))?;
        registry.register(Box::new(finalize_outcomes_total.clone()))?;

        Ok(Self {
            inner: Arc::new(Inner {
                registry,
                http_requests_total,
                http_request_duration_seconds,
                step_outcomes_total,
                provider_failures_total,
                finalize_outcomes_total,
            }),
        })
    }

    /// Total request count, summed across labels.
    pub fn requests(&self) -> u64 {
        sum_counters(&self.inner.http_requests_total)
    }

    /// Count for one step/outcome pair.
    pub fn step_outcome(&self, step: Step, outcome: &str) -> u64 {
        self.inner
            .step_outcomes_total
            .with_label_values(&[step.as_str(), outcome])
            .get()
    }

    /// Record the outcome of one step attempt.
    pub fn record_step(&self, step: Step, outcome: &str) {
        self.inner
            .step_outcomes_total
            .with_label_values(&[step.as_str(), outcome])
            .inc();
    }

    pub fn record_provider_failure(&self, operation: &str) {
        self.inner
            .provider_failures_total
            .with_label_values(&[operation])
            .inc();
    }

    pub fn record_finalize(&self, outcome: &str) {
        self.inner
            .finalize_outcomes_total
            .with_label_values(&[outcome])
            .inc();
    }

    fn record_request(&self, method: &str, route: &str, status: u16, duration_secs: f64) {
        let status = status.to_string();
        self.inner
            .http_requests_total
            .with_label_values(&[method, route, &status])
            .inc();
        self.inner
            .http_request_duration_seconds
            .with_label_values(&[method, route])
            .observe(duration_secs);
    }

    /// Gather all metrics and encode to Prometheus text format.
    pub fn gather_and_encode(&self) -> Result<String, String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| format!("failed to encode metrics: {e}"))?;
        String::from_utf8(buffer).map_err(|e| format!("metrics encoding produced invalid UTF-8: {e}"))
    }
}

fn sum_counters(vec: &IntCounterVec) -> u64 {
    vec.collect()
        .iter()
        .flat_map(|mf| mf.get_metric())
        .map(|m| m.get_counter().get_value() as u64)
        .sum()
}

/// Middleware that records HTTP request metrics.
///
/// Requests are labeled by matched route template, so unknown paths share
/// the single `unmatched` label.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();
    let method = request.method().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let start = Instant::now();

    let response = next.run(request).await;

    if let Some(m) = metrics {
        m.record_request(
            &method,
            &route,
            response.status().as_u16(),
            start.elapsed().as_secs_f64(),
        );
    }

    response
}
