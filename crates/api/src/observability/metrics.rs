//! Prometheus instruments and the exposition endpoint.

use std::sync::Arc;

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use salvo::{
    Depot, Request, Response, handler,
    http::{
        StatusCode,
        header::{CONTENT_TYPE, HeaderValue},
    },
};
use tracing::error;

use crate::state::State;

/// Buckets sized for the simulated 0.1-1.0s processing delays, with room
/// for outliers on both sides.
const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Request instruments, registered once at startup and shared by all
/// in-flight requests.
///
/// The underlying counters are lock-free; concurrent increments are never
/// lost and accumulate until process restart.
#[derive(Debug, Clone)]
pub(crate) struct Metrics {
    registry: Registry,
    request_count: IntCounterVec,
    request_latency_seconds: HistogramVec,
    error_count: IntCounterVec,
}

impl Metrics {
    /// Builds and registers the three request instruments.
    ///
    /// # Errors
    ///
    /// Returns an error if an instrument cannot be created or registered.
    pub(crate) fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let request_count = IntCounterVec::new(
            Opts::new("request_count", "Total request count"),
            &["method", "endpoint", "status"],
        )?;

        let request_latency_seconds = HistogramVec::new(
            HistogramOpts::new("request_latency_seconds", "Request latency")
                .buckets(LATENCY_BUCKETS.to_vec()),
            &["method", "endpoint"],
        )?;

        let error_count = IntCounterVec::new(
            Opts::new("error_count", "Total error count"),
            &["method", "endpoint", "error_type"],
        )?;

        registry.register(Box::new(request_count.clone()))?;
        registry.register(Box::new(request_latency_seconds.clone()))?;
        registry.register(Box::new(error_count.clone()))?;

        Ok(Self {
            registry,
            request_count,
            request_latency_seconds,
            error_count,
        })
    }

    /// Records the per-request samples: one count and one latency
    /// observation, whatever the outcome.
    pub(crate) fn observe_request(
        &self,
        method: &str,
        endpoint: &str,
        status_code: u16,
        duration_seconds: f64,
    ) {
        let status = status_code.to_string();

        self.request_count
            .with_label_values(&[method, endpoint, status.as_str()])
            .inc();

        self.request_latency_seconds
            .with_label_values(&[method, endpoint])
            .observe(duration_seconds);
    }

    /// Records one error sample under the given taxonomy error type.
    pub(crate) fn record_error(&self, method: &str, endpoint: &str, error_type: &str) {
        self.error_count
            .with_label_values(&[method, endpoint, error_type])
            .inc();
    }

    fn gather(&self) -> Vec<prometheus::proto::MetricFamily> {
        self.registry.gather()
    }

    #[cfg(test)]
    pub(crate) fn request_count_value(&self, method: &str, endpoint: &str, status: &str) -> u64 {
        self.request_count
            .with_label_values(&[method, endpoint, status])
            .get()
    }

    #[cfg(test)]
    pub(crate) fn latency_sample_count(&self, method: &str, endpoint: &str) -> u64 {
        self.request_latency_seconds
            .with_label_values(&[method, endpoint])
            .get_sample_count()
    }

    #[cfg(test)]
    pub(crate) fn error_count_value(&self, method: &str, endpoint: &str, error_type: &str) -> u64 {
        self.error_count
            .with_label_values(&[method, endpoint, error_type])
            .get()
    }
}

/// Prometheus text exposition endpoint.
#[handler]
pub(crate) async fn metrics_handler(_req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Ok(state) = depot.obtain::<Arc<State>>() else {
        res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
        return;
    };

    let encoder = TextEncoder::new();
    let metric_families = state.metrics.gather();

    let mut encoded = Vec::new();

    if let Err(source) = encoder.encode(&metric_families, &mut encoded) {
        error!("failed to encode metrics response: {source}");
        res.status_code(StatusCode::INTERNAL_SERVER_ERROR);

        return;
    }

    let content_type = match HeaderValue::from_str(encoder.format_type()) {
        Ok(value) => value,
        Err(source) => {
            error!("failed to encode metrics content type header: {source}");
            res.status_code(StatusCode::INTERNAL_SERVER_ERROR);

            return;
        }
    };

    res.headers_mut().insert(CONTENT_TYPE, content_type);
    res.render(String::from_utf8_lossy(&encoded).into_owned());
}

#[cfg(test)]
mod tests {
    use salvo::{
        Router, Service,
        test::{ResponseExt, TestClient},
    };
    use testresult::TestResult;

    use crate::test_helpers::{service_with_state, test_context};

    use super::*;

    #[tokio::test]
    async fn metrics_endpoint_exposes_all_three_instruments() -> TestResult {
        let context = test_context(crate::test_helpers::strict_random())?;

        context
            .state
            .metrics
            .observe_request("GET", "/", 200, 0.042);
        context
            .state
            .metrics
            .observe_request("GET", "/", 500, 0.123);
        context
            .state
            .metrics
            .record_error("GET", "/", "simulated_error");

        let service = service_with_state(
            Arc::clone(&context.state),
            Router::with_path("metrics").get(metrics_handler),
        );

        let response: String = TestClient::get("http://example.com/metrics")
            .send(&service)
            .await
            .take_string()
            .await
            .unwrap_or_default();

        assert!(
            response.contains("request_count"),
            "expected request_count metric in response"
        );
        assert!(
            response.contains("request_latency_seconds"),
            "expected request_latency_seconds metric in response"
        );
        assert!(
            response.contains("error_count"),
            "expected error_count metric in response"
        );

        Ok(())
    }

    #[test]
    fn samples_accumulate_per_label_tuple() -> TestResult {
        let metrics = Metrics::new()?;

        metrics.observe_request("GET", "/health", 200, 0.001);
        metrics.observe_request("GET", "/health", 200, 0.002);
        metrics.observe_request("GET", "/health", 503, 0.001);
        metrics.record_error("GET", "/health", "health_check_failed");

        assert_eq!(metrics.request_count_value("GET", "/health", "200"), 2);
        assert_eq!(metrics.request_count_value("GET", "/health", "503"), 1);
        assert_eq!(metrics.latency_sample_count("GET", "/health"), 3);
        assert_eq!(
            metrics.error_count_value("GET", "/health", "health_check_failed"),
            1
        );

        Ok(())
    }

    #[tokio::test]
    async fn missing_state_yields_500() {
        let service = Service::new(Router::with_path("metrics").get(metrics_handler));

        let res = TestClient::get("http://example.com/metrics")
            .send(&service)
            .await;

        assert_eq!(res.status_code, Some(StatusCode::INTERNAL_SERVER_ERROR));
    }
}
