//! Health endpoint handler.

use std::sync::Arc;

use jiff::Timestamp;
use salvo::{Depot, http::StatusCode, writing::Json};
use serde::{Deserialize, Serialize};
use tracing::{Instrument as _, info_span};

use crate::{errors::ApiError, extensions::DepotExt as _, state::State};

const HEALTH_FAILURE_PROBABILITY: f64 = 0.1;

/// Health response
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct HealthResponse {
    /// Service status
    pub(crate) status: String,

    /// Current time as epoch seconds
    pub(crate) timestamp: f64,
}

/// Health endpoint with occasional injected unavailability.
#[salvo::handler]
pub(crate) async fn handler(depot: &mut Depot) -> Result<Json<HealthResponse>, ApiError> {
    let state = Arc::clone(depot.obtain_or_fault::<Arc<State>>()?);

    let span = info_span!("health_check");

    async move {
        if state.random.chance(HEALTH_FAILURE_PROBABILITY) {
            state
                .metrics
                .record_error("GET", "/health", "health_check_failed");

            return Err(ApiError::classified(
                StatusCode::SERVICE_UNAVAILABLE,
                "Service temporarily unavailable",
            ));
        }

        Ok(Json(HealthResponse {
            status: "healthy".to_owned(),
            timestamp: epoch_seconds(),
        }))
    }
    .instrument(span)
    .await
}

fn epoch_seconds() -> f64 {
    Timestamp::now().as_duration().as_secs_f64()
}

#[cfg(test)]
mod tests {
    use salvo::{
        Router,
        test::{ResponseExt, TestClient},
    };
    use serde_json::Value;
    use testresult::TestResult;

    use crate::{
        random::MockRandomSource,
        test_helpers::{service_with_state, test_context},
    };

    use super::*;

    fn source_with_chance(outcome: bool) -> MockRandomSource {
        let mut random = MockRandomSource::new();

        random.expect_chance().returning(move |_probability| outcome);
        random.expect_sample_delay().never();
        random.expect_choose().never();

        random
    }

    #[tokio::test]
    async fn healthy_when_fault_injection_never_triggers() -> TestResult {
        let context = test_context(source_with_chance(false))?;
        let service = service_with_state(
            Arc::clone(&context.state),
            Router::with_path("health").get(handler),
        );

        let mut res = TestClient::get("http://example.com/health")
            .send(&service)
            .await;
        let status = res.status_code;
        let body: HealthResponse = res.take_json().await?;

        assert_eq!(status, Some(StatusCode::OK));
        assert_eq!(body.status, "healthy");
        assert!(body.timestamp > 0.0, "timestamp must be epoch seconds");

        Ok(())
    }

    #[tokio::test]
    async fn unavailable_when_fault_injection_triggers() -> TestResult {
        let context = test_context(source_with_chance(true))?;
        let service = service_with_state(
            Arc::clone(&context.state),
            Router::with_path("health").get(handler),
        );

        let mut res = TestClient::get("http://example.com/health")
            .send(&service)
            .await;
        let status = res.status_code;
        let body: Value = res.take_json().await?;

        assert_eq!(status, Some(StatusCode::SERVICE_UNAVAILABLE));
        assert_eq!(
            body.get("detail").and_then(Value::as_str),
            Some("Service temporarily unavailable")
        );
        assert_eq!(
            context
                .state
                .metrics
                .error_count_value("GET", "/health", "health_check_failed"),
            1
        );

        Ok(())
    }
}
