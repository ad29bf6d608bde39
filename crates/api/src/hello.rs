//! Root endpoint handler.

use std::sync::Arc;

use opentelemetry::{KeyValue, trace::Status};
use salvo::{Depot, http::StatusCode, writing::Json};
use serde::{Deserialize, Serialize};
use tokio::time::{Duration, sleep};
use tracing::{Instrument as _, Span, info_span};
use tracing_opentelemetry::OpenTelemetrySpanExt as _;

use crate::{errors::ApiError, extensions::DepotExt as _, state::State};

const SIMULATED_ERROR_PROBABILITY: f64 = 0.2;

/// Root response
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct HelloResponse {
    /// Greeting message
    pub(crate) message: String,

    /// Simulated processing time, in seconds
    pub(crate) processing_time: f64,
}

/// Root endpoint: simulated processing with occasional injected failures.
#[salvo::handler]
pub(crate) async fn handler(depot: &mut Depot) -> Result<Json<HelloResponse>, ApiError> {
    let state = Arc::clone(depot.obtain_or_fault::<Arc<State>>()?);

    let span = info_span!("root_endpoint", processing_time = tracing::field::Empty);

    async move {
        let processing_time = state.random.sample_delay(0.1, 0.5);
        sleep(Duration::from_secs_f64(processing_time)).await;

        if state.random.chance(SIMULATED_ERROR_PROBABILITY) {
            state.metrics.record_error("GET", "/", "simulated_error");

            let span = Span::current();
            span.add_event(
                "exception",
                vec![KeyValue::new("exception.message", "Simulated error")],
            );
            span.set_status(Status::error("Simulated error"));

            return Err(ApiError::classified(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Simulated server error",
            ));
        }

        Span::current().record("processing_time", processing_time);

        Ok(Json(HelloResponse {
            message: "Hello World!".to_owned(),
            processing_time,
        }))
    }
    .instrument(span)
    .await
}
