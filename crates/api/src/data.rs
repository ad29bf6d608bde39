//! Data endpoint handler.

use std::sync::Arc;

use jiff::Timestamp;
use opentelemetry::{KeyValue, trace::Status};
use salvo::{Depot, http::StatusCode, writing::Json};
use serde::{Deserialize, Serialize};
use tokio::time::{Duration, sleep};
use tracing::{Instrument as _, Span, info_span};
use tracing_opentelemetry::OpenTelemetrySpanExt as _;

use crate::{errors::ApiError, extensions::DepotExt as _, state::State};

const DATA_FETCH_ERROR_PROBABILITY: f64 = 0.15;

/// One catalogue entry
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct DataItem {
    /// Item identifier
    pub(crate) id: u32,

    /// Item display name
    pub(crate) name: String,
}

/// Data response
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct DataResponse {
    /// Fixed demo items
    pub(crate) items: Vec<DataItem>,

    /// Simulated processing time, in seconds
    pub(crate) processing_time: f64,

    /// Current time as epoch seconds
    pub(crate) timestamp: f64,
}

/// Data endpoint: simulated fetch with occasional injected failures.
#[salvo::handler]
pub(crate) async fn handler(depot: &mut Depot) -> Result<Json<DataResponse>, ApiError> {
    let state = Arc::clone(depot.obtain_or_fault::<Arc<State>>()?);

    let span = info_span!(
        "get_data_endpoint",
        data.items_count = tracing::field::Empty,
        processing_time = tracing::field::Empty,
    );

    async move {
        let processing_time = state.random.sample_delay(0.2, 1.0);
        sleep(Duration::from_secs_f64(processing_time)).await;

        if state.random.chance(DATA_FETCH_ERROR_PROBABILITY) {
            state
                .metrics
                .record_error("GET", "/api/data", "data_fetch_error");

            let span = Span::current();
            span.add_event(
                "exception",
                vec![KeyValue::new("exception.message", "Data fetch error")],
            );
            span.set_status(Status::error("Data not available"));

            return Err(ApiError::classified(
                StatusCode::NOT_FOUND,
                "Data not available",
            ));
        }

        let items = vec![
            DataItem {
                id: 1,
                name: "Item 1".to_owned(),
            },
            DataItem {
                id: 2,
                name: "Item 2".to_owned(),
            },
            DataItem {
                id: 3,
                name: "Item 3".to_owned(),
            },
        ];

        let span = Span::current();
        span.record(
            "data.items_count",
            u64::try_from(items.len()).unwrap_or(u64::MAX),
        );
        span.record("processing_time", processing_time);

        Ok(Json(DataResponse {
            items,
            processing_time,
            timestamp: epoch_seconds(),
        }))
    }
    .instrument(span)
    .await
}

fn epoch_seconds() -> f64 {
    Timestamp::now().as_duration().as_secs_f64()
}
