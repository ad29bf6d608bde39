//! Request observability middleware.
//!
//! Wraps every inbound request: opens the server span, times the request,
//! classifies the outcome, and emits the correlated metric samples and log
//! record in a fixed order on every exit path.

mod parent_context;
mod request_ids;

use std::{sync::Arc, time::Instant};

use opentelemetry::{
    KeyValue,
    trace::{Status, TraceContextExt as _},
};
use salvo::{
    Request, handler,
    http::{StatusCode, header::USER_AGENT},
    prelude::{Depot, FlowCtrl, Response},
};
use serde_json::{Map, Value, json};
use tracing::{Instrument as _, Span, warn};
use tracing_opentelemetry::OpenTelemetrySpanExt as _;

use crate::{
    errors::Outcome,
    extensions::DepotExt as _,
    observability::{Callsite, settings},
    state::State,
};

const REQUEST_ID_DEPOT_KEY: &str = "request_id";

#[handler]
pub(crate) async fn observe_request(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
    ctrl: &mut FlowCtrl,
) {
    // Scrape traffic is not demo traffic.
    if req.uri().path() == "/metrics" {
        ctrl.call_next(req, depot, res).await;
        return;
    }

    let Ok(state) = depot.obtain::<Arc<State>>() else {
        warn!("application state missing, serving request uninstrumented");
        ctrl.call_next(req, depot, res).await;
        return;
    };
    let state = Arc::clone(state);

    let started = Instant::now();

    let request_id =
        request_ids::resolve_request_id(req.header::<String>(request_ids::REQUEST_ID_HEADER));

    depot.insert(REQUEST_ID_DEPOT_KEY, request_id.clone());
    request_ids::set_request_id_header(res, &request_id);

    let method = req.method().to_string();
    let path = req.uri().path().to_owned();
    let url = req.uri().to_string();
    let client_ip = client_ip(req);
    let user_agent = req.header::<String>(USER_AGENT).unwrap_or_default();
    let span_name = format!("{method} {path}");

    let span = tracing::info_span!(
        parent: None,
        "http.request",
        otel.name = %span_name,
        otel.kind = "server",
        request_id = %request_id,
        http.method = %method,
        http.url = %url,
        http.client_ip = tracing::field::Empty,
        http.status_code = tracing::field::Empty,
        http.response_time = tracing::field::Empty,
    );

    if let Some(ip) = client_ip.as_deref() {
        span.record("http.client_ip", ip);
    }

    if settings::otel_parent_propagation_enabled()
        && let Some(parent_context) = parent_context::extract_parent_context(req.headers())
        && let Err(source) = span.set_parent(parent_context)
    {
        warn!("failed to set parent context on request span: {source}");
    }

    ctrl.call_next(req, depot, res)
        .instrument(span.clone())
        .await;

    let elapsed = started.elapsed();
    let status = res.status_code.unwrap_or(StatusCode::OK);
    let outcome = depot.request_outcome();

    // Fixed sequence on every path: metric updates, then span mutation,
    // then the log record, which embeds the finalized trace identifiers.
    state
        .metrics
        .observe_request(&method, &path, status.as_u16(), elapsed.as_secs_f64());

    match outcome {
        None => {
            span.record("http.status_code", status.as_u16());
            span.record("http.response_time", elapsed.as_secs_f64());

            let extra = success_log_fields(
                &span,
                &method,
                &path,
                status,
                elapsed.as_secs_f64(),
                &user_agent,
                &request_id,
                client_ip,
            );

            span.in_scope(|| {
                state.emitter.info(
                    "Request processed",
                    &extra,
                    Callsite {
                        module: module_path!(),
                        function: "observe_request",
                        line: line!(),
                    },
                );
            });
        }
        Some(Outcome::HttpError {
            status: error_status,
            detail,
        }) => {
            state.metrics.record_error(&method, &path, "http_error");

            span.record("http.status_code", error_status.as_u16());
            span.add_event(
                "exception",
                vec![KeyValue::new("exception.message", detail.clone())],
            );
            span.set_status(Status::error(detail.clone()));

            span.in_scope(|| {
                state.emitter.warning(
                    &format!("HTTP Error: {detail}"),
                    &Map::new(),
                    Callsite {
                        module: module_path!(),
                        function: "observe_request",
                        line: line!(),
                    },
                );
            });
        }
        Some(Outcome::Fault { message }) => {
            state.metrics.record_error(&method, &path, "server_error");

            span.add_event(
                "exception",
                vec![KeyValue::new("exception.message", message.clone())],
            );
            span.set_status(Status::error(message.clone()));

            span.in_scope(|| {
                state.emitter.error(
                    &format!("Server Error: {message}"),
                    &Map::new(),
                    Callsite {
                        module: module_path!(),
                        function: "observe_request",
                        line: line!(),
                    },
                );
            });
        }
    }

    let duration_ms = elapsed.as_millis();
    let threshold_ms = u128::from(settings::slow_request_threshold_ms());

    if duration_ms > threshold_ms {
        span.in_scope(|| {
            warn!(
                method = %method,
                path = %path,
                request_id = %request_id,
                duration_ms,
                threshold_ms,
                "slow request detected"
            );
        });
    }
}

#[expect(
    clippy::too_many_arguments,
    reason = "flat capture of the request context for one log record"
)]
fn success_log_fields(
    span: &Span,
    method: &str,
    path: &str,
    status: StatusCode,
    latency_seconds: f64,
    user_agent: &str,
    request_id: &str,
    client_ip: Option<String>,
) -> Map<String, Value> {
    let context = span.context();
    let otel_span = context.span();
    let ids = otel_span.span_context();

    let mut extra = Map::new();
    extra.insert("method".to_owned(), json!(method));
    extra.insert("endpoint".to_owned(), json!(path));
    extra.insert("status_code".to_owned(), json!(status.as_u16()));
    extra.insert(
        "latency_seconds".to_owned(),
        json!(round_to_millis(latency_seconds)),
    );
    extra.insert("user_agent".to_owned(), json!(user_agent));
    extra.insert("trace_id".to_owned(), json!(ids.trace_id().to_string()));
    extra.insert("span_id".to_owned(), json!(ids.span_id().to_string()));
    extra.insert("request_id".to_owned(), json!(request_id));

    if let Some(ip) = client_ip {
        extra.insert("ip".to_owned(), json!(ip));
    }

    extra
}

fn client_ip(req: &Request) -> Option<String> {
    let addr = req.remote_addr();

    if let Some(ipv4) = addr.as_ipv4() {
        Some(ipv4.ip().to_string())
    } else {
        addr.as_ipv6().map(|ipv6| ipv6.ip().to_string())
    }
}

fn round_to_millis(latency_seconds: f64) -> f64 {
    (latency_seconds * 1_000.0).round() / 1_000.0
}
