//! Observability subsystem: structured logs, metrics, traces, and the
//! request middleware that correlates them.

use thiserror::Error;

mod emitter;
mod init;
mod logging;
mod metrics;
mod otel;
mod request;
mod settings;

pub(crate) use emitter::{Callsite, LogEmitter};
pub(crate) use init::Observability;
pub(crate) use metrics::{Metrics, metrics_handler};
pub(crate) use request::observe_request;

/// Errors raised while initialising observability.
#[derive(Debug, Error)]
pub(crate) enum ObservabilityError {
    /// Failed to build OTLP exporter.
    #[error("failed to build OTLP exporter: {0}")]
    OtlpExporter(#[from] opentelemetry_otlp::ExporterBuildError),

    /// Failed to initialise tracing subscriber.
    #[error("failed to initialise tracing subscriber: {0}")]
    TracingSubscriber(#[from] tracing_subscriber::util::TryInitError),
}
