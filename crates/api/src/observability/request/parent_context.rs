//! Parent trace context extraction from HTTP headers.

use opentelemetry::{Context, global, propagation::Extractor, trace::TraceContextExt as _};
use salvo::http::{HeaderMap, HeaderName};

/// Extracts a remote W3C trace context, if the headers carry a valid one.
pub(super) fn extract_parent_context(headers: &HeaderMap) -> Option<Context> {
    let carrier = CarrierHeaders(headers);

    global::get_text_map_propagator(|propagator| {
        // Extract against a fresh base context so missing trace headers do
        // not inherit the currently active in-process span chain.
        let context = propagator.extract_with_context(&Context::new(), &carrier);

        if context.span().span_context().is_valid() {
            Some(context)
        } else {
            None
        }
    })
}

#[derive(Debug)]
struct CarrierHeaders<'a>(&'a HeaderMap);

impl Extractor for CarrierHeaders<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|value| value.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(HeaderName::as_str).collect()
    }
}
