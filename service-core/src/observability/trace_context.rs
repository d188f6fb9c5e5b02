//! W3C trace-context headers for outgoing settlement API calls.
//!
//! See: https://www.w3.org/TR/trace-context/

use opentelemetry::trace::TraceContextExt;
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

pub const TRACEPARENT_HEADER: &str = "traceparent";
pub const TRACESTATE_HEADER: &str = "tracestate";
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// `traceparent` and `tracestate` of the current span. `None` when no
/// OpenTelemetry trace is active, e.g. when no OTLP endpoint is configured.
pub fn current_trace_context() -> Option<(String, Option<String>)> {
    let context = Span::current().context();
    let span = context.span();
    let span_context = span.span_context();
    if !span_context.is_valid() {
        return None;
    }

    let traceparent = format!(
        "00-{}-{}-{:02x}",
        span_context.trace_id(),
        span_context.span_id(),
        span_context.trace_flags().to_u8()
    );
    let tracestate = Some(span_context.trace_state().header()).filter(|s| !s.is_empty());
    Some((traceparent, tracestate))
}

/// Headers attached to every outgoing call: the correlation id, plus the
/// trace context when there is one. Values that are not valid header text
/// are skipped.
pub fn outgoing_headers(request_id: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();

    if let Ok(value) = HeaderValue::from_str(request_id) {
        headers.insert(REQUEST_ID_HEADER, value);
    }

    if let Some((traceparent, tracestate)) = current_trace_context() {
        if let Ok(value) = HeaderValue::from_str(&traceparent) {
            headers.insert(TRACEPARENT_HEADER, value);
        }
        if let Some(Ok(value)) = tracestate.as_deref().map(HeaderValue::from_str) {
            headers.insert(TRACESTATE_HEADER, value);
        }
    }

    headers
}
