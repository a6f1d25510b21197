//! Root-context resolution for spans created outside any ambient span.
//!
//! A test process launched by an outer build or CI pipeline may receive a
//! W3C trace-parent through the environment. Spans that would otherwise be
//! trace roots are seeded from it so the whole run nests under the caller's
//! trace; with no value present the run starts a self-consistent root.

use std::collections::HashMap;
use std::env;

use opentelemetry::propagation::TextMapPropagator;
use opentelemetry::trace::TraceContextExt;
use opentelemetry::Context;
use opentelemetry_sdk::propagation::TraceContextPropagator;

/// Environment variable carrying the externally supplied trace-parent, in the
/// standard `version-traceid-spanid-flags` header encoding.
pub const TRACEPARENT_ENV: &str = "TRACEPARENT";

const TRACEPARENT_FIELD: &str = "traceparent";

/// Resolve the context a root-level span should be created under.
///
/// Returns the ambient active context when it already carries a span.
/// Otherwise extracts [`TRACEPARENT_ENV`] into a fresh context; a missing or
/// malformed value simply yields a context with no span. Calling this twice
/// without starting a span in between returns equivalent contexts.
pub fn resolve_root_context() -> Context {
    let current = Context::current();
    if current.has_active_span() {
        return current;
    }

    let mut carrier = HashMap::new();
    if let Ok(value) = env::var(TRACEPARENT_ENV) {
        carrier.insert(TRACEPARENT_FIELD.to_string(), value);
    }
    extract_trace_parent(&carrier)
}

/// Extract a trace-parent from an explicit carrier into a fresh context.
pub fn extract_trace_parent(carrier: &HashMap<String, String>) -> Context {
    TraceContextPropagator::new().extract_with_context(&Context::new(), carrier)
}
