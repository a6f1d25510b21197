//! Lazy acquisition of the tracer that produces harness spans.

use std::sync::OnceLock;

use opentelemetry::global::{self, BoxedTracer};

/// Instrumentation scope under which all harness spans are emitted.
pub const SCOPE_NAME: &str = "opentelemetry-testharness";

/// Holds the harness tracer, produced from the global provider on first use.
///
/// Resolution is deferred so that a tracer provider installed during
/// environment setup — after the harness object was constructed — is the one
/// that ends up producing spans.
#[derive(Debug, Default)]
pub struct TracerSource {
    tracer: OnceLock<BoxedTracer>,
}

impl TracerSource {
    /// A source that resolves from [`opentelemetry::global`] when first used.
    pub fn global() -> Self {
        TracerSource::default()
    }

    /// Get the tracer, producing it if necessary.
    pub fn get(&self) -> &BoxedTracer {
        self.tracer.get_or_init(|| global::tracer(SCOPE_NAME))
    }
}
