use std::sync::OnceLock;

use opentelemetry::global;
use opentelemetry_sdk::trace::{InMemorySpanExporter, SdkTracerProvider, SpanData};

static EXPORTER: OnceLock<InMemorySpanExporter> = OnceLock::new();

/// Install an in-memory pipeline as the global provider, once per test
/// binary, and hand out the shared exporter.
pub fn exporter() -> InMemorySpanExporter {
    EXPORTER
        .get_or_init(|| {
            let exporter = InMemorySpanExporter::default();
            let provider = SdkTracerProvider::builder()
                .with_simple_exporter(exporter.clone())
                .build();
            global::set_tracer_provider(provider);
            exporter
        })
        .clone()
}

/// Finished span with the given name; panics if absent or ambiguous.
pub fn span_named(exporter: &InMemorySpanExporter, name: &str) -> SpanData {
    let matches: Vec<SpanData> = exporter
        .get_finished_spans()
        .expect("finished spans")
        .into_iter()
        .filter(|span| span.name == name)
        .collect();
    assert_eq!(matches.len(), 1, "expected exactly one span named {name:?}");
    matches.into_iter().next().unwrap()
}

/// All finished spans with the given name, in export order.
pub fn spans_named(exporter: &InMemorySpanExporter, name: &str) -> Vec<SpanData> {
    exporter
        .get_finished_spans()
        .expect("finished spans")
        .into_iter()
        .filter(|span| span.name == name)
        .collect()
}
