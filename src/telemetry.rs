//! Process-wide tracer-provider lifecycle.
//!
//! The environment instrumentor starts telemetry during setup and tears it
//! down when the test file finishes. Both operations are deliberately
//! forgiving: a failure to build the exporter or to flush on shutdown is
//! logged and the run proceeds as if uninstrumented — instrumentation must
//! never change a test result.

use std::sync::OnceLock;
use std::time::Duration;

use opentelemetry::{global, otel_warn};
use opentelemetry_sdk::trace::{BatchConfigBuilder, BatchSpanProcessor, SdkTracerProvider};

/// Scheduled delay for the batch processor, short enough that spans show up
/// near-live in whatever is watching the trace.
const NEARLY_IMMEDIATE: Duration = Duration::from_millis(100);

/// `None` records that initialization ran but exporter construction failed.
static PROVIDER: OnceLock<Option<SdkTracerProvider>> = OnceLock::new();

/// Build the OTLP pipeline and install it as the global tracer provider.
///
/// Idempotent: subsequent calls (one environment instance per test file, all
/// in one process) reuse the provider installed by the first and never
/// duplicate exporters. The OTLP endpoint comes from the standard
/// `OTEL_EXPORTER_OTLP_*` environment variables.
pub fn init() {
    PROVIDER.get_or_init(|| {
        let exporter = match opentelemetry_otlp::SpanExporter::builder().with_http().build() {
            Ok(exporter) => exporter,
            Err(err) => {
                otel_warn!(
                    name: "TestHarness.ExporterInitFailed",
                    reason = format!("{err}")
                );
                return None;
            }
        };

        let processor = BatchSpanProcessor::builder(exporter)
            .with_batch_config(
                BatchConfigBuilder::default()
                    .with_scheduled_delay(NEARLY_IMMEDIATE)
                    .build(),
            )
            .build();

        let provider = SdkTracerProvider::builder()
            .with_span_processor(processor)
            .build();
        global::set_tracer_provider(provider.clone());
        Some(provider)
    });
}

/// Flush pending spans and shut the provider down.
///
/// Failures are logged, never propagated: teardown of the surrounding test
/// environment must complete regardless of exporter health. Calling this
/// more than once warns on the second shutdown and is otherwise harmless.
pub fn shutdown() {
    let Some(Some(provider)) = PROVIDER.get() else {
        return;
    };

    if let Err(err) = provider.force_flush() {
        otel_warn!(
            name: "TestHarness.FlushFailed",
            reason = format!("{err}")
        );
    }
    if let Err(err) = provider.shutdown() {
        otel_warn!(
            name: "TestHarness.ShutdownFailed",
            reason = format!("{err}")
        );
    }
}
