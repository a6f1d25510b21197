//! # OpenTelemetry Test Harness Instrumentation
//!
//! Overlays distributed-tracing spans onto a test runner's `describe`/`it`
//! hierarchy: every group and every test becomes a span nested under its
//! lexical parent and, when a `TRACEPARENT` value is supplied by the
//! surrounding process, under the externally provided trace.
//!
//! Two independent integration strategies share the same span topology and
//! invariants:
//!
//! * [`harness::TestHarness`] wraps the runner's *registration* primitives.
//!   Test files declare their groups and tests through the harness; group
//!   spans are opened and closed by before-all/after-all hooks and each test
//!   body runs with its own span attached.
//! * [`environment::TracedEnvironment`] hooks the runner's *execution* event
//!   stream instead, keyed by the runner's own opaque block/test identities.
//!   Test files stay untouched; the environment decides span lifecycle from
//!   `test_start`/`test_done`/`run_describe_start`/`run_describe_finish`
//!   events.
//!
//! In both cases failures of the instrumentation itself degrade to an
//! uninstrumented run: test outcomes pass through byte-identical and tracer
//! problems are logged, never thrown.
//!
//! ## Quick start (declaration wrapping)
//!
//! ```no_run
//! use opentelemetry_testharness::harness::TestHarness;
//! # use opentelemetry_testharness::runner::{HookFn, Runner, Selection, TestBody, TestSpec};
//! # #[derive(Debug)] struct MyRunner;
//! # impl Runner for MyRunner {
//! #     fn describe(&self, _: &str, _: Selection, body: &mut dyn FnMut()) { body() }
//! #     fn test(&self, _: TestSpec, _: Option<TestBody>) {}
//! #     fn before_all(&self, _: HookFn) {}
//! #     fn after_all(&self, _: HookFn) {}
//! # }
//!
//! let harness = TestHarness::new(MyRunner);
//! harness.describe("checkout", |h| {
//!     h.it("adds an item", || Ok(()));
//!     h.it_pending("applies coupons");
//! });
//! ```
#![warn(
    future_incompatible,
    missing_debug_implementations,
    missing_docs,
    nonstandard_style,
    rust_2018_idioms,
    unreachable_pub,
    unused
)]
#![cfg_attr(docsrs, feature(doc_cfg), deny(rustdoc::broken_intra_doc_links))]
#![doc(
    html_logo_url = "https://raw.githubusercontent.com/open-telemetry/opentelemetry-rust/main/assets/logo.svg"
)]
#![cfg_attr(test, deny(warnings))]

pub mod environment;
pub mod harness;
pub mod propagation;
pub mod runner;
pub mod telemetry;
pub mod title;
pub mod tracer;
pub mod tree;

pub use environment::TracedEnvironment;
pub use harness::TestHarness;
pub use runner::{
    first_error, BlockId, ErrorEntry, RawError, Runner, RunnerEvent, Selection, TestFailure,
    TestId, TestMode, TestOutcome, TestSpec,
};
pub use title::format_title;
