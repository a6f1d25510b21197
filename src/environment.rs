//! Execution-time instrumentation driven by the runner's event stream.
//!
//! Where [`TestHarness`](crate::harness::TestHarness) wraps declaration call
//! sites, [`TracedEnvironment`] hooks the runner's own lifecycle events, so
//! test files need no changes at all. State is keyed by the opaque block and
//! test identities the runner already assigns, because under this integration
//! execution order and registration order are not guaranteed to match.

use std::collections::HashMap;

use opentelemetry::trace::{Status, TraceContextExt, Tracer};
use opentelemetry::Context;

use crate::propagation::resolve_root_context;
use crate::runner::{first_error, BlockId, ErrorEntry, RunnerEvent, TestId};
use crate::telemetry;
use crate::tracer::TracerSource;

/// Span instrumentation scoped to one test-environment instance (one test
/// file under most runners).
///
/// Each registry entry's context carries its span; entries exist exactly
/// between a start event and the matching end event.
#[derive(Debug, Default)]
pub struct TracedEnvironment {
    tracer: TracerSource,
    blocks: HashMap<BlockId, Context>,
    tests: HashMap<TestId, Context>,
}

impl TracedEnvironment {
    /// Create an instrumentor for one environment instance.
    pub fn new() -> Self {
        TracedEnvironment::default()
    }

    /// Start the telemetry pipeline.
    ///
    /// Called after the base environment's own setup has completed.
    /// Idempotent across environment instances: the first call installs the
    /// process-wide provider, later calls reuse it.
    pub fn setup(&self) {
        telemetry::init();
    }

    /// Flush and shut telemetry down, then let the base environment's
    /// teardown proceed. Shutdown failures are logged, never propagated.
    pub fn teardown(&mut self) {
        telemetry::shutdown();
    }

    /// Advance the state machine with one runner event.
    pub fn handle_event(&mut self, event: RunnerEvent) {
        match event {
            RunnerEvent::RunDescribeStart {
                block,
                parent,
                name,
            } => self.on_describe_start(block, parent, name),
            RunnerEvent::RunDescribeFinish { block } => self.on_describe_finish(block),
            RunnerEvent::TestStart { test, parent, name } => {
                self.on_test_start(test, parent, name)
            }
            RunnerEvent::TestDone { test, errors } => {
                self.on_test_done(test, &errors);
            }
        }
    }

    /// Wrap one execution attempt of `test`'s body so it runs with the test
    /// span active and any spans it creates nest under it.
    ///
    /// A fresh wrapper is produced per attempt and the declared body is never
    /// mutated, so retries cannot accumulate wrapping layers. Decorating an
    /// unknown test id degrades to running the body unwrapped.
    pub fn decorate<T, F>(&self, test: TestId, body: F) -> impl FnOnce() -> T
    where
        F: FnOnce() -> T,
    {
        let cx = self.tests.get(&test).cloned();
        move || match cx {
            Some(cx) => {
                let _guard = cx.attach();
                body()
            }
            None => body(),
        }
    }

    /// Number of blocks with an open span. Entries are pruned on finish.
    pub fn open_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Number of tests with an open span. Entries are pruned on done.
    pub fn open_tests(&self) -> usize {
        self.tests.len()
    }

    fn on_describe_start(&mut self, block: BlockId, parent: Option<BlockId>, name: String) {
        // The implicit root block groups the whole file; it gets no span.
        if parent.is_none() {
            return;
        }
        if self.blocks.contains_key(&block) {
            return;
        }

        let parent_cx = self.context_for(parent);
        let span = self.tracer.get().start_with_context(name, &parent_cx);
        self.blocks.insert(block, parent_cx.with_span(span));
    }

    fn on_describe_finish(&mut self, block: BlockId) {
        if let Some(cx) = self.blocks.remove(&block) {
            cx.span().end();
        }
    }

    fn on_test_start(&mut self, test: TestId, parent: Option<BlockId>, name: String) {
        if self.tests.contains_key(&test) {
            return;
        }

        let parent_cx = self.context_for(parent);
        let span = self.tracer.get().start_with_context(name, &parent_cx);
        self.tests.insert(test, parent_cx.with_span(span));
    }

    fn on_test_done(&mut self, test: TestId, errors: &[ErrorEntry]) {
        let Some(cx) = self.tests.remove(&test) else {
            return;
        };

        match first_error(errors) {
            Some(failure) => {
                cx.span().record_error(&failure);
                cx.span()
                    .set_status(Status::error(failure.message().to_string()));
            }
            None => cx.span().set_status(Status::Ok),
        }
        cx.span().end();
    }

    /// The stored context of `parent`, or a freshly resolved root context
    /// when the parent is the implicit root block or simply unknown.
    fn context_for(&self, parent: Option<BlockId>) -> Context {
        parent
            .and_then(|block| self.blocks.get(&block).cloned())
            .unwrap_or_else(resolve_root_context)
    }
}
