//! Declaration-time instrumentation: wrapped `describe`/`it` registration.
//!
//! [`TestHarness`] wraps a [`Runner`]'s registration primitives so that every
//! group becomes a span opened by a before-all hook and closed by an
//! after-all hook, and every test body runs inside its own span nested under
//! the enclosing group. Registration itself stays fully synchronous; only the
//! hooks and bodies registered here run later, on the runner's schedule.

use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use opentelemetry::trace::{Status, TraceContextExt, Tracer};
use serde_json::Value;

use crate::propagation::resolve_root_context;
use crate::runner::{Runner, Selection, TestBody, TestMode, TestOutcome, TestSpec};
use crate::title::format_title;
use crate::tracer::TracerSource;
use crate::tree::{RegistrationStack, TestTreeNode};

type PlainBody = fn() -> TestOutcome;

/// Wraps a runner's registration surface with span instrumentation.
///
/// Intended for test files that import their `describe`/`it` from this crate
/// instead of from the runner directly. The harness is deliberately `!Sync`;
/// declarations must all happen on the registering thread.
#[derive(Debug)]
pub struct TestHarness<R: Runner> {
    runner: R,
    tracer: Arc<TracerSource>,
    stack: RegistrationStack,
}

impl<R: Runner> TestHarness<R> {
    /// Wrap `runner`, producing spans through the globally installed tracer
    /// provider.
    pub fn new(runner: R) -> Self {
        TestHarness {
            runner,
            tracer: Arc::new(TracerSource::global()),
            stack: RegistrationStack::new(),
        }
    }

    /// The wrapped runner.
    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Register a group of tests.
    ///
    /// `body` runs synchronously and registers the group's children through
    /// this same harness; the group's span starts only once the runner fires
    /// the before-all hook and ends after every descendant has finished.
    pub fn describe(&self, name: &str, body: impl FnOnce(&Self)) {
        self.describe_with(name, Selection::Run, body);
    }

    /// Register a group that runs exclusively.
    pub fn describe_only(&self, name: &str, body: impl FnOnce(&Self)) {
        self.describe_with(name, Selection::Only, body);
    }

    /// Register a group that is declared but skipped.
    pub fn describe_skip(&self, name: &str, body: impl FnOnce(&Self)) {
        self.describe_with(name, Selection::Skip, body);
    }

    /// Register a group with an explicit selection modifier.
    pub fn describe_with(&self, name: &str, selection: Selection, body: impl FnOnce(&Self)) {
        let parent = self.stack.current_parent();
        let node = Arc::new(TestTreeNode::new(name, parent));
        let mut body = Some(body);

        self.runner.describe(name, selection, &mut || {
            self.stack.push(node.clone());

            let tracer = self.tracer.clone();
            let hook_node = node.clone();
            let span_name = name.to_string();
            self.runner.before_all(Box::new(move || {
                let base = match hook_node.parent() {
                    Some(parent) => parent.context().unwrap_or_else(resolve_root_context),
                    None => resolve_root_context(),
                };
                let span = tracer.get().start_with_context(span_name.clone(), &base);
                hook_node.activate(base.with_span(span));
            }));

            let finish_node = node.clone();
            self.runner.after_all(Box::new(move || finish_node.finish()));

            if let Some(body) = body.take() {
                body(self);
            }

            // Registration order, not execution order: the node leaves the
            // stack as soon as its children are registered.
            self.stack.pop();
        });
    }

    /// Register one group per case row, expanding `template` for each.
    pub fn describe_each(&self, rows: &[Value], template: &str, body: impl Fn(&Self, &[Value])) {
        self.describe_each_with(rows, template, Selection::Run, body);
    }

    /// [`describe_each`](Self::describe_each) with an explicit selection
    /// modifier.
    pub fn describe_each_with(
        &self,
        rows: &[Value],
        template: &str,
        selection: Selection,
        body: impl Fn(&Self, &[Value]),
    ) {
        for (index, row) in rows.iter().enumerate() {
            let title = format_title(template, row, index);
            let args = spread(row);
            self.describe_with(&title, selection, |harness| body(harness, &args));
        }
    }

    /// Register a test whose body runs inside its own span.
    pub fn it<F>(&self, name: &str, body: F)
    where
        F: Fn() -> TestOutcome + Send + Sync + 'static,
    {
        self.it_with(name, TestMode::default(), Some(body), None);
    }

    /// Register a test that runs exclusively.
    pub fn it_only<F>(&self, name: &str, body: F)
    where
        F: Fn() -> TestOutcome + Send + Sync + 'static,
    {
        self.it_with(name, TestMode::only(), Some(body), None);
    }

    /// Register a test that is declared but skipped.
    pub fn it_skip<F>(&self, name: &str, body: F)
    where
        F: Fn() -> TestOutcome + Send + Sync + 'static,
    {
        self.it_with(name, TestMode::skip(), Some(body), None);
    }

    /// Register a test that is expected to fail.
    pub fn it_failing<F>(&self, name: &str, body: F)
    where
        F: Fn() -> TestOutcome + Send + Sync + 'static,
    {
        self.it_with(name, TestMode::default().failing(), Some(body), None);
    }

    /// Register a test the runner may execute concurrently with its siblings.
    pub fn it_concurrent<F>(&self, name: &str, body: F)
    where
        F: Fn() -> TestOutcome + Send + Sync + 'static,
    {
        self.it_with(name, TestMode::default().concurrent(), Some(body), None);
    }

    /// Register a pending test: no body yet, but the span is still created
    /// and completed around no work so the test shows up in the trace.
    pub fn it_pending(&self, name: &str) {
        self.it_with::<PlainBody>(name, TestMode::default(), None, None);
    }

    /// Register a todo declaration.
    ///
    /// Passed through to the runner unwrapped — nothing executes, so no span
    /// is produced.
    pub fn it_todo(&self, name: &str) {
        self.it_with::<PlainBody>(name, TestMode::todo(), None, None);
    }

    /// Register a test with the full modifier matrix and optional timeout.
    ///
    /// The wrapped body resolves its parent context at execution time from
    /// the group captured at registration time, runs with the test span
    /// attached for its whole extent, records failures on the span, and
    /// returns the outcome to the runner unchanged. Panics end the span and
    /// then resume unwinding.
    pub fn it_with<F>(&self, name: &str, mode: TestMode, body: Option<F>, timeout: Option<Duration>)
    where
        F: Fn() -> TestOutcome + Send + Sync + 'static,
    {
        let spec = TestSpec {
            name: name.to_string(),
            mode,
            timeout,
        };

        if mode.todo {
            self.runner.test(spec, None);
            return;
        }

        let node = self.stack.current_parent();
        let tracer = self.tracer.clone();
        let span_name = name.to_string();
        let wrapped: TestBody = Box::new(move || {
            let parent_cx = node
                .as_ref()
                .and_then(|n| n.context())
                .unwrap_or_else(resolve_root_context);
            let span = tracer.get().start_with_context(span_name.clone(), &parent_cx);
            let cx = parent_cx.with_span(span);

            let outcome = {
                let _guard = cx.clone().attach();
                match body.as_ref() {
                    Some(f) => catch_unwind(AssertUnwindSafe(|| f())),
                    // Pending test: open and close the span around no work.
                    None => Ok(Ok(())),
                }
            };

            match outcome {
                Ok(result) => {
                    if let Err(failure) = &result {
                        cx.span().record_error(failure);
                        cx.span().set_status(Status::error(failure.message().to_string()));
                    }
                    cx.span().end();
                    result
                }
                Err(payload) => {
                    cx.span().set_status(Status::error("test body panicked"));
                    cx.span().end();
                    resume_unwind(payload)
                }
            }
        });

        self.runner.test(spec, Some(wrapped));
    }

    /// Register one test per case row, expanding `template` for each.
    ///
    /// Array rows are spread into the argument slice; any other row is passed
    /// as a single argument. Registration order matches row order and rows
    /// share no state.
    pub fn it_each<F>(&self, rows: &[Value], template: &str, body: F)
    where
        F: Fn(&[Value]) -> TestOutcome + Send + Sync + 'static,
    {
        self.it_each_with(rows, template, TestMode::default(), None, body);
    }

    /// [`it_each`](Self::it_each) with explicit modifiers and timeout.
    pub fn it_each_with<F>(
        &self,
        rows: &[Value],
        template: &str,
        mode: TestMode,
        timeout: Option<Duration>,
        body: F,
    ) where
        F: Fn(&[Value]) -> TestOutcome + Send + Sync + 'static,
    {
        let body = Arc::new(body);
        for (index, row) in rows.iter().enumerate() {
            let title = format_title(template, row, index);
            let args = spread(row);
            let body = body.clone();
            self.it_with(&title, mode, Some(move || (*body)(&args)), timeout);
        }
    }
}

/// Spread an array row into positional arguments; wrap anything else.
fn spread(row: &Value) -> Vec<Value> {
    match row {
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    }
}
