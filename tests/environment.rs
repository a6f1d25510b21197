//! State-machine checks for the event-driven environment instrumentor,
//! driven by scripted runner-event sequences against an in-memory exporter.

mod common;

use opentelemetry::global;
use opentelemetry::trace::{SpanId, Status, Tracer};
use opentelemetry_testharness::runner::{
    BlockId, ErrorEntry, RawError, RunnerEvent, TestFailure, TestId,
};
use opentelemetry_testharness::TracedEnvironment;

const TRACEPARENT: &str = "TRACEPARENT";

fn describe_start(block: u64, parent: Option<u64>, name: &str) -> RunnerEvent {
    RunnerEvent::RunDescribeStart {
        block: BlockId(block),
        parent: parent.map(BlockId),
        name: name.to_string(),
    }
}

fn test_start(test: u64, parent: u64, name: &str) -> RunnerEvent {
    RunnerEvent::TestStart {
        test: TestId(test),
        parent: Some(BlockId(parent)),
        name: name.to_string(),
    }
}

fn test_done(test: u64, errors: Vec<ErrorEntry>) -> RunnerEvent {
    RunnerEvent::TestDone {
        test: TestId(test),
        errors,
    }
}

#[test]
fn block_and_test_spans_nest_by_runner_identity() {
    let exporter = common::exporter();
    temp_env::with_var_unset(TRACEPARENT, || {
        let mut env = TracedEnvironment::new();
        env.handle_event(describe_start(1, None, "env-root"));
        env.handle_event(describe_start(2, Some(1), "env-suite"));
        env.handle_event(test_start(10, 2, "env-test"));
        env.handle_event(test_done(10, Vec::new()));
        env.handle_event(RunnerEvent::RunDescribeFinish { block: BlockId(2) });
        env.handle_event(RunnerEvent::RunDescribeFinish { block: BlockId(1) });

        assert_eq!(env.open_blocks(), 0);
        assert_eq!(env.open_tests(), 0);

        // The implicit root block gets no span of its own.
        assert!(common::spans_named(&exporter, "env-root").is_empty());

        let suite = common::span_named(&exporter, "env-suite");
        let test = common::span_named(&exporter, "env-test");
        assert_eq!(suite.parent_span_id, SpanId::INVALID);
        assert_eq!(test.parent_span_id, suite.span_context.span_id());
        assert_eq!(test.status, Status::Ok);
        assert_eq!(suite.status, Status::Unset);
        assert!(test.end_time <= suite.end_time);
    });
}

#[test]
fn reported_errors_become_span_status_and_exception() {
    let exporter = common::exporter();
    temp_env::with_var_unset(TRACEPARENT, || {
        let mut env = TracedEnvironment::new();
        env.handle_event(describe_start(1, None, "err-root"));
        env.handle_event(test_start(20, 1, "err-test"));
        env.handle_event(test_done(
            20,
            vec![ErrorEntry::Pair(
                Some(RawError::Failure(TestFailure::with_stack(
                    "expected 2, got 3",
                    "at spec line 4",
                ))),
                Some(TestFailure::new("async shadow")),
            )],
        ));

        let span = common::span_named(&exporter, "err-test");
        match &span.status {
            Status::Error { description } => assert_eq!(description.as_ref(), "expected 2, got 3"),
            other => panic!("expected error status, got {other:?}"),
        }
        assert!(span.events.iter().any(|event| event.name == "exception"));
        assert_eq!(env.open_tests(), 0);
    });
}

#[test]
fn malformed_error_lists_still_close_the_span() {
    let exporter = common::exporter();
    temp_env::with_var_unset(TRACEPARENT, || {
        let mut env = TracedEnvironment::new();
        env.handle_event(describe_start(1, None, "mal-root"));
        env.handle_event(test_start(30, 1, "mal-test"));
        env.handle_event(test_done(30, vec![ErrorEntry::Pair(None, None)]));

        let span = common::span_named(&exporter, "mal-test");
        match &span.status {
            Status::Error { description } => {
                assert_eq!(description.as_ref(), "unknown test runner error")
            }
            other => panic!("expected error status, got {other:?}"),
        }
    });
}

#[test]
fn decorate_wraps_each_attempt_against_the_fresh_span() {
    let exporter = common::exporter();
    temp_env::with_var_unset(TRACEPARENT, || {
        let mut env = TracedEnvironment::new();
        env.handle_event(describe_start(1, None, "retry-root"));

        for attempt in 0..2 {
            env.handle_event(test_start(40, 1, "retry-test"));
            let child = format!("retry-child-{attempt}");
            let body = env.decorate(TestId(40), move || {
                global::tracer("env-test").in_span(child, |_cx| {});
            });
            body();
            env.handle_event(test_done(40, Vec::new()));
        }

        let attempts = common::spans_named(&exporter, "retry-test");
        assert_eq!(attempts.len(), 2);

        // Each attempt's body span hangs off that attempt's test span, so the
        // second attempt wrapped the original body, not a stale wrapper.
        let first = common::span_named(&exporter, "retry-child-0");
        let second = common::span_named(&exporter, "retry-child-1");
        assert_eq!(first.parent_span_id, attempts[0].span_context.span_id());
        assert_eq!(second.parent_span_id, attempts[1].span_context.span_id());
        assert_ne!(
            attempts[0].span_context.span_id(),
            attempts[1].span_context.span_id()
        );
    });
}

#[test]
fn unknown_parents_fall_back_to_root_context() {
    let exporter = common::exporter();
    temp_env::with_var_unset(TRACEPARENT, || {
        let mut env = TracedEnvironment::new();
        // Parent block 99 never announced itself; execution order is not
        // guaranteed to match registration order.
        env.handle_event(test_start(50, 99, "orphan-test"));
        env.handle_event(test_done(50, Vec::new()));

        let span = common::span_named(&exporter, "orphan-test");
        assert_eq!(span.parent_span_id, SpanId::INVALID);
    });
}

#[test]
fn stray_end_events_are_ignored() {
    let mut env = TracedEnvironment::new();
    env.handle_event(RunnerEvent::RunDescribeFinish { block: BlockId(77) });
    env.handle_event(test_done(78, Vec::new()));
    assert_eq!(env.open_blocks(), 0);
    assert_eq!(env.open_tests(), 0);
}

#[test]
fn duplicate_test_start_is_tolerated() {
    let exporter = common::exporter();
    temp_env::with_var_unset(TRACEPARENT, || {
        let mut env = TracedEnvironment::new();
        env.handle_event(describe_start(1, None, "dup-root"));
        env.handle_event(test_start(60, 1, "dup-test"));
        env.handle_event(test_start(60, 1, "dup-test"));
        env.handle_event(test_done(60, Vec::new()));

        assert_eq!(common::spans_named(&exporter, "dup-test").len(), 1);
    });
}

#[test]
fn decorating_an_unknown_test_runs_the_body_unwrapped() {
    let env = TracedEnvironment::new();
    let body = env.decorate(TestId(99), || 7);
    assert_eq!(body(), 7);
}

#[test]
fn teardown_without_setup_is_harmless() {
    let mut env = TracedEnvironment::new();
    env.teardown();
}
