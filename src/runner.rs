//! The host test runner's contract, as consumed by this crate.
//!
//! Two integration surfaces exist and this module models both: the
//! synchronous registration primitives (`describe`/`test`/hooks) wrapped by
//! [`TestHarness`](crate::harness::TestHarness), and the execution event
//! stream consumed by [`TracedEnvironment`](crate::environment::TracedEnvironment).
//! Nothing here creates spans; these are the seams between the runner and the
//! instrumentation.

use std::time::Duration;

/// Opaque identity the runner assigns to one declared test.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TestId(pub u64);

/// Opaque identity the runner assigns to one describe block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockId(pub u64);

/// How a declaration participates in the run, mirroring the runner's
/// `only`/`skip` modifiers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Selection {
    /// Run normally.
    #[default]
    Run,
    /// Run exclusively, skipping unselected siblings.
    Only,
    /// Declare but do not run.
    Skip,
}

/// Modifier set accepted by [`Runner::test`].
///
/// The runner's modifier surface composes (`skip.failing`,
/// `concurrent.only`, ...); independent fields model the full matrix.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TestMode {
    /// `only`/`skip` selection.
    pub selection: Selection,
    /// The test is expected to fail; the runner inverts its outcome.
    pub failing: bool,
    /// The runner may execute this test concurrently with its siblings.
    pub concurrent: bool,
    /// Declared as unimplemented; the runner reports it as todo and never
    /// executes anything.
    pub todo: bool,
}

impl TestMode {
    /// Mode for `only` tests.
    pub fn only() -> Self {
        TestMode {
            selection: Selection::Only,
            ..TestMode::default()
        }
    }

    /// Mode for `skip` tests.
    pub fn skip() -> Self {
        TestMode {
            selection: Selection::Skip,
            ..TestMode::default()
        }
    }

    /// Mode for `todo` declarations.
    pub fn todo() -> Self {
        TestMode {
            todo: true,
            ..TestMode::default()
        }
    }

    /// Mark the test as expected to fail.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Allow concurrent execution.
    pub fn concurrent(mut self) -> Self {
        self.concurrent = true;
        self
    }
}

/// A single test registration handed to the runner.
#[derive(Clone, Debug)]
pub struct TestSpec {
    /// Display name, already expanded for parameterized cases.
    pub name: String,
    /// Modifier set.
    pub mode: TestMode,
    /// Caller-supplied timeout, forwarded unchanged.
    pub timeout: Option<Duration>,
}

impl TestSpec {
    /// A plain registration with no modifiers and no timeout.
    pub fn new(name: impl Into<String>) -> Self {
        TestSpec {
            name: name.into(),
            mode: TestMode::default(),
            timeout: None,
        }
    }
}

/// Outcome of one test-body invocation.
pub type TestOutcome = Result<(), TestFailure>;

/// A test body as registered with the runner.
///
/// `Fn` rather than `FnOnce` because the runner may retry the same
/// registration; `Send + Sync` because `concurrent` tests may run on any
/// thread.
pub type TestBody = Box<dyn Fn() -> TestOutcome + Send + Sync>;

/// A before-all/after-all hook.
pub type HookFn = Box<dyn Fn() + Send + Sync>;

/// Registration primitives of the host runner.
///
/// `describe` must invoke `body` synchronously on the calling thread; the
/// wrapper's registration stack depends on it. Execution of registered hooks
/// and tests happens later, on the runner's schedule.
pub trait Runner {
    /// Register a group and synchronously run `body` to register its
    /// children.
    fn describe(&self, name: &str, selection: Selection, body: &mut dyn FnMut());

    /// Register one test. `body` is `None` for `todo` declarations.
    fn test(&self, spec: TestSpec, body: Option<TestBody>);

    /// Run `hook` once before any test of the group currently being
    /// registered.
    fn before_all(&self, hook: HookFn);

    /// Run `hook` once after every test of the group currently being
    /// registered has finished.
    fn after_all(&self, hook: HookFn);
}

/// A failure reported for a test, reduced to what a span can record.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct TestFailure {
    message: String,
    stack: Option<String>,
}

impl TestFailure {
    /// A failure with a message and no backtrace.
    pub fn new(message: impl Into<String>) -> Self {
        TestFailure {
            message: message.into(),
            stack: None,
        }
    }

    /// A failure carrying the runner's captured backtrace.
    pub fn with_stack(message: impl Into<String>, stack: impl Into<String>) -> Self {
        TestFailure {
            message: message.into(),
            stack: Some(stack.into()),
        }
    }

    /// Failure message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Captured backtrace, if the runner provided one.
    pub fn stack(&self) -> Option<&str> {
        self.stack.as_deref()
    }
}

/// An error value as it appears in the runner's error list, before
/// classification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RawError {
    /// A structured error object.
    Failure(TestFailure),
    /// A bare message string.
    Message(String),
}

/// One element of the error list attached to a `test_done` event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ErrorEntry {
    /// A single error value.
    Single(RawError),
    /// A `[synchronous, asynchronous]` pair, as emitted by runners that track
    /// both the throwing call and the surrounding async failure. Either half
    /// may be missing.
    Pair(Option<RawError>, Option<TestFailure>),
}

/// Extract the first failure worth reporting from a runner error list.
///
/// Pairs prefer the synchronous half when it carries a stack trace, wrap a
/// bare synchronous string, and otherwise fall back to the asynchronous half
/// or a generic placeholder. Returns `None` only for an empty list; malformed
/// input degrades, it never panics.
pub fn first_error(errors: &[ErrorEntry]) -> Option<TestFailure> {
    let first = errors.first()?;
    Some(match first {
        ErrorEntry::Single(RawError::Failure(failure)) => failure.clone(),
        ErrorEntry::Single(RawError::Message(message)) => TestFailure::new(message.clone()),
        ErrorEntry::Pair(sync, asynchronous) => match sync {
            Some(RawError::Failure(failure)) if failure.stack().is_some() => failure.clone(),
            Some(RawError::Message(message)) => TestFailure::new(message.clone()),
            _ => asynchronous
                .clone()
                .unwrap_or_else(|| TestFailure::new("unknown test runner error")),
        },
    })
}

/// One event from the runner's execution stream.
///
/// The runner's implicit root block is the only block delivered with
/// `parent: None`; it groups the whole file and gets no span of its own.
#[derive(Clone, Debug)]
pub enum RunnerEvent {
    /// A describe block is about to run its children.
    RunDescribeStart {
        /// Identity of the block.
        block: BlockId,
        /// Enclosing block, `None` for the implicit root.
        parent: Option<BlockId>,
        /// Display name.
        name: String,
    },
    /// A describe block's children have all finished.
    RunDescribeFinish {
        /// Identity of the block.
        block: BlockId,
    },
    /// A test is about to execute (possibly a retry).
    TestStart {
        /// Identity of the test.
        test: TestId,
        /// Enclosing block.
        parent: Option<BlockId>,
        /// Display name.
        name: String,
    },
    /// A test finished executing.
    TestDone {
        /// Identity of the test.
        test: TestId,
        /// Errors collected by the runner; empty on success.
        errors: Vec<ErrorEntry>,
    },
}
