//! Lexical test-tree model used by the declaration wrapper.
//!
//! Nodes are created while the runner registers `describe` blocks and live on
//! a strict-LIFO [`RegistrationStack`]. A node's tracing context is attached
//! much later, when the runner fires the group's before-all hook, so the two
//! lifecycles are kept deliberately separate: the stack is only meaningful
//! during the synchronous registration pass, the context only during
//! execution.

use std::cell::RefCell;
use std::sync::{Arc, OnceLock};

use opentelemetry::trace::TraceContextExt;
use opentelemetry::Context;

/// One declared test group in source order.
///
/// The context stored by [`activate`](TestTreeNode::activate) already carries
/// the group's span, so span and context cannot be observed in a half-set
/// state.
#[derive(Debug)]
pub struct TestTreeNode {
    name: String,
    parent: Option<Arc<TestTreeNode>>,
    state: OnceLock<Context>,
}

impl TestTreeNode {
    /// Create a node for a group named `name`, nested under `parent`.
    pub fn new(name: impl Into<String>, parent: Option<Arc<TestTreeNode>>) -> Self {
        TestTreeNode {
            name: name.into(),
            parent,
            state: OnceLock::new(),
        }
    }

    /// Display name of the group.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The enclosing group, if any.
    pub fn parent(&self) -> Option<&Arc<TestTreeNode>> {
        self.parent.as_ref()
    }

    /// Attach the group's context once its span has been started.
    ///
    /// Only the first call has any effect; the group's before-all hook runs
    /// once per run, so a second call indicates a misbehaving runner and is
    /// ignored rather than clobbering an already published context.
    pub fn activate(&self, cx: Context) {
        let _ = self.state.set(cx);
    }

    /// Context carrying this group's span, if the group has started running.
    pub fn context(&self) -> Option<Context> {
        self.state.get().cloned()
    }

    /// End the group's span, if one was ever started.
    ///
    /// Skipped groups never get a context, so this is a no-op for them.
    pub fn finish(&self) {
        if let Some(cx) = self.state.get() {
            cx.span().end();
        }
    }
}

/// The currently open lexical nesting during registration.
///
/// Interior mutability through [`RefCell`] keeps the owning harness `!Sync`:
/// registration must stay on one thread for top-of-stack parent lookups to be
/// meaningful, and the type system enforces exactly that.
#[derive(Debug, Default)]
pub struct RegistrationStack {
    frames: RefCell<Vec<Arc<TestTreeNode>>>,
}

impl RegistrationStack {
    /// Create an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a group.
    pub fn push(&self, node: Arc<TestTreeNode>) {
        self.frames.borrow_mut().push(node);
    }

    /// Close the most recently opened group.
    pub fn pop(&self) -> Option<Arc<TestTreeNode>> {
        self.frames.borrow_mut().pop()
    }

    /// The nearest enclosing group, or `None` at top level.
    pub fn current_parent(&self) -> Option<Arc<TestTreeNode>> {
        self.frames.borrow().last().cloned()
    }

    /// True once every group opened during registration has been closed.
    pub fn is_empty(&self) -> bool {
        self.frames.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stack_is_lifo() {
        let stack = RegistrationStack::new();
        assert!(stack.current_parent().is_none());

        let outer = Arc::new(TestTreeNode::new("outer", None));
        let inner = Arc::new(TestTreeNode::new("inner", Some(outer.clone())));

        stack.push(outer.clone());
        stack.push(inner.clone());
        assert_eq!(stack.current_parent().unwrap().name(), "inner");

        assert_eq!(stack.pop().unwrap().name(), "inner");
        assert_eq!(stack.current_parent().unwrap().name(), "outer");
        assert_eq!(stack.pop().unwrap().name(), "outer");
        assert!(stack.is_empty());
    }

    #[test]
    fn node_links_to_parent() {
        let parent = Arc::new(TestTreeNode::new("parent", None));
        let child = TestTreeNode::new("child", Some(parent.clone()));
        assert_eq!(child.parent().unwrap().name(), "parent");
        assert!(parent.parent().is_none());
    }

    #[test]
    fn first_activation_wins() {
        let node = TestTreeNode::new("group", None);
        assert!(node.context().is_none());

        let first = Context::new().with_value(1u32);
        node.activate(first);
        node.activate(Context::new().with_value(2u32));

        let stored = node.context().unwrap();
        assert_eq!(stored.get::<u32>(), Some(&1));
    }

    #[test]
    fn finish_without_activation_is_harmless() {
        TestTreeNode::new("never ran", None).finish();
    }
}
