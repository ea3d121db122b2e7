//! Helpers for walking the linked list of chain nodes.

use crate::errors::{ErrorChain, ErrorChainNode};

impl ErrorChainNode {
    /// Create a node with no payload and no wrapped child.
    pub fn new(ty: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            r#type: ty.into(),
            message: message.into(),
            data: Vec::new(),
            wrapped: None,
        }
    }

    /// Iterate from this node down to the innermost cause.
    pub fn iter(&self) -> Nodes<'_> {
        Nodes { next: Some(self) }
    }

    /// Number of nodes from this one to the innermost cause, inclusive.
    pub fn depth(&self) -> usize {
        self.iter().count()
    }
}

impl ErrorChain {
    /// Wrap a root node into an envelope.
    pub fn with_root(root: ErrorChainNode) -> Self {
        Self { root: Some(root) }
    }

    /// Number of nodes in the chain; zero when the root is absent.
    pub fn depth(&self) -> usize {
        self.root.as_ref().map_or(0, ErrorChainNode::depth)
    }
}

/// Iterator over a chain of nodes, outermost first.
#[derive(Debug, Clone)]
pub struct Nodes<'a> {
    next: Option<&'a ErrorChainNode>,
}

impl<'a> Iterator for Nodes<'a> {
    type Item = &'a ErrorChainNode;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.wrapped.as_deref();
        Some(current)
    }
}
