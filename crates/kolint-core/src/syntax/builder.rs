//! Incremental construction of a [`SyntaxTree`] by parser frontends.

use super::{NodeId, NodeKind, SyntaxTree};

/// Position in the currently open node, used to wrap already emitted
/// children into a new node (e.g. the left operand of a binary expression).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(usize);

/// Builds a tree from a stream of start/token/finish events.
///
/// ```
/// use kolint_core::syntax::{NodeKind, TreeBuilder};
///
/// let mut builder = TreeBuilder::new(NodeKind::File);
/// builder.start_node(NodeKind::Property);
/// builder.token(NodeKind::Keyword, "val");
/// builder.finish_node();
/// let tree = builder.finish();
/// assert_eq!(tree.render(), "val");
/// ```
pub struct TreeBuilder {
    tree: SyntaxTree,
    stack: Vec<(NodeKind, Vec<NodeId>)>,
    pending_root: Vec<NodeId>,
}

impl TreeBuilder {
    /// Creates a builder whose root node has `root_kind`.
    #[must_use]
    pub fn new(root_kind: NodeKind) -> Self {
        Self {
            tree: SyntaxTree::new(root_kind),
            stack: Vec::new(),
            pending_root: Vec::new(),
        }
    }

    fn current_children(&mut self) -> &mut Vec<NodeId> {
        match self.stack.last_mut() {
            Some((_, children)) => children,
            None => &mut self.pending_root,
        }
    }

    /// Opens a new composite node.
    pub fn start_node(&mut self, kind: NodeKind) {
        self.stack.push((kind, Vec::new()));
    }

    /// Returns a checkpoint in the currently open node.
    #[must_use]
    pub fn checkpoint(&self) -> Checkpoint {
        let len = self
            .stack
            .last()
            .map_or(self.pending_root.len(), |(_, children)| children.len());
        Checkpoint(len)
    }

    /// Opens a new node that adopts every child emitted since `checkpoint`.
    pub fn start_node_at(&mut self, checkpoint: Checkpoint, kind: NodeKind) {
        let children = self.current_children();
        let start = checkpoint.0.min(children.len());
        let adopted = children.split_off(start);
        self.stack.push((kind, adopted));
    }

    /// Adds a leaf to the currently open node. Empty texts are skipped.
    pub fn token(&mut self, kind: NodeKind, text: &str) {
        if text.is_empty() {
            return;
        }
        let leaf = self.tree.new_leaf(kind, text);
        self.current_children().push(leaf);
    }

    /// Closes the most recently opened node.
    pub fn finish_node(&mut self) {
        let Some((kind, children)) = self.stack.pop() else {
            return;
        };
        let node = self.tree.new_node(kind);
        for child in children {
            self.tree.append_child(node, child);
        }
        self.current_children().push(node);
    }

    /// Closes any open nodes and returns the tree.
    #[must_use]
    pub fn finish(mut self) -> SyntaxTree {
        while !self.stack.is_empty() {
            self.finish_node();
        }
        let root = self.tree.root();
        for child in std::mem::take(&mut self.pending_root) {
            self.tree.append_child(root, child);
        }
        self.tree
    }
}
