//! Arena-backed syntax tree.

use std::cell::OnceCell;
use std::ops::Range;

use super::NodeKind;
use crate::position::{LineColumn, PositionIndex};

/// Stable index of a node in a [`SyntaxTree`].
///
/// Ids stay valid for the lifetime of the tree, including after the node has
/// been detached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    #[allow(clippy::cast_possible_truncation)]
    fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    /// Returns the arena index of this node.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    text: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Offsets derived from the leaf texts, valid for one revision.
#[derive(Debug, Clone)]
struct Layout {
    starts: Vec<usize>,
    ends: Vec<usize>,
    leaves: Vec<NodeId>,
    /// Position of each leaf in `leaves`, `usize::MAX` for others.
    leaf_pos: Vec<usize>,
    index: PositionIndex,
}

const DETACHED: usize = usize::MAX;

/// A syntax tree stored as an arena of nodes linked by index.
///
/// Leaves own text; the text of a composite node is the concatenation of its
/// leaves. Offsets are computed lazily and cached until the next mutation.
/// Every mutation bumps [`SyntaxTree::revision`].
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    nodes: Vec<NodeData>,
    root: NodeId,
    revision: u64,
    layout: OnceCell<Layout>,
}

impl SyntaxTree {
    /// Creates a tree consisting of an empty root node.
    #[must_use]
    pub fn new(root_kind: NodeKind) -> Self {
        Self {
            nodes: vec![NodeData {
                kind: root_kind,
                text: None,
                parent: None,
                children: Vec::new(),
            }],
            root: NodeId(0),
            revision: 0,
            layout: OnceCell::new(),
        }
    }

    // --- queries ---

    /// Returns the root node.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Returns the mutation counter.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Returns the number of nodes in the arena, including detached ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the root has no content.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text_len() == 0
    }

    /// Returns the kind of `id`.
    #[must_use]
    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.nodes[id.index()].kind
    }

    /// Returns the parent of `id`.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    /// Returns the children of `id` in text order.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    /// Returns true if `id` owns text.
    #[must_use]
    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.nodes[id.index()].text.is_some()
    }

    /// Returns the own text of a leaf.
    #[must_use]
    pub fn leaf_text(&self, id: NodeId) -> Option<&str> {
        self.nodes[id.index()].text.as_deref()
    }

    /// Returns true if `id` is reachable from the root.
    #[must_use]
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current == self.root
    }

    /// Returns the first child of `id` of the given kind.
    #[must_use]
    pub fn find_child(&self, id: NodeId, kind: NodeKind) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|&child| self.kind(child) == kind)
    }

    /// Returns the first child of `id` that holds code.
    #[must_use]
    pub fn first_code_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|&child| self.kind(child).is_code())
    }

    /// Returns the last child of `id` that holds code.
    #[must_use]
    pub fn last_code_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id)
            .iter()
            .rev()
            .copied()
            .find(|&child| self.kind(child).is_code())
    }

    fn sibling_position(&self, id: NodeId) -> Option<(NodeId, usize)> {
        let parent = self.parent(id)?;
        let position = self.children(parent).iter().position(|&c| c == id)?;
        Some((parent, position))
    }

    /// Returns the sibling before `id`.
    #[must_use]
    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        let (parent, position) = self.sibling_position(id)?;
        position
            .checked_sub(1)
            .map(|p| self.children(parent)[p])
    }

    /// Returns the sibling after `id`.
    #[must_use]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let (parent, position) = self.sibling_position(id)?;
        self.children(parent).get(position + 1).copied()
    }

    /// Returns the closest preceding sibling that holds code.
    #[must_use]
    pub fn prev_code_sibling(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.prev_sibling(id);
        while let Some(sibling) = current {
            if self.kind(sibling).is_code() {
                return Some(sibling);
            }
            current = self.prev_sibling(sibling);
        }
        None
    }

    /// Returns the closest following sibling that holds code.
    #[must_use]
    pub fn next_code_sibling(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.next_sibling(id);
        while let Some(sibling) = current {
            if self.kind(sibling).is_code() {
                return Some(sibling);
            }
            current = self.next_sibling(sibling);
        }
        None
    }

    /// Iterates over the ancestors of `id`, nearest first, excluding `id`.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&current| self.parent(current))
    }

    /// Returns the nearest ancestor of the given kind.
    #[must_use]
    pub fn ancestor_of_kind(&self, id: NodeId, kind: NodeKind) -> Option<NodeId> {
        self.ancestors(id).find(|&a| self.kind(a) == kind)
    }

    /// Returns true if `ancestor` is `id` or one of its ancestors.
    #[must_use]
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
        id == ancestor || self.ancestors(id).any(|a| a == ancestor)
    }

    /// Returns `id` and all of its descendants in pre-order.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            result.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        result
    }

    /// Returns the first leaf of `id`, or `id` itself when it is a leaf.
    #[must_use]
    pub fn first_leaf(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        loop {
            if self.is_leaf(current) {
                return Some(current);
            }
            current = *self.children(current).first()?;
        }
    }

    /// Returns the last leaf of `id`, or `id` itself when it is a leaf.
    #[must_use]
    pub fn last_leaf(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        loop {
            if self.is_leaf(current) {
                return Some(current);
            }
            current = *self.children(current).last()?;
        }
    }

    /// Returns all attached leaves in text order.
    #[must_use]
    pub fn leaves(&self) -> &[NodeId] {
        &self.layout().leaves
    }

    /// Returns the leaf directly preceding `id` in text order.
    #[must_use]
    pub fn prev_leaf(&self, id: NodeId) -> Option<NodeId> {
        let layout = self.layout();
        if let Some(first) = self.first_leaf(id) {
            let position = layout.leaf_pos[first.index()];
            if position != DETACHED {
                return position.checked_sub(1).map(|p| layout.leaves[p]);
            }
        }
        let start = layout.starts[id.index()];
        if start == DETACHED {
            return None;
        }
        let count = layout
            .leaves
            .partition_point(|l| layout.starts[l.index()] < start);
        count.checked_sub(1).map(|p| layout.leaves[p])
    }

    /// Returns the leaf directly following `id` in text order.
    #[must_use]
    pub fn next_leaf(&self, id: NodeId) -> Option<NodeId> {
        let layout = self.layout();
        if let Some(last) = self.last_leaf(id) {
            let position = layout.leaf_pos[last.index()];
            if position != DETACHED {
                return layout.leaves.get(position + 1).copied();
            }
        }
        let end = layout.ends[id.index()];
        if end == DETACHED {
            return None;
        }
        let count = layout
            .leaves
            .partition_point(|l| layout.starts[l.index()] < end);
        layout.leaves.get(count).copied()
    }

    /// Returns the closest preceding leaf that holds code.
    #[must_use]
    pub fn prev_code_leaf(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.prev_leaf(id);
        while let Some(leaf) = current {
            if self.kind(leaf).is_code() {
                return Some(leaf);
            }
            current = self.prev_leaf(leaf);
        }
        None
    }

    /// Returns the closest following leaf that holds code.
    #[must_use]
    pub fn next_code_leaf(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.next_leaf(id);
        while let Some(leaf) = current {
            if self.kind(leaf).is_code() {
                return Some(leaf);
            }
            current = self.next_leaf(leaf);
        }
        None
    }

    /// Returns the non-empty leaf that contains `offset`.
    ///
    /// An offset at or past the end of the text maps to the last leaf.
    #[must_use]
    pub fn leaf_at(&self, offset: usize) -> Option<NodeId> {
        let layout = self.layout();
        if offset >= layout.index.text().len() {
            return layout.leaves.last().copied();
        }
        let count = layout
            .leaves
            .partition_point(|l| layout.starts[l.index()] <= offset);
        layout.leaves[..count]
            .iter()
            .rev()
            .copied()
            .find(|l| layout.ends[l.index()] > offset)
    }

    /// Returns the byte offset at which `id` starts.
    ///
    /// Detached nodes report `usize::MAX`.
    #[must_use]
    pub fn start(&self, id: NodeId) -> usize {
        self.layout().starts[id.index()]
    }

    /// Returns the byte offset at which `id` ends.
    #[must_use]
    pub fn end(&self, id: NodeId) -> usize {
        self.layout().ends[id.index()]
    }

    /// Returns the byte range of `id`.
    #[must_use]
    pub fn range(&self, id: NodeId) -> Range<usize> {
        self.start(id)..self.end(id)
    }

    /// Returns the text of `id`. Detached nodes render their own leaves.
    #[must_use]
    pub fn text(&self, id: NodeId) -> &str {
        let layout = self.layout();
        let (start, end) = (layout.starts[id.index()], layout.ends[id.index()]);
        if start == DETACHED {
            return self.leaf_text(id).unwrap_or("");
        }
        layout.index.text().get(start..end).unwrap_or("")
    }

    /// Returns the text of the whole tree.
    #[must_use]
    pub fn full_text(&self) -> &str {
        self.layout().index.text()
    }

    /// Returns an owned copy of the whole text.
    #[must_use]
    pub fn render(&self) -> String {
        self.full_text().to_string()
    }

    /// Returns the length of the whole text in bytes.
    #[must_use]
    pub fn text_len(&self) -> usize {
        self.full_text().len()
    }

    /// Returns the position index of the current revision.
    #[must_use]
    pub fn position_index(&self) -> &PositionIndex {
        &self.layout().index
    }

    /// Maps `offset` of the current revision to a line and column.
    #[must_use]
    pub fn position(&self, offset: usize) -> LineColumn {
        self.position_index().line_col(offset)
    }

    /// Returns true if the text of `id` contains a line break.
    #[must_use]
    pub fn contains_newline(&self, id: NodeId) -> bool {
        self.text(id).contains(['\n', '\r'])
    }

    /// Returns true if `id` is a whitespace leaf containing a line break.
    #[must_use]
    pub fn is_whitespace_with_newline(&self, id: NodeId) -> bool {
        self.kind(id).is_whitespace() && self.contains_newline(id)
    }

    /// Returns true if `id` is a whitespace leaf without a line break.
    #[must_use]
    pub fn is_whitespace_without_newline(&self, id: NodeId) -> bool {
        self.kind(id).is_whitespace() && !self.contains_newline(id)
    }

    /// Returns the leading spaces and tabs of the line on which `id` starts.
    #[must_use]
    pub fn line_indent(&self, id: NodeId) -> String {
        let index = self.position_index();
        let line = index.line_of(self.start(id));
        index
            .line_text(line)
            .chars()
            .take_while(|c| *c == ' ' || *c == '\t')
            .collect()
    }

    /// Returns true if no line break occurs between the start of `from` and the
    /// end of `to`.
    #[must_use]
    pub fn no_newline_in_closed_range(&self, from: NodeId, to: NodeId) -> bool {
        let (start, end) = (self.start(from), self.end(to));
        if start == DETACHED || end == DETACHED || start > end {
            return false;
        }
        self.full_text()
            .get(start..end)
            .is_some_and(|text| !text.contains(['\n', '\r']))
    }

    /// Renders the tree structure, one node per line, for debugging and tests.
    #[must_use]
    pub fn dump(&self) -> String {
        use std::fmt::Write;
        let mut out = String::new();
        let mut stack = vec![(self.root, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            let _ = write!(out, "{}{}", "  ".repeat(depth), self.kind(id));
            if let Some(text) = self.leaf_text(id) {
                let _ = write!(out, " {text:?}");
            }
            out.push('\n');
            for &child in self.children(id).iter().rev() {
                stack.push((child, depth + 1));
            }
        }
        out
    }

    // --- mutation ---

    fn touch(&mut self) {
        self.revision += 1;
        self.layout = OnceCell::new();
    }

    /// Replaces the content with `snapshot`. The revision counter keeps
    /// growing, so caches keyed on it never see an old revision again.
    pub fn restore(&mut self, snapshot: SyntaxTree) {
        let revision = self.revision.max(snapshot.revision);
        *self = snapshot;
        self.revision = revision;
        self.touch();
    }

    fn push(&mut self, kind: NodeKind, text: Option<String>) -> NodeId {
        let id = NodeId::from_index(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            text,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Creates a detached leaf.
    pub fn new_leaf(&mut self, kind: NodeKind, text: impl Into<String>) -> NodeId {
        self.push(kind, Some(text.into()))
    }

    /// Creates a detached composite node.
    pub fn new_node(&mut self, kind: NodeKind) -> NodeId {
        self.push(kind, None)
    }

    /// Replaces the text of a leaf. Has no effect on composite nodes.
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        let text = text.into();
        let changed = match &mut self.nodes[id.index()].text {
            Some(current) if *current != text => {
                *current = text;
                true
            }
            _ => false,
        };
        if changed {
            self.touch();
        }
    }

    /// Appends `child` as last child of `parent`, detaching it first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[parent.index()].children.push(child);
        self.nodes[child.index()].parent = Some(parent);
        self.touch();
    }

    /// Inserts `node` as sibling directly before `anchor`.
    pub fn insert_before(&mut self, anchor: NodeId, node: NodeId) {
        self.insert_sibling(anchor, node, 0);
    }

    /// Inserts `node` as sibling directly after `anchor`.
    pub fn insert_after(&mut self, anchor: NodeId, node: NodeId) {
        self.insert_sibling(anchor, node, 1);
    }

    fn insert_sibling(&mut self, anchor: NodeId, node: NodeId, shift: usize) {
        self.detach(node);
        let Some((parent, position)) = self.sibling_position(anchor) else {
            return;
        };
        self.nodes[parent.index()]
            .children
            .insert(position + shift, node);
        self.nodes[node.index()].parent = Some(parent);
        self.touch();
    }

    /// Removes `id` from its parent. The node stays in the arena.
    pub fn detach(&mut self, id: NodeId) {
        if let Some((parent, position)) = self.sibling_position(id) {
            self.nodes[parent.index()].children.remove(position);
            self.nodes[id.index()].parent = None;
            self.touch();
        }
    }

    /// Sets the whitespace directly before `id` to `text`.
    ///
    /// A whitespace `id` is changed itself. Otherwise the preceding whitespace
    /// leaf is changed, or a new whitespace leaf is inserted. An empty `text`
    /// removes the whitespace.
    pub fn upsert_whitespace_before(&mut self, id: NodeId, text: &str) {
        if self.kind(id).is_whitespace() {
            self.replace_whitespace(id, text);
            return;
        }
        let previous = if self.is_leaf(id) {
            self.prev_sibling(id).or_else(|| self.prev_leaf(id))
        } else {
            self.prev_sibling(id)
        };
        match previous {
            Some(p) if self.kind(p).is_whitespace() => self.replace_whitespace(p, text),
            _ if text.is_empty() => {}
            _ => match self.parent(id) {
                Some(parent) if self.children(parent).first() == Some(&id) => {
                    // never start a composite with whitespace
                    if parent == self.root {
                        let ws = self.new_leaf(NodeKind::Whitespace, text);
                        self.insert_before(id, ws);
                    } else {
                        self.upsert_whitespace_before(parent, text);
                    }
                }
                Some(_) => {
                    let ws = self.new_leaf(NodeKind::Whitespace, text);
                    self.insert_before(id, ws);
                }
                None => {}
            },
        }
    }

    /// Sets the whitespace directly after `id` to `text`.
    ///
    /// Mirror image of [`SyntaxTree::upsert_whitespace_before`].
    pub fn upsert_whitespace_after(&mut self, id: NodeId, text: &str) {
        if self.kind(id).is_whitespace() {
            self.replace_whitespace(id, text);
            return;
        }
        let next = if self.is_leaf(id) {
            self.next_sibling(id).or_else(|| self.next_leaf(id))
        } else {
            self.next_sibling(id)
        };
        match next {
            Some(n) if self.kind(n).is_whitespace() => self.replace_whitespace(n, text),
            _ if text.is_empty() => {}
            _ => match self.parent(id) {
                Some(parent) if self.children(parent).last() == Some(&id) => {
                    // never end a composite with whitespace
                    if parent == self.root {
                        let ws = self.new_leaf(NodeKind::Whitespace, text);
                        self.insert_after(id, ws);
                    } else {
                        self.upsert_whitespace_after(parent, text);
                    }
                }
                Some(_) => {
                    let ws = self.new_leaf(NodeKind::Whitespace, text);
                    self.insert_after(id, ws);
                }
                None => {}
            },
        }
    }

    fn replace_whitespace(&mut self, id: NodeId, text: &str) {
        if text.is_empty() {
            self.detach(id);
        } else {
            self.set_text(id, text);
        }
    }

    // --- layout ---

    fn layout(&self) -> &Layout {
        self.layout.get_or_init(|| self.compute_layout())
    }

    fn compute_layout(&self) -> Layout {
        let count = self.nodes.len();
        let mut starts = vec![DETACHED; count];
        let mut ends = vec![DETACHED; count];
        let mut leaf_pos = vec![DETACHED; count];
        let mut leaves = Vec::new();
        let mut text = String::new();

        let mut stack = vec![(self.root, false)];
        while let Some((id, exiting)) = stack.pop() {
            let i = id.index();
            if exiting {
                ends[i] = text.len();
                continue;
            }
            starts[i] = text.len();
            let data = &self.nodes[i];
            if let Some(own) = &data.text {
                text.push_str(own);
                ends[i] = text.len();
                leaf_pos[i] = leaves.len();
                leaves.push(id);
                continue;
            }
            stack.push((id, true));
            stack.extend(data.children.iter().rev().map(|&c| (c, false)));
        }

        Layout {
            starts,
            ends,
            leaves,
            leaf_pos,
            index: PositionIndex::new(text),
        }
    }
}
