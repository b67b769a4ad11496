//! Line length measurement.

use crate::syntax::{NodeId, NodeKind, SyntaxTree};

/// Measures physical lines of one tree revision.
pub(crate) struct Measure<'t> {
    tree: &'t SyntaxTree,
    ignore_back_ticked_identifier: bool,
}

impl<'t> Measure<'t> {
    pub(crate) fn new(tree: &'t SyntaxTree, ignore_back_ticked_identifier: bool) -> Self {
        Self {
            tree,
            ignore_back_ticked_identifier,
        }
    }

    /// Offset at which the code of `line` ends: before a trailing EOL comment
    /// and the blanks in front of it, or at the line terminator.
    pub(crate) fn content_end(&self, line: usize) -> usize {
        let index = self.tree.position_index();
        let (start, end) = (index.line_start(line), index.line_end(line));
        let mut leaf = self.tree.leaf_at(start);
        while let Some(current) = leaf {
            let leaf_start = self.tree.start(current);
            if leaf_start >= end {
                break;
            }
            if self.tree.kind(current) == NodeKind::EolComment && leaf_start >= start {
                return self
                    .tree
                    .prev_leaf(current)
                    .filter(|&p| self.tree.is_whitespace_without_newline(p) && self.tree.start(p) >= start)
                    .map_or(leaf_start, |p| self.tree.start(p));
            }
            leaf = self.tree.next_leaf(current);
        }
        end
    }

    /// Number of characters in `from..to`, without backticked identifiers
    /// when those are ignored.
    pub(crate) fn span_len(&self, from: usize, to: usize) -> usize {
        let text = self.tree.full_text();
        let Some(span) = text.get(from..to.max(from)) else {
            return 0;
        };
        let mut length = span.chars().count();
        if self.ignore_back_ticked_identifier && span.contains('`') {
            length -= self
                .tree
                .leaves()
                .iter()
                .filter(|&&leaf| {
                    self.tree.kind(leaf) == NodeKind::Identifier
                        && self.tree.start(leaf) >= from
                        && self.tree.end(leaf) <= to
                })
                .map(|&leaf| self.tree.text(leaf))
                .filter(|name| name.len() > 1 && name.starts_with('`') && name.ends_with('`'))
                .map(|name| name.chars().count())
                .sum::<usize>();
        }
        length
    }

    /// Length of `line` without its trailing EOL comment.
    pub(crate) fn line_length(&self, line: usize) -> usize {
        let start = self.tree.position_index().line_start(line);
        self.span_len(start, self.content_end(line))
    }

    /// Length of the line on which `offset` lies.
    pub(crate) fn line_length_at(&self, offset: usize) -> usize {
        self.line_length(self.tree.position_index().line_of(offset))
    }

    /// Length from the start of the line on which `node` starts through the
    /// end of `node`, capped at the end of that line's code.
    pub(crate) fn prefix_length(&self, node: NodeId) -> usize {
        self.prefix_length_until(node, self.tree.end(node))
    }

    /// Length from the start of the line on which `node` starts up to
    /// `offset`, capped at the end of that line's code.
    pub(crate) fn prefix_length_until(&self, node: NodeId, offset: usize) -> usize {
        self.line_prefix(self.tree.start(node), offset)
    }

    /// Length from the start of the line on which `at` lies up to `offset`,
    /// capped at the end of that line's code.
    pub(crate) fn line_prefix(&self, at: usize, offset: usize) -> usize {
        let index = self.tree.position_index();
        let line = index.line_of(at);
        let cut = offset.min(self.content_end(line));
        self.span_len(index.line_start(line), cut)
    }
}
