//! Rule to keep block comments apart from code on the same line.
//!
//! # Rationale
//!
//! A block comment followed by code on the same line is easily overlooked,
//! and a comment between two elements of one line splits the line in a way
//! that is hard to read.
//!
//! ```kotlin
//! // Bad
//! /* some comment */ val foo = "foo"
//!
//! // Good
//! /* some comment */
//! val foo = "foo"
//! ```
//!
//! Only code following a comment is moved to a new line. The other
//! placements are reported but left for manual correction.

use kolint_core::{NodeId, NodeKind, Rule, RuleContext, RuleDescriptor, SyntaxTree};

/// Rule id of comment-wrapping.
pub const ID: &str = "standard:comment-wrapping";

/// Requires a block comment to end its line.
#[derive(Debug, Clone)]
pub struct CommentWrapping {
    descriptor: RuleDescriptor,
}

impl Default for CommentWrapping {
    fn default() -> Self {
        Self::new()
    }
}

impl CommentWrapping {
    /// Creates a new rule.
    #[must_use]
    pub fn new() -> Self {
        Self {
            descriptor: RuleDescriptor::new(ID),
        }
    }
}

fn is_line_boundary(tree: &SyntaxTree, leaf: Option<NodeId>) -> bool {
    leaf.map_or(true, |l| tree.is_whitespace_with_newline(l))
}

impl Rule for CommentWrapping {
    fn descriptor(&self) -> &RuleDescriptor {
        &self.descriptor
    }

    fn description(&self) -> &'static str {
        "Disallows code after a block comment on the same line"
    }

    fn visit(&self, node: NodeId, cx: &mut RuleContext<'_>) {
        let tree = cx.tree();
        if tree.kind(node) != NodeKind::BlockComment {
            return;
        }
        let before = tree
            .prev_leaf(node)
            .filter(|&p| tree.is_whitespace_without_newline(p))
            .unwrap_or(node);
        let after = tree
            .next_leaf(node)
            .filter(|&n| tree.is_whitespace_without_newline(n))
            .unwrap_or(node);
        let previous = tree.prev_leaf(before);
        let next = tree.next_leaf(after);
        let offset = tree.start(node);

        if !is_line_boundary(tree, previous) && !is_line_boundary(tree, next) {
            if !tree.no_newline_in_closed_range(before, after) {
                cx.emit(
                    offset,
                    "A block comment starting on same line as another element and ending on another line before another element is disallowed",
                );
            } else {
                let in_braces = previous.is_some_and(|p| tree.kind(p) == NodeKind::LBrace)
                    && next.is_some_and(|n| tree.kind(n) == NodeKind::RBrace);
                if !in_braces {
                    cx.emit(offset, "A block comment in between other elements on the same line is disallowed");
                }
            }
            return;
        }

        if !is_line_boundary(tree, previous) && tree.contains_newline(node) {
            cx.emit(
                offset,
                "A block comment after any other element on the same line must be separated by a new line",
            );
        }

        let tree = cx.tree();
        if let Some(code) = next.filter(|&n| !tree.is_whitespace_with_newline(n)) {
            let indent = format!("\n{}", tree.line_indent(node));
            let offset = tree.start(code);
            cx.emit_with_fix(
                offset,
                "A block comment may not be followed by any other element on that same line",
                |tree| tree.upsert_whitespace_before(code, &indent),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;
    use kolint_core::Settings;

    fn lint(code: &str) -> Vec<String> {
        test_utils::lint(vec![Box::new(CommentWrapping::new())], code, &Settings::new())
    }

    fn format(code: &str) -> String {
        test_utils::format(vec![Box::new(CommentWrapping::new())], code, &Settings::new())
    }

    #[test]
    fn code_after_comment_moves_to_next_line() {
        let code = "fun f() {\n    /* some comment */ val x = 1\n}\n";
        assert_eq!(
            lint(code),
            vec!["2:24: A block comment may not be followed by any other element on that same line"]
        );
        insta::assert_snapshot!(format(code), @r###"
        fun f() {
            /* some comment */
            val x = 1
        }
        "###);
    }

    #[test]
    fn comment_ending_its_line_is_allowed() {
        assert!(lint("/* some comment */\nval foo = \"foo\"\n").is_empty());
        assert!(lint("val foo = \"foo\" /* some comment */\n").is_empty());
    }

    #[test]
    fn comment_between_elements_is_not_autocorrectable() {
        let code = "val foo /* some comment */ = \"foo\"\n";
        assert_eq!(
            lint(code),
            vec!["1:9: A block comment in between other elements on the same line is disallowed"]
        );
        assert_eq!(format(code), code);
    }

    #[test]
    fn comment_in_single_line_block_is_allowed() {
        assert!(lint("val foo = { /* no-op */ }\n").is_empty());
    }

    #[test]
    fn multiline_comment_after_code_is_reported() {
        let code = "val foo = \"foo\" /* some\n comment */\n";
        assert_eq!(
            lint(code),
            vec!["1:17: A block comment after any other element on the same line must be separated by a new line"]
        );
    }
}
