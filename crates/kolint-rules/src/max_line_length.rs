//! Rule to report lines exceeding the max line length.
//!
//! # Rationale
//!
//! Long lines are hard to read side by side and in reviews. The wrapping
//! rules fix most of them; what remains is reported by this rule, which
//! never corrects anything.
//!
//! Lines of package and import directives, KDoc, raw multiline strings, and
//! lines holding nothing but a comment or a single string are not reported.
//!
//! # Configuration
//!
//! - `max_line_length`: limit, `off` to disable
//! - `ktlint_ignore_back_ticked_identifier`: do not count backticked
//!   identifiers
//!
//! Disabling this rule also disables line wrapping in the other rules.

use kolint_core::{
    LineColumn, NodeId, NodeKind, Rule, RuleContext, RuleDescriptor, SyntaxTree,
    MAX_LINE_LENGTH_RULE_ID,
};

/// Rule id of max-line-length.
pub const ID: &str = MAX_LINE_LENGTH_RULE_ID;

/// Reports lines longer than `max_line_length`.
#[derive(Debug, Clone)]
pub struct MaxLineLengthRule {
    descriptor: RuleDescriptor,
}

impl Default for MaxLineLengthRule {
    fn default() -> Self {
        Self::new()
    }
}

impl MaxLineLengthRule {
    /// Creates a new rule.
    #[must_use]
    pub fn new() -> Self {
        Self {
            descriptor: RuleDescriptor::new(ID).run_as_late_as_possible(),
        }
    }
}

fn is_line_start(tree: &SyntaxTree, leaf: Option<NodeId>) -> bool {
    leaf.map_or(true, |l| tree.is_whitespace_with_newline(l))
}

fn is_raw_multiline_string(tree: &SyntaxTree, leaf: NodeId) -> bool {
    tree.kind(leaf) == NodeKind::StringLiteral
        && tree.text(leaf).starts_with("\"\"\"")
        && tree.contains_newline(leaf)
}

fn is_single_template_string(tree: &SyntaxTree, leaf: NodeId) -> bool {
    tree.parent(leaf)
        .filter(|&p| tree.kind(p) == NodeKind::StringTemplate)
        .is_some_and(|template| {
            let before = tree.first_leaf(template).and_then(|first| tree.prev_leaf(first));
            is_line_start(tree, before)
        })
}

fn is_exempt(tree: &SyntaxTree, leaf: NodeId) -> bool {
    let in_directive = tree.ancestors(leaf).any(|a| {
        matches!(tree.kind(a), NodeKind::PackageDirective | NodeKind::ImportDirective)
    });
    let kind = tree.kind(leaf);
    in_directive
        || kind == NodeKind::Kdoc
        || is_raw_multiline_string(tree, leaf)
        || is_single_template_string(tree, leaf)
        || (kind == NodeKind::Comma
            && tree
                .prev_leaf(leaf)
                .is_some_and(|p| is_single_template_string(tree, p)))
        || (kind.is_comment() && is_line_start(tree, tree.prev_leaf(leaf)))
}

impl Rule for MaxLineLengthRule {
    fn descriptor(&self) -> &RuleDescriptor {
        &self.descriptor
    }

    fn description(&self) -> &'static str {
        "Reports lines exceeding the max line length"
    }

    fn before_first_node(&self, cx: &mut RuleContext<'_>) {
        if cx.max_line_length().limit().is_none() {
            cx.stop_traversal();
        }
    }

    fn visit(&self, node: NodeId, cx: &mut RuleContext<'_>) {
        let tree = cx.tree();
        if !tree.is_leaf(node) || tree.kind(node).is_whitespace() {
            return;
        }
        let ends_line = tree
            .next_leaf(node)
            .map_or(true, |n| tree.is_whitespace_with_newline(n));
        let Some(limit) = cx.max_line_length().limit() else {
            return;
        };
        if !ends_line {
            return;
        }
        let index = tree.position_index();
        let line = index.line_of(tree.end(node));
        if cx.wrapper().full_line_length(tree, line) <= limit || is_exempt(tree, node) {
            return;
        }
        let offset = index
            .offset_of(LineColumn::new(line, limit + 1))
            .unwrap_or_else(|| index.line_end(line));
        cx.emit(offset, format!("Exceeded max line length ({limit})"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;
    use kolint_core::Settings;

    fn lint(code: &str, max: usize) -> Vec<String> {
        let settings = Settings::new().with_max_line_length(max);
        test_utils::lint(vec![Box::new(MaxLineLengthRule::new())], code, &settings)
    }

    #[test]
    fn long_line_is_reported() {
        let code = "fun main() {\n    println(\"a very long message\")\n}\n";
        assert_eq!(lint(code, 20), vec!["2:21: Exceeded max line length (20)"]);
    }

    #[test]
    fn short_lines_are_allowed() {
        assert!(lint("fun main() {\n    println(\"a\")\n}\n", 20).is_empty());
    }

    #[test]
    fn violation_is_not_autocorrectable() {
        let code = "val x = someVeryLongFunctionName()\n";
        let settings = Settings::new().with_max_line_length(10);
        let tree = kolint_parser::parse(code).unwrap();
        let outcome = test_utils::engine(vec![Box::new(MaxLineLengthRule::new())]).lint(&tree, &settings);
        assert_eq!(outcome.violations.len(), 1);
        assert!(!outcome.violations[0].can_be_autocorrected);
    }

    #[test]
    fn directives_and_comment_lines_are_ignored() {
        let code = "package com.example.some.very.long.package.name\n\nimport com.example.some.very.long.Name\n\n// a comment that is much longer than the limit\nval x = 1\n";
        assert!(lint(code, 20).is_empty());
    }

    #[test]
    fn line_with_only_a_string_is_ignored() {
        let code = "val x = listOf(\n    \"a string that is longer than the limit\",\n)\n";
        assert!(lint(code, 30).is_empty());
    }

    #[test]
    fn disabled_rule_does_not_report() {
        let settings = Settings::new()
            .with_max_line_length(10)
            .with_rule(MAX_LINE_LENGTH_RULE_ID, false);
        let code = "val x = someVeryLongFunctionName()\n";
        let violations = test_utils::lint(vec![Box::new(MaxLineLengthRule::new())], code, &settings);
        assert!(violations.is_empty());
    }

    #[test]
    fn back_ticked_identifiers_can_be_ignored() {
        let code = "fun `a test with a long descriptive name`() {}\n";
        let settings = Settings::new()
            .with_max_line_length(20)
            .with_ignore_back_ticked_identifier(true);
        let violations = test_utils::lint(vec![Box::new(MaxLineLengthRule::new())], code, &settings);
        assert!(violations.is_empty());
        assert_eq!(lint(code, 20).len(), 1);
    }
}
