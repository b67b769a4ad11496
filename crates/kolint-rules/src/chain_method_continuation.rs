//! Rule to align chain operators of method chains.
//!
//! # Rationale
//!
//! A chain that is spread over several lines reads best when every chain
//! operator (`.` or `?.`) starts a line, followed directly by its selector.
//! A chain operator dangling at the end of a line hides the continuation.
//!
//! ```kotlin
//! // Bad
//! val x = a.
//!     b().
//!     c()
//!
//! // Good
//! val x = a
//!     .b()
//!     .c()
//! ```
//!
//! A chain is put on separate lines when any operator after the first is
//! already wrapped, when it does not fit on the line, or when it holds at
//! least `ktlint_chain_method_rule_force_multiline_when_chain_operator_count_greater_or_equal_than`
//! operators (default 4, `unset` disables the limit).
//!
//! Operators after a closing `)`, `}` or `]` that starts its own line stay on
//! the line of that closing element.
//!
//! # Suppression
//!
//! - `@Suppress("ktlint:standard:chain-method-continuation")`

use kolint_core::{NodeId, NodeKind, Rule, RuleContext, RuleDescriptor, SyntaxTree, MAX_LINE_LENGTH_RULE_ID};
use tracing::warn;

/// Rule id of chain-method-continuation.
pub const ID: &str = "standard:chain-method-continuation";

/// Property holding the operator count from which chains always wrap.
pub const FORCE_MULTILINE_PROPERTY: &str =
    "ktlint_chain_method_rule_force_multiline_when_chain_operator_count_greater_or_equal_than";

const DEFAULT_FORCE_MULTILINE: usize = 4;

/// Puts chain operators at the start of a line.
#[derive(Debug, Clone)]
pub struct ChainMethodContinuation {
    descriptor: RuleDescriptor,
}

impl Default for ChainMethodContinuation {
    fn default() -> Self {
        Self::new()
    }
}

impl ChainMethodContinuation {
    /// Creates a new rule.
    #[must_use]
    pub fn new() -> Self {
        Self {
            descriptor: RuleDescriptor::new(ID).collaborator(MAX_LINE_LENGTH_RULE_ID),
        }
    }
}

/// A method chain, outermost qualified expression first.
struct Chain {
    root: NodeId,
    /// Chain operators in source order.
    operators: Vec<NodeId>,
}

impl Chain {
    fn of(tree: &SyntaxTree, operator: NodeId) -> Option<Self> {
        let parent = tree.parent(operator)?;
        if !tree.kind(parent).is_qualified_expression() {
            return None;
        }
        let mut root = parent;
        while let Some(outer) = tree.parent(root) {
            if !tree.kind(outer).is_qualified_expression() || tree.first_code_child(outer) != Some(root) {
                break;
            }
            root = outer;
        }

        let mut operators = Vec::new();
        let mut current = root;
        while tree.kind(current).is_qualified_expression() {
            if let Some(op) = chain_operator(tree, current) {
                operators.push(op);
            }
            match tree.first_code_child(current) {
                Some(receiver) => current = receiver,
                None => break,
            }
        }
        operators.reverse();
        Some(Self { root, operators })
    }

    fn is_in_directive_or_template(&self, tree: &SyntaxTree) -> bool {
        tree.ancestors(self.root).any(|a| {
            matches!(
                tree.kind(a),
                NodeKind::ImportDirective | NodeKind::PackageDirective | NodeKind::StringTemplate
            )
        })
    }

    fn first_receiver(&self, tree: &SyntaxTree) -> Option<NodeId> {
        let first = *self.operators.first()?;
        tree.parent(first).and_then(|p| tree.first_code_child(p))
    }

    fn has_newline_before_first_operator(&self, tree: &SyntaxTree) -> bool {
        let Some(&first) = self.operators.first() else {
            return false;
        };
        self.first_receiver(tree).is_some_and(|r| tree.contains_newline(r))
            || is_preceded_by_newline(tree, first)
    }

    fn has_newline_between_operators(&self, tree: &SyntaxTree) -> bool {
        let count = self.operators.len();
        if count < 2 {
            return false;
        }
        self.operators.iter().any(|&op| is_preceded_by_newline(tree, op))
            || self.operators[..count - 1]
                .iter()
                .any(|&op| is_followed_by_newline(tree, op))
    }

    fn has_newline_after_last_operator(&self, tree: &SyntaxTree) -> bool {
        self.operators
            .last()
            .is_some_and(|&op| is_followed_by_newline(tree, op))
    }

    fn wrap_each_operator(&self, tree: &SyntaxTree, force_from: Option<usize>) -> bool {
        if self.has_newline_between_operators(tree) {
            return true;
        }
        let after_last = self.has_newline_after_last_operator(tree);
        let on_string = self
            .first_receiver(tree)
            .is_some_and(|r| tree.kind(r) == NodeKind::StringTemplate);
        if on_string && !after_last {
            return false;
        }
        if !self.has_newline_before_first_operator(tree) && !after_last {
            return force_from.is_some_and(|limit| self.operators.len() >= limit);
        }
        false
    }

    /// Returns true if the line of the chain overflows before the trailing
    /// lambda of the last call, or before the end of the chain.
    ///
    /// An operand of a binary expression is only measured once it starts
    /// its own line; until then the binary expression is wrapped first.
    fn exceeds_line(&self, cx: &RuleContext<'_>) -> bool {
        let tree = cx.tree();
        let in_binary = tree
            .parent(self.root)
            .is_some_and(|p| tree.kind(p) == NodeKind::BinaryExpression);
        if in_binary && !starts_own_line(tree, self.root) {
            return false;
        }
        let stop = self
            .operators
            .last()
            .and_then(|&op| tree.next_code_sibling(op))
            .filter(|&selector| tree.kind(selector) == NodeKind::CallExpression)
            .and_then(|call| tree.find_child(call, NodeKind::LambdaExpression))
            .and_then(|lambda| tree.find_child(lambda, NodeKind::LBrace))
            .map_or_else(|| tree.end(self.root), |brace| tree.start(brace));
        cx.wrapper().overflows_before(tree, self.root, stop)
    }
}

fn starts_own_line(tree: &SyntaxTree, node: NodeId) -> bool {
    tree.first_leaf(node)
        .and_then(|first| tree.prev_leaf(first))
        .is_some_and(|p| tree.is_whitespace_with_newline(p))
}

fn chain_operator(tree: &SyntaxTree, node: NodeId) -> Option<NodeId> {
    tree.children(node)
        .iter()
        .copied()
        .find(|&c| tree.kind(c).is_chain_operator())
}

fn is_preceded_by_newline(tree: &SyntaxTree, operator: NodeId) -> bool {
    let mut sibling = tree.prev_sibling(operator);
    while let Some(s) = sibling {
        if tree.is_whitespace_with_newline(s) {
            return true;
        }
        sibling = tree.prev_sibling(s);
    }
    false
}

fn is_followed_by_newline(tree: &SyntaxTree, operator: NodeId) -> bool {
    if tree
        .next_code_sibling(operator)
        .is_some_and(|selector| tree.contains_newline(selector))
    {
        return true;
    }
    let mut sibling = tree.next_sibling(operator);
    while let Some(s) = sibling {
        if tree.is_whitespace_with_newline(s) {
            return true;
        }
        sibling = tree.next_sibling(s);
    }
    false
}

/// `a.b` selecting a property from a plain reference, as in `com.example.Foo`.
fn is_reference(tree: &SyntaxTree, operator: NodeId) -> bool {
    let selects_identifier = tree
        .next_code_sibling(operator)
        .is_some_and(|s| tree.kind(s) == NodeKind::Identifier);
    if !selects_identifier {
        return false;
    }
    let mut receiver = tree.prev_code_sibling(operator);
    while let Some(r) = receiver {
        match tree.kind(r) {
            NodeKind::Identifier => return true,
            kind if kind.is_qualified_expression() => {
                let inner_selects_identifier = tree
                    .last_code_child(r)
                    .is_some_and(|s| tree.kind(s) == NodeKind::Identifier);
                if !inner_selects_identifier {
                    return false;
                }
                receiver = tree.first_code_child(r);
            }
            _ => return false,
        }
    }
    false
}

fn prev_non_whitespace_leaf(tree: &SyntaxTree, node: NodeId) -> Option<NodeId> {
    let mut leaf = tree.prev_leaf(node);
    while let Some(l) = leaf {
        if !tree.kind(l).is_whitespace() {
            return Some(l);
        }
        leaf = tree.prev_leaf(l);
    }
    None
}

/// Returns true if `operator` follows a closing element which starts its own
/// line, like the `}` of a multiline lambda.
fn follows_closing_element_on_own_line(tree: &SyntaxTree, operator: NodeId) -> bool {
    let Some(closing) = prev_non_whitespace_leaf(tree, operator) else {
        return false;
    };
    match tree.kind(closing) {
        NodeKind::RPar | NodeKind::RBrace => {}
        NodeKind::Punctuation if tree.text(closing) == "]" => {}
        NodeKind::StringLiteral => return tree.contains_newline(closing),
        _ => return false,
    }
    tree.prev_leaf(closing)
        .is_some_and(|p| tree.is_whitespace_with_newline(p))
}

fn force_multiline_from(cx: &RuleContext<'_>) -> Option<usize> {
    match cx.settings().property(FORCE_MULTILINE_PROPERTY) {
        Some("unset") => None,
        Some(value) => Some(value.trim().parse().unwrap_or_else(|_| {
            warn!(
                property = FORCE_MULTILINE_PROPERTY,
                value,
                "Invalid chain operator count, using {DEFAULT_FORCE_MULTILINE}"
            );
            DEFAULT_FORCE_MULTILINE
        })),
        None => Some(DEFAULT_FORCE_MULTILINE),
    }
}

fn fix_newline_before(operator: NodeId, wrap: bool, cx: &mut RuleContext<'_>) {
    let tree = cx.tree();
    let text = tree.text(operator).to_string();
    let previous = tree.prev_leaf(operator);
    let after_newline = previous.is_some_and(|p| tree.is_whitespace_with_newline(p));

    let offset = tree.start(operator);

    if follows_closing_element_on_own_line(tree, operator) {
        if let Some(whitespace) = previous.filter(|_| after_newline) {
            cx.emit_with_fix(
                offset,
                format!("Unexpected newline before '{text}'"),
                |tree| tree.detach(whitespace),
            );
        }
        return;
    }

    let has_comment = tree
        .parent(operator)
        .is_some_and(|p| tree.children(p).iter().any(|&c| tree.kind(c).is_comment()));
    if !wrap && !has_comment {
        return;
    }
    let needs_newline = previous.is_some_and(|p| {
        let kind = tree.kind(p);
        kind.is_code() || kind.is_comment() || tree.is_whitespace_without_newline(p)
    });
    if !needs_newline {
        return;
    }
    let Some(parent) = tree.parent(operator) else {
        return;
    };
    let indent = cx.wrapper().child_indent_of(tree, parent);
    cx.emit_with_fix(
        offset,
        format!("Expected newline before '{text}'"),
        |tree| tree.upsert_whitespace_before(operator, &indent),
    );
}

fn check_comment_after(operator: NodeId, cx: &mut RuleContext<'_>) {
    let tree = cx.tree();
    let mut sibling = tree.next_sibling(operator);
    while let Some(s) = sibling.filter(|&s| tree.kind(s).is_whitespace()) {
        sibling = tree.next_sibling(s);
    }
    if let Some(comment) = sibling.filter(|&s| tree.kind(s).is_comment()) {
        let offset = tree.start(comment);
        cx.emit(offset, "No comment expected at this location in method chain");
    }
}

fn fix_newline_after(operator: NodeId, cx: &mut RuleContext<'_>) {
    let tree = cx.tree();
    let Some(whitespace) = tree
        .next_leaf(operator)
        .filter(|&n| tree.is_whitespace_with_newline(n))
    else {
        return;
    };
    let message = format!("Unexpected newline after '{}'", tree.text(operator));
    let offset = tree.start(whitespace).saturating_sub(1);
    let before_comment = tree
        .next_leaf(whitespace)
        .is_some_and(|n| tree.kind(n).is_comment());
    if before_comment {
        cx.emit(offset, message);
    } else {
        cx.emit_with_fix(offset, message, |tree| tree.detach(whitespace));
    }
}

impl Rule for ChainMethodContinuation {
    fn descriptor(&self) -> &RuleDescriptor {
        &self.descriptor
    }

    fn description(&self) -> &'static str {
        "Requires chain operators at the start of a line in multiline method chains"
    }

    fn visit(&self, node: NodeId, cx: &mut RuleContext<'_>) {
        let tree = cx.tree();
        if !tree.kind(node).is_chain_operator() {
            return;
        }
        let Some(chain) = Chain::of(tree, node) else {
            return;
        };
        // a chain is handled once, from its first operator
        if chain.operators.first() != Some(&node) || chain.is_in_directive_or_template(tree) {
            return;
        }

        let wrap = chain.wrap_each_operator(tree, force_multiline_from(cx)) || chain.exceeds_line(cx);
        for &operator in &chain.operators {
            if !cx.tree().is_attached(operator) {
                continue;
            }
            if !is_reference(cx.tree(), operator) {
                fix_newline_before(operator, wrap, cx);
            }
            check_comment_after(operator, cx);
            fix_newline_after(operator, cx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;
    use kolint_core::Settings;

    fn rules() -> Vec<kolint_core::RuleBox> {
        vec![Box::new(ChainMethodContinuation::new())]
    }

    #[test]
    fn trailing_operators_move_to_the_next_line() {
        let code = "a.\n  b().\n  c()\n";
        assert_eq!(
            test_utils::lint(rules(), code, &Settings::new()),
            vec![
                "1:2: Expected newline before '.'",
                "1:2: Unexpected newline after '.'",
                "2:6: Expected newline before '.'",
                "2:6: Unexpected newline after '.'",
            ]
        );
        insta::assert_snapshot!(test_utils::format(rules(), code, &Settings::new()), @r###"
        a
            .b()
            .c()
        "###);
    }

    #[test]
    fn wrapped_chain_is_left_alone() {
        let code = "val x = a\n    .b()\n    .c()\n";
        assert!(test_utils::lint(rules(), code, &Settings::new()).is_empty());
    }

    #[test]
    fn short_chain_on_one_line_is_allowed() {
        let code = "val x = foo.bar().baz()\n";
        assert!(test_utils::lint(rules(), code, &Settings::new()).is_empty());
    }

    #[test]
    fn long_chain_is_always_wrapped() {
        let code = "val x = foo.bar().baz().qux().quux()\n";
        insta::assert_snapshot!(test_utils::format(rules(), code, &Settings::new()), @r###"
        val x = foo
            .bar()
            .baz()
            .qux()
            .quux()
        "###);
    }

    #[test]
    fn force_multiline_can_be_unset() {
        let code = "val x = foo.bar().baz().qux().quux()\n";
        let settings = Settings::new().with_property(FORCE_MULTILINE_PROPERTY, "unset");
        assert!(test_utils::lint(rules(), code, &settings).is_empty());
    }

    #[test]
    fn chain_exceeding_line_is_wrapped() {
        let code = "val result = someObject.someFunction().anotherFunction()\n";
        let settings = Settings::new().with_max_line_length(40);
        insta::assert_snapshot!(test_utils::format(rules(), code, &settings), @r###"
        val result = someObject
            .someFunction()
            .anotherFunction()
        "###);
    }

    #[test]
    fn operand_chain_waits_for_the_binary_break() {
        let code = "val m = mapOf(KEY to SOME_RECEIVER_NAME.toPropertyWithValue(SOME_VALUE))\n";
        let settings = Settings::new().with_max_line_length(40);
        assert!(test_utils::lint(rules(), code, &settings).is_empty());
    }

    #[test]
    fn operand_chain_on_its_own_line_is_wrapped() {
        let code = "val m = mapOf(\n    KEY to\n        SOME_RECEIVER_NAME.toPropertyWithValue(SOME_VALUE.toString()),\n)\n";
        let settings = Settings::new().with_max_line_length(60);
        insta::assert_snapshot!(test_utils::format(rules(), code, &settings), @r###"
        val m = mapOf(
            KEY to
                SOME_RECEIVER_NAME
                    .toPropertyWithValue(SOME_VALUE.toString()),
        )
        "###);
    }

    #[test]
    fn operator_joins_closing_brace_on_own_line() {
        let code = "val x = foo {\n    it\n}\n    .bar()\n";
        assert_eq!(
            test_utils::lint(rules(), code, &Settings::new()),
            vec!["4:5: Unexpected newline before '.'"]
        );
        insta::assert_snapshot!(test_utils::format(rules(), code, &Settings::new()), @r###"
        val x = foo {
            it
        }.bar()
        "###);
    }

    #[test]
    fn package_and_references_are_ignored() {
        let code = "package com.example.app\n\nval x = com.example.Foo.bar()\n";
        assert!(test_utils::lint(rules(), code, &Settings::new()).is_empty());
    }
}
