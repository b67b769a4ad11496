//! Rule to wrap binary expressions that exceed the max line length.
//!
//! # Rationale
//!
//! A long binary expression is easier to read when it is broken at an
//! operator instead of running past the right margin. Breaking the whole
//! expression away from an assignment or into its own argument line is
//! preferred over breaking it at an operator.
//!
//! # Behaviour
//!
//! In order, for every binary expression:
//!
//! 1. an initializer of a property or function that shares the line with `=`
//!    moves to the next line when that line is too long;
//! 2. an expression used as a call argument moves to the next line when it
//!    does not fit;
//! 3. a trailing lambda of a call on the left side gets its body on separate
//!    lines when the call does not fit;
//! 4. otherwise the expression is broken after its operator, or before `?:`.
//!
//! Each step measures the live tree, so a break made by an earlier step is
//! taken into account by the later ones.
//!
//! # Configuration
//!
//! Uses `max_line_length`, `indent_size` and `indent_style`. The rule does
//! nothing when the `max-line-length` rule is disabled.
//!
//! # Suppression
//!
//! - `@Suppress("ktlint:standard:binary-expression-wrapping")`
//! - `// ktlint-disable binary-expression-wrapping`

use kolint_core::{
    NodeId, NodeKind, Rule, RuleContext, RuleDescriptor, SyntaxTree, WrapDecision,
    MAX_LINE_LENGTH_RULE_ID,
};

/// Rule id of binary-expression-wrapping.
pub const ID: &str = "standard:binary-expression-wrapping";

const PREFIX: &str = "Line is exceeding max line length.";

/// Wraps binary expressions that do not fit on a line.
#[derive(Debug, Clone)]
pub struct BinaryExpressionWrapping {
    descriptor: RuleDescriptor,
}

impl Default for BinaryExpressionWrapping {
    fn default() -> Self {
        Self::new()
    }
}

impl BinaryExpressionWrapping {
    /// Creates a new rule.
    #[must_use]
    pub fn new() -> Self {
        Self {
            descriptor: RuleDescriptor::new(ID).collaborator(MAX_LINE_LENGTH_RULE_ID),
        }
    }
}

fn wrap_after_assignment(node: NodeId, cx: &mut RuleContext<'_>) {
    let tree = cx.tree();
    let Some(parent) = tree.parent(node) else {
        return;
    };
    if !matches!(tree.kind(parent), NodeKind::Property | NodeKind::Function) {
        return;
    }
    let Some(eq) = tree
        .prev_code_sibling(node)
        .filter(|&p| tree.kind(p) == NodeKind::Eq)
    else {
        return;
    };
    let wrapper = cx.wrapper();
    let same_line = tree
        .first_leaf(node)
        .is_some_and(|first| tree.no_newline_in_closed_range(eq, first));
    if !same_line || !wrapper.line_overflows(tree, node) {
        return;
    }
    let indent = wrapper.child_indent_of(tree, node);
    let offset = tree.start(node);
    cx.emit_with_fix(
        offset,
        format!("{PREFIX} Break line between assignment and expression"),
        |tree| tree.upsert_whitespace_before(node, &indent),
    );
}

fn wrap_argument(node: NodeId, cx: &mut RuleContext<'_>) {
    let tree = cx.tree();
    let is_argument = tree
        .parent(node)
        .is_some_and(|p| tree.kind(p) == NodeKind::ValueArgument);
    if !is_argument || starts_on_fresh_line(tree, node) {
        return;
    }
    let wrapper = cx.wrapper();
    if !wrapper.causes_overflow(tree, node) {
        return;
    }
    let indent = wrapper.child_indent_of(tree, node);
    let offset = tree.start(node);
    cx.emit_with_fix(
        offset,
        format!("{PREFIX} Break line before expression"),
        |tree| tree.upsert_whitespace_before(node, &indent),
    );
}

/// Puts the body of a trailing lambda of the left operand on its own
/// lines.
fn wrap_trailing_lambda(node: NodeId, cx: &mut RuleContext<'_>) {
    let tree = cx.tree();
    let Some(call) = tree
        .first_code_child(node)
        .filter(|&c| tree.kind(c) == NodeKind::CallExpression)
    else {
        return;
    };
    let wrapper = cx.wrapper();
    if !wrapper.causes_overflow(tree, call) {
        return;
    }
    let Some(lambda) = tree.find_child(call, NodeKind::LambdaExpression) else {
        return;
    };
    let (Some(lbrace), Some(rbrace)) = (
        tree.find_child(lambda, NodeKind::LBrace),
        tree.find_child(lambda, NodeKind::RBrace),
    ) else {
        return;
    };

    let body_broken = tree
        .next_leaf(lbrace)
        .is_some_and(|n| tree.is_whitespace_with_newline(n));
    if !body_broken {
        let indent = wrapper.child_indent_of(tree, lambda);
        let offset = tree.end(lbrace);
        cx.emit_with_fix(offset, "Newline expected after '{'", |tree| {
            tree.upsert_whitespace_after(lbrace, &indent);
        });
    }

    let tree = cx.tree();
    let closing_broken = tree
        .prev_leaf(rbrace)
        .is_some_and(|p| tree.is_whitespace_with_newline(p));
    if !closing_broken {
        let indent = tree
            .parent(node)
            .map_or_else(|| "\n".to_string(), |p| wrapper.sibling_indent_of(tree, p));
        let offset = tree.start(rbrace);
        cx.emit_with_fix(offset, "Newline expected before '}'", |tree| {
            tree.upsert_whitespace_before(rbrace, &indent);
        });
    }
}

fn wrap_at_operator(node: NodeId, cx: &mut RuleContext<'_>) {
    let wrapper = cx.wrapper();
    let tree = cx.tree();
    let decision = wrapper.decide_binary(tree, node);
    let (token, offset, fixable) = match &decision {
        WrapDecision::Fits => return,
        WrapDecision::Break(line_break) => (line_break.token, line_break.offset, true),
        WrapDecision::Unwrappable { token, offset } => (*token, *offset, false),
    };
    let operator = tree.text(token);
    let message = if operator == "?:" {
        format!("{PREFIX} Break line before '?:'")
    } else {
        format!("{PREFIX} Break line after '{operator}' in binary expression")
    };
    if fixable {
        cx.emit_with_fix(offset, message, |tree| {
            wrapper.apply(tree, &decision);
        });
    } else {
        cx.emit(offset, message);
    }
}

fn starts_on_fresh_line(tree: &SyntaxTree, node: NodeId) -> bool {
    tree.first_leaf(node)
        .and_then(|first| tree.prev_leaf(first))
        .is_some_and(|p| tree.is_whitespace_with_newline(p))
}

impl Rule for BinaryExpressionWrapping {
    fn descriptor(&self) -> &RuleDescriptor {
        &self.descriptor
    }

    fn description(&self) -> &'static str {
        "Wraps binary expressions exceeding the max line length"
    }

    fn before_first_node(&self, cx: &mut RuleContext<'_>) {
        if cx.max_line_length().limit().is_none() {
            cx.stop_traversal();
        }
    }

    fn visit(&self, node: NodeId, cx: &mut RuleContext<'_>) {
        if cx.tree().kind(node) != NodeKind::BinaryExpression {
            return;
        }
        wrap_after_assignment(node, cx);
        wrap_argument(node, cx);
        wrap_trailing_lambda(node, cx);
        wrap_at_operator(node, cx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;
    use kolint_core::Settings;

    fn lint(code: &str, max: usize) -> Vec<String> {
        let settings = Settings::new().with_max_line_length(max);
        test_utils::lint(vec![Box::new(BinaryExpressionWrapping::new())], code, &settings)
    }

    fn format(code: &str, max: usize) -> String {
        let settings = Settings::new().with_max_line_length(max);
        test_utils::format(vec![Box::new(BinaryExpressionWrapping::new())], code, &settings)
    }

    const ASSIGNMENT: &str = "val bar = leftHandSideExpression && rightHandSideExpression\n";

    #[test]
    fn assignment_and_operator_are_reported() {
        assert_eq!(
            lint(ASSIGNMENT, 55),
            vec![
                "1:11: Line is exceeding max line length. Break line between assignment and expression",
                "1:36: Line is exceeding max line length. Break line after '&&' in binary expression",
            ]
        );
    }

    #[test]
    fn assignment_break_resolves_the_operator_overflow() {
        insta::assert_snapshot!(format(ASSIGNMENT, 55), @r###"
        val bar =
            leftHandSideExpression && rightHandSideExpression
        "###);
    }

    #[test]
    fn fitting_expression_is_left_alone() {
        assert!(lint(ASSIGNMENT, 80).is_empty());
    }

    #[test]
    fn unlimited_line_length_never_wraps() {
        let settings = Settings::new()
            .with_max_line_length(20)
            .with_rule(MAX_LINE_LENGTH_RULE_ID, false);
        let violations = test_utils::lint(
            vec![Box::new(BinaryExpressionWrapping::new())],
            ASSIGNMENT,
            &settings,
        );
        assert!(violations.is_empty());
    }

    #[test]
    fn nested_expression_is_wrapped_outside_in() {
        let code = "fun foo() {\n    return (leftHandSide && rightHandSide) || (anotherOne && yetAnotherOne)\n}\n";
        insta::assert_snapshot!(format(code, 50), @r###"
        fun foo() {
            return (leftHandSide && rightHandSide) ||
                (anotherOne && yetAnotherOne)
        }
        "###);
    }

    #[test]
    fn elvis_breaks_before_operator() {
        let code = "fun foo() {\n    return someNullableValueWithLongName ?: fallback\n}\n";
        assert_eq!(
            lint(code, 50),
            vec!["2:42: Line is exceeding max line length. Break line before '?:'"]
        );
        insta::assert_snapshot!(format(code, 50), @r###"
        fun foo() {
            return someNullableValueWithLongName
                ?: fallback
        }
        "###);
    }

    #[test]
    fn argument_moves_to_its_own_line() {
        let code = "val x = fooBar(\"foooooooooooooooo\" + \"baaaaaaaaaaaaaaaar\")\n";
        insta::assert_snapshot!(format(code, 50), @r###"
        val x = fooBar(
            "foooooooooooooooo" + "baaaaaaaaaaaaaaaar")
        "###);
    }

    #[test]
    fn operator_beyond_limit_is_not_autocorrectable() {
        let code = "fun f() = someVeryLongReceiverName.someVeryLongFunctionName() && other\n";
        let settings = Settings::new().with_max_line_length(30);
        let tree = kolint_parser::parse(code).unwrap();
        let outcome = test_utils::engine(vec![Box::new(BinaryExpressionWrapping::new())])
            .lint(&tree, &settings);
        let operator = outcome
            .violations
            .iter()
            .find(|v| v.message.contains("'&&'"))
            .unwrap();
        assert!(!operator.can_be_autocorrected);
    }

    #[test]
    fn expressions_in_string_templates_are_ignored() {
        let code = "val s = \"${leftHandSideExpression && rightHandSideExpression}\"\n";
        let violations = lint(code, 40);
        assert!(violations.iter().all(|v| !v.contains("in binary expression")), "{violations:?}");
    }
}
