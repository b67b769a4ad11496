//! Rule to put every operand of a multiline logical condition on its own
//! line.
//!
//! # Rationale
//!
//! When a condition built from `&&` and `||` spans several lines, mixing
//! operands that share a line with operands that do not hides the
//! structure of the condition.
//!
//! This rule is experimental and only runs when experimental rules are
//! enabled.
//!
//! # Configuration
//!
//! Uses `indent_size` and `indent_style`.

use kolint_core::{NodeId, NodeKind, Rule, RuleContext, RuleDescriptor, SyntaxTree};

/// Rule id of condition-wrapping.
pub const ID: &str = "standard:condition-wrapping";

/// Requires a newline before each operand of a multiline condition.
#[derive(Debug, Clone)]
pub struct ConditionWrapping {
    descriptor: RuleDescriptor,
}

impl Default for ConditionWrapping {
    fn default() -> Self {
        Self::new()
    }
}

impl ConditionWrapping {
    /// Creates a new rule.
    #[must_use]
    pub fn new() -> Self {
        Self {
            descriptor: RuleDescriptor::new(ID).experimental(),
        }
    }
}

fn logical_operator(tree: &SyntaxTree, node: NodeId) -> Option<NodeId> {
    if tree.kind(node) != NodeKind::BinaryExpression {
        return None;
    }
    tree.find_child(node, NodeKind::OperationReference)
        .filter(|&op| matches!(tree.text(op), "&&" | "||"))
}

fn is_multiline_operand(tree: &SyntaxTree, operand: Option<NodeId>) -> bool {
    let Some(operand) = operand else {
        return false;
    };
    let (Some(first), Some(last)) = (tree.first_leaf(operand), tree.last_leaf(operand)) else {
        return false;
    };
    let mut leaf = Some(first);
    while let Some(current) = leaf {
        if tree.is_whitespace_with_newline(current) {
            return true;
        }
        if current == last {
            break;
        }
        leaf = tree.next_leaf(current);
    }
    false
}

fn is_multiline(tree: &SyntaxTree, node: NodeId) -> bool {
    if is_multiline_operand(tree, tree.first_code_child(node))
        || is_multiline_operand(tree, tree.last_code_child(node))
    {
        return true;
    }
    let mut current = Some(node);
    while let Some(binary) = current.filter(|&n| tree.kind(n) == NodeKind::BinaryExpression) {
        if tree
            .children(binary)
            .iter()
            .any(|&c| tree.is_whitespace_with_newline(c))
        {
            return true;
        }
        current = tree.parent(binary);
    }
    false
}

impl Rule for ConditionWrapping {
    fn descriptor(&self) -> &RuleDescriptor {
        &self.descriptor
    }

    fn description(&self) -> &'static str {
        "Requires each operand of a multiline condition on a separate line"
    }

    fn visit(&self, node: NodeId, cx: &mut RuleContext<'_>) {
        let tree = cx.tree();
        let Some(operator) = logical_operator(tree, node) else {
            return;
        };
        if !is_multiline(tree, node) {
            return;
        }
        let next = tree.next_sibling(operator);
        if next.is_some_and(|n| tree.is_whitespace_with_newline(n)) {
            return;
        }
        let offset = next
            .filter(|&n| tree.kind(n).is_whitespace())
            .map_or(tree.end(operator), |n| tree.end(n));
        let indent = cx.wrapper().child_indent_of(tree, node);
        cx.emit_with_fix(
            offset,
            "Newline expected before operand in multiline condition",
            |tree| tree.upsert_whitespace_after(operator, &indent),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;
    use kolint_core::Settings;

    fn settings() -> Settings {
        Settings::new().with_experimental(true)
    }

    #[test]
    fn operand_after_operator_on_same_line_is_reported() {
        let code = "val foo = bar1 &&\n    bar2 && bar3\n";
        assert_eq!(
            test_utils::lint(vec![Box::new(ConditionWrapping::new())], code, &settings()),
            vec!["2:13: Newline expected before operand in multiline condition"]
        );
        insta::assert_snapshot!(
            test_utils::format(vec![Box::new(ConditionWrapping::new())], code, &settings()),
            @r###"
        val foo = bar1 &&
            bar2 &&
            bar3
        "###
        );
    }

    #[test]
    fn every_operand_gets_its_own_line() {
        let code = "val foo =\n    bar1 || bar2 ||\n        baz1 || baz2 || baz3\n";
        assert_eq!(
            test_utils::lint(vec![Box::new(ConditionWrapping::new())], code, &settings()),
            vec![
                "2:13: Newline expected before operand in multiline condition",
                "3:17: Newline expected before operand in multiline condition",
                "3:25: Newline expected before operand in multiline condition",
            ]
        );
        insta::assert_snapshot!(
            test_utils::format(vec![Box::new(ConditionWrapping::new())], code, &settings()),
            @r###"
        val foo =
            bar1 ||
                bar2 ||
                baz1 ||
                baz2 ||
                baz3
        "###
        );
    }

    #[test]
    fn single_line_condition_is_allowed() {
        let code = "val foo = bar1 && bar2 || bar3\n";
        assert!(test_utils::lint(vec![Box::new(ConditionWrapping::new())], code, &settings()).is_empty());
    }

    #[test]
    fn rule_is_disabled_unless_experimental() {
        let code = "val foo = bar1 &&\n    bar2 && bar3\n";
        let engine = test_utils::engine(vec![Box::new(ConditionWrapping::new())]);
        assert!(engine.active_rule_ids(&Settings::new()).is_empty());
        let tree = kolint_parser::parse(code).unwrap();
        assert!(engine.lint(&tree, &Settings::new()).is_clean());
    }
}
