//! Rule to wrap property declarations that exceed the max line length.
//!
//! # Rationale
//!
//! A property which does not fit on its line is broken after the `:` of its
//! name, or after the `=` before its initializer. The earliest break that
//! applies is made first and the line is measured again before the next one.
//!
//! A binary initializer is left to `binary-expression-wrapping` when that
//! rule runs as well.
//!
//! # Configuration
//!
//! Uses `max_line_length`, `indent_size` and `indent_style`.

use kolint_core::{
    BreakPoint, NodeId, NodeKind, Rule, RuleContext, RuleDescriptor, RuleId, WrapDecision,
    MAX_LINE_LENGTH_RULE_ID,
};
use tracing::trace;

use crate::binary_expression_wrapping;

/// Rule id of property-wrapping.
pub const ID: &str = "standard:property-wrapping";

/// Inserts missing newlines inside a property.
#[derive(Debug, Clone)]
pub struct PropertyWrapping {
    descriptor: RuleDescriptor,
}

impl Default for PropertyWrapping {
    fn default() -> Self {
        Self::new()
    }
}

impl PropertyWrapping {
    /// Creates a new rule.
    #[must_use]
    pub fn new() -> Self {
        Self {
            descriptor: RuleDescriptor::new(ID)
                .collaborator(MAX_LINE_LENGTH_RULE_ID)
                .collaborator(binary_expression_wrapping::ID),
        }
    }
}

fn is_left_to_binary_wrapping(decision: &WrapDecision, cx: &RuleContext<'_>) -> bool {
    let WrapDecision::Break(line_break) = decision else {
        return false;
    };
    if line_break.point != BreakPoint::AfterEq {
        return false;
    }
    let tree = cx.tree();
    let binary_initializer = tree
        .next_code_sibling(line_break.token)
        .is_some_and(|value| tree.kind(value) == NodeKind::BinaryExpression);
    let skip = binary_initializer && cx.is_collaborator_active(&RuleId::new(binary_expression_wrapping::ID));
    if skip {
        trace!(offset = line_break.offset, "Initializer is wrapped by binary-expression-wrapping");
    }
    skip
}

impl Rule for PropertyWrapping {
    fn descriptor(&self) -> &RuleDescriptor {
        &self.descriptor
    }

    fn description(&self) -> &'static str {
        "Wraps property declarations exceeding the max line length"
    }

    fn before_first_node(&self, cx: &mut RuleContext<'_>) {
        if cx.max_line_length().limit().is_none() {
            cx.stop_traversal();
        }
    }

    fn visit(&self, node: NodeId, cx: &mut RuleContext<'_>) {
        if cx.tree().kind(node) != NodeKind::Property {
            return;
        }
        let wrapper = cx.wrapper();
        let decision = wrapper.decide_declaration(cx.tree(), node);
        if is_left_to_binary_wrapping(&decision, cx) {
            return;
        }
        let tree = cx.tree();
        match &decision {
            WrapDecision::Fits => {}
            WrapDecision::Break(line_break) => {
                let message = format!("Missing newline after \"{}\"", tree.text(line_break.token));
                let offset = line_break.offset;
                cx.emit_with_fix(offset, message, |tree| {
                    wrapper.apply(tree, &decision);
                });
            }
            WrapDecision::Unwrappable { token, offset } => {
                let message = format!("Missing newline after \"{}\"", tree.text(*token));
                cx.emit(*offset, message);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary_expression_wrapping::BinaryExpressionWrapping;
    use crate::test_utils;
    use kolint_core::Settings;

    fn rules() -> Vec<kolint_core::RuleBox> {
        vec![Box::new(PropertyWrapping::new())]
    }

    fn settings() -> Settings {
        Settings::new().with_max_line_length(40)
    }

    #[test]
    fn type_is_moved_to_next_line_first() {
        let code = "val aVeryLongPropertyName: SomeVeryLongTypeName = createIt()\n";
        assert_eq!(
            test_utils::lint(rules(), code, &settings()),
            vec!["1:27: Missing newline after \":\""]
        );
        insta::assert_snapshot!(test_utils::format(rules(), code, &settings()), @r###"
        val aVeryLongPropertyName:
            SomeVeryLongTypeName = createIt()
        "###);
    }

    #[test]
    fn initializer_is_moved_to_next_line() {
        let code = "val name = someFunctionWithLongName(argument)\n";
        assert_eq!(
            test_utils::lint(rules(), code, &settings()),
            vec!["1:11: Missing newline after \"=\""]
        );
        insta::assert_snapshot!(test_utils::format(rules(), code, &settings()), @r###"
        val name =
            someFunctionWithLongName(argument)
        "###);
    }

    #[test]
    fn binary_initializer_is_left_to_binary_expression_wrapping() {
        let code = "val bar = leftHandSideExpression && rightHandSideExpression\n";
        let rules: Vec<kolint_core::RuleBox> = vec![
            Box::new(PropertyWrapping::new()),
            Box::new(BinaryExpressionWrapping::new()),
        ];
        let violations = test_utils::lint(rules, code, &settings());
        assert!(violations.iter().all(|v| !v.contains("Missing newline")), "{violations:?}");
    }

    #[test]
    fn binary_initializer_is_wrapped_without_binary_expression_wrapping() {
        let code = "val bar = leftHandSideExpression && rightHandSideExpression\n";
        assert_eq!(
            test_utils::lint(rules(), code, &settings()),
            vec!["1:10: Missing newline after \"=\""]
        );
    }
}
