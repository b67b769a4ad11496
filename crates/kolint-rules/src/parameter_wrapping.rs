//! Rule to wrap value parameters that exceed the max line length.
//!
//! # Rationale
//!
//! A parameter which does not fit on its line is broken after the `:` of its
//! name, or after the `=` before its default value.
//!
//! # Configuration
//!
//! Uses `max_line_length`, `indent_size` and `indent_style`.

use kolint_core::{NodeId, NodeKind, Rule, RuleContext, RuleDescriptor, WrapDecision, MAX_LINE_LENGTH_RULE_ID};

/// Rule id of parameter-wrapping.
pub const ID: &str = "standard:parameter-wrapping";

/// Inserts missing newlines inside a value parameter.
#[derive(Debug, Clone)]
pub struct ParameterWrapping {
    descriptor: RuleDescriptor,
}

impl Default for ParameterWrapping {
    fn default() -> Self {
        Self::new()
    }
}

impl ParameterWrapping {
    /// Creates a new rule.
    #[must_use]
    pub fn new() -> Self {
        Self {
            descriptor: RuleDescriptor::new(ID).collaborator(MAX_LINE_LENGTH_RULE_ID),
        }
    }
}

impl Rule for ParameterWrapping {
    fn descriptor(&self) -> &RuleDescriptor {
        &self.descriptor
    }

    fn description(&self) -> &'static str {
        "Wraps value parameters exceeding the max line length"
    }

    fn before_first_node(&self, cx: &mut RuleContext<'_>) {
        if cx.max_line_length().limit().is_none() {
            cx.stop_traversal();
        }
    }

    fn visit(&self, node: NodeId, cx: &mut RuleContext<'_>) {
        if cx.tree().kind(node) != NodeKind::ValueParameter {
            return;
        }
        let wrapper = cx.wrapper();
        let tree = cx.tree();
        let decision = wrapper.decide_declaration(tree, node);
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
