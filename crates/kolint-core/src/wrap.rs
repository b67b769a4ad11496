//! Line-length constrained wrapping shared by the wrapping rules.
//!
//! [`LineWrapper::decide`] looks at a single node and tells where, if
//! anywhere, a line break must go so that the line holding the node's break
//! token fits the budget. Rules report each decision as a violation and
//! attach [`LineWrapper::apply`] as the fix. Because the engine visits
//! parents before children on the live tree, an outer break is applied
//! before inner nodes are measured. An inner break can push an outer
//! operator onto a later line; the next format pass picks it up.
//! [`LineWrapper::wrap`] runs the same process directly on a subtree and
//! repeats it until no break is added.
//!
//! Supported shapes:
//!
//! - binary expressions break after the operator and indent the right
//!   operand one level deeper; an elvis breaks before `?:`;
//! - call chains break before a `.` or `?.` that precedes a call;
//! - properties and value parameters break after `:` or after `=`.
//!
//! Operands that already start on a fresh line are left alone. String
//! literals are never split.

mod measure;

use crate::settings::{IndentConfig, MaxLineLength, Settings};
use crate::syntax::{NodeId, NodeKind, SyntaxTree};

use measure::Measure;

/// Upper bound of breaks applied to one node by [`LineWrapper::wrap`].
const MAX_BREAKS_PER_NODE: usize = 4;

/// Where a break goes relative to its token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakPoint {
    /// After a binary operator.
    AfterOperator,
    /// Before an elvis operator.
    BeforeOperator,
    /// Before a `.` or `?.` of a call chain.
    BeforeChainOperator,
    /// After the `:` of a declaration.
    AfterColon,
    /// After the `=` of a declaration.
    AfterEq,
}

/// A line break to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Break {
    /// Kind of break.
    pub point: BreakPoint,
    /// Operator, colon or equals sign the break belongs to.
    pub token: NodeId,
    /// Node in front of which the whitespace is set.
    pub anchor: NodeId,
    /// Offset at which the violation is reported.
    pub offset: usize,
    /// Whitespace to set, starting with a line break.
    pub indent: String,
    /// Indentation level of the continuation line.
    pub level: usize,
}

/// Outcome of [`LineWrapper::decide`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WrapDecision {
    /// No break is needed here.
    Fits,
    /// Insert a line break.
    Break(Break),
    /// The line overflows before the first possible break.
    Unwrappable {
        /// Token at which a break would have been made.
        token: NodeId,
        /// Offset at which the violation is reported.
        offset: usize,
    },
}

/// Summary of [`LineWrapper::wrap`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WrapReport {
    /// Number of breaks applied.
    pub breaks: usize,
    /// Offsets, in the final text, of overflows that could not be resolved.
    pub unwrappable: Vec<usize>,
}

/// Decides and applies line breaks for a line length budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineWrapper {
    budget: MaxLineLength,
    indent: IndentConfig,
    ignore_back_ticked_identifier: bool,
}

impl LineWrapper {
    /// Creates a wrapper for `budget` indenting with `indent`.
    #[must_use]
    pub fn new(budget: MaxLineLength, indent: IndentConfig) -> Self {
        Self {
            budget,
            indent,
            ignore_back_ticked_identifier: false,
        }
    }

    /// Creates a wrapper from the settings snapshot.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.max_line_length(), settings.indent())
            .ignore_back_ticked_identifier(settings.ignore_back_ticked_identifier)
    }

    /// Sets whether backticked identifiers count towards line length.
    #[must_use]
    pub fn ignore_back_ticked_identifier(mut self, ignore: bool) -> Self {
        self.ignore_back_ticked_identifier = ignore;
        self
    }

    /// Returns the budget.
    #[must_use]
    pub fn budget(&self) -> MaxLineLength {
        self.budget
    }

    fn measure<'t>(&self, tree: &'t SyntaxTree) -> Measure<'t> {
        Measure::new(tree, self.ignore_back_ticked_identifier)
    }

    fn exceeds(&self, length: usize) -> bool {
        self.budget.is_exceeded_by(length)
    }

    /// Returns the measured length of the line on which `node` starts.
    #[must_use]
    pub fn line_length(&self, tree: &SyntaxTree, node: NodeId) -> usize {
        self.measure(tree).line_length_at(tree.start(node))
    }

    /// Returns the measured length of the 1-based `line`, trailing comments
    /// included.
    #[must_use]
    pub fn full_line_length(&self, tree: &SyntaxTree, line: usize) -> usize {
        let index = tree.position_index();
        self.measure(tree)
            .span_len(index.line_start(line), index.line_end(line))
    }

    /// Returns true if the line on which `node` starts exceeds the budget.
    #[must_use]
    pub fn line_overflows(&self, tree: &SyntaxTree, node: NodeId) -> bool {
        self.exceeds(self.line_length(tree, node))
    }

    /// Returns true if the line exceeds the budget at or before the end of
    /// `node`.
    #[must_use]
    pub fn causes_overflow(&self, tree: &SyntaxTree, node: NodeId) -> bool {
        self.exceeds(self.measure(tree).prefix_length(node))
    }

    /// Returns true if the line on which `token` starts exceeds the budget at
    /// or before the end of `node`.
    #[must_use]
    pub fn overflows_on_line_of(&self, tree: &SyntaxTree, token: NodeId, node: NodeId) -> bool {
        self.exceeds(self.measure(tree).line_prefix(tree.start(token), tree.end(node)))
    }

    /// Returns true if the line on which `node` starts exceeds the budget
    /// before `offset`.
    #[must_use]
    pub fn overflows_before(&self, tree: &SyntaxTree, node: NodeId, offset: usize) -> bool {
        self.exceeds(self.measure(tree).prefix_length_until(node, offset))
    }

    /// Returns true if `node` fits on its first line.
    #[must_use]
    pub fn fits(&self, tree: &SyntaxTree, node: NodeId) -> bool {
        !self.causes_overflow(tree, node)
    }

    /// Returns a line break followed by the indentation of `node`'s line plus
    /// one level.
    #[must_use]
    pub fn child_indent_of(&self, tree: &SyntaxTree, node: NodeId) -> String {
        format!("\n{}{}", tree.line_indent(node), self.indent.unit())
    }

    /// Returns a line break followed by the indentation of `node`'s line.
    #[must_use]
    pub fn sibling_indent_of(&self, tree: &SyntaxTree, node: NodeId) -> String {
        format!("\n{}", tree.line_indent(node))
    }

    fn line_break(&self, point: BreakPoint, token: NodeId, anchor: NodeId, offset: usize, indent: String) -> WrapDecision {
        let level = self.indent.level_of(&indent);
        WrapDecision::Break(Break {
            point,
            token,
            anchor,
            offset,
            indent,
            level,
        })
    }

    /// Decides the break for one node by its shape.
    #[must_use]
    pub fn decide(&self, tree: &SyntaxTree, node: NodeId) -> WrapDecision {
        match tree.kind(node) {
            NodeKind::BinaryExpression => self.decide_binary(tree, node),
            kind if kind.is_qualified_expression() => self.decide_chain(tree, node),
            NodeKind::Property | NodeKind::ValueParameter => self.decide_declaration(tree, node),
            _ => WrapDecision::Fits,
        }
    }

    /// Returns true if `node` is the condition of an `if` whose last line
    /// overflows.
    #[must_use]
    pub fn condition_overflows(&self, tree: &SyntaxTree, node: NodeId) -> bool {
        tree.parent(node)
            .filter(|&p| tree.kind(p) == NodeKind::Condition)
            .is_some_and(|condition| {
                let end = tree.end(condition);
                self.exceeds(self.measure(tree).line_length_at(end))
            })
    }

    /// Decides the break of a binary expression.
    #[must_use]
    pub fn decide_binary(&self, tree: &SyntaxTree, node: NodeId) -> WrapDecision {
        let Some(operator) = tree.find_child(node, NodeKind::OperationReference) else {
            return WrapDecision::Fits;
        };
        if tree.ancestor_of_kind(node, NodeKind::StringTemplate).is_some() {
            return WrapDecision::Fits;
        }
        if !self.overflows_on_line_of(tree, operator, node) && !self.condition_overflows(tree, node) {
            return WrapDecision::Fits;
        }

        if tree.text(operator) == "?:" {
            let broken = tree
                .prev_leaf(operator)
                .is_some_and(|p| tree.is_whitespace_with_newline(p));
            if broken {
                return WrapDecision::Fits;
            }
            let before = tree.prev_code_sibling(operator).unwrap_or(operator);
            if self.causes_overflow(tree, before) {
                return WrapDecision::Unwrappable {
                    token: operator,
                    offset: tree.start(operator),
                };
            }
            let indent = self.child_indent_of(tree, operator);
            return self.line_break(BreakPoint::BeforeOperator, operator, operator, tree.start(operator), indent);
        }

        let Some(anchor) = tree.next_sibling(operator) else {
            return WrapDecision::Fits;
        };
        if tree.is_whitespace_with_newline(anchor) {
            return WrapDecision::Fits;
        }
        if self.causes_overflow(tree, operator) {
            return WrapDecision::Unwrappable {
                token: operator,
                offset: tree.end(operator),
            };
        }
        let indent = self.child_indent_of(tree, operator);
        self.line_break(BreakPoint::AfterOperator, operator, anchor, tree.end(operator), indent)
    }

    /// Decides the break of a dot-qualified or safe-access expression.
    #[must_use]
    pub fn decide_chain(&self, tree: &SyntaxTree, node: NodeId) -> WrapDecision {
        let Some(operator) = tree
            .children(node)
            .iter()
            .copied()
            .find(|&c| tree.kind(c).is_chain_operator())
        else {
            return WrapDecision::Fits;
        };
        let calls = tree
            .next_code_sibling(operator)
            .is_some_and(|s| tree.kind(s) == NodeKind::CallExpression);
        if !calls {
            return WrapDecision::Fits;
        }
        let broken = tree
            .prev_leaf(operator)
            .is_some_and(|p| tree.is_whitespace_with_newline(p));
        if broken {
            return WrapDecision::Fits;
        }

        let outermost = chain_root(tree, node);
        if !self.causes_overflow(tree, outermost) {
            return WrapDecision::Fits;
        }
        let receiver = tree.first_code_child(node).unwrap_or(node);
        if !tree.kind(receiver).is_qualified_expression() && self.causes_overflow(tree, receiver) {
            return WrapDecision::Unwrappable {
                token: operator,
                offset: tree.start(operator),
            };
        }
        let indent = self.child_indent_of(tree, outermost);
        self.line_break(BreakPoint::BeforeChainOperator, operator, operator, tree.start(operator), indent)
    }

    /// Decides the break of a property or value parameter.
    ///
    /// Candidates are tried from left to right: after `:` when the name
    /// and type do not fit, then after `=` when the value does not fit.
    #[must_use]
    pub fn decide_declaration(&self, tree: &SyntaxTree, node: NodeId) -> WrapDecision {
        let mut candidates = Vec::new();
        if let Some(colon) = tree.find_child(node, NodeKind::Colon) {
            let segment = tree.find_child(node, NodeKind::TypeReference).unwrap_or(colon);
            candidates.push((BreakPoint::AfterColon, colon, segment));
        }
        if let Some(eq) = tree.find_child(node, NodeKind::Eq) {
            let segment = tree.next_code_sibling(eq).unwrap_or(eq);
            candidates.push((BreakPoint::AfterEq, eq, segment));
        }

        for (point, token, segment) in candidates {
            let Some(anchor) = tree.next_sibling(token) else {
                continue;
            };
            if tree.is_whitespace_with_newline(anchor) || !self.causes_overflow(tree, segment) {
                continue;
            }
            if self.causes_overflow(tree, token) {
                return WrapDecision::Unwrappable {
                    token,
                    offset: tree.end(token),
                };
            }
            let indent = self.child_indent_of(tree, token);
            return self.line_break(point, token, anchor, tree.end(token), indent);
        }
        WrapDecision::Fits
    }

    /// Applies a break. Returns true if the tree changed.
    pub fn apply(&self, tree: &mut SyntaxTree, decision: &WrapDecision) -> bool {
        let WrapDecision::Break(line_break) = decision else {
            return false;
        };
        if !tree.is_attached(line_break.anchor) {
            return false;
        }
        let revision = tree.revision();
        tree.upsert_whitespace_before(line_break.anchor, &line_break.indent);
        tree.revision() != revision
    }

    /// Wraps `node` and its descendants, outermost first, re-measuring after
    /// every break.
    ///
    /// The subtree is walked again after any round that added a break, so an
    /// operator moved onto an overflowing line by an inner break is wrapped
    /// too. Only the last round's unresolved overflows are reported.
    pub fn wrap(&self, tree: &mut SyntaxTree, node: NodeId) -> WrapReport {
        let mut report = WrapReport::default();
        loop {
            let (breaks, unwrappable) = self.wrap_round(tree, node);
            report.breaks += breaks;
            if breaks == 0 {
                report.unwrappable = unwrappable
                    .into_iter()
                    .filter(|&token| tree.is_attached(token))
                    .map(|token| tree.end(token))
                    .collect();
                return report;
            }
        }
    }

    fn wrap_round(&self, tree: &mut SyntaxTree, node: NodeId) -> (usize, Vec<NodeId>) {
        let mut breaks = 0;
        let mut unwrappable = Vec::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            if !tree.is_attached(current) {
                continue;
            }
            for _ in 0..MAX_BREAKS_PER_NODE {
                let decision = self.decide(tree, current);
                match decision {
                    WrapDecision::Fits => break,
                    WrapDecision::Unwrappable { token, .. } => {
                        unwrappable.push(token);
                        break;
                    }
                    WrapDecision::Break(_) => {
                        if !self.apply(tree, &decision) {
                            break;
                        }
                        breaks += 1;
                    }
                }
            }
            stack.extend(tree.children(current).iter().rev().copied());
        }
        (breaks, unwrappable)
    }
}

/// Returns the outermost qualified expression of which `node` is the
/// receiver chain.
fn chain_root(tree: &SyntaxTree, node: NodeId) -> NodeId {
    let mut current = node;
    while let Some(parent) = tree.parent(current) {
        let is_receiver = tree.kind(parent).is_qualified_expression()
            && tree.first_code_child(parent) == Some(current);
        if !is_receiver {
            break;
        }
        current = parent;
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::TreeBuilder;

    fn wrapper(max: usize) -> LineWrapper {
        LineWrapper::new(MaxLineLength::Limited(max), IndentConfig::default())
    }

    /// `val bar = left && right`
    fn assignment(left: &str, right: &str) -> SyntaxTree {
        let mut builder = TreeBuilder::new(NodeKind::File);
        builder.start_node(NodeKind::Property);
        builder.token(NodeKind::Keyword, "val");
        builder.token(NodeKind::Whitespace, " ");
        builder.token(NodeKind::Identifier, "bar");
        builder.token(NodeKind::Whitespace, " ");
        builder.token(NodeKind::Eq, "=");
        builder.token(NodeKind::Whitespace, " ");
        builder.start_node(NodeKind::BinaryExpression);
        builder.token(NodeKind::Identifier, left);
        builder.token(NodeKind::Whitespace, " ");
        builder.token(NodeKind::OperationReference, "&&");
        builder.token(NodeKind::Whitespace, " ");
        builder.token(NodeKind::Identifier, right);
        builder.finish_node();
        builder.finish_node();
        builder.finish()
    }

    /// `val x = a + b + c`, parsed left-associatively.
    fn sum(operands: [&str; 3]) -> SyntaxTree {
        let mut builder = TreeBuilder::new(NodeKind::File);
        builder.start_node(NodeKind::Property);
        builder.token(NodeKind::Keyword, "val");
        builder.token(NodeKind::Whitespace, " ");
        builder.token(NodeKind::Identifier, "x");
        builder.token(NodeKind::Whitespace, " ");
        builder.token(NodeKind::Eq, "=");
        builder.token(NodeKind::Whitespace, " ");
        builder.start_node(NodeKind::BinaryExpression);
        builder.start_node(NodeKind::BinaryExpression);
        builder.token(NodeKind::Identifier, operands[0]);
        builder.token(NodeKind::Whitespace, " ");
        builder.token(NodeKind::OperationReference, "+");
        builder.token(NodeKind::Whitespace, " ");
        builder.token(NodeKind::Identifier, operands[1]);
        builder.finish_node();
        builder.token(NodeKind::Whitespace, " ");
        builder.token(NodeKind::OperationReference, "+");
        builder.token(NodeKind::Whitespace, " ");
        builder.token(NodeKind::Identifier, operands[2]);
        builder.finish_node();
        builder.finish_node();
        builder.finish()
    }

    fn find(tree: &SyntaxTree, kind: NodeKind) -> NodeId {
        tree.descendants(tree.root())
            .into_iter()
            .find(|&n| tree.kind(n) == kind)
            .unwrap()
    }

    #[test]
    fn short_binary_fits() {
        let tree = assignment("a", "b");
        let binary = find(&tree, NodeKind::BinaryExpression);
        assert_eq!(wrapper(40).decide(&tree, binary), WrapDecision::Fits);
    }

    #[test]
    fn binary_breaks_after_operator() {
        let tree = assignment("leftHandSideExpression", "rightHandSideExpression");
        let binary = find(&tree, NodeKind::BinaryExpression);
        let WrapDecision::Break(line_break) = wrapper(50).decide(&tree, binary) else {
            panic!("expected a break");
        };
        assert_eq!(line_break.point, BreakPoint::AfterOperator);
        assert_eq!(tree.position(line_break.offset).column, 36);
        assert_eq!(line_break.indent, "\n    ");
        assert_eq!(line_break.level, 1);
    }

    #[test]
    fn operator_beyond_budget_is_unwrappable() {
        let tree = assignment("leftHandSideExpression", "rightHandSideExpression");
        let binary = find(&tree, NodeKind::BinaryExpression);
        assert!(matches!(
            wrapper(30).decide(&tree, binary),
            WrapDecision::Unwrappable { .. }
        ));
    }

    #[test]
    fn declaration_breaks_after_eq_when_value_overflows() {
        let tree = assignment("leftHandSideExpression", "rightHandSideExpression");
        let property = find(&tree, NodeKind::Property);
        let WrapDecision::Break(line_break) = wrapper(50).decide(&tree, property) else {
            panic!("expected a break");
        };
        assert_eq!(line_break.point, BreakPoint::AfterEq);
        assert_eq!(tree.position(line_break.offset).column, 10);
    }

    #[test]
    fn wrap_makes_every_line_fit() {
        let mut tree = assignment("leftHandSideExpression", "rightHandSideExpression");
        let root = tree.root();
        let report = wrapper(32).wrap(&mut tree, root);
        assert_eq!(
            tree.render(),
            "val bar =\n    leftHandSideExpression &&\n        rightHandSideExpression"
        );
        assert_eq!(report.breaks, 2);
        assert!(report.unwrappable.is_empty());
        assert!(tree.render().lines().all(|line| line.chars().count() <= 32));
    }

    #[test]
    fn wrap_revisits_operators_moved_by_inner_breaks() {
        let mut tree = sum(["aaaaaaaaaaaaaaaa", "bbbbbbbbbbbbbbbbbbbbbb", "ccccccccccccccccccc"]);
        let root = tree.root();
        let report = wrapper(40).wrap(&mut tree, root);
        assert_eq!(
            tree.render(),
            "val x =\n    aaaaaaaaaaaaaaaa +\n        bbbbbbbbbbbbbbbbbbbbbb +\n            ccccccccccccccccccc"
        );
        assert_eq!(report.breaks, 3);
        assert!(report.unwrappable.is_empty());
        assert!(tree.render().lines().all(|line| line.chars().count() <= 40));
    }

    #[test]
    fn operator_on_a_later_line_is_measured_on_that_line() {
        let mut tree = sum(["aaaaaaaaaaaaaaaa", "bbbbbbbbbbbbbbbbbbbbbb", "ccccccccccccccccccc"]);
        let inner = tree
            .descendants(tree.root())
            .into_iter()
            .filter(|&n| tree.kind(n) == NodeKind::BinaryExpression)
            .nth(1)
            .unwrap();
        let operator = tree.find_child(inner, NodeKind::OperationReference).unwrap();
        let anchor = tree.next_sibling(operator).unwrap();
        tree.upsert_whitespace_before(anchor, "\n    ");

        let outer = find(&tree, NodeKind::BinaryExpression);
        let WrapDecision::Break(line_break) = wrapper(40).decide(&tree, outer) else {
            panic!("expected a break");
        };
        assert_eq!(line_break.point, BreakPoint::AfterOperator);
        assert_eq!(tree.position(line_break.offset).line, 2);
    }

    #[test]
    fn wrap_is_a_no_op_when_everything_fits() {
        let mut tree = assignment("a", "b");
        let root = tree.root();
        let revision = tree.revision();
        assert_eq!(wrapper(80).wrap(&mut tree, root), WrapReport::default());
        assert_eq!(tree.revision(), revision);
    }

    #[test]
    fn unlimited_budget_never_breaks() {
        let tree = assignment("leftHandSideExpression", "rightHandSideExpression");
        let binary = find(&tree, NodeKind::BinaryExpression);
        let unlimited = LineWrapper::new(MaxLineLength::Unlimited, IndentConfig::default());
        assert_eq!(unlimited.decide(&tree, binary), WrapDecision::Fits);
    }
}
