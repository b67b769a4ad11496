//! Suppression of rules by annotations and comment directives.
//!
//! A violation is dropped when the node it is reported on lies inside a
//! suppression scope that mentions the rule:
//!
//! - `@Suppress(...)`/`@SuppressWarnings(...)` on a class, function, property,
//!   parameter or annotated expression covers that element;
//! - `@file:Suppress(...)` covers the whole file and is consulted last;
//! - `ktlint-disable`/`ktlint-enable` comments (and formatter tags when
//!   enabled) cover an offset range.
//!
//! Annotation arguments are `"ktlint"` for every rule, `"ktlint:<id>"` for one
//! rule, or a foreign inspection name listed in [`SuppressionAliases`].

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;
use std::sync::Arc;

use crate::rule::RuleId;
use crate::syntax::{NodeId, NodeKind, SyntaxTree};
use crate::utils::{parse_directive, suppress_arguments, Directive};

const KTLINT: &str = "ktlint";

/// Foreign suppression names and the rules they stand for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuppressionAliases(BTreeMap<String, BTreeSet<RuleId>>);

impl SuppressionAliases {
    /// Returns the names understood out of the box.
    #[must_use]
    pub fn builtin() -> Self {
        let mut aliases = Self::default();
        for (alias, rule) in [
            ("EnumEntryName", "enum-entry-name-case"),
            ("RemoveCurlyBracesFromTemplate", "string-template"),
            ("ClassName", "class-naming"),
            ("FunctionName", "function-naming"),
            ("LocalVariableName", "backing-property-naming"),
            ("PackageName", "package-name"),
            ("PropertyName", "property-naming"),
            ("PropertyName", "backing-property-naming"),
            ("ConstPropertyName", "property-naming"),
            ("ObjectPropertyName", "property-naming"),
            ("ObjectPropertyName", "backing-property-naming"),
            ("PrivatePropertyName", "property-naming"),
            ("UnusedImport", "no-unused-imports"),
        ] {
            aliases.register(alias, RuleId::new(rule));
        }
        aliases
    }

    /// Maps `alias` to `rule_id` in addition to any existing mapping.
    pub fn register(&mut self, alias: impl Into<String>, rule_id: RuleId) {
        self.0.entry(alias.into()).or_default().insert(rule_id);
    }

    /// Returns the rules an alias stands for.
    #[must_use]
    pub fn get(&self, alias: &str) -> Option<&BTreeSet<RuleId>> {
        self.0.get(alias)
    }
}

/// Rules covered by one scope.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RuleSelection {
    All,
    Only(BTreeSet<RuleId>),
}

impl RuleSelection {
    fn from_ids(ids: &[String]) -> Self {
        if ids.is_empty() {
            Self::All
        } else {
            Self::Only(ids.iter().map(|id| RuleId::new(id.as_str())).collect())
        }
    }

    fn contains(&self, rule_id: &RuleId) -> bool {
        match self {
            Self::All => true,
            Self::Only(ids) => ids.contains(rule_id),
        }
    }
}

#[derive(Debug, Clone)]
struct RangeScope {
    range: Range<usize>,
    rules: RuleSelection,
}

/// Answers whether a rule is suppressed at a node.
///
/// Comment ranges are computed lazily and cached per tree revision.
#[derive(Debug, Clone)]
pub struct SuppressionResolver {
    aliases: Arc<SuppressionAliases>,
    formatter_tags: bool,
    ranges: Option<(u64, Vec<RangeScope>)>,
}

impl SuppressionResolver {
    /// Creates a resolver. `formatter_tags` enables `@formatter:off`/`on`.
    #[must_use]
    pub fn new(aliases: Arc<SuppressionAliases>, formatter_tags: bool) -> Self {
        Self {
            aliases,
            formatter_tags,
            ranges: None,
        }
    }

    /// Returns true if `rule_id` is suppressed at `node`.
    pub fn is_suppressed(&mut self, tree: &SyntaxTree, node: NodeId, rule_id: &RuleId) -> bool {
        self.is_suppressed_by_annotation(tree, node, rule_id)
            || self.is_suppressed_by_comment(tree, tree.start(node), rule_id)
    }

    /// Returns true if `rule_id` is suppressed at the leaf holding `offset`.
    pub fn is_suppressed_at(&mut self, tree: &SyntaxTree, offset: usize, rule_id: &RuleId) -> bool {
        let by_annotation = tree
            .leaf_at(offset)
            .is_some_and(|leaf| self.is_suppressed_by_annotation(tree, leaf, rule_id));
        by_annotation || self.is_suppressed_by_comment(tree, offset, rule_id)
    }

    fn is_suppressed_by_annotation(&self, tree: &SyntaxTree, node: NodeId, rule_id: &RuleId) -> bool {
        let root = tree.root();
        let declared = std::iter::once(node)
            .chain(tree.ancestors(node))
            .filter(|&owner| owner != root && tree.kind(owner).can_be_annotated())
            .any(|owner| self.mentions(tree, owner, rule_id));
        declared || self.mentions(tree, root, rule_id)
    }

    fn mentions(&self, tree: &SyntaxTree, owner: NodeId, rule_id: &RuleId) -> bool {
        suppress_arguments(tree, owner)
            .iter()
            .filter_map(|argument| self.selection_of_argument(argument))
            .any(|selection| selection.contains(rule_id))
    }

    fn selection_of_argument(&self, argument: &str) -> Option<RuleSelection> {
        if argument == KTLINT {
            return Some(RuleSelection::All);
        }
        if let Some(id) = argument.strip_prefix("ktlint:") {
            return Some(RuleSelection::Only(BTreeSet::from([RuleId::new(id)])));
        }
        self.aliases
            .get(argument)
            .map(|ids| RuleSelection::Only(ids.clone()))
    }

    fn is_suppressed_by_comment(&mut self, tree: &SyntaxTree, offset: usize, rule_id: &RuleId) -> bool {
        let stale = self
            .ranges
            .as_ref()
            .map_or(true, |(revision, _)| *revision != tree.revision());
        if stale {
            self.ranges = Some((tree.revision(), self.compute_ranges(tree)));
        }
        self.ranges.as_ref().is_some_and(|(_, scopes)| {
            scopes
                .iter()
                .any(|scope| scope.range.contains(&offset) && scope.rules.contains(rule_id))
        })
    }

    fn compute_ranges(&self, tree: &SyntaxTree) -> Vec<RangeScope> {
        let index = tree.position_index();
        let mut open: Vec<(usize, RuleSelection)> = Vec::new();
        let mut scopes = Vec::new();

        for &leaf in tree.leaves() {
            let kind = tree.kind(leaf);
            if !matches!(kind, NodeKind::EolComment | NodeKind::BlockComment) {
                continue;
            }
            let Some(directive) = parse_directive(tree.text(leaf), self.formatter_tags) else {
                continue;
            };
            let start = tree.start(leaf);
            match directive {
                Directive::Disable(ids) => {
                    let rules = RuleSelection::from_ids(&ids);
                    let line = index.line_of(start);
                    let before = index.text().get(index.line_start(line)..start).unwrap_or("");
                    if kind == NodeKind::EolComment && !before.trim().is_empty() {
                        scopes.push(RangeScope {
                            range: index.line_start(line)..index.line_end(line),
                            rules,
                        });
                    } else {
                        open.push((start, rules));
                    }
                }
                Directive::Enable(ids) => {
                    let rules = RuleSelection::from_ids(&ids);
                    if let Some(position) = open.iter().rposition(|(_, r)| *r == rules) {
                        let (from, rules) = open.remove(position);
                        scopes.push(RangeScope {
                            range: from..start,
                            rules,
                        });
                    }
                }
            }
        }

        let end = tree.text_len() + 1;
        scopes.extend(open.into_iter().map(|(from, rules)| RangeScope {
            range: from..end,
            rules,
        }));
        scopes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::TreeBuilder;

    fn resolver() -> SuppressionResolver {
        SuppressionResolver::new(Arc::new(SuppressionAliases::builtin()), true)
    }

    fn leaf_with_text(tree: &SyntaxTree, text: &str) -> NodeId {
        *tree
            .leaves()
            .iter()
            .find(|&&l| tree.text(l) == text)
            .unwrap()
    }

    fn property_with_annotation(builder: &mut TreeBuilder, argument: &str, name: &str) {
        builder.start_node(NodeKind::Property);
        builder.start_node(NodeKind::ModifierList);
        builder.start_node(NodeKind::Annotation);
        builder.token(NodeKind::At, "@");
        builder.token(NodeKind::Identifier, "Suppress");
        builder.start_node(NodeKind::ValueArgumentList);
        builder.token(NodeKind::LPar, "(");
        builder.start_node(NodeKind::ValueArgument);
        builder.token(NodeKind::StringLiteral, &format!("\"{argument}\""));
        builder.finish_node();
        builder.token(NodeKind::RPar, ")");
        builder.finish_node();
        builder.finish_node();
        builder.finish_node();
        builder.token(NodeKind::Whitespace, " ");
        builder.token(NodeKind::Keyword, "val");
        builder.token(NodeKind::Whitespace, " ");
        builder.token(NodeKind::Identifier, name);
        builder.finish_node();
    }

    #[test]
    fn annotation_covers_declaration_only() {
        let mut builder = TreeBuilder::new(NodeKind::File);
        property_with_annotation(&mut builder, "ktlint:max-line-length", "a");
        builder.token(NodeKind::Whitespace, "\n");
        builder.token(NodeKind::Identifier, "b");
        let tree = builder.finish();
        let rule = RuleId::new("max-line-length");
        let mut resolver = resolver();

        assert!(resolver.is_suppressed(&tree, leaf_with_text(&tree, "a"), &rule));
        assert!(!resolver.is_suppressed(&tree, leaf_with_text(&tree, "b"), &rule));
        assert!(!resolver.is_suppressed(
            &tree,
            leaf_with_text(&tree, "a"),
            &RuleId::new("final-newline")
        ));
    }

    #[test]
    fn bare_ktlint_suppresses_every_rule() {
        let mut builder = TreeBuilder::new(NodeKind::File);
        property_with_annotation(&mut builder, "ktlint", "a");
        let tree = builder.finish();
        let a = leaf_with_text(&tree, "a");
        assert!(resolver().is_suppressed(&tree, a, &RuleId::new("custom:anything")));
    }

    #[test]
    fn foreign_names_map_to_rules() {
        let mut builder = TreeBuilder::new(NodeKind::File);
        property_with_annotation(&mut builder, "PropertyName", "a");
        let tree = builder.finish();
        let a = leaf_with_text(&tree, "a");
        let mut resolver = resolver();
        assert!(resolver.is_suppressed(&tree, a, &RuleId::new("property-naming")));
        assert!(resolver.is_suppressed(&tree, a, &RuleId::new("backing-property-naming")));
        assert!(!resolver.is_suppressed(&tree, a, &RuleId::new("max-line-length")));
    }

    #[test]
    fn block_directive_covers_range_until_enable() {
        let mut builder = TreeBuilder::new(NodeKind::File);
        builder.token(NodeKind::Identifier, "a");
        builder.token(NodeKind::Whitespace, "\n");
        builder.token(NodeKind::BlockComment, "/* ktlint-disable final-newline */");
        builder.token(NodeKind::Whitespace, "\n");
        builder.token(NodeKind::Identifier, "b");
        builder.token(NodeKind::Whitespace, "\n");
        builder.token(NodeKind::BlockComment, "/* ktlint-enable final-newline */");
        builder.token(NodeKind::Whitespace, "\n");
        builder.token(NodeKind::Identifier, "c");
        let tree = builder.finish();
        let rule = RuleId::new("final-newline");
        let mut resolver = resolver();

        assert!(!resolver.is_suppressed(&tree, leaf_with_text(&tree, "a"), &rule));
        assert!(resolver.is_suppressed(&tree, leaf_with_text(&tree, "b"), &rule));
        assert!(!resolver.is_suppressed(&tree, leaf_with_text(&tree, "c"), &rule));
    }

    #[test]
    fn unclosed_block_extends_to_end_of_file() {
        let mut builder = TreeBuilder::new(NodeKind::File);
        builder.token(NodeKind::EolComment, "// ktlint-disable");
        builder.token(NodeKind::Whitespace, "\n");
        builder.token(NodeKind::Identifier, "b");
        let tree = builder.finish();
        let mut resolver = resolver();
        let rule = RuleId::new("final-newline");
        assert!(resolver.is_suppressed_at(&tree, tree.text_len(), &rule));
    }

    #[test]
    fn trailing_eol_directive_covers_its_line() {
        let mut builder = TreeBuilder::new(NodeKind::File);
        builder.token(NodeKind::Identifier, "a");
        builder.token(NodeKind::Whitespace, " ");
        builder.token(NodeKind::EolComment, "// ktlint-disable no-trailing-spaces");
        builder.token(NodeKind::Whitespace, "\n");
        builder.token(NodeKind::Identifier, "b");
        let tree = builder.finish();
        let rule = RuleId::new("no-trailing-spaces");
        let mut resolver = resolver();
        assert!(resolver.is_suppressed(&tree, leaf_with_text(&tree, "a"), &rule));
        assert!(!resolver.is_suppressed(&tree, leaf_with_text(&tree, "b"), &rule));
    }

    #[test]
    fn formatter_tags_suppress_everything_in_between() {
        let mut builder = TreeBuilder::new(NodeKind::File);
        builder.token(NodeKind::EolComment, "// @formatter:off");
        builder.token(NodeKind::Whitespace, "\n");
        builder.token(NodeKind::Identifier, "a");
        builder.token(NodeKind::Whitespace, "\n");
        builder.token(NodeKind::EolComment, "// @formatter:on");
        builder.token(NodeKind::Whitespace, "\n");
        builder.token(NodeKind::Identifier, "b");
        let tree = builder.finish();
        let rule = RuleId::new("max-line-length");
        let mut resolver = resolver();
        assert!(resolver.is_suppressed(&tree, leaf_with_text(&tree, "a"), &rule));
        assert!(!resolver.is_suppressed(&tree, leaf_with_text(&tree, "b"), &rule));
    }
}
