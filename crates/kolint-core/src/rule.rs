//! Rule trait and rule metadata.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::context::RuleContext;
use crate::syntax::NodeId;

/// Rule set of the built-in rules.
pub const STANDARD_RULE_SET: &str = "standard";

/// Qualified rule id of the form `rule-set:rule-name`.
///
/// Ids without a rule set are taken to belong to the `standard` set.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(String);

impl RuleId {
    /// Creates a qualified id, prefixing `standard:` when no rule set is given.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        if id.contains(':') {
            Self(id)
        } else {
            Self(format!("{STANDARD_RULE_SET}:{id}"))
        }
    }

    /// Returns the rule set part.
    #[must_use]
    pub fn rule_set(&self) -> &str {
        self.0.split_once(':').map_or(STANDARD_RULE_SET, |(set, _)| set)
    }

    /// Returns the rule name part.
    #[must_use]
    pub fn name(&self) -> &str {
        self.0.split_once(':').map_or(self.0.as_str(), |(_, name)| name)
    }

    /// Returns the qualified id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true for rules of the `standard` rule set.
    #[must_use]
    pub fn is_standard(&self) -> bool {
        self.rule_set() == STANDARD_RULE_SET
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RuleId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for RuleId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

/// How a run-after dependency behaves when the other rule is not active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunAfterMode {
    /// Skip this rule unless the other rule is loaded and enabled.
    OnlyWhenLoadedAndEnabled,
    /// Only order the rules; run this rule regardless.
    Regardless,
}

/// A dependency on another rule running earlier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunAfter {
    /// Rule that must run first.
    pub rule_id: RuleId,
    /// Behaviour when that rule is not active.
    pub mode: RunAfterMode,
}

/// Static metadata of a rule, fixed when the rule is constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleDescriptor {
    /// Qualified id.
    pub id: RuleId,
    /// Rules that must run before this one.
    pub run_after: Vec<RunAfter>,
    /// Rules that must run after this one.
    pub run_before: Vec<RuleId>,
    /// Whether the rule is ordered after all others where possible.
    pub run_as_late_as_possible: bool,
    /// Whether the rule is experimental and needs explicit opt-in.
    pub experimental: bool,
    /// Rules whose configuration this rule reads.
    pub collaborators: Vec<RuleId>,
    /// Foreign suppression names that also suppress this rule.
    pub aliases: Vec<String>,
}

impl RuleDescriptor {
    /// Creates a descriptor without ordering constraints.
    #[must_use]
    pub fn new(id: impl Into<RuleId>) -> Self {
        Self {
            id: id.into(),
            run_after: Vec::new(),
            run_before: Vec::new(),
            run_as_late_as_possible: false,
            experimental: false,
            collaborators: Vec::new(),
            aliases: Vec::new(),
        }
    }

    /// Requires `rule_id` to run first.
    #[must_use]
    pub fn run_after(mut self, rule_id: impl Into<RuleId>, mode: RunAfterMode) -> Self {
        self.run_after.push(RunAfter {
            rule_id: rule_id.into(),
            mode,
        });
        self
    }

    /// Requires `rule_id` to run later.
    #[must_use]
    pub fn run_before(mut self, rule_id: impl Into<RuleId>) -> Self {
        self.run_before.push(rule_id.into());
        self
    }

    /// Orders the rule after all others where possible.
    #[must_use]
    pub fn run_as_late_as_possible(mut self) -> Self {
        self.run_as_late_as_possible = true;
        self
    }

    /// Marks the rule experimental.
    #[must_use]
    pub fn experimental(mut self) -> Self {
        self.experimental = true;
        self
    }

    /// Declares a rule whose configuration this rule reads.
    #[must_use]
    pub fn collaborator(mut self, rule_id: impl Into<RuleId>) -> Self {
        self.collaborators.push(rule_id.into());
        self
    }

    /// Registers a foreign suppression name.
    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }
}

/// A lint rule that visits a syntax tree.
///
/// The same visitor serves lint and format. During lint the context holds a
/// shared tree and fixes passed to [`RuleContext::emit_with_fix`] are dropped.
/// During format the context holds the tree exclusively and fixes are
/// applied immediately, so later nodes see the corrected tree.
///
/// Rules are shared across threads and must not keep state between files.
///
/// # Example
///
/// ```
/// use kolint_core::{Rule, RuleContext, RuleDescriptor};
/// use kolint_core::syntax::{NodeId, NodeKind};
///
/// pub struct NoSemicolons {
///     descriptor: RuleDescriptor,
/// }
///
/// impl Rule for NoSemicolons {
///     fn descriptor(&self) -> &RuleDescriptor {
///         &self.descriptor
///     }
///
///     fn visit(&self, node: NodeId, cx: &mut RuleContext<'_>) {
///         if cx.tree().kind(node) == NodeKind::Semicolon {
///             let offset = cx.tree().start(node);
///             cx.emit_with_fix(offset, "Unnecessary semicolon", |tree| tree.detach(node));
///         }
///     }
/// }
/// ```
pub trait Rule: Send + Sync {
    /// Returns the rule metadata.
    fn descriptor(&self) -> &RuleDescriptor;

    /// Returns the qualified id.
    fn id(&self) -> &RuleId {
        &self.descriptor().id
    }

    /// Returns a brief description of what this rule checks.
    fn description(&self) -> &'static str {
        ""
    }

    /// Called once before the root is visited.
    fn before_first_node(&self, _cx: &mut RuleContext<'_>) {}

    /// Called for every attached node, parents before children.
    fn visit(&self, node: NodeId, cx: &mut RuleContext<'_>);

    /// Called for every node after its children were visited.
    fn after_visit(&self, _node: NodeId, _cx: &mut RuleContext<'_>) {}

    /// Called once after the whole tree was visited.
    fn after_last_node(&self, _cx: &mut RuleContext<'_>) {}
}

/// Type alias for boxed Rule trait objects.
pub type RuleBox = Box<dyn Rule>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unqualified_ids_belong_to_standard() {
        let id = RuleId::new("final-newline");
        assert_eq!(id.as_str(), "standard:final-newline");
        assert_eq!(id.rule_set(), "standard");
        assert_eq!(id.name(), "final-newline");
        assert!(id.is_standard());
    }

    #[test]
    fn qualified_ids_are_kept() {
        let id = RuleId::from("custom:no-foo");
        assert_eq!(id.rule_set(), "custom");
        assert_eq!(id.name(), "no-foo");
        assert!(!id.is_standard());
        assert_eq!(id.to_string(), "custom:no-foo");
    }

    #[test]
    fn descriptor_builder_collects_modifiers() {
        let descriptor = RuleDescriptor::new("chain-method-continuation")
            .run_after("argument-list-wrapping", RunAfterMode::Regardless)
            .run_before("max-line-length")
            .collaborator("max-line-length")
            .alias("ChainWrapping");
        assert_eq!(descriptor.run_after[0].rule_id.as_str(), "standard:argument-list-wrapping");
        assert_eq!(descriptor.run_before, vec![RuleId::new("max-line-length")]);
        assert_eq!(descriptor.collaborators.len(), 1);
        assert_eq!(descriptor.aliases, vec!["ChainWrapping".to_string()]);
        assert!(!descriptor.experimental);
    }
}
