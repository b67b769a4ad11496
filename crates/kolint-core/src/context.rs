//! Context handed to a rule while it visits one file.

use std::collections::BTreeSet;

use tracing::trace;

use crate::rule::{RuleDescriptor, RuleId};
use crate::settings::{IndentConfig, MaxLineLength, Settings};
use crate::suppression::SuppressionResolver;
use crate::syntax::SyntaxTree;
use crate::types::Violation;
use crate::wrap::LineWrapper;

/// Access to the tree: shared during lint, exclusive during format.
pub(crate) enum TreeAccess<'a> {
    Shared(&'a SyntaxTree),
    Exclusive(&'a mut SyntaxTree),
}

impl TreeAccess<'_> {
    pub(crate) fn reborrow(&mut self) -> TreeAccess<'_> {
        match self {
            Self::Shared(tree) => TreeAccess::Shared(&**tree),
            Self::Exclusive(tree) => TreeAccess::Exclusive(&mut **tree),
        }
    }

    pub(crate) fn tree(&self) -> &SyntaxTree {
        match self {
            Self::Shared(tree) => *tree,
            Self::Exclusive(tree) => &**tree,
        }
    }
}

/// Everything a rule may read, plus the sink for its violations.
///
/// Suppressed emissions are dropped here, so rules never consult the
/// suppression resolver themselves.
pub struct RuleContext<'a> {
    tree: TreeAccess<'a>,
    settings: &'a Settings,
    descriptor: &'a RuleDescriptor,
    active_rules: &'a BTreeSet<RuleId>,
    suppression: &'a mut SuppressionResolver,
    violations: Vec<Violation>,
    mutated: bool,
    stopped: bool,
}

impl<'a> RuleContext<'a> {
    pub(crate) fn new(
        tree: TreeAccess<'a>,
        settings: &'a Settings,
        descriptor: &'a RuleDescriptor,
        active_rules: &'a BTreeSet<RuleId>,
        suppression: &'a mut SuppressionResolver,
    ) -> Self {
        Self {
            tree,
            settings,
            descriptor,
            active_rules,
            suppression,
            violations: Vec::new(),
            mutated: false,
            stopped: false,
        }
    }

    /// Returns the tree being visited.
    #[must_use]
    pub fn tree(&self) -> &SyntaxTree {
        self.tree.tree()
    }

    /// Returns the settings snapshot.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        self.settings
    }

    /// Returns the id of the running rule.
    #[must_use]
    pub fn rule_id(&self) -> &RuleId {
        &self.descriptor.id
    }

    /// Returns true when fixes are applied.
    #[must_use]
    pub fn is_formatting(&self) -> bool {
        matches!(self.tree, TreeAccess::Exclusive(_))
    }

    /// Returns true if `rule_id` runs on this file as well.
    #[must_use]
    pub fn is_collaborator_active(&self, rule_id: &RuleId) -> bool {
        self.active_rules.contains(rule_id)
    }

    /// Returns the line length wrapping must honour.
    #[must_use]
    pub fn max_line_length(&self) -> MaxLineLength {
        self.settings.max_line_length()
    }

    /// Returns the indentation unit.
    #[must_use]
    pub fn indent(&self) -> IndentConfig {
        self.settings.indent()
    }

    /// Returns a line wrapper configured from the settings.
    #[must_use]
    pub fn wrapper(&self) -> LineWrapper {
        LineWrapper::from_settings(self.settings)
    }

    /// Reports a violation that cannot be corrected automatically.
    pub fn emit(&mut self, offset: usize, message: impl Into<String>) {
        self.record(offset, message.into(), None::<fn(&mut SyntaxTree)>);
    }

    /// Reports a violation with a fix.
    ///
    /// The fix runs immediately when formatting and is dropped when linting.
    /// Returns true if the fix changed the tree.
    pub fn emit_with_fix<F>(&mut self, offset: usize, message: impl Into<String>, fix: F) -> bool
    where
        F: FnOnce(&mut SyntaxTree),
    {
        self.record(offset, message.into(), Some(fix))
    }

    /// Stops visiting further nodes of this file for the running rule.
    pub fn stop_traversal(&mut self) {
        self.stopped = true;
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub(crate) fn finish(self) -> (Vec<Violation>, bool) {
        (self.violations, self.mutated)
    }

    fn record<F>(&mut self, offset: usize, message: String, fix: Option<F>) -> bool
    where
        F: FnOnce(&mut SyntaxTree),
    {
        let rule_id = &self.descriptor.id;
        let tree = self.tree.tree();
        if self.suppression.is_suppressed_at(tree, offset, rule_id) {
            return false;
        }
        let position = tree.position(offset);
        let mut violation = Violation::new(rule_id.clone(), position.line, position.column, message)
            .with_offset(offset)
            .autocorrectable(fix.is_some());

        let mut applied = false;
        if let (TreeAccess::Exclusive(tree), Some(fix)) = (&mut self.tree, fix) {
            let revision = tree.revision();
            fix(&mut **tree);
            applied = tree.revision() != revision;
        }
        if applied {
            self.mutated = true;
            violation.corrected = true;
            trace!(rule = %violation.rule_id, line = violation.line, column = violation.column, "{}", violation.message);
        }
        self.violations.push(violation);
        applied
    }
}
