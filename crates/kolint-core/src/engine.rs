//! Rule engine orchestrating lint and format runs.

use std::any::Any;
use std::collections::BTreeSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::context::{RuleContext, TreeAccess};
use crate::rule::{Rule, RuleBox, RuleId};
use crate::settings::Settings;
use crate::sorter::{active_rules, sort_rules};
use crate::suppression::{SuppressionAliases, SuppressionResolver};
use crate::syntax::{NodeId, SyntaxTree};
use crate::types::{sort_violations, FormatOutcome, LintOutcome, RuleFault, Violation};

/// Default upper bound of format passes per file.
pub const DEFAULT_MAX_FORMAT_PASSES: usize = 3;

/// Name used for trees that do not come from a file.
pub const STDIN_FILE: &str = "<stdin>";

/// Errors reported by the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A rule must run before or after itself.
    #[error("Rule '{rule_id}' refers to itself in its run-after or run-before constraints")]
    SelfReferencingRule {
        /// The offending rule.
        rule_id: RuleId,
    },

    /// Two loaded rules share an id.
    #[error("Rule '{rule_id}' is loaded more than once")]
    DuplicateRule {
        /// The duplicated id.
        rule_id: RuleId,
    },

    /// The ordering constraints cannot be satisfied.
    #[error("Found cyclic dependencies between rules: {}", rules.join(", "))]
    RuleOrderingCycle {
        /// Rules involved in the cycle.
        rules: Vec<String>,
    },

    /// Formatting kept changing the file until the pass limit.
    #[error("Format of {file} did not converge after {passes} passes")]
    NonConvergent {
        /// File being formatted.
        file: String,
        /// Passes that ran.
        passes: usize,
    },

    /// The caller cancelled the run.
    #[error("Format was cancelled")]
    Cancelled,
}

/// Cooperative cancellation checked between format passes.
#[derive(Debug, Default)]
pub struct CancelFlag(AtomicBool);

impl CancelFlag {
    /// Creates a flag that is not set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Returns true if cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Builder for configuring a [`RuleEngine`].
#[derive(Default)]
pub struct RuleEngineBuilder {
    rules: Vec<RuleBox>,
    max_format_passes: Option<usize>,
}

impl RuleEngineBuilder {
    /// Creates a new builder without rules.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule.
    #[must_use]
    pub fn rule<R: Rule + 'static>(mut self, rule: R) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Adds a boxed rule.
    #[must_use]
    pub fn rule_box(mut self, rule: RuleBox) -> Self {
        self.rules.push(rule);
        self
    }

    /// Adds multiple boxed rules.
    #[must_use]
    pub fn rules<I>(mut self, rules: I) -> Self
    where
        I: IntoIterator<Item = RuleBox>,
    {
        self.rules.extend(rules);
        self
    }

    /// Sets the upper bound of format passes per file.
    #[must_use]
    pub fn max_format_passes(mut self, passes: usize) -> Self {
        self.max_format_passes = Some(passes.max(1));
        self
    }

    /// Orders the rules and builds the engine.
    ///
    /// # Errors
    ///
    /// Returns an error if the rule ordering constraints are inconsistent.
    pub fn build(self) -> Result<RuleEngine, EngineError> {
        let order = sort_rules(&self.rules)?;
        let mut slots: Vec<Option<RuleBox>> = self.rules.into_iter().map(Some).collect();
        let rules: Vec<RuleBox> = order.iter().filter_map(|&i| slots[i].take()).collect();

        let mut aliases = SuppressionAliases::builtin();
        for rule in &rules {
            for alias in &rule.descriptor().aliases {
                aliases.register(alias.clone(), rule.id().clone());
            }
        }

        Ok(RuleEngine {
            order: (0..rules.len()).collect(),
            rules,
            max_format_passes: self.max_format_passes.unwrap_or(DEFAULT_MAX_FORMAT_PASSES),
            aliases: Arc::new(aliases),
        })
    }
}

/// Runs rules over syntax trees.
///
/// The engine is immutable once built and can be shared across threads; each
/// call works on one tree only.
///
/// # Example
///
/// ```
/// use kolint_core::{RuleEngine, Settings, SyntaxTree};
/// use kolint_core::syntax::NodeKind;
///
/// let engine = RuleEngine::builder().build()?;
/// let tree = SyntaxTree::new(NodeKind::File);
/// let outcome = engine.lint(&tree, &Settings::default());
/// assert!(outcome.is_clean());
/// # Ok::<(), kolint_core::EngineError>(())
/// ```
pub struct RuleEngine {
    /// Rules in execution order.
    rules: Vec<RuleBox>,
    order: Vec<usize>,
    max_format_passes: usize,
    aliases: Arc<SuppressionAliases>,
}

struct PassResult {
    violations: Vec<Violation>,
    faults: Vec<RuleFault>,
    mutated: bool,
}

enum Step {
    Enter(NodeId),
    Exit(NodeId),
}

impl RuleEngine {
    /// Creates a builder.
    #[must_use]
    pub fn builder() -> RuleEngineBuilder {
        RuleEngineBuilder::new()
    }

    /// Returns the loaded rules in execution order.
    pub fn rules(&self) -> impl Iterator<Item = &dyn Rule> {
        self.rules.iter().map(|rule| rule.as_ref())
    }

    /// Returns the upper bound of format passes per file.
    #[must_use]
    pub fn max_format_passes(&self) -> usize {
        self.max_format_passes
    }

    /// Returns the ids of the rules that run under `settings`, in order.
    #[must_use]
    pub fn active_rule_ids(&self, settings: &Settings) -> Vec<RuleId> {
        active_rules(&self.rules, &self.order, settings)
            .into_iter()
            .map(|i| self.rules[i].id().clone())
            .collect()
    }

    /// Lints a tree that does not come from a file.
    #[must_use]
    pub fn lint(&self, tree: &SyntaxTree, settings: &Settings) -> LintOutcome {
        self.lint_file(STDIN_FILE, tree, settings)
    }

    /// Lints `tree`. The tree is never changed.
    #[must_use]
    pub fn lint_file(&self, file: &str, tree: &SyntaxTree, settings: &Settings) -> LintOutcome {
        let active = active_rules(&self.rules, &self.order, settings);
        debug!(file, rules = active.len(), "Linting");
        let mut resolver = self.resolver(settings);
        let mut pass = self.run_pass(file, TreeAccess::Shared(tree), settings, &active, &mut resolver);
        sort_violations(&mut pass.violations);
        LintOutcome {
            violations: pass.violations,
            faults: pass.faults,
        }
    }

    /// Formats a tree that does not come from a file.
    ///
    /// # Errors
    ///
    /// See [`RuleEngine::format_file`].
    pub fn format(&self, tree: &mut SyntaxTree, settings: &Settings) -> Result<FormatOutcome, EngineError> {
        self.format_file(STDIN_FILE, tree, settings, None)
    }

    /// Formats a tree, checking `cancel` between passes.
    ///
    /// # Errors
    ///
    /// See [`RuleEngine::format_file`].
    pub fn format_with_cancel(
        &self,
        tree: &mut SyntaxTree,
        settings: &Settings,
        cancel: &CancelFlag,
    ) -> Result<FormatOutcome, EngineError> {
        self.format_file(STDIN_FILE, tree, settings, Some(cancel))
    }

    /// Formats `tree` until a pass applies no fix.
    ///
    /// Passes run on a copy that replaces `tree` only on success. A rule that
    /// panics has its changes of that pass rolled back and is recorded in
    /// [`FormatOutcome::faults`]; the other rules keep running.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NonConvergent`] if fixable violations remain
    /// after the pass limit and [`EngineError::Cancelled`] if `cancel` is
    /// set.
    pub fn format_file(
        &self,
        file: &str,
        tree: &mut SyntaxTree,
        settings: &Settings,
        cancel: Option<&CancelFlag>,
    ) -> Result<FormatOutcome, EngineError> {
        let active = active_rules(&self.rules, &self.order, settings);
        debug!(file, rules = active.len(), "Formatting");
        let mut resolver = self.resolver(settings);
        let mut working = tree.clone();
        let mut corrected = Vec::new();
        let mut faults = Vec::new();
        let mut passes = 0;

        let remaining = loop {
            if cancel.is_some_and(CancelFlag::is_cancelled) {
                return Err(EngineError::Cancelled);
            }
            if passes == self.max_format_passes {
                let check = self.run_pass(file, TreeAccess::Shared(&working), settings, &active, &mut resolver);
                let fixable = check.violations.iter().filter(|v| v.can_be_autocorrected).count();
                if fixable == 0 {
                    merge_faults(&mut faults, check.faults);
                    break check.violations;
                }
                warn!(
                    file,
                    passes,
                    fixable,
                    "Format was not able to resolve all violations which (theoretically) can be autocorrected"
                );
                return Err(EngineError::NonConvergent {
                    file: file.to_string(),
                    passes,
                });
            }

            passes += 1;
            let pass = self.run_pass(file, TreeAccess::Exclusive(&mut working), settings, &active, &mut resolver);
            merge_faults(&mut faults, pass.faults);
            let (fixed, unfixed): (Vec<_>, Vec<_>) = pass.violations.into_iter().partition(|v| v.corrected);
            corrected.extend(fixed);
            if !pass.mutated {
                break unfixed;
            }
            debug!(file, pass = passes, "Pass changed the tree");
        };

        let mut remaining = remaining;
        sort_violations(&mut remaining);
        *tree = working;
        Ok(FormatOutcome {
            corrected,
            remaining,
            faults,
            passes,
        })
    }

    fn resolver(&self, settings: &Settings) -> SuppressionResolver {
        let formatter_tags = settings.property_bool("ij_formatter_tags_enabled", false);
        SuppressionResolver::new(Arc::clone(&self.aliases), formatter_tags)
    }

    fn run_pass(
        &self,
        file: &str,
        mut tree: TreeAccess<'_>,
        settings: &Settings,
        active: &[usize],
        resolver: &mut SuppressionResolver,
    ) -> PassResult {
        let active_ids: BTreeSet<RuleId> = active.iter().map(|&i| self.rules[i].id().clone()).collect();
        let mut result = PassResult {
            violations: Vec::new(),
            faults: Vec::new(),
            mutated: false,
        };

        for &index in active {
            let rule = self.rules[index].as_ref();
            let mut current = None;
            let snapshot = matches!(tree, TreeAccess::Exclusive(_)).then(|| tree.tree().clone());
            let run = catch_unwind(AssertUnwindSafe(|| {
                let mut cx = RuleContext::new(tree.reborrow(), settings, rule.descriptor(), &active_ids, resolver);
                traverse(rule, &mut cx, &mut current);
                cx.finish()
            }));
            match run {
                Ok((violations, mutated)) => {
                    result.violations.extend(violations);
                    result.mutated |= mutated;
                }
                Err(payload) => {
                    let position = current
                        .filter(|_| !matches!(tree, TreeAccess::Exclusive(_)))
                        .map(|offset| tree.tree().position(offset));
                    let fault = RuleFault {
                        rule_id: rule.id().clone(),
                        file: file.to_string(),
                        line: position.map_or(0, |p| p.line),
                        column: position.map_or(0, |p| p.column),
                        message: panic_message(payload.as_ref()),
                    };
                    warn!(%fault, "Rule failed");
                    result.faults.push(fault);
                    if let (TreeAccess::Exclusive(working), Some(snapshot)) = (&mut tree, snapshot) {
                        working.restore(snapshot);
                    }
                }
            }
        }
        result
    }
}

/// Visits every attached node in pre-order with enter and exit callbacks.
fn traverse(rule: &dyn Rule, cx: &mut RuleContext<'_>, current: &mut Option<usize>) {
    rule.before_first_node(cx);
    let mut stack = vec![Step::Enter(cx.tree().root())];
    while let Some(step) = stack.pop() {
        if cx.is_stopped() {
            break;
        }
        match step {
            Step::Enter(node) => {
                if !cx.tree().is_attached(node) {
                    continue;
                }
                *current = Some(cx.tree().start(node));
                rule.visit(node, cx);
                if cx.tree().is_attached(node) {
                    stack.push(Step::Exit(node));
                    stack.extend(cx.tree().children(node).iter().rev().map(|&c| Step::Enter(c)));
                }
            }
            Step::Exit(node) => {
                if cx.tree().is_attached(node) {
                    rule.after_visit(node, cx);
                }
            }
        }
    }
    rule.after_last_node(cx);
}

/// Adds faults not seen in an earlier pass.
fn merge_faults(faults: &mut Vec<RuleFault>, found: Vec<RuleFault>) {
    for fault in found {
        if !faults.contains(&fault) {
            faults.push(fault);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown failure".to_string())
}
