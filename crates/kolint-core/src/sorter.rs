//! Execution order of rules.
//!
//! Rules are sorted topologically along their run-after and run-before
//! constraints. Among rules that are free to run, the order is
//! run-as-late-as-possible last, then `standard` rules before others, then
//! by id.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use crate::engine::EngineError;
use crate::rule::{RuleBox, RuleId, RunAfterMode};
use crate::settings::Settings;

type ReadyKey = (bool, bool, RuleId, usize);

fn ready_key(rules: &[RuleBox], index: usize) -> ReadyKey {
    let descriptor = rules[index].descriptor();
    (
        descriptor.run_as_late_as_possible,
        !descriptor.id.is_standard(),
        descriptor.id.clone(),
        index,
    )
}

/// Returns the indexes of `rules` in execution order.
///
/// # Errors
///
/// Returns an error if a rule refers to itself, if two rules share an id, or
/// if the constraints form a cycle.
pub fn sort_rules(rules: &[RuleBox]) -> Result<Vec<usize>, EngineError> {
    let mut by_id: BTreeMap<&RuleId, usize> = BTreeMap::new();
    for (index, rule) in rules.iter().enumerate() {
        let descriptor = rule.descriptor();
        let refers_to_self = descriptor.run_after.iter().any(|r| r.rule_id == descriptor.id)
            || descriptor.run_before.contains(&descriptor.id);
        if refers_to_self {
            return Err(EngineError::SelfReferencingRule {
                rule_id: descriptor.id.clone(),
            });
        }
        if by_id.insert(&descriptor.id, index).is_some() {
            return Err(EngineError::DuplicateRule {
                rule_id: descriptor.id.clone(),
            });
        }
    }

    // successor lists and in-degrees over loaded rules only
    let mut successors: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); rules.len()];
    for (index, rule) in rules.iter().enumerate() {
        let descriptor = rule.descriptor();
        for run_after in &descriptor.run_after {
            match by_id.get(&run_after.rule_id) {
                Some(&before) => {
                    successors[before].insert(index);
                }
                None if run_after.mode == RunAfterMode::OnlyWhenLoadedAndEnabled => {
                    warn!(
                        rule = %descriptor.id,
                        requires = %run_after.rule_id,
                        "Rule is skipped because the rule it must run after is not loaded"
                    );
                }
                None => {}
            }
        }
        for run_before in &descriptor.run_before {
            if let Some(&after) = by_id.get(run_before) {
                successors[index].insert(after);
            }
        }
    }
    let mut in_degree = vec![0usize; rules.len()];
    for targets in &successors {
        for &target in targets {
            in_degree[target] += 1;
        }
    }

    let mut ready: BTreeSet<ReadyKey> = (0..rules.len())
        .filter(|&i| in_degree[i] == 0)
        .map(|i| ready_key(rules, i))
        .collect();
    let mut order = Vec::with_capacity(rules.len());
    while let Some(key) = ready.pop_first() {
        let index = key.3;
        order.push(index);
        for &next in &successors[index] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                ready.insert(ready_key(rules, next));
            }
        }
    }

    if order.len() < rules.len() {
        // unsorted rules are on a cycle or downstream of one
        let mut cyclic: Vec<String> = (0..rules.len())
            .filter(|&i| in_degree[i] > 0 && reaches(&successors, i, i))
            .map(|i| rules[i].id().to_string())
            .collect();
        cyclic.sort();
        return Err(EngineError::RuleOrderingCycle { rules: cyclic });
    }

    debug!(
        order = ?order.iter().map(|&i| rules[i].id().as_str()).collect::<Vec<_>>(),
        "Rule execution order"
    );
    Ok(order)
}

/// Returns true if `target` can be reached from `from` along at least one
/// edge.
fn reaches(successors: &[BTreeSet<usize>], from: usize, target: usize) -> bool {
    let mut seen = BTreeSet::new();
    let mut stack: Vec<usize> = successors[from].iter().copied().collect();
    while let Some(node) = stack.pop() {
        if node == target {
            return true;
        }
        if seen.insert(node) {
            stack.extend(successors[node].iter().copied());
        }
    }
    false
}

/// Returns the subset of `order` that runs under `settings`.
///
/// A rule is dropped when it is disabled, or when a rule it must run after
/// in [`RunAfterMode::OnlyWhenLoadedAndEnabled`] mode does not run.
#[must_use]
pub fn active_rules(rules: &[RuleBox], order: &[usize], settings: &Settings) -> Vec<usize> {
    let mut active: BTreeSet<&RuleId> = order
        .iter()
        .map(|&i| rules[i].descriptor())
        .filter(|d| settings.is_rule_enabled(&d.id, d.experimental))
        .map(|d| &d.id)
        .collect();

    loop {
        let dropped: Vec<&RuleId> = order
            .iter()
            .map(|&i| rules[i].descriptor())
            .filter(|d| active.contains(&d.id))
            .filter(|d| {
                d.run_after.iter().any(|r| {
                    r.mode == RunAfterMode::OnlyWhenLoadedAndEnabled && !active.contains(&r.rule_id)
                })
            })
            .map(|d| &d.id)
            .collect();
        if dropped.is_empty() {
            break;
        }
        for id in dropped {
            debug!(rule = %id, "Rule is skipped because a rule it must run after is not enabled");
            active.remove(id);
        }
    }

    order
        .iter()
        .copied()
        .filter(|&i| active.contains(rules[i].id()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RuleContext;
    use crate::rule::{Rule, RuleDescriptor};
    use crate::syntax::NodeId;

    struct Stub(RuleDescriptor);

    impl Rule for Stub {
        fn descriptor(&self) -> &RuleDescriptor {
            &self.0
        }

        fn visit(&self, _node: NodeId, _cx: &mut RuleContext<'_>) {}
    }

    fn boxed(descriptor: RuleDescriptor) -> RuleBox {
        Box::new(Stub(descriptor))
    }

    fn ids(rules: &[RuleBox], order: &[usize]) -> Vec<String> {
        order.iter().map(|&i| rules[i].id().to_string()).collect()
    }

    #[test]
    fn ties_are_broken_by_lateness_rule_set_and_id() {
        let rules = vec![
            boxed(RuleDescriptor::new("max-line-length").run_as_late_as_possible()),
            boxed(RuleDescriptor::new("custom:alpha")),
            boxed(RuleDescriptor::new("final-newline")),
            boxed(RuleDescriptor::new("comment-wrapping")),
        ];
        let order = sort_rules(&rules).unwrap();
        assert_eq!(
            ids(&rules, &order),
            vec![
                "standard:comment-wrapping",
                "standard:final-newline",
                "custom:alpha",
                "standard:max-line-length",
            ]
        );
    }

    #[test]
    fn constraints_override_tie_break() {
        let rules = vec![
            boxed(RuleDescriptor::new("a").run_after("c", RunAfterMode::Regardless)),
            boxed(RuleDescriptor::new("b")),
            boxed(RuleDescriptor::new("c").run_after("b", RunAfterMode::Regardless)),
            boxed(RuleDescriptor::new("z").run_before("b")),
        ];
        let order = sort_rules(&rules).unwrap();
        assert_eq!(
            ids(&rules, &order),
            vec!["standard:z", "standard:b", "standard:c", "standard:a"]
        );
    }

    #[test]
    fn cycle_is_rejected() {
        let rules = vec![
            boxed(RuleDescriptor::new("a").run_after("b", RunAfterMode::Regardless)),
            boxed(RuleDescriptor::new("b").run_after("a", RunAfterMode::Regardless)),
            boxed(RuleDescriptor::new("c")),
            boxed(RuleDescriptor::new("d").run_after("b", RunAfterMode::Regardless)),
        ];
        let err = sort_rules(&rules).unwrap_err();
        assert!(matches!(
            err,
            EngineError::RuleOrderingCycle { ref rules } if rules == &["standard:a", "standard:b"]
        ));
    }

    #[test]
    fn cycle_report_names_only_its_members() {
        let rules = vec![
            boxed(RuleDescriptor::new("a").run_after("c", RunAfterMode::Regardless)),
            boxed(RuleDescriptor::new("b").run_after("a", RunAfterMode::Regardless)),
            boxed(RuleDescriptor::new("c").run_after("b", RunAfterMode::Regardless)),
            boxed(RuleDescriptor::new("d").run_after("c", RunAfterMode::Regardless)),
            boxed(RuleDescriptor::new("e").run_after("d", RunAfterMode::Regardless)),
        ];
        let err = sort_rules(&rules).unwrap_err();
        assert!(matches!(
            err,
            EngineError::RuleOrderingCycle { ref rules }
                if rules == &["standard:a", "standard:b", "standard:c"]
        ));
    }

    #[test]
    fn self_reference_is_rejected() {
        let rules = vec![boxed(RuleDescriptor::new("a").run_before("a"))];
        assert!(matches!(
            sort_rules(&rules),
            Err(EngineError::SelfReferencingRule { .. })
        ));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let rules = vec![boxed(RuleDescriptor::new("a")), boxed(RuleDescriptor::new("standard:a"))];
        assert!(matches!(sort_rules(&rules), Err(EngineError::DuplicateRule { .. })));
    }

    #[test]
    fn dependents_of_disabled_rules_are_skipped() {
        let rules = vec![
            boxed(RuleDescriptor::new("a")),
            boxed(RuleDescriptor::new("b").run_after("a", RunAfterMode::OnlyWhenLoadedAndEnabled)),
            boxed(RuleDescriptor::new("c").run_after("b", RunAfterMode::OnlyWhenLoadedAndEnabled)),
            boxed(RuleDescriptor::new("d").run_after("a", RunAfterMode::Regardless)),
        ];
        let order = sort_rules(&rules).unwrap();
        let settings = Settings::default().with_rule("a", false);
        let active = active_rules(&rules, &order, &settings);
        assert_eq!(ids(&rules, &active), vec!["standard:d"]);
    }

    #[test]
    fn experimental_rules_are_inactive_by_default() {
        let rules = vec![
            boxed(RuleDescriptor::new("a")),
            boxed(RuleDescriptor::new("b").experimental()),
        ];
        let order = sort_rules(&rules).unwrap();
        let active = active_rules(&rules, &order, &Settings::default());
        assert_eq!(ids(&rules, &active), vec!["standard:a"]);
        let all = active_rules(&rules, &order, &Settings::default().with_experimental(true));
        assert_eq!(all.len(), 2);
    }
}
