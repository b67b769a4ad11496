//! Shared helpers for rule tests.

use kolint_core::{RuleBox, RuleEngine, Settings};

/// Builds an engine from `rules`.
pub(crate) fn engine(rules: Vec<RuleBox>) -> RuleEngine {
    RuleEngine::builder().rules(rules).build().unwrap()
}

/// Lints `code` and renders each violation as `line:column: message`.
pub(crate) fn lint(rules: Vec<RuleBox>, code: &str, settings: &Settings) -> Vec<String> {
    let tree = kolint_parser::parse(code).unwrap();
    let outcome = engine(rules).lint(&tree, settings);
    assert!(outcome.faults.is_empty(), "{:?}", outcome.faults);
    outcome
        .violations
        .iter()
        .map(|v| format!("{}:{}: {}", v.line, v.column, v.message))
        .collect()
}

/// Formats `code` and returns the rendered result.
pub(crate) fn format(rules: Vec<RuleBox>, code: &str, settings: &Settings) -> String {
    let mut tree = kolint_parser::parse(code).unwrap();
    engine(rules).format(&mut tree, settings).unwrap();
    tree.render()
}
