//! Core types for lint violations and results.

use miette::{Diagnostic, SourceSpan};
use serde::{Deserialize, Serialize};

use crate::rule::RuleId;

/// A style violation found by a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Qualified id of the emitting rule.
    pub rule_id: RuleId,
    /// Line number (1-indexed).
    pub line: usize,
    /// Column number (1-indexed, in characters).
    pub column: usize,
    /// Byte offset in the text the rule saw (for miette integration).
    #[serde(skip)]
    pub offset: usize,
    /// Human-readable message.
    pub message: String,
    /// Whether the rule offered a fix.
    pub can_be_autocorrected: bool,
    /// Whether the fix was applied. Only set by format.
    pub corrected: bool,
}

impl Violation {
    /// Creates a new violation without a fix.
    #[must_use]
    pub fn new(rule_id: RuleId, line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            rule_id,
            line,
            column,
            offset: 0,
            message: message.into(),
            can_be_autocorrected: false,
            corrected: false,
        }
    }

    /// Sets the byte offset.
    #[must_use]
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Marks the violation as fixable.
    #[must_use]
    pub fn autocorrectable(mut self, can_be_autocorrected: bool) -> Self {
        self.can_be_autocorrected = can_be_autocorrected;
        self
    }

    /// Marks the violation as corrected.
    #[must_use]
    pub fn with_corrected(mut self, corrected: bool) -> Self {
        self.corrected = corrected;
        self
    }

    /// Formats the violation for terminal output, prefixed with `file`.
    #[must_use]
    pub fn format(&self, file: &str) -> String {
        use std::fmt::Write;
        let mut output = format!("{file}:{}:{}: {}", self.line, self.column, self.message);
        let _ = write!(output, " ({})", self.rule_id);
        if self.corrected {
            output.push_str(" (corrected)");
        } else if !self.can_be_autocorrected {
            output.push_str(" (cannot be auto-corrected)");
        }
        output
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}: {} ({})",
            self.line, self.column, self.message, self.rule_id
        )
    }
}

/// A rule that failed while visiting a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleFault {
    /// Qualified id of the failing rule.
    pub rule_id: RuleId,
    /// Name of the file being processed.
    pub file: String,
    /// Line of the node being visited, or 0 when unknown.
    pub line: usize,
    /// Column of the node being visited, or 0 when unknown.
    pub column: usize,
    /// Failure message.
    pub message: String,
}

impl std::fmt::Display for RuleFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}: rule '{}' failed: {}",
            self.file, self.line, self.column, self.rule_id, self.message
        )
    }
}

/// Converts a Violation to a miette Diagnostic for rich error display.
#[derive(Debug, thiserror::Error, Diagnostic)]
#[error("{message}")]
pub struct ViolationDiagnostic {
    message: String,
    #[help]
    help: Option<String>,
    #[label("{label_message}")]
    span: SourceSpan,
    label_message: String,
}

impl From<&Violation> for ViolationDiagnostic {
    fn from(v: &Violation) -> Self {
        Self {
            message: v.message.clone(),
            help: (!v.can_be_autocorrected).then(|| "cannot be auto-corrected".to_string()),
            span: SourceSpan::from((v.offset, 0)),
            label_message: v.rule_id.to_string(),
        }
    }
}

/// Result of linting one file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintOutcome {
    /// Violations sorted by line and column.
    pub violations: Vec<Violation>,
    /// Rules that failed.
    pub faults: Vec<RuleFault>,
}

impl LintOutcome {
    /// Returns true if nothing was found.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty() && self.faults.is_empty()
    }

    /// Counts violations that format could fix.
    #[must_use]
    pub fn autocorrectable_count(&self) -> usize {
        self.violations
            .iter()
            .filter(|v| v.can_be_autocorrected)
            .count()
    }
}

/// Result of formatting one file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatOutcome {
    /// Violations whose fix was applied, in emission order per pass.
    pub corrected: Vec<Violation>,
    /// Violations left in the formatted tree, sorted by line and column.
    pub remaining: Vec<Violation>,
    /// Rules that failed; their changes were rolled back.
    pub faults: Vec<RuleFault>,
    /// Number of passes that ran.
    pub passes: usize,
}

impl FormatOutcome {
    /// Returns true if any fix was applied.
    #[must_use]
    pub fn changed(&self) -> bool {
        !self.corrected.is_empty()
    }
}

/// Sorts violations by line then column, keeping emission order for ties.
pub fn sort_violations(violations: &mut [Violation]) {
    violations.sort_by_key(|v| (v.line, v.column));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_violation(line: usize, column: usize, message: &str) -> Violation {
        Violation::new(RuleId::new("final-newline"), line, column, message)
    }

    #[test]
    fn format_marks_uncorrectable() {
        let v = make_violation(1, 2, "Trailing space(s)");
        assert_eq!(
            v.format("a.kt"),
            "a.kt:1:2: Trailing space(s) (standard:final-newline) (cannot be auto-corrected)"
        );
        let fixed = v.autocorrectable(true).with_corrected(true);
        assert!(fixed.format("a.kt").ends_with("(corrected)"));
    }

    #[test]
    fn sort_is_stable_for_equal_positions() {
        let mut violations = vec![
            make_violation(2, 1, "b"),
            make_violation(1, 5, "first"),
            make_violation(1, 5, "second"),
            make_violation(1, 1, "a"),
        ];
        sort_violations(&mut violations);
        let messages: Vec<_> = violations.iter().map(|v| v.message.as_str()).collect();
        assert_eq!(messages, vec!["a", "first", "second", "b"]);
    }

    #[test]
    fn diagnostic_labels_rule() {
        let v = make_violation(1, 1, "File must end with a newline (\\n)").with_offset(10);
        let diagnostic = ViolationDiagnostic::from(&v);
        assert_eq!(diagnostic.label_message, "standard:final-newline");
        assert_eq!(diagnostic.span.offset(), 10);
    }

    #[test]
    fn lint_outcome_counts() {
        let outcome = LintOutcome {
            violations: vec![
                make_violation(1, 1, "a").autocorrectable(true),
                make_violation(1, 2, "b"),
            ],
            faults: Vec::new(),
        };
        assert!(!outcome.is_clean());
        assert_eq!(outcome.autocorrectable_count(), 1);
    }
}
