//! Rule presets for common configurations.

use crate::{
    BinaryExpressionWrapping, ChainMethodContinuation, CommentWrapping, ConditionWrapping,
    FinalNewline, MaxLineLengthRule, NoTrailingSpaces, ParameterWrapping, PropertyWrapping,
};
use kolint_core::RuleBox;

/// Preset configurations for kolint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    /// All stable rules.
    Standard,
    /// Only the experimental rules.
    Experimental,
    /// Stable and experimental rules.
    All,
}

impl Preset {
    /// Returns the rules for this preset.
    #[must_use]
    pub fn rules(self) -> Vec<RuleBox> {
        match self {
            Self::Standard => standard_rules(),
            Self::Experimental => experimental_rules(),
            Self::All => all_rules(),
        }
    }
}

/// Returns the stable rules.
///
/// Includes:
/// - `binary-expression-wrapping`
/// - `chain-method-continuation`
/// - `comment-wrapping`
/// - `final-newline`
/// - `max-line-length`
/// - `no-trailing-spaces`
/// - `parameter-wrapping`
/// - `property-wrapping`
#[must_use]
pub fn standard_rules() -> Vec<RuleBox> {
    vec![
        Box::new(BinaryExpressionWrapping::new()),
        Box::new(ChainMethodContinuation::new()),
        Box::new(CommentWrapping::new()),
        Box::new(FinalNewline::new()),
        Box::new(MaxLineLengthRule::new()),
        Box::new(NoTrailingSpaces::new()),
        Box::new(ParameterWrapping::new()),
        Box::new(PropertyWrapping::new()),
    ]
}

/// Returns the experimental rules.
///
/// These only run when experimental rules are enabled in the settings.
#[must_use]
pub fn experimental_rules() -> Vec<RuleBox> {
    vec![Box::new(ConditionWrapping::new())]
}

/// Returns all available rules.
#[must_use]
pub fn all_rules() -> Vec<RuleBox> {
    let mut rules = standard_rules();
    rules.extend(experimental_rules());
    rules
}
