//! # kolint-rules
//!
//! Built-in style rules for kolint.
//!
//! Every rule is an ordinary [`Rule`](kolint_core::Rule) run by the
//! [`RuleEngine`](kolint_core::RuleEngine). The wrapping rules share the
//! [`LineWrapper`](kolint_core::LineWrapper) and only wrap while the
//! `max-line-length` rule is enabled.
//!
//! ## Available Rules
//!
//! | Id | Autocorrect | Description |
//! |----|-------------|-------------|
//! | `standard:binary-expression-wrapping` | yes | Wraps binary expressions exceeding the max line length |
//! | `standard:chain-method-continuation` | yes | Puts chain operators at the start of a line |
//! | `standard:comment-wrapping` | partly | Disallows code after a block comment on the same line |
//! | `standard:condition-wrapping` | yes | Puts each operand of a multiline condition on its own line (experimental) |
//! | `standard:final-newline` | yes | Enforces or forbids a final newline |
//! | `standard:max-line-length` | no | Reports lines exceeding the max line length |
//! | `standard:no-trailing-spaces` | yes | Removes trailing spaces |
//! | `standard:parameter-wrapping` | yes | Wraps value parameters exceeding the max line length |
//! | `standard:property-wrapping` | yes | Wraps properties exceeding the max line length |
//!
//! ## Usage
//!
//! ```ignore
//! use kolint_core::{RuleEngine, Settings};
//!
//! let engine = RuleEngine::builder()
//!     .rules(kolint_rules::standard_rules())
//!     .build()?;
//! let outcome = engine.lint(&tree, &Settings::default());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod binary_expression_wrapping;
mod chain_method_continuation;
mod comment_wrapping;
mod condition_wrapping;
mod final_newline;
mod max_line_length;
mod no_trailing_spaces;
mod parameter_wrapping;
mod presets;
mod property_wrapping;

#[cfg(test)]
mod test_utils;

pub use binary_expression_wrapping::{BinaryExpressionWrapping, ID as BINARY_EXPRESSION_WRAPPING};
pub use chain_method_continuation::{
    ChainMethodContinuation, FORCE_MULTILINE_PROPERTY, ID as CHAIN_METHOD_CONTINUATION,
};
pub use comment_wrapping::{CommentWrapping, ID as COMMENT_WRAPPING};
pub use condition_wrapping::{ConditionWrapping, ID as CONDITION_WRAPPING};
pub use final_newline::{FinalNewline, ID as FINAL_NEWLINE};
pub use max_line_length::{MaxLineLengthRule, ID as MAX_LINE_LENGTH};
pub use no_trailing_spaces::{NoTrailingSpaces, ID as NO_TRAILING_SPACES};
pub use parameter_wrapping::{ParameterWrapping, ID as PARAMETER_WRAPPING};
pub use presets::{all_rules, experimental_rules, standard_rules, Preset};
pub use property_wrapping::{PropertyWrapping, ID as PROPERTY_WRAPPING};

/// Re-export core types for convenience.
pub use kolint_core::{Rule, RuleBox, Violation};
