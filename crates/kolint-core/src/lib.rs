//! # kolint-core
//!
//! Core engine for linting and formatting Kotlin syntax trees.
//!
//! This crate provides the foundational types for building style rules:
//!
//! - [`SyntaxTree`] an arena-backed tree that rules read and rewrite
//! - [`Rule`] trait and [`RuleDescriptor`] for rule metadata and ordering
//! - [`RuleEngine`] for running rules in lint or format mode
//! - [`SuppressionResolver`] for `@Suppress` annotations and directives
//! - [`LineWrapper`] for line-length constrained wrapping
//! - [`PositionIndex`] for offset to line/column mapping
//!
//! ## Example
//!
//! ```ignore
//! use kolint_core::{RuleEngine, Settings};
//!
//! let engine = RuleEngine::builder()
//!     .rule(MyRule::new())
//!     .build()?;
//!
//! let outcome = engine.lint_file("Main.kt", &tree, &Settings::default());
//! for violation in &outcome.violations {
//!     println!("{}", violation.format("Main.kt"));
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod context;
mod engine;
mod position;
mod rule;
mod settings;
mod sorter;
mod suppression;
mod types;

/// Syntax tree types.
pub mod syntax;
/// Utility modules for rule implementations.
pub mod utils;
/// Line-length constrained wrapping.
pub mod wrap;

pub use config::{Config, ConfigError, FilesConfig, LineLengthValue, RuleConfig, StyleConfig};
pub use context::RuleContext;
pub use engine::{
    CancelFlag, EngineError, RuleEngine, RuleEngineBuilder, DEFAULT_MAX_FORMAT_PASSES, STDIN_FILE,
};
pub use position::{LineColumn, PositionIndex};
pub use rule::{Rule, RuleBox, RuleDescriptor, RuleId, RunAfter, RunAfterMode, STANDARD_RULE_SET};
pub use settings::{
    CodeStyle, IndentConfig, IndentStyle, MaxLineLength, Settings, MAX_LINE_LENGTH_RULE_ID,
};
pub use sorter::{active_rules, sort_rules};
pub use suppression::{SuppressionAliases, SuppressionResolver};
pub use syntax::{NodeId, NodeKind, SyntaxTree};
pub use types::{
    sort_violations, FormatOutcome, LintOutcome, RuleFault, Violation, ViolationDiagnostic,
};
pub use wrap::{Break, BreakPoint, LineWrapper, WrapDecision, WrapReport};
