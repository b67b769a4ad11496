//! # kolint
//!
//! Linter and formatter for Kotlin source code.
//!
//! This is the main facade crate that re-exports the engine, the parser and
//! the built-in rules, and runs them on source text.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use kolint::{format_code, lint_code, standard_engine, Settings};
//!
//! let settings = Settings::new().with_max_line_length(100);
//! let engine = standard_engine(&settings)?;
//!
//! for violation in lint_code("val x = 1", &settings, &engine)?.violations {
//!     println!("{violation}");
//! }
//!
//! let formatted = format_code("val x = 1", &settings, &engine)?;
//! assert_eq!(formatted.code, "val x = 1\n");
//! ```
//!
//! ## Suppression
//!
//! ```kotlin
//! @Suppress("ktlint:standard:max-line-length")
//! val url = "https://example.com/a/very/long/path"
//!
//! // ktlint-disable standard:no-trailing-spaces
//! ```
//!
//! ## Byte order mark and line separators
//!
//! A leading byte order mark and `\r\n` line separators are removed before
//! parsing and restored in formatted output.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

// Re-export core types and traits
pub use kolint_core::*;

pub use kolint_parser::{parse, Frontend, KotlinParser, ParseError, TreeSitterFrontend};

/// Built-in rules and presets.
pub mod rules {
    pub use kolint_rules::*;
}

mod runner;

pub use runner::{
    engine_for_config, engine_for_preset, format_code, format_source, format_source_with,
    frontend_by_name, lint_code, lint_source, lint_source_with, preset_by_name, standard_engine,
    Formatted, KolintError, LineSeparator, SourceText,
};
