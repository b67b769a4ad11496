//! # kolint-parser
//!
//! Lossless Kotlin parser frontends producing [`kolint_core::SyntaxTree`]s.
//!
//! Rendering a parsed tree reproduces the input byte for byte, except for a
//! leading UTF-8 byte order mark which frontends drop. Two frontends are
//! provided:
//!
//! - [`KotlinParser`] a hand-written recursive descent parser (the default)
//! - [`TreeSitterFrontend`] a converter from the `tree-sitter-kotlin-ng` grammar
//!
//! ## Example
//!
//! ```
//! use kolint_parser::parse;
//!
//! let tree = parse("val answer = 42\n").unwrap();
//! assert_eq!(tree.render(), "val answer = 42\n");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod lexer;
mod parser;
mod ts;

use kolint_core::{PositionIndex, SyntaxTree};
use thiserror::Error;

pub use ts::TreeSitterFrontend;

/// UTF-8 byte order mark.
pub const BOM: char = '\u{feff}';

/// Errors raised when source text cannot be turned into a tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A literal, comment or bracket is not closed.
    #[error("Unterminated {what} starting at {line}:{column}")]
    Unterminated {
        /// What was left open.
        what: &'static str,
        /// Line number (1-indexed).
        line: usize,
        /// Column number (1-indexed).
        column: usize,
    },

    /// A token appears where it cannot be matched.
    #[error("Unexpected '{token}' at {line}:{column}")]
    Unexpected {
        /// Text of the token.
        token: String,
        /// Line number (1-indexed).
        line: usize,
        /// Column number (1-indexed).
        column: usize,
    },

    /// The tree-sitter grammar reported a syntax error.
    #[error("Syntax error at {line}:{column}")]
    Syntax {
        /// Line number (1-indexed).
        line: usize,
        /// Column number (1-indexed).
        column: usize,
    },

    /// The tree-sitter grammar could not be loaded.
    #[error("Failed to load the Kotlin grammar: {0}")]
    Grammar(String),
}

impl ParseError {
    pub(crate) fn unterminated(source: &str, what: &'static str, offset: usize) -> Self {
        let position = PositionIndex::new(source).line_col(offset);
        Self::Unterminated {
            what,
            line: position.line,
            column: position.column,
        }
    }

    pub(crate) fn unexpected(source: &str, token: &str, offset: usize) -> Self {
        let position = PositionIndex::new(source).line_col(offset);
        Self::Unexpected {
            token: token.to_string(),
            line: position.line,
            column: position.column,
        }
    }

    /// Returns the 1-based line and column of the error, if known.
    #[must_use]
    pub fn position(&self) -> Option<(usize, usize)> {
        match self {
            Self::Unterminated { line, column, .. }
            | Self::Unexpected { line, column, .. }
            | Self::Syntax { line, column } => Some((*line, *column)),
            Self::Grammar(_) => None,
        }
    }
}

/// A parser that turns Kotlin source into a lossless syntax tree.
///
/// Implement this to plug another Kotlin grammar into the engine.
pub trait Frontend: Send + Sync {
    /// Short name used in logs and on the command line.
    fn name(&self) -> &'static str;

    /// Parses `source`, which must not start with a byte order mark.
    ///
    /// # Errors
    ///
    /// Returns an error when the source is not valid Kotlin as far as this
    /// frontend can tell.
    fn parse(&self, source: &str) -> Result<SyntaxTree, ParseError>;
}

/// Hand-written recursive descent parser for Kotlin.
///
/// The parser is tolerant: constructs it does not model are kept as plain
/// tokens inside the nearest enclosing node. It only fails on unterminated
/// literals, comments and brackets, and on stray closing brackets.
#[derive(Debug, Clone, Copy, Default)]
pub struct KotlinParser;

impl KotlinParser {
    /// Create a new parser.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Frontend for KotlinParser {
    fn name(&self) -> &'static str {
        "kotlin"
    }

    fn parse(&self, source: &str) -> Result<SyntaxTree, ParseError> {
        let tokens = lexer::tokenize(source)?;
        parser::Parser::new(source, tokens).parse_file()
    }
}

/// Removes a leading byte order mark, reporting whether one was present.
#[must_use]
pub fn strip_bom(source: &str) -> (&str, bool) {
    match source.strip_prefix(BOM) {
        Some(rest) => (rest, true),
        None => (source, false),
    }
}

/// Parses `source` with the default [`KotlinParser`].
///
/// A leading byte order mark is dropped.
///
/// # Errors
///
/// Returns an error for unterminated literals, comments or brackets.
pub fn parse(source: &str) -> Result<SyntaxTree, ParseError> {
    let (source, _) = strip_bom(source);
    KotlinParser.parse(source)
}
