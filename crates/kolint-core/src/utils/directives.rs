//! Comment-based suppression directives.
//!
//! Supports directives like:
//! ```text
//! /* ktlint-disable standard:max-line-length */
//! ...
//! /* ktlint-enable standard:max-line-length */
//!
//! val x = 1 // ktlint-disable no-trailing-spaces
//! ```
//!
//! and, when `ij_formatter_tags_enabled` is set, `// @formatter:off` and
//! `// @formatter:on`.

/// A parsed directive. An empty rule list means all rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Starts suppressing the listed rules.
    Disable(Vec<String>),
    /// Stops suppressing the listed rules.
    Enable(Vec<String>),
}

const DISABLE: &str = "ktlint-disable";
const ENABLE: &str = "ktlint-enable";
const FORMATTER_OFF: &str = "@formatter:off";
const FORMATTER_ON: &str = "@formatter:on";

/// Parses the text of an end-of-line or block comment.
#[must_use]
pub fn parse_directive(comment: &str, formatter_tags: bool) -> Option<Directive> {
    let body = comment_body(comment);
    if formatter_tags {
        match body {
            FORMATTER_OFF => return Some(Directive::Disable(Vec::new())),
            FORMATTER_ON => return Some(Directive::Enable(Vec::new())),
            _ => {}
        }
    }
    if let Some(rules) = keyword_arguments(body, DISABLE) {
        return Some(Directive::Disable(rules));
    }
    keyword_arguments(body, ENABLE).map(Directive::Enable)
}

fn comment_body(comment: &str) -> &str {
    let comment = comment.trim();
    if let Some(rest) = comment.strip_prefix("//") {
        return rest.trim();
    }
    comment
        .strip_prefix("/*")
        .map(|rest| rest.strip_suffix("*/").unwrap_or(rest))
        .map_or(comment, str::trim)
}

fn keyword_arguments(body: &str, keyword: &str) -> Option<Vec<String>> {
    let rest = body.strip_prefix(keyword)?;
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(rest.split_whitespace().map(str::to_string).collect())
}
