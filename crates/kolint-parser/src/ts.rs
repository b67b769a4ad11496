//! Tree-sitter frontend.
//!
//! Converts the concrete syntax tree of the `tree-sitter-kotlin-ng` grammar
//! into a [`SyntaxTree`]. Grammar nodes without a counterpart are flattened
//! into their parent, and text between grammar tokens becomes whitespace
//! leaves, so the result renders back to the input.

use kolint_core::syntax::{NodeKind, TreeBuilder};
use kolint_core::SyntaxTree;
use tree_sitter::{Language, Node, Parser};

use crate::{Frontend, ParseError};

/// Kotlin frontend backed by tree-sitter.
pub struct TreeSitterFrontend {
    language: Language,
}

impl TreeSitterFrontend {
    /// Create a new frontend.
    #[must_use]
    pub fn new() -> Self {
        Self {
            language: tree_sitter_kotlin_ng::LANGUAGE.into(),
        }
    }
}

impl Default for TreeSitterFrontend {
    fn default() -> Self {
        Self::new()
    }
}

impl Frontend for TreeSitterFrontend {
    fn name(&self) -> &'static str {
        "tree-sitter"
    }

    fn parse(&self, source: &str) -> Result<SyntaxTree, ParseError> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.language)
            .map_err(|e| ParseError::Grammar(e.to_string()))?;
        let tree = parser
            .parse(source.as_bytes(), None)
            .ok_or_else(|| ParseError::Grammar("parsing was cancelled".to_string()))?;
        let root = tree.root_node();
        if root.has_error() {
            return Err(first_error(root));
        }

        let mut converter = Converter {
            source,
            builder: TreeBuilder::new(NodeKind::File),
            cursor: 0,
        };
        converter.children(root);
        converter.gap(source.len());
        Ok(converter.builder.finish())
    }
}

fn first_error(root: Node<'_>) -> ParseError {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            let point = node.start_position();
            return ParseError::Syntax {
                line: point.row + 1,
                column: point.column + 1,
            };
        }
        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    ParseError::Syntax { line: 1, column: 1 }
}

fn is_type(kind: &str) -> bool {
    matches!(kind, "type" | "user_type" | "nullable_type" | "function_type" | "non_nullable_type")
}

fn is_binary(kind: &str) -> bool {
    matches!(
        kind,
        "disjunction_expression"
            | "conjunction_expression"
            | "equality_expression"
            | "comparison_expression"
            | "check_expression"
            | "elvis_expression"
            | "infix_expression"
            | "range_expression"
            | "additive_expression"
            | "multiplicative_expression"
            | "as_expression"
            | "assignment"
    )
}

fn is_string(kind: &str) -> bool {
    matches!(kind, "string_literal" | "multiline_string_literal")
}

/// Node kind for a grammar node, or `None` to flatten it.
fn composite_kind(node: Node<'_>) -> Option<NodeKind> {
    let kind = node.kind();
    let parent_kind = node.parent().map(|p| p.kind()).unwrap_or_default();
    let mapped = match kind {
        "package_header" => NodeKind::PackageDirective,
        "import" | "import_header" => NodeKind::ImportDirective,
        "file_annotation" => NodeKind::FileAnnotationList,
        "annotation" => NodeKind::Annotation,
        "annotated_expression" => NodeKind::AnnotatedExpression,
        "modifiers" => NodeKind::ModifierList,
        "class_declaration" | "object_declaration" | "companion_object" => NodeKind::Class,
        "class_body" | "enum_class_body" => NodeKind::ClassBody,
        "function_declaration" => NodeKind::Function,
        "function_value_parameters" | "class_parameters" => NodeKind::ValueParameterList,
        "parameter" | "class_parameter" | "function_value_parameter" => NodeKind::ValueParameter,
        "property_declaration" => NodeKind::Property,
        "block" => NodeKind::Block,
        "jump_expression" if node.child(0).is_some_and(|c| c.kind() == "return") => {
            NodeKind::ReturnExpression
        }
        "if_expression" => NodeKind::IfExpression,
        "prefix_expression" | "unary_expression" => NodeKind::PrefixExpression,
        "navigation_expression" => qualified_kind(node),
        "call_expression" => NodeKind::CallExpression,
        "value_arguments" => NodeKind::ValueArgumentList,
        "value_argument" => NodeKind::ValueArgument,
        "parenthesized_expression" => NodeKind::ParenthesizedExpression,
        "lambda_literal" => NodeKind::LambdaExpression,
        k if is_binary(k) => NodeKind::BinaryExpression,
        k if is_type(k) && !is_type(parent_kind) => NodeKind::TypeReference,
        _ => return None,
    };
    Some(mapped)
}

fn qualified_kind(navigation: Node<'_>) -> NodeKind {
    let safe = navigation_parts(navigation)
        .iter()
        .any(|part| part.kind() == "?.");
    if safe {
        NodeKind::SafeAccessExpression
    } else {
        NodeKind::DotQualifiedExpression
    }
}

/// Children of a navigation expression with a selector suffix expanded.
fn navigation_parts(navigation: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = navigation.walk();
    let mut parts = Vec::new();
    for child in navigation.children(&mut cursor) {
        if child.kind() == "navigation_suffix" {
            let mut inner = child.walk();
            parts.extend(child.children(&mut inner));
        } else {
            parts.push(child);
        }
    }
    parts
}

fn leaf_kind(node: Node<'_>, text: &str) -> NodeKind {
    let parent_kind = node.parent().map(|p| p.kind()).unwrap_or_default();
    match node.kind() {
        "line_comment" => return NodeKind::EolComment,
        "block_comment" if text.starts_with("/**") && text != "/**/" => return NodeKind::Kdoc,
        "block_comment" => return NodeKind::BlockComment,
        "identifier" | "simple_identifier" | "type_identifier" => return NodeKind::Identifier,
        "character_literal" => return NodeKind::CharLiteral,
        "number_literal" | "integer_literal" | "long_literal" | "real_literal" | "hex_literal"
        | "bin_literal" | "unsigned_literal" | "float_literal" => return NodeKind::NumberLiteral,
        _ => {}
    }
    match text {
        "." => NodeKind::Dot,
        "?." => NodeKind::SafeAccess,
        ":" => NodeKind::Colon,
        "," => NodeKind::Comma,
        ";" => NodeKind::Semicolon,
        "(" => NodeKind::LPar,
        ")" => NodeKind::RPar,
        "{" => NodeKind::LBrace,
        "}" => NodeKind::RBrace,
        "->" => NodeKind::Arrow,
        "@" => NodeKind::At,
        _ if is_binary(parent_kind) && !node.is_named() => NodeKind::OperationReference,
        _ if parent_kind == "prefix_expression" && !node.is_named() => NodeKind::PrefixOperator,
        "=" => NodeKind::Eq,
        _ if text.starts_with(|c: char| c.is_alphabetic()) => NodeKind::Keyword,
        _ => NodeKind::Punctuation,
    }
}

struct Converter<'s> {
    source: &'s str,
    builder: TreeBuilder,
    cursor: usize,
}

impl Converter<'_> {
    /// Emits the text between the cursor and `to` as whitespace leaves,
    /// keeping anything else as error leaves.
    fn gap(&mut self, to: usize) {
        if to <= self.cursor {
            return;
        }
        let source = self.source;
        let text = &source[self.cursor..to];
        let mut run_start = 0;
        let mut run_is_space = None;
        for (i, c) in text.char_indices() {
            let is_space = c.is_whitespace();
            if run_is_space.is_some_and(|s| s != is_space) {
                self.gap_run(&text[run_start..i], run_is_space == Some(true));
                run_start = i;
            }
            run_is_space = Some(is_space);
        }
        self.gap_run(&text[run_start..], run_is_space == Some(true));
        self.cursor = to;
    }

    fn gap_run(&mut self, text: &str, is_space: bool) {
        let kind = if is_space {
            NodeKind::Whitespace
        } else {
            NodeKind::Error
        };
        self.builder.token(kind, text);
    }

    fn leaf(&mut self, node: Node<'_>, kind: Option<NodeKind>) {
        self.gap(node.start_byte());
        let source = self.source;
        let text = &source[node.start_byte()..node.end_byte()];
        let kind = kind.unwrap_or_else(|| leaf_kind(node, text));
        self.builder.token(kind, text);
        self.cursor = self.cursor.max(node.end_byte());
    }

    fn node(&mut self, node: Node<'_>) {
        if node.start_byte() < self.cursor {
            return;
        }
        if is_string(node.kind()) {
            self.gap(node.start_byte());
            self.builder.start_node(NodeKind::StringTemplate);
            self.leaf(node, Some(NodeKind::StringLiteral));
            self.builder.finish_node();
            return;
        }
        if node.child_count() == 0 || node.kind() == "character_literal" {
            self.leaf(node, None);
            return;
        }
        if node.kind() == "call_expression" {
            if let Some(callee) = node.child(0).filter(|c| c.kind() == "navigation_expression") {
                self.chained_call(node, callee);
                return;
            }
        }
        self.gap(node.start_byte());
        let kind = composite_kind(node);
        if let Some(kind) = kind {
            self.builder.start_node(kind);
        }
        self.children(node);
        if kind.is_some() {
            self.builder.finish_node();
        }
    }

    fn children(&mut self, node: Node<'_>) {
        let wrap_fields = node.kind() == "if_expression";
        let mut cursor = node.walk();
        if !cursor.goto_first_child() {
            return;
        }
        loop {
            let child = cursor.node();
            let wrapper = match cursor.field_name() {
                Some("condition") if wrap_fields => Some(NodeKind::Condition),
                Some("consequence") if wrap_fields => Some(NodeKind::Then),
                Some("alternative") if wrap_fields => Some(NodeKind::Else),
                _ => None,
            };
            match wrapper {
                Some(kind) => {
                    self.gap(child.start_byte());
                    self.builder.start_node(kind);
                    self.node(child);
                    self.builder.finish_node();
                }
                None => self.node(child),
            }
            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }

    /// Rebuilds `receiver.selector(args)` so the call sits inside the
    /// qualified expression, with the selector as its callee.
    fn chained_call(&mut self, call: Node<'_>, navigation: Node<'_>) {
        let parts = navigation_parts(navigation);
        let Some((selector, receiver)) = parts.split_last() else {
            return;
        };
        self.gap(navigation.start_byte());
        self.builder.start_node(qualified_kind(navigation));
        for part in receiver {
            self.node(*part);
        }
        self.gap(selector.start_byte());
        self.builder.start_node(NodeKind::CallExpression);
        self.node(*selector);
        let mut cursor = call.walk();
        for suffix in call.children(&mut cursor).skip(1) {
            self.node(suffix);
        }
        self.builder.finish_node();
        self.builder.finish_node();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> SyntaxTree {
        TreeSitterFrontend::new().parse(source).unwrap()
    }

    #[test]
    fn renders_input_unchanged() {
        let source = "package com.example\n\nimport com.example.domain.User\n\n// comment\nclass A(val x: Int) {\n    fun f(): Boolean = x > 1 && x != 10\n}\n\nval s = \"text ${1 + 2}\"\n";
        assert_eq!(parse(source).render(), source);
    }

    #[test]
    fn maps_binary_expressions() {
        let tree = parse("val x = a && b\n");
        let binaries: Vec<&str> = tree
            .descendants(tree.root())
            .into_iter()
            .filter(|&n| tree.kind(n) == NodeKind::BinaryExpression)
            .map(|n| tree.text(n))
            .collect();
        assert_eq!(binaries, vec!["a && b"]);
    }

    #[test]
    fn syntax_errors_are_reported() {
        let err = TreeSitterFrontend::new().parse("fun f( {\n").unwrap_err();
        assert!(matches!(err, ParseError::Syntax { .. }), "{err}");
    }
}
