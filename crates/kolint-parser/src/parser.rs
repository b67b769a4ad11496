//! Recursive descent parser over the token stream.
//!
//! Whitespace and comments are attached lazily: they are emitted into the
//! node that consumes the next code token, so nodes never start or end with
//! trivia. Constructs without a dedicated node kind are kept as plain
//! tokens inside the enclosing node.

use kolint_core::syntax::{Checkpoint, NodeKind, TreeBuilder};
use kolint_core::SyntaxTree;
use tracing::trace;

use crate::lexer::{Token, TokenKind};
use crate::ParseError;

const MODIFIERS: &[&str] = &[
    "abstract", "actual", "annotation", "companion", "const", "crossinline", "data", "enum",
    "expect", "external", "final", "infix", "inline", "inner", "internal", "lateinit",
    "noinline", "open", "operator", "out", "override", "private", "protected", "public",
    "reified", "sealed", "suspend", "tailrec", "value", "vararg",
];

const DECLARATION_KEYWORDS: &[&str] = &["class", "interface", "object", "fun", "val", "var", "typealias"];

const ASSIGNMENTS: &[&str] = &["=", "+=", "-=", "*=", "/=", "%="];

// identifiers that continue a construct instead of acting as infix calls
const NOT_INFIX: &[&str] = &["by", "catch", "constructor", "finally", "get", "init", "set", "where"];

/// Binary precedence levels, loosest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Disjunction,
    Conjunction,
    Equality,
    Comparison,
    NamedCheck,
    Elvis,
    Infix,
    Range,
    Additive,
    Multiplicative,
    Cast,
}

impl Level {
    const ALL: [Level; 11] = [
        Level::Disjunction,
        Level::Conjunction,
        Level::Equality,
        Level::Comparison,
        Level::NamedCheck,
        Level::Elvis,
        Level::Infix,
        Level::Range,
        Level::Additive,
        Level::Multiplicative,
        Level::Cast,
    ];

    fn next(self) -> Option<Level> {
        let index = Self::ALL.iter().position(|&l| l == self)?;
        Self::ALL.get(index + 1).copied()
    }

    fn operators(self) -> &'static [&'static str] {
        match self {
            Level::Disjunction => &["||"],
            Level::Conjunction => &["&&"],
            Level::Equality => &["==", "!=", "===", "!=="],
            Level::Comparison => &["<", ">", "<=", ">="],
            Level::NamedCheck => &["in", "is"],
            Level::Elvis => &["?:"],
            Level::Range => &["..", "..<"],
            Level::Additive => &["+", "-"],
            Level::Multiplicative => &["*", "/", "%"],
            Level::Cast => &["as"],
            Level::Infix => &[],
        }
    }

    /// Operators of these levels may start a continuation line.
    fn allows_newline_before(self) -> bool {
        matches!(self, Level::Disjunction | Level::Conjunction | Level::Elvis)
    }
}

pub(crate) struct Parser<'s> {
    source: &'s str,
    tokens: Vec<Token>,
    pos: usize,
    builder: TreeBuilder,
    error: Option<ParseError>,
}

impl<'s> Parser<'s> {
    pub(crate) fn new(source: &'s str, tokens: Vec<Token>) -> Self {
        Self {
            source,
            tokens,
            pos: 0,
            builder: TreeBuilder::new(NodeKind::File),
            error: None,
        }
    }

    pub(crate) fn parse_file(mut self) -> Result<SyntaxTree, ParseError> {
        self.file_annotations();
        if self.at("package") {
            self.package_directive();
        }
        if self.at("import") {
            self.import_list();
        }
        while let Some(i) = self.next_code() {
            let before = self.pos;
            if matches!(self.text(i), "}" | ")" | "]") {
                self.report_unexpected(i);
                self.bump_default();
            } else {
                self.statement();
            }
            self.ensure_progress(before);
        }
        self.trivia();
        if let Some(error) = self.error {
            return Err(error);
        }
        let tree = self.builder.finish();
        trace!(nodes = tree.len(), "Parsed file");
        Ok(tree)
    }

    // --- token access ---

    fn text(&self, i: usize) -> &'s str {
        let token = self.tokens[i];
        &self.source[token.start..token.end]
    }

    fn kind(&self, i: usize) -> TokenKind {
        self.tokens[i].kind
    }

    fn code_from(&self, from: usize) -> Option<usize> {
        (from..self.tokens.len()).find(|&i| !self.kind(i).is_trivia())
    }

    /// Index of the next code token.
    fn next_code(&self) -> Option<usize> {
        self.code_from(self.pos)
    }

    /// True when trivia in `from..to` contains a line break.
    fn newline_between(&self, from: usize, to: usize) -> bool {
        (from..to).any(|i| {
            self.kind(i) == TokenKind::Whitespace && self.text(i).contains(['\n', '\r'])
        })
    }

    fn at(&self, text: &str) -> bool {
        self.next_code().is_some_and(|i| self.text(i) == text)
    }

    /// True when the next code token is `text` and on the current line.
    fn at_same_line(&self, text: &str) -> bool {
        self.next_code()
            .is_some_and(|i| self.text(i) == text && !self.newline_between(self.pos, i))
    }

    /// True when the next token is `text` with no trivia in between.
    fn at_adjacent(&self, text: &str) -> bool {
        self.pos < self.tokens.len() && self.text(self.pos) == text
    }

    fn at_kind(&self, kind: TokenKind) -> bool {
        self.next_code().is_some_and(|i| self.kind(i) == kind)
    }

    fn at_name(&self) -> bool {
        self.at_kind(TokenKind::Identifier)
    }

    // --- emission ---

    fn trivia(&mut self) {
        while self.pos < self.tokens.len() && self.kind(self.pos).is_trivia() {
            let kind = match self.kind(self.pos) {
                TokenKind::EolComment => NodeKind::EolComment,
                TokenKind::BlockComment => NodeKind::BlockComment,
                TokenKind::Kdoc => NodeKind::Kdoc,
                _ => NodeKind::Whitespace,
            };
            self.builder.token(kind, self.text(self.pos));
            self.pos += 1;
        }
    }

    fn bump(&mut self, kind: NodeKind) {
        self.trivia();
        if self.pos < self.tokens.len() {
            self.builder.token(kind, self.text(self.pos));
            self.pos += 1;
        }
    }

    /// Emits `count` adjacent tokens as one leaf.
    fn bump_joined(&mut self, kind: NodeKind, count: usize) {
        self.trivia();
        let last = (self.pos + count).min(self.tokens.len());
        if last > self.pos {
            let (start, end) = (self.tokens[self.pos].start, self.tokens[last - 1].end);
            self.builder.token(kind, &self.source[start..end]);
            self.pos = last;
        }
    }

    fn bump_default(&mut self) {
        self.trivia();
        if self.pos < self.tokens.len() {
            let kind = self.default_kind(self.pos);
            self.bump(kind);
        }
    }

    fn default_kind(&self, i: usize) -> NodeKind {
        match self.kind(i) {
            TokenKind::Whitespace => NodeKind::Whitespace,
            TokenKind::EolComment => NodeKind::EolComment,
            TokenKind::BlockComment => NodeKind::BlockComment,
            TokenKind::Kdoc => NodeKind::Kdoc,
            TokenKind::Identifier => NodeKind::Identifier,
            TokenKind::Keyword => NodeKind::Keyword,
            TokenKind::Number => NodeKind::NumberLiteral,
            TokenKind::Char => NodeKind::CharLiteral,
            TokenKind::String => NodeKind::StringLiteral,
            TokenKind::Op => match self.text(i) {
                "." => NodeKind::Dot,
                "?." => NodeKind::SafeAccess,
                ":" => NodeKind::Colon,
                "=" => NodeKind::Eq,
                "," => NodeKind::Comma,
                ";" => NodeKind::Semicolon,
                "(" => NodeKind::LPar,
                ")" => NodeKind::RPar,
                "{" => NodeKind::LBrace,
                "}" => NodeKind::RBrace,
                "->" => NodeKind::Arrow,
                "@" => NodeKind::At,
                _ => NodeKind::Punctuation,
            },
        }
    }

    fn start(&mut self, kind: NodeKind) {
        self.trivia();
        self.builder.start_node(kind);
    }

    fn finish(&mut self) {
        self.builder.finish_node();
    }

    fn checkpoint(&mut self) -> Checkpoint {
        self.trivia();
        self.builder.checkpoint()
    }

    fn ensure_progress(&mut self, before: usize) {
        if self.pos == before {
            self.bump_default();
        }
    }

    /// Consumes the closing token `close`, or records an error when the
    /// input ends first.
    fn expect_close(&mut self, close: &str, kind: NodeKind, what: &'static str, open: usize) {
        if self.at(close) {
            self.bump(kind);
        } else if self.next_code().is_none() {
            let offset = self.tokens.get(open).map_or(0, |t| t.start);
            self.record(ParseError::unterminated(self.source, what, offset));
        }
    }

    fn record(&mut self, error: ParseError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    fn report_unexpected(&mut self, i: usize) {
        let error = ParseError::unexpected(self.source, self.text(i), self.tokens[i].start);
        self.record(error);
    }

    /// Emits tokens up to and including the bracket matching the one at
    /// the cursor.
    fn balanced(&mut self, open: &str, close: &str) {
        let start = self.next_code().unwrap_or(self.pos);
        let mut depth = 0usize;
        while let Some(i) = self.next_code() {
            let text = self.text(i);
            if text == open {
                depth += 1;
            } else if text == close {
                depth = depth.saturating_sub(1);
            }
            self.bump_default();
            if depth == 0 {
                return;
            }
        }
        let offset = self.tokens.get(start).map_or(0, |t| t.start);
        self.record(ParseError::unterminated(self.source, "bracket", offset));
    }

    /// Emits a `<...>` type argument or parameter list. Stops early at
    /// tokens that cannot appear inside one.
    fn angles(&mut self) {
        let mut depth = 0usize;
        while let Some(i) = self.next_code() {
            match self.text(i) {
                "<" => depth += 1,
                ">" => depth = depth.saturating_sub(1),
                "{" | "}" | ";" | "=" => return,
                _ => {}
            }
            self.bump_default();
            if depth == 0 {
                return;
            }
        }
    }

    // --- file header ---

    fn file_annotations(&mut self) {
        let mut open = false;
        while self.at_file_annotation() {
            if !open {
                self.start(NodeKind::FileAnnotationList);
                open = true;
            }
            self.annotation();
        }
        if open {
            self.finish();
        }
    }

    fn at_file_annotation(&self) -> bool {
        let Some(at) = self.next_code() else {
            return false;
        };
        self.text(at) == "@"
            && at + 2 < self.tokens.len()
            && self.text(at + 1) == "file"
            && self.text(at + 2) == ":"
    }

    fn package_directive(&mut self) {
        self.start(NodeKind::PackageDirective);
        self.bump(NodeKind::Keyword);
        self.qualified_name();
        self.finish();
    }

    fn import_list(&mut self) {
        self.start(NodeKind::ImportList);
        while self.at("import") {
            self.start(NodeKind::ImportDirective);
            self.bump(NodeKind::Keyword);
            self.qualified_name();
            if self.at_same_line("as") {
                self.bump(NodeKind::Keyword);
                self.bump(NodeKind::Identifier);
            }
            self.finish();
            if self.at_same_line(";") {
                self.bump(NodeKind::Semicolon);
            }
        }
        self.finish();
    }

    fn qualified_name(&mut self) {
        loop {
            let Some(i) = self.next_code() else { return };
            if self.newline_between(self.pos, i) {
                return;
            }
            match (self.kind(i), self.text(i)) {
                (TokenKind::Identifier | TokenKind::Keyword, _) if self.text(i) != "as" => {
                    self.bump(NodeKind::Identifier);
                }
                (_, ".") => self.bump(NodeKind::Dot),
                (_, "*") => self.bump(NodeKind::Punctuation),
                _ => return,
            }
        }
    }

    // --- declarations ---

    fn statement(&mut self) {
        if self.at(";") {
            self.bump(NodeKind::Semicolon);
        } else if self.looks_like_declaration() {
            self.declaration();
        } else {
            self.expression_statement();
        }
    }

    /// Skips annotations and modifiers ahead and checks whether a
    /// declaration keyword follows.
    fn looks_like_declaration(&self) -> bool {
        let mut i = self.next_code();
        while let Some(at) = i {
            let text = self.text(at);
            if text == "@" {
                i = self.skip_annotation(at);
            } else if self.kind(at) == TokenKind::Identifier && MODIFIERS.contains(&text) {
                i = self.code_from(at + 1);
            } else {
                return self.kind(at) == TokenKind::Keyword && DECLARATION_KEYWORDS.contains(&text);
            }
        }
        false
    }

    /// Index of the first code token after the annotation starting at `at`.
    fn skip_annotation(&self, at: usize) -> Option<usize> {
        let mut i = at + 1;
        if i + 1 < self.tokens.len()
            && self.kind(i) == TokenKind::Identifier
            && self.text(i + 1) == ":"
        {
            i += 2;
        }
        while i < self.tokens.len() && (self.kind(i) == TokenKind::Identifier || self.text(i) == ".") {
            i += 1;
        }
        if i < self.tokens.len() && self.text(i) == "(" {
            let mut depth = 0usize;
            while i < self.tokens.len() {
                match self.text(i) {
                    "(" => depth += 1,
                    ")" => {
                        depth -= 1;
                        if depth == 0 {
                            i += 1;
                            break;
                        }
                    }
                    _ => {}
                }
                i += 1;
            }
        }
        self.code_from(i)
    }

    fn declaration(&mut self) {
        let cp = self.checkpoint();
        self.modifier_list();
        let Some(i) = self.next_code() else { return };
        match self.text(i) {
            "class" | "interface" | "object" => {
                self.builder.start_node_at(cp, NodeKind::Class);
                self.class_rest();
                self.finish();
            }
            "fun" => {
                self.builder.start_node_at(cp, NodeKind::Function);
                self.function_rest();
                self.finish();
            }
            "val" | "var" => {
                self.builder.start_node_at(cp, NodeKind::Property);
                self.property_rest();
                self.finish();
            }
            _ => self.rest_of_line(),
        }
    }

    /// Emits plain tokens until the end of the current line.
    fn rest_of_line(&mut self) {
        while let Some(i) = self.next_code() {
            if self.newline_between(self.pos, i) || matches!(self.text(i), "}" | ")") {
                return;
            }
            match self.text(i) {
                "(" => self.balanced("(", ")"),
                "{" => self.block(),
                _ => self.bump_default(),
            }
        }
    }

    fn modifier_list(&mut self) {
        let Some(i) = self.next_code() else { return };
        let text = self.text(i);
        if text != "@" && !MODIFIERS.contains(&text) {
            return;
        }
        self.start(NodeKind::ModifierList);
        while let Some(i) = self.next_code() {
            if self.text(i) == "@" {
                self.annotation();
            } else if self.kind(i) == TokenKind::Identifier && MODIFIERS.contains(&self.text(i)) {
                self.bump(NodeKind::Keyword);
            } else {
                break;
            }
        }
        self.finish();
    }

    fn annotation(&mut self) {
        self.start(NodeKind::Annotation);
        self.bump(NodeKind::At);
        if self.at_adjacent("[") {
            self.balanced("[", "]");
            self.finish();
            return;
        }
        if self.pos + 1 < self.tokens.len()
            && self.kind(self.pos) == TokenKind::Identifier
            && self.text(self.pos + 1) == ":"
        {
            self.bump(NodeKind::Identifier);
            self.bump(NodeKind::Colon);
        }
        if self.at_kind(TokenKind::Identifier) {
            self.bump(NodeKind::Identifier);
        }
        while self.at_adjacent(".") {
            self.bump(NodeKind::Dot);
            self.bump(NodeKind::Identifier);
        }
        if self.at_adjacent("<") {
            self.angles();
        }
        if self.at_adjacent("(") {
            self.value_arguments();
        }
        self.finish();
    }

    fn class_rest(&mut self) {
        self.bump(NodeKind::Keyword);
        if self.at_name() {
            self.bump(NodeKind::Identifier);
        }
        if self.at_same_line("<") {
            self.angles();
        }
        let constructor_modifiers = self.next_code().is_some_and(|i| {
            !self.newline_between(self.pos, i)
                && (self.text(i) == "@"
                    || self.text(i) == "constructor"
                    || MODIFIERS.contains(&self.text(i)))
        });
        if constructor_modifiers {
            self.modifier_list();
            if self.at("constructor") {
                self.bump(NodeKind::Keyword);
            }
        }
        if self.at_same_line("(") {
            self.value_parameter_list();
        }
        if self.at(":") {
            self.bump(NodeKind::Colon);
            self.super_types();
        }
        if self.at("where") {
            self.rest_of_line_until("{");
        }
        if self.at("{") {
            self.class_body();
        }
    }

    fn super_types(&mut self) {
        loop {
            self.type_reference();
            if self.at_adjacent("(") {
                self.value_arguments();
            }
            if self.at_same_line("by") {
                self.bump(NodeKind::Keyword);
                self.expression();
            }
            if self.at(",") {
                self.bump(NodeKind::Comma);
            } else {
                return;
            }
        }
    }

    fn rest_of_line_until(&mut self, stop: &str) {
        while let Some(i) = self.next_code() {
            if self.text(i) == stop {
                return;
            }
            self.bump_default();
        }
    }

    fn class_body(&mut self) {
        self.start(NodeKind::ClassBody);
        let open = self.next_code().unwrap_or(self.pos);
        self.bump(NodeKind::LBrace);
        self.statements_until_brace();
        self.expect_close("}", NodeKind::RBrace, "class body", open);
        self.finish();
    }

    fn statements_until_brace(&mut self) {
        while let Some(i) = self.next_code() {
            let text = self.text(i);
            if text == "}" {
                return;
            }
            let before = self.pos;
            if matches!(text, ")" | "]") {
                self.report_unexpected(i);
                self.bump_default();
            } else {
                self.statement();
            }
            self.ensure_progress(before);
        }
    }

    fn function_rest(&mut self) {
        self.bump(NodeKind::Keyword);
        if self.at_same_line("<") {
            self.angles();
        }
        self.declaration_name();
        if self.at("(") {
            self.value_parameter_list();
        }
        if self.at(":") {
            self.bump(NodeKind::Colon);
            self.type_reference();
        }
        if self.at("where") {
            self.rest_of_line_until("{");
        }
        if self.at("{") {
            self.block();
        } else if self.at("=") {
            self.bump(NodeKind::Eq);
            self.expression();
        }
    }

    /// Name of a function or property, with an optional receiver type.
    fn declaration_name(&mut self) {
        while let Some(i) = self.next_code() {
            if self.kind(i) != TokenKind::Identifier || self.newline_between(self.pos, i) {
                return;
            }
            self.bump(NodeKind::Identifier);
            if self.at_adjacent("<") {
                self.angles();
            }
            if self.at_adjacent("?") {
                self.bump(NodeKind::Punctuation);
            }
            if self.at_adjacent(".") || self.at_adjacent("?.") {
                let kind = self.default_kind(self.pos);
                self.bump(kind);
            } else {
                return;
            }
        }
    }

    fn property_rest(&mut self) {
        self.bump(NodeKind::Keyword);
        if self.at_same_line("<") {
            self.angles();
        }
        if self.at_same_line("(") {
            self.balanced("(", ")");
        } else {
            self.declaration_name();
        }
        if self.at_same_line(":") {
            self.bump(NodeKind::Colon);
            self.type_reference();
        }
        if self.at("=") {
            self.bump(NodeKind::Eq);
            self.expression();
        } else if self.at_same_line("by") {
            self.bump(NodeKind::Keyword);
            self.expression();
        }
    }

    fn value_parameter_list(&mut self) {
        self.start(NodeKind::ValueParameterList);
        let open = self.next_code().unwrap_or(self.pos);
        self.bump(NodeKind::LPar);
        while let Some(i) = self.next_code() {
            if self.text(i) == ")" {
                break;
            }
            let before = self.pos;
            self.value_parameter();
            if self.at(",") {
                self.bump(NodeKind::Comma);
            }
            self.ensure_progress(before);
        }
        self.expect_close(")", NodeKind::RPar, "parameter list", open);
        self.finish();
    }

    fn value_parameter(&mut self) {
        self.start(NodeKind::ValueParameter);
        let has_modifiers = self.next_code().is_some_and(|i| {
            self.text(i) == "@"
                || (MODIFIERS.contains(&self.text(i))
                    && self.code_from(i + 1).is_some_and(|n| {
                        matches!(self.kind(n), TokenKind::Identifier | TokenKind::Keyword)
                            || self.text(n) == "@"
                    }))
        });
        if has_modifiers {
            self.modifier_list();
        }
        if self.at("val") || self.at("var") {
            self.bump(NodeKind::Keyword);
        }
        if self.at_name() {
            self.bump(NodeKind::Identifier);
        }
        if self.at(":") {
            self.bump(NodeKind::Colon);
            self.type_reference();
        }
        if self.at("=") {
            self.bump(NodeKind::Eq);
            self.expression();
        }
        self.finish();
    }

    fn type_reference(&mut self) {
        self.start(NodeKind::TypeReference);
        self.type_inner();
        self.finish();
    }

    fn type_inner(&mut self) {
        while self.at("suspend") {
            self.bump(NodeKind::Keyword);
        }
        while self.at("@") {
            self.annotation();
        }
        if self.at("(") {
            self.balanced("(", ")");
        } else {
            if !self.at_name() {
                return;
            }
            self.bump(NodeKind::Identifier);
            if self.at_adjacent("<") {
                self.angles();
            }
            while self.at_adjacent(".") && self.pos + 1 < self.tokens.len() {
                if self.text(self.pos + 1) == "(" {
                    // receiver of a function type
                    self.bump(NodeKind::Dot);
                    self.balanced("(", ")");
                    break;
                }
                self.bump(NodeKind::Dot);
                self.bump(NodeKind::Identifier);
                if self.at_adjacent("<") {
                    self.angles();
                }
            }
        }
        if self.at_adjacent("?") {
            self.bump(NodeKind::Punctuation);
        }
        if self.at_same_line("->") {
            self.bump(NodeKind::Arrow);
            self.type_inner();
        }
    }

    // --- statements and blocks ---

    fn expression_statement(&mut self) {
        let cp = self.checkpoint();
        if !self.expression() {
            return;
        }
        if let Some(i) = self.next_code() {
            if ASSIGNMENTS.contains(&self.text(i)) && !self.newline_between(self.pos, i) {
                self.builder.start_node_at(cp, NodeKind::BinaryExpression);
                self.bump(NodeKind::OperationReference);
                self.expression();
                self.finish();
            }
        }
    }

    fn block(&mut self) {
        self.start(NodeKind::Block);
        let open = self.next_code().unwrap_or(self.pos);
        self.bump(NodeKind::LBrace);
        self.statements_until_brace();
        self.expect_close("}", NodeKind::RBrace, "block", open);
        self.finish();
    }

    fn lambda(&mut self) {
        self.start(NodeKind::LambdaExpression);
        let open = self.next_code().unwrap_or(self.pos);
        self.bump(NodeKind::LBrace);
        if self.has_lambda_parameters() {
            while self.next_code().is_some() && !self.at("->") {
                self.bump_default();
            }
            self.bump(NodeKind::Arrow);
        }
        self.statements_until_brace();
        self.expect_close("}", NodeKind::RBrace, "lambda", open);
        self.finish();
    }

    fn has_lambda_parameters(&self) -> bool {
        let mut i = self.next_code();
        while let Some(at) = i {
            let text = self.text(at);
            if text == "->" {
                return true;
            }
            let parameter_token = matches!(self.kind(at), TokenKind::Identifier)
                || matches!(text, "," | ":" | "(" | ")" | "<" | ">" | "?" | ".");
            if !parameter_token {
                return false;
            }
            i = self.code_from(at + 1);
        }
        false
    }

    /// Body of a control structure: a block or a single expression.
    fn control_body(&mut self) {
        if self.at("{") {
            self.block();
        } else if self.looks_like_declaration() {
            self.declaration();
        } else {
            self.expression_statement();
        }
    }

    // --- expressions ---

    /// Parses an expression, returning false when none starts here.
    fn expression(&mut self) -> bool {
        self.binary(Level::Disjunction)
    }

    fn binary(&mut self, level: Level) -> bool {
        let cp = self.checkpoint();
        if !self.operand(level) {
            return false;
        }
        while let Some(count) = self.binary_operator(level) {
            self.builder.start_node_at(cp, NodeKind::BinaryExpression);
            self.bump_joined(NodeKind::OperationReference, count);
            if matches!(level, Level::Cast | Level::NamedCheck) && self.type_follows_operator() {
                self.type_reference();
            } else {
                self.operand(level);
            }
            self.finish();
        }
        true
    }

    fn operand(&mut self, level: Level) -> bool {
        match level.next() {
            Some(next) => self.binary(next),
            None => self.prefix(),
        }
    }

    fn type_follows_operator(&self) -> bool {
        let Some(end) = self.pos.checked_sub(1) else {
            return false;
        };
        matches!(self.text(end), "as" | "is" | "?")
    }

    /// Number of tokens forming a binary operator of `level` at the cursor.
    fn binary_operator(&self, level: Level) -> Option<usize> {
        let i = self.next_code()?;
        if self.newline_between(self.pos, i) && !level.allows_newline_before() {
            return None;
        }
        let text = self.text(i);
        let adjacent = |text: &str| i + 1 < self.tokens.len() && self.text(i + 1) == text;
        match level {
            Level::Infix => {
                let candidate = self.kind(i) == TokenKind::Identifier
                    && !NOT_INFIX.contains(&text)
                    && !MODIFIERS.contains(&text);
                // the operand may start on the next line, the name may not
                let operand_follows = self
                    .code_from(i + 1)
                    .is_some_and(|n| self.starts_expression(n));
                (candidate && operand_follows).then_some(1)
            }
            Level::NamedCheck if text == "!" && (adjacent("in") || adjacent("is")) => Some(2),
            Level::Cast if text == "as" && adjacent("?") => Some(2),
            _ if level.operators().contains(&text) => Some(1),
            _ => None,
        }
    }

    fn starts_expression(&self, i: usize) -> bool {
        match self.kind(i) {
            TokenKind::Identifier
            | TokenKind::Number
            | TokenKind::Char
            | TokenKind::String => true,
            TokenKind::Keyword => matches!(
                self.text(i),
                "true" | "false" | "null" | "this" | "super" | "if" | "when" | "try" | "object"
            ),
            TokenKind::Op => matches!(self.text(i), "(" | "{" | "!" | "-" | "+" | "::" | "@" | "["),
            _ => false,
        }
    }

    fn prefix(&mut self) -> bool {
        let Some(i) = self.next_code() else {
            return false;
        };
        match self.text(i) {
            "@" => {
                self.start(NodeKind::AnnotatedExpression);
                self.annotation();
                self.prefix();
                self.finish();
                true
            }
            "-" | "+" | "!" | "++" | "--" => {
                self.start(NodeKind::PrefixExpression);
                self.bump(NodeKind::PrefixOperator);
                self.prefix();
                self.finish();
                true
            }
            _ => self.postfix(),
        }
    }

    fn postfix(&mut self) -> bool {
        let cp = self.checkpoint();
        if !self.primary() {
            return false;
        }
        while let Some(i) = self.next_code() {
            let newline = self.newline_between(self.pos, i);
            match self.text(i) {
                "." | "?." => {
                    let (node, token) = if self.text(i) == "." {
                        (NodeKind::DotQualifiedExpression, NodeKind::Dot)
                    } else {
                        (NodeKind::SafeAccessExpression, NodeKind::SafeAccess)
                    };
                    self.builder.start_node_at(cp, node);
                    self.bump(token);
                    self.selector();
                    self.finish();
                }
                "::" => {
                    self.bump(NodeKind::Punctuation);
                    self.bump_default();
                }
                "(" if !newline => {
                    self.builder.start_node_at(cp, NodeKind::CallExpression);
                    self.value_arguments();
                    self.finish();
                }
                "[" if !newline => self.indexing(),
                "!!" | "++" | "--" if !newline => self.bump(NodeKind::Punctuation),
                _ => break,
            }
        }
        true
    }

    fn indexing(&mut self) {
        let open = self.next_code().unwrap_or(self.pos);
        self.bump(NodeKind::Punctuation);
        while let Some(i) = self.next_code() {
            if self.text(i) == "]" {
                break;
            }
            let before = self.pos;
            self.expression();
            if self.at(",") {
                self.bump(NodeKind::Comma);
            }
            self.ensure_progress(before);
        }
        self.expect_close("]", NodeKind::Punctuation, "index", open);
    }

    /// Member after a `.` or `?.`, with an optional call suffix.
    fn selector(&mut self) {
        let cp = self.checkpoint();
        let Some(i) = self.next_code() else { return };
        match self.kind(i) {
            TokenKind::Identifier => self.bump(NodeKind::Identifier),
            TokenKind::Keyword => self.bump(NodeKind::Keyword),
            _ => return,
        }
        self.call_suffix(cp);
    }

    /// Wraps what was emitted since `cp` into a call when arguments or a
    /// trailing lambda follow on the same line.
    fn call_suffix(&mut self, cp: Checkpoint) {
        if self.at_adjacent("<") && self.type_arguments_follow() {
            self.angles();
        }
        let arguments = self.at_same_line("(");
        let lambda = !arguments && self.at_same_line("{");
        if !arguments && !lambda {
            return;
        }
        self.builder.start_node_at(cp, NodeKind::CallExpression);
        if arguments {
            self.value_arguments();
        }
        while self.at_same_line("{") {
            self.lambda();
        }
        self.finish();
    }

    /// True when the `<` at the cursor opens type arguments followed by a
    /// call, as in `listOf<String>()`.
    fn type_arguments_follow(&self) -> bool {
        let mut depth = 0usize;
        for i in self.pos..self.tokens.len() {
            match self.text(i) {
                "<" => depth += 1,
                ">" => {
                    depth -= 1;
                    if depth == 0 {
                        return i + 1 < self.tokens.len() && matches!(self.text(i + 1), "(" | "{");
                    }
                }
                "," | "." | "?" | "*" => {}
                _ if self.kind(i) == TokenKind::Identifier || self.kind(i) == TokenKind::Whitespace => {}
                _ => return false,
            }
        }
        false
    }

    fn value_arguments(&mut self) {
        self.start(NodeKind::ValueArgumentList);
        let open = self.next_code().unwrap_or(self.pos);
        self.bump(NodeKind::LPar);
        while let Some(i) = self.next_code() {
            if self.text(i) == ")" {
                break;
            }
            let before = self.pos;
            self.start(NodeKind::ValueArgument);
            let named = self.kind(i) == TokenKind::Identifier
                && self.code_from(i + 1).is_some_and(|n| self.text(n) == "=");
            if named {
                self.bump(NodeKind::Identifier);
                self.bump(NodeKind::Eq);
            }
            if self.at("*") {
                self.bump(NodeKind::PrefixOperator);
            }
            self.expression();
            self.finish();
            if self.at(",") {
                self.bump(NodeKind::Comma);
            } else if let Some(j) = self.next_code().filter(|&j| self.text(j) != ")") {
                if matches!(self.text(j), "}" | "]") {
                    self.report_unexpected(j);
                }
                self.bump_default();
            }
            self.ensure_progress(before);
        }
        self.expect_close(")", NodeKind::RPar, "argument list", open);
        self.finish();
    }

    fn primary(&mut self) -> bool {
        let Some(i) = self.next_code() else {
            return false;
        };
        let text = self.text(i);
        match self.kind(i) {
            TokenKind::String => {
                self.start(NodeKind::StringTemplate);
                self.bump(NodeKind::StringLiteral);
                self.finish();
            }
            TokenKind::Number => self.bump(NodeKind::NumberLiteral),
            TokenKind::Char => self.bump(NodeKind::CharLiteral),
            TokenKind::Identifier => {
                let cp = self.checkpoint();
                self.bump(NodeKind::Identifier);
                self.label();
                self.call_suffix(cp);
            }
            TokenKind::Keyword => return self.keyword_expression(text),
            TokenKind::Op => match text {
                "(" => self.parenthesized(),
                "{" => self.lambda(),
                "::" => {
                    self.bump(NodeKind::Punctuation);
                    self.bump_default();
                }
                "[" => self.balanced("[", "]"),
                _ => return false,
            },
            _ => return false,
        }
        true
    }

    /// `@label` directly after `return`, `this`, a lambda call or a loop.
    fn label(&mut self) {
        if self.at_adjacent("@") && self.pos + 1 < self.tokens.len() && self.kind(self.pos + 1) == TokenKind::Identifier {
            self.bump(NodeKind::At);
            self.bump(NodeKind::Identifier);
        }
    }

    fn keyword_expression(&mut self, keyword: &str) -> bool {
        match keyword {
            "true" | "false" | "null" => self.bump(NodeKind::Keyword),
            "this" | "super" => {
                self.bump(NodeKind::Keyword);
                self.label();
                if self.at_adjacent("<") {
                    self.angles();
                }
            }
            "if" => self.if_expression(),
            "return" => {
                self.start(NodeKind::ReturnExpression);
                self.bump(NodeKind::Keyword);
                self.label();
                self.same_line_operand();
                self.finish();
            }
            "throw" => {
                self.bump(NodeKind::Keyword);
                self.expression();
            }
            "break" | "continue" => {
                self.bump(NodeKind::Keyword);
                self.label();
            }
            "when" => self.when_expression(),
            "try" => {
                self.bump(NodeKind::Keyword);
                self.control_body();
                while self.at("catch") {
                    self.bump(NodeKind::Keyword);
                    if self.at("(") {
                        self.balanced("(", ")");
                    }
                    self.control_body();
                }
                if self.at("finally") {
                    self.bump(NodeKind::Keyword);
                    self.control_body();
                }
            }
            "while" | "for" => {
                self.bump(NodeKind::Keyword);
                if self.at("(") {
                    self.balanced("(", ")");
                }
                self.control_body();
            }
            "do" => {
                self.bump(NodeKind::Keyword);
                self.control_body();
                if self.at("while") {
                    self.bump(NodeKind::Keyword);
                    if self.at("(") {
                        self.balanced("(", ")");
                    }
                }
            }
            "object" => {
                self.bump(NodeKind::Keyword);
                if self.at(":") {
                    self.bump(NodeKind::Colon);
                    self.super_types();
                }
                if self.at("{") {
                    self.class_body();
                }
            }
            "fun" => self.function_rest(),
            _ => return false,
        }
        true
    }

    fn same_line_operand(&mut self) {
        let follows = self
            .next_code()
            .is_some_and(|i| !self.newline_between(self.pos, i) && self.starts_expression(i));
        if follows {
            self.expression();
        }
    }

    fn parenthesized(&mut self) {
        self.start(NodeKind::ParenthesizedExpression);
        let open = self.next_code().unwrap_or(self.pos);
        self.bump(NodeKind::LPar);
        self.expression();
        self.junk_until(")");
        self.expect_close(")", NodeKind::RPar, "parenthesis", open);
        self.finish();
    }

    /// Emits unexpected tokens as plain leaves until `close` or a closing
    /// bracket of an outer construct.
    fn junk_until(&mut self, close: &str) {
        while let Some(i) = self.next_code() {
            match self.text(i) {
                t if t == close => return,
                "}" | "]" | ")" => {
                    self.report_unexpected(i);
                    return;
                }
                "(" => self.balanced("(", ")"),
                "{" => self.lambda(),
                _ => self.bump_default(),
            }
        }
    }

    fn if_expression(&mut self) {
        self.start(NodeKind::IfExpression);
        self.bump(NodeKind::Keyword);
        if self.at("(") {
            let open = self.next_code().unwrap_or(self.pos);
            self.bump(NodeKind::LPar);
            self.start(NodeKind::Condition);
            self.expression();
            self.finish();
            self.junk_until(")");
            self.expect_close(")", NodeKind::RPar, "condition", open);
        }
        let has_then = self
            .next_code()
            .is_some_and(|i| !matches!(self.text(i), "else" | "}" | ")" | "]" | ";"));
        if has_then {
            self.start(NodeKind::Then);
            self.control_body();
            self.finish();
        }
        if self.at("else") {
            self.bump(NodeKind::Keyword);
            self.start(NodeKind::Else);
            self.control_body();
            self.finish();
        }
        self.finish();
    }

    fn when_expression(&mut self) {
        self.bump(NodeKind::Keyword);
        if self.at_same_line("(") {
            let open = self.next_code().unwrap_or(self.pos);
            self.bump(NodeKind::LPar);
            if self.looks_like_declaration() {
                self.declaration();
            } else {
                self.expression();
            }
            self.junk_until(")");
            self.expect_close(")", NodeKind::RPar, "when subject", open);
        }
        if !self.at("{") {
            return;
        }
        self.start(NodeKind::Block);
        let open = self.next_code().unwrap_or(self.pos);
        self.bump(NodeKind::LBrace);
        while let Some(i) = self.next_code() {
            if self.text(i) == "}" {
                break;
            }
            let before = self.pos;
            self.when_entry();
            self.ensure_progress(before);
        }
        self.expect_close("}", NodeKind::RBrace, "when", open);
        self.finish();
    }

    fn when_entry(&mut self) {
        while let Some(i) = self.next_code() {
            match self.text(i) {
                "->" => {
                    self.bump(NodeKind::Arrow);
                    self.control_body();
                    return;
                }
                "}" => return,
                "," => self.bump(NodeKind::Comma),
                "else" => self.bump(NodeKind::Keyword),
                "in" | "is" => {
                    self.bump(NodeKind::Keyword);
                    if self.text(i) == "is" {
                        self.type_reference();
                    } else {
                        self.expression();
                    }
                }
                "!" if i + 1 < self.tokens.len() && matches!(self.text(i + 1), "in" | "is") => {
                    let is_check = self.text(i + 1) == "is";
                    self.bump_joined(NodeKind::Keyword, 2);
                    if is_check {
                        self.type_reference();
                    } else {
                        self.expression();
                    }
                }
                _ => {
                    let before = self.pos;
                    self.expression();
                    self.ensure_progress(before);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;
    use kolint_core::NodeId;

    fn find(tree: &SyntaxTree, kind: NodeKind) -> Vec<NodeId> {
        tree.descendants(tree.root())
            .into_iter()
            .filter(|&n| tree.kind(n) == kind)
            .collect()
    }

    fn texts(tree: &SyntaxTree, kind: NodeKind) -> Vec<String> {
        find(tree, kind)
            .into_iter()
            .map(|n| tree.text(n).to_string())
            .collect()
    }

    #[test]
    fn renders_input_unchanged() {
        let sources = [
            "package a.b\n\nimport c.d.E\nimport f.*\n\nfun main() {\n    println(\"hi\")\n}\n",
            "@file:Suppress(\"ktlint\")\n\nclass A(val x: Int, private var y: String = \"\") : B(), C {\n    fun f(): Int = x + 1\n}\n",
            "val s = \"\"\"\n  raw ${x}\n\"\"\".trimIndent()\n",
            "fun f(x: Int?) = when (x) {\n    1, 2 -> \"a\"\n    is Int -> { \"b\" }\n    else -> null\n}\n",
            "fun g() {\n    for (i in 0..10) { if (i % 2 == 0) continue }\n    try { a() } catch (e: Exception) { b() } finally { c() }\n}\n",
            "val f: (Int) -> String = { it -> it.toString() }\nval m = mapOf<String, Int>(\"a\" to 1)\n",
            "object O {\n    val x by lazy { 1 }\n    var y = x!!\n        private set\n}\n",
            "fun `name with spaces`() = listOf(1, 2).map { it * 2 }.filter { it > 2 }?.size ?: 0\r\n",
            "/* block */ // eol\n/** kdoc */\nfun h() = this@h\n",
        ];
        for source in sources {
            let tree = parse(source).unwrap();
            assert_eq!(tree.render(), source);
        }
    }

    #[test]
    fn property_with_binary_initializer() {
        let tree = parse("val bar = leftHandSideExpression && rightHandSideExpression\n").unwrap();
        insta::assert_snapshot!(tree.dump(), @r###"
        FILE
          PROPERTY
            KEYWORD "val"
            WHITE_SPACE " "
            IDENTIFIER "bar"
            WHITE_SPACE " "
            EQ "="
            WHITE_SPACE " "
            BINARY_EXPRESSION
              IDENTIFIER "leftHandSideExpression"
              WHITE_SPACE " "
              OPERATION_REFERENCE "&&"
              WHITE_SPACE " "
              IDENTIFIER "rightHandSideExpression"
          WHITE_SPACE "\n"
        "###);
    }

    #[test]
    fn binary_precedence() {
        let tree = parse("val x = a || b && c == d + e * f\n").unwrap();
        assert_eq!(
            texts(&tree, NodeKind::BinaryExpression),
            vec!["a || b && c == d + e * f", "b && c == d + e * f", "c == d + e * f", "d + e * f", "e * f"]
        );
    }

    #[test]
    fn binary_operators_are_left_associative() {
        let tree = parse("val x = a + b - c\n").unwrap();
        assert_eq!(
            texts(&tree, NodeKind::BinaryExpression),
            vec!["a + b - c", "a + b"]
        );
    }

    #[test]
    fn continuation_operators_may_start_a_line() {
        let tree = parse("val x = a\n    && b\n    ?: c\nval y = d\n- e\n").unwrap();
        let binaries = texts(&tree, NodeKind::BinaryExpression);
        assert_eq!(binaries, vec!["a\n    && b\n    ?: c", "b\n    ?: c"]);
        assert_eq!(find(&tree, NodeKind::Property).len(), 2);
        assert_eq!(texts(&tree, NodeKind::PrefixExpression), vec!["- e"]);
    }

    #[test]
    fn infix_call_may_continue_on_the_next_line() {
        let tree = parse("val m = mapOf(\n    KEY to\n        value.toString(),\n)\nval n = a\nto(b)\n").unwrap();
        assert_eq!(
            texts(&tree, NodeKind::BinaryExpression),
            vec!["KEY to\n        value.toString()"]
        );
        assert_eq!(find(&tree, NodeKind::Property).len(), 2);
    }

    #[test]
    fn call_chain_nests_calls_inside_qualified_expressions() {
        let tree = parse("val x = a.b().c { it }\n").unwrap();
        assert_eq!(
            texts(&tree, NodeKind::DotQualifiedExpression),
            vec!["a.b().c { it }", "a.b()"]
        );
        assert_eq!(texts(&tree, NodeKind::CallExpression), vec!["b()", "c { it }"]);
        assert_eq!(texts(&tree, NodeKind::LambdaExpression), vec!["{ it }"]);
    }

    #[test]
    fn chain_operator_may_start_a_line() {
        let tree = parse("val x = a\n    .b()\n    ?.c()\n").unwrap();
        assert_eq!(texts(&tree, NodeKind::SafeAccessExpression), vec!["a\n    .b()\n    ?.c()"]);
        assert_eq!(texts(&tree, NodeKind::DotQualifiedExpression), vec!["a\n    .b()"]);
    }

    #[test]
    fn if_with_condition_and_branches() {
        let tree = parse("fun f() = if (a && b) c else d\n").unwrap();
        assert_eq!(texts(&tree, NodeKind::Condition), vec!["a && b"]);
        assert_eq!(texts(&tree, NodeKind::Then), vec!["c"]);
        assert_eq!(texts(&tree, NodeKind::Else), vec!["d"]);
    }

    #[test]
    fn declarations_with_modifiers_and_annotations() {
        let tree = parse("@Suppress(\"x\")\nprivate data class A(@Ann val b: Int)\n").unwrap();
        let class = find(&tree, NodeKind::Class)[0];
        let modifiers = tree.find_child(class, NodeKind::ModifierList).unwrap();
        assert_eq!(tree.text(modifiers), "@Suppress(\"x\")\nprivate data");
        assert_eq!(texts(&tree, NodeKind::Annotation), vec!["@Suppress(\"x\")", "@Ann"]);
        assert_eq!(texts(&tree, NodeKind::ValueParameter), vec!["@Ann val b: Int"]);
        assert_eq!(texts(&tree, NodeKind::TypeReference), vec!["Int"]);
    }

    #[test]
    fn annotated_expression() {
        let tree = parse("fun f() {\n    @Suppress(\"x\") foo()\n}\n").unwrap();
        assert_eq!(texts(&tree, NodeKind::AnnotatedExpression), vec!["@Suppress(\"x\") foo()"]);
    }

    #[test]
    fn file_annotations_package_and_imports() {
        let tree = parse("@file:JvmName(\"X\")\npackage a.b\nimport c.D as E\n").unwrap();
        assert_eq!(texts(&tree, NodeKind::FileAnnotationList), vec!["@file:JvmName(\"X\")"]);
        assert_eq!(texts(&tree, NodeKind::PackageDirective), vec!["package a.b"]);
        assert_eq!(texts(&tree, NodeKind::ImportDirective), vec!["import c.D as E"]);
    }

    #[test]
    fn named_arguments_and_assignments() {
        let tree = parse("fun f() {\n    x = g(a = 1, b)\n}\n").unwrap();
        assert_eq!(texts(&tree, NodeKind::ValueArgument), vec!["a = 1", "b"]);
        assert_eq!(texts(&tree, NodeKind::BinaryExpression), vec!["x = g(a = 1, b)"]);
    }

    #[test]
    fn return_takes_operand_on_same_line_only() {
        let tree = parse("fun f() {\n    return\n    g()\n}\nfun h() { return (a && b) || c }\n").unwrap();
        assert_eq!(texts(&tree, NodeKind::ReturnExpression), vec!["return", "return (a && b) || c"]);
    }

    #[test]
    fn type_checks_and_casts_take_types() {
        let tree = parse("val x = a as? List<String>\nval y = b !is Foo\n").unwrap();
        assert_eq!(texts(&tree, NodeKind::TypeReference), vec!["List<String>", "Foo"]);
        assert_eq!(texts(&tree, NodeKind::OperationReference), vec!["as?", "!is"]);
    }

    #[test]
    fn stray_closing_brace_is_an_error() {
        let err = parse("fun f() {}\n}\n").unwrap_err();
        assert_eq!(err.position(), Some((2, 1)));
    }

    #[test]
    fn unclosed_block_is_an_error() {
        let err = parse("fun f() {\n    g()\n").unwrap_err();
        assert!(matches!(err, ParseError::Unterminated { what: "block", .. }), "{err}");
    }
}
