//! Tokenizer for Kotlin source text.
//!
//! Every byte of the input ends up in exactly one token, so concatenating
//! the token texts reproduces the input.

use crate::ParseError;

/// Coarse token classes. The parser refines them into node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Whitespace,
    EolComment,
    BlockComment,
    Kdoc,
    Identifier,
    Keyword,
    Number,
    Char,
    String,
    Op,
}

impl TokenKind {
    pub(crate) fn is_trivia(self) -> bool {
        matches!(
            self,
            Self::Whitespace | Self::EolComment | Self::BlockComment | Self::Kdoc
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Token {
    pub(crate) kind: TokenKind,
    pub(crate) start: usize,
    pub(crate) end: usize,
}

const HARD_KEYWORDS: &[&str] = &[
    "as", "break", "class", "continue", "do", "else", "false", "for", "fun", "if", "in",
    "interface", "is", "null", "object", "package", "return", "super", "this", "throw", "true",
    "try", "typealias", "typeof", "val", "var", "when", "while",
];

// longest first
const OPERATORS: &[&str] = &[
    "===", "!==", "..<", "?:", "?.", "::", "..", "->", "&&", "||", "==", "!=", "<=", ">=", "+=",
    "-=", "*=", "/=", "%=", "++", "--", "!!",
];

/// Splits `source` into tokens.
pub(crate) fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    let mut lexer = Lexer {
        source,
        pos: 0,
        tokens: Vec::new(),
    };
    while lexer.pos < source.len() {
        lexer.next_token()?;
    }
    Ok(lexer.tokens)
}

struct Lexer<'s> {
    source: &'s str,
    pos: usize,
    tokens: Vec<Token>,
}

impl Lexer<'_> {
    fn rest(&self) -> &str {
        &self.source[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        self.tokens.push(Token {
            kind,
            start,
            end: self.pos,
        });
    }

    fn unterminated(&self, what: &'static str, start: usize) -> ParseError {
        ParseError::unterminated(self.source, what, start)
    }

    fn next_token(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        let Some(c) = self.peek() else {
            return Ok(());
        };
        if c.is_whitespace() {
            while self.peek().is_some_and(char::is_whitespace) {
                self.bump();
            }
            self.push(TokenKind::Whitespace, start);
        } else if self.rest().starts_with("//") {
            while self.peek().is_some_and(|c| c != '\n' && c != '\r') {
                self.bump();
            }
            self.push(TokenKind::EolComment, start);
        } else if self.rest().starts_with("/*") {
            let kdoc = self.rest().starts_with("/**") && !self.rest().starts_with("/**/");
            self.block_comment(start)?;
            let kind = if kdoc {
                TokenKind::Kdoc
            } else {
                TokenKind::BlockComment
            };
            self.push(kind, start);
        } else if c == '"' {
            self.string(start)?;
            self.push(TokenKind::String, start);
        } else if c == '\'' {
            self.char_literal(start)?;
            self.push(TokenKind::Char, start);
        } else if c == '`' {
            self.bump();
            while self.peek().is_some_and(|c| c != '`' && c != '\n') {
                self.bump();
            }
            if self.peek() != Some('`') {
                return Err(self.unterminated("backticked identifier", start));
            }
            self.bump();
            self.push(TokenKind::Identifier, start);
        } else if c.is_alphabetic() || c == '_' {
            while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
                self.bump();
            }
            let kind = if HARD_KEYWORDS.contains(&&self.source[start..self.pos]) {
                TokenKind::Keyword
            } else {
                TokenKind::Identifier
            };
            self.push(kind, start);
        } else if c.is_ascii_digit() {
            self.number();
            self.push(TokenKind::Number, start);
        } else {
            let len = OPERATORS
                .iter()
                .find(|op| self.rest().starts_with(*op))
                .map_or(c.len_utf8(), |op| op.len());
            self.pos += len;
            self.push(TokenKind::Op, start);
        }
        Ok(())
    }

    fn block_comment(&mut self, start: usize) -> Result<(), ParseError> {
        let mut depth = 0usize;
        loop {
            if self.rest().starts_with("/*") {
                depth += 1;
                self.pos += 2;
            } else if self.rest().starts_with("*/") {
                depth -= 1;
                self.pos += 2;
                if depth == 0 {
                    return Ok(());
                }
            } else if self.peek().is_some() {
                self.bump();
            } else {
                return Err(self.unterminated("block comment", start));
            }
        }
    }

    fn string(&mut self, start: usize) -> Result<(), ParseError> {
        if self.rest().starts_with("\"\"\"") {
            self.pos += 3;
            loop {
                if self.rest().starts_with("\"\"\"") {
                    while self.peek() == Some('"') {
                        self.bump();
                    }
                    return Ok(());
                }
                if self.rest().starts_with("${") {
                    self.pos += 2;
                    self.template_expression(start)?;
                } else if self.peek().is_some() {
                    self.bump();
                } else {
                    return Err(self.unterminated("raw string", start));
                }
            }
        }
        self.bump();
        loop {
            match self.peek() {
                None | Some('\n' | '\r') => return Err(self.unterminated("string", start)),
                Some('\\') => {
                    self.bump();
                    self.bump();
                }
                Some('"') => {
                    self.bump();
                    return Ok(());
                }
                Some('$') if self.peek_at(1) == Some('{') => {
                    self.pos += 2;
                    self.template_expression(start)?;
                }
                Some(_) => self.bump(),
            }
        }
    }

    /// Skips the code of a `${...}` template entry, including nested
    /// strings and braces.
    fn template_expression(&mut self, string_start: usize) -> Result<(), ParseError> {
        let mut depth = 1usize;
        loop {
            let at = self.pos;
            match self.peek() {
                None => return Err(self.unterminated("string template", string_start)),
                Some('{') => {
                    depth += 1;
                    self.bump();
                }
                Some('}') => {
                    depth -= 1;
                    self.bump();
                    if depth == 0 {
                        return Ok(());
                    }
                }
                Some('"') => self.string(at)?,
                Some('\'') => self.char_literal(at)?,
                Some('/') if self.rest().starts_with("/*") => self.block_comment(at)?,
                Some(_) => self.bump(),
            }
        }
    }

    fn char_literal(&mut self, start: usize) -> Result<(), ParseError> {
        self.bump();
        loop {
            match self.peek() {
                None | Some('\n' | '\r') => {
                    return Err(self.unterminated("character literal", start));
                }
                Some('\\') => {
                    self.bump();
                    self.bump();
                }
                Some('\'') => {
                    self.bump();
                    return Ok(());
                }
                Some(_) => self.bump(),
            }
        }
    }

    fn number(&mut self) {
        let hex = self.rest().starts_with("0x") || self.rest().starts_with("0X");
        loop {
            match self.peek() {
                Some(c) if c.is_ascii_alphanumeric() || c == '_' => {
                    let exponent = !hex && (c == 'e' || c == 'E');
                    self.bump();
                    if exponent && matches!(self.peek(), Some('+' | '-')) {
                        self.bump();
                    }
                }
                Some('.') if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => self.bump(),
                _ => return,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<(TokenKind, &str)> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| (t.kind, &source[t.start..t.end]))
            .collect()
    }

    #[test]
    fn tokens_cover_the_input() {
        let source = "val x = a?.b ?: 1_000L // done\n/** doc */ fun `a b`() = \"s${x}\"";
        let joined: String = lex(source).iter().map(|(_, text)| *text).collect();
        assert_eq!(joined, source);
    }

    #[test]
    fn operators_use_longest_match() {
        let tokens = lex("a?.b?:c!==d..<e");
        let ops: Vec<&str> = tokens
            .iter()
            .filter(|(kind, _)| *kind == TokenKind::Op)
            .map(|(_, text)| *text)
            .collect();
        assert_eq!(ops, vec!["?.", "?:", "!==", "..<"]);
    }

    #[test]
    fn keywords_and_identifiers_are_distinguished() {
        let tokens = lex("val data");
        assert_eq!(tokens[0], (TokenKind::Keyword, "val"));
        assert_eq!(tokens[2], (TokenKind::Identifier, "data"));
    }

    #[test]
    fn strings_with_templates_are_single_tokens() {
        let tokens = lex(r#""a${b("}")}c" + """raw "quoted" ${x}""""#);
        assert_eq!(tokens[0], (TokenKind::String, r#""a${b("}")}c""#));
        assert_eq!(tokens[4], (TokenKind::String, r#""""raw "quoted" ${x}""""#));
    }

    #[test]
    fn nested_block_comments() {
        let tokens = lex("/* a /* b */ c */x");
        assert_eq!(tokens[0], (TokenKind::BlockComment, "/* a /* b */ c */"));
        assert_eq!(tokens[1], (TokenKind::Identifier, "x"));
    }

    #[test]
    fn numbers_with_fractions_and_exponents() {
        let tokens = lex("1.5e-3f 0xFF 1..2");
        assert_eq!(tokens[0], (TokenKind::Number, "1.5e-3f"));
        assert_eq!(tokens[2], (TokenKind::Number, "0xFF"));
        assert_eq!(tokens[4], (TokenKind::Number, "1"));
        assert_eq!(tokens[5], (TokenKind::Op, ".."));
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let err = tokenize("val s = \"abc\nval t = 1").unwrap_err();
        assert!(err.to_string().contains("1:9"), "{err}");
    }

    #[test]
    fn unterminated_comment_is_an_error() {
        assert!(tokenize("/* never closed").is_err());
    }
}
