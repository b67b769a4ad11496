//! Node kinds of the Kotlin syntax tree.

use serde::{Deserialize, Serialize};

/// Type tag of a syntax tree node.
///
/// Composite kinds group other nodes; leaf kinds carry source text. The
/// distinction is informative only: the tree decides leafness by whether a
/// node owns text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeKind {
    // --- composite kinds ---
    /// Root of a Kotlin file.
    File,
    /// `package a.b.c`
    PackageDirective,
    /// Container of all import directives.
    ImportList,
    /// `import a.b.C`
    ImportDirective,
    /// Container of `@file:` annotations.
    FileAnnotationList,
    /// Modifiers and annotations preceding a declaration.
    ModifierList,
    /// `@Name(args)` or `@file:Name(args)`
    Annotation,
    /// Expression preceded by annotations, e.g. `@Suppress("x") foo()`.
    AnnotatedExpression,
    /// `class`, `interface` or `object` declaration.
    Class,
    /// `{ ... }` body of a class.
    ClassBody,
    /// `fun` declaration.
    Function,
    /// `( ... )` of a function declaration.
    ValueParameterList,
    /// One declared parameter.
    ValueParameter,
    /// Type after a colon.
    TypeReference,
    /// `val` / `var` declaration.
    Property,
    /// `{ ... }` block of statements.
    Block,
    /// `return expr`
    ReturnExpression,
    /// `if (cond) then else other`
    IfExpression,
    /// Condition between the parentheses of an `if`.
    Condition,
    /// Then branch of an `if`.
    Then,
    /// Else branch of an `if`.
    Else,
    /// `left op right`
    BinaryExpression,
    /// `!x`, `-x`
    PrefixExpression,
    /// `receiver.selector`
    DotQualifiedExpression,
    /// `receiver?.selector`
    SafeAccessExpression,
    /// `callee(args)` with an optional trailing lambda.
    CallExpression,
    /// `( ... )` of a call.
    ValueArgumentList,
    /// One call argument.
    ValueArgument,
    /// `( expr )`
    ParenthesizedExpression,
    /// String literal of any flavour.
    StringTemplate,
    /// `{ ... }` lambda literal.
    LambdaExpression,

    // --- leaf kinds ---
    /// Spaces, tabs and line breaks.
    Whitespace,
    /// `// ...`
    EolComment,
    /// `/* ... */`
    BlockComment,
    /// `/** ... */`
    Kdoc,
    /// Plain or backticked identifier.
    Identifier,
    /// Hard or soft keyword.
    Keyword,
    /// Binary operator token, e.g. `&&`, `+`, `?:`.
    OperationReference,
    /// Prefix operator token, e.g. `!`.
    PrefixOperator,
    /// `.`
    Dot,
    /// `?.`
    SafeAccess,
    /// `:`
    Colon,
    /// `=`
    Eq,
    /// `,`
    Comma,
    /// `;`
    Semicolon,
    /// `(`
    LPar,
    /// `)`
    RPar,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `<`, `>` and other tokens without own kind.
    Punctuation,
    /// `->`
    Arrow,
    /// `@`
    At,
    /// Quoted string text including its delimiters.
    StringLiteral,
    /// Numeric literal.
    NumberLiteral,
    /// Character literal.
    CharLiteral,
    /// Text the parser could not classify.
    Error,
}

impl NodeKind {
    /// Returns the upper snake case name used in tree dumps.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "FILE",
            Self::PackageDirective => "PACKAGE_DIRECTIVE",
            Self::ImportList => "IMPORT_LIST",
            Self::ImportDirective => "IMPORT_DIRECTIVE",
            Self::FileAnnotationList => "FILE_ANNOTATION_LIST",
            Self::ModifierList => "MODIFIER_LIST",
            Self::Annotation => "ANNOTATION",
            Self::AnnotatedExpression => "ANNOTATED_EXPRESSION",
            Self::Class => "CLASS",
            Self::ClassBody => "CLASS_BODY",
            Self::Function => "FUN",
            Self::ValueParameterList => "VALUE_PARAMETER_LIST",
            Self::ValueParameter => "VALUE_PARAMETER",
            Self::TypeReference => "TYPE_REFERENCE",
            Self::Property => "PROPERTY",
            Self::Block => "BLOCK",
            Self::ReturnExpression => "RETURN",
            Self::IfExpression => "IF",
            Self::Condition => "CONDITION",
            Self::Then => "THEN",
            Self::Else => "ELSE",
            Self::BinaryExpression => "BINARY_EXPRESSION",
            Self::PrefixExpression => "PREFIX_EXPRESSION",
            Self::DotQualifiedExpression => "DOT_QUALIFIED_EXPRESSION",
            Self::SafeAccessExpression => "SAFE_ACCESS_EXPRESSION",
            Self::CallExpression => "CALL_EXPRESSION",
            Self::ValueArgumentList => "VALUE_ARGUMENT_LIST",
            Self::ValueArgument => "VALUE_ARGUMENT",
            Self::ParenthesizedExpression => "PARENTHESIZED",
            Self::StringTemplate => "STRING_TEMPLATE",
            Self::LambdaExpression => "LAMBDA_EXPRESSION",
            Self::Whitespace => "WHITE_SPACE",
            Self::EolComment => "EOL_COMMENT",
            Self::BlockComment => "BLOCK_COMMENT",
            Self::Kdoc => "KDOC",
            Self::Identifier => "IDENTIFIER",
            Self::Keyword => "KEYWORD",
            Self::OperationReference => "OPERATION_REFERENCE",
            Self::PrefixOperator => "PREFIX_OPERATOR",
            Self::Dot => "DOT",
            Self::SafeAccess => "SAFE_ACCESS",
            Self::Colon => "COLON",
            Self::Eq => "EQ",
            Self::Comma => "COMMA",
            Self::Semicolon => "SEMICOLON",
            Self::LPar => "LPAR",
            Self::RPar => "RPAR",
            Self::LBrace => "LBRACE",
            Self::RBrace => "RBRACE",
            Self::Punctuation => "PUNCTUATION",
            Self::Arrow => "ARROW",
            Self::At => "AT",
            Self::StringLiteral => "STRING_LITERAL",
            Self::NumberLiteral => "NUMBER_LITERAL",
            Self::CharLiteral => "CHAR_LITERAL",
            Self::Error => "ERROR",
        }
    }

    /// Returns true for comment kinds.
    #[must_use]
    pub fn is_comment(self) -> bool {
        matches!(self, Self::EolComment | Self::BlockComment | Self::Kdoc)
    }

    /// Returns true for leaves that carry neither code nor comments.
    #[must_use]
    pub fn is_whitespace(self) -> bool {
        self == Self::Whitespace
    }

    /// Returns true for kinds that hold code (not whitespace, not comments).
    #[must_use]
    pub fn is_code(self) -> bool {
        !self.is_whitespace() && !self.is_comment()
    }

    /// Returns true for kinds that can carry a suppression annotation.
    #[must_use]
    pub fn can_be_annotated(self) -> bool {
        matches!(
            self,
            Self::File
                | Self::Class
                | Self::Function
                | Self::Property
                | Self::ValueParameter
                | Self::AnnotatedExpression
        )
    }

    /// Returns true for the two chain-access operator kinds.
    #[must_use]
    pub fn is_chain_operator(self) -> bool {
        matches!(self, Self::Dot | Self::SafeAccess)
    }

    /// Returns true for the two chained expression kinds.
    #[must_use]
    pub fn is_qualified_expression(self) -> bool {
        matches!(
            self,
            Self::DotQualifiedExpression | Self::SafeAccessExpression
        )
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
