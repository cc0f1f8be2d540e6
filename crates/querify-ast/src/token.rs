// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Tokens of the C#-like source language.

use crate::Span;

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

/// A piece of an interpolated string token.
#[derive(Debug, Clone, PartialEq)]
pub enum InterpolatedToken {
    /// Literal text as written
    Text(String),
    /// The tokens of `{expr,alignment:format}` up to the suffix, which is kept raw
    Hole { tokens: Vec<Token>, suffix: String },
}

/// Declaration modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Modifier {
    Public,
    Private,
    Protected,
    Internal,
    Static,
    Abstract,
    Virtual,
    Override,
    Sealed,
    Readonly,
    Const,
    Extern,
    Unsafe,
    Volatile,
    New,
    Partial,
    Async,
}

impl Modifier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Modifier::Public => "public",
            Modifier::Private => "private",
            Modifier::Protected => "protected",
            Modifier::Internal => "internal",
            Modifier::Static => "static",
            Modifier::Abstract => "abstract",
            Modifier::Virtual => "virtual",
            Modifier::Override => "override",
            Modifier::Sealed => "sealed",
            Modifier::Readonly => "readonly",
            Modifier::Const => "const",
            Modifier::Extern => "extern",
            Modifier::Unsafe => "unsafe",
            Modifier::Volatile => "volatile",
            Modifier::New => "new",
            Modifier::Partial => "partial",
            Modifier::Async => "async",
        }
    }
}

/// The kind of token.
///
/// Contextual keywords (`var`, `get`, `set`, `add`, `remove`, `partial`,
/// `async` and the query keywords `from`, `select`, `where`, ...) are
/// lexed as identifiers; the parser recognizes them by text.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Int(u64),
    Float(f64),
    String(String),
    /// `$"..."`: the prefix as written, then text and lexed holes
    InterpolatedString {
        prefix: String,
        parts: Vec<InterpolatedToken>,
    },
    Char(char),
    Bool(bool),
    Null,

    // Identifier (a leading `@` is stripped)
    Ident(String),

    // Keywords
    Using,
    Namespace,
    Class,
    Struct,
    Interface,
    Enum,
    Event,
    Operator,
    Implicit,
    Explicit,
    This,
    Base,
    New,
    Return,
    If,
    Else,
    While,
    Do,
    For,
    Foreach,
    In,
    Is,
    As,
    Throw,
    Break,
    Continue,
    Ref,
    Out,
    Params,
    Typeof,
    /// Modifier keyword other than `new` (which doubles as an operator)
    Modifier(Modifier),

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Eq,
    EqEq,
    BangEq,
    Lt,
    /// Always a single `>`; the parser joins adjacent pairs into `>>`
    Gt,
    LtEq,
    GtEq,
    AmpAmp,
    PipePipe,
    Bang,
    Question,
    QuestionQuestion,
    QuestionDot,
    FatArrow,
    Dot,
    Amp,          // &
    Pipe,         // |
    Caret,        // ^
    Tilde,        // ~
    LtLt,         // <<
    PlusPlus,     // ++
    MinusMinus,   // --
    PlusEq,       // +=
    MinusEq,      // -=
    StarEq,       // *=
    SlashEq,      // /=
    PercentEq,    // %=
    AmpEq,        // &=
    PipeEq,       // |=
    CaretEq,      // ^=
    LtLtEq,       // <<=
    QuestionQuestionEq, // ??=

    // Delimiters
    LBrace,
    RBrace,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Colon,
    Semi,
    Comma,

    // Special
    Eof,
}

impl TokenKind {
    /// True for the identifier `text` (contextual keyword check).
    pub fn is_ident(&self, text: &str) -> bool {
        matches!(self, TokenKind::Ident(name) if name == text)
    }

    /// How the token is named in "expected X, found Y" messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            // Literals
            TokenKind::Int(_) => "a number",
            TokenKind::Float(_) => "a number",
            TokenKind::String(_) | TokenKind::InterpolatedString { .. } => "a string",
            TokenKind::Char(_) => "a character",
            TokenKind::Bool(_) => "'true' or 'false'",
            TokenKind::Null => "'null'",

            // Identifier
            TokenKind::Ident(_) => "a name",

            // Keywords
            TokenKind::Using => "'using'",
            TokenKind::Namespace => "'namespace'",
            TokenKind::Class => "'class'",
            TokenKind::Struct => "'struct'",
            TokenKind::Interface => "'interface'",
            TokenKind::Enum => "'enum'",
            TokenKind::Event => "'event'",
            TokenKind::Operator => "'operator'",
            TokenKind::Implicit => "'implicit'",
            TokenKind::Explicit => "'explicit'",
            TokenKind::This => "'this'",
            TokenKind::Base => "'base'",
            TokenKind::New => "'new'",
            TokenKind::Return => "'return'",
            TokenKind::If => "'if'",
            TokenKind::Else => "'else'",
            TokenKind::While => "'while'",
            TokenKind::Do => "'do'",
            TokenKind::For => "'for'",
            TokenKind::Foreach => "'foreach'",
            TokenKind::In => "'in'",
            TokenKind::Is => "'is'",
            TokenKind::As => "'as'",
            TokenKind::Throw => "'throw'",
            TokenKind::Break => "'break'",
            TokenKind::Continue => "'continue'",
            TokenKind::Ref => "'ref'",
            TokenKind::Out => "'out'",
            TokenKind::Params => "'params'",
            TokenKind::Typeof => "'typeof'",
            TokenKind::Modifier(_) => "a modifier",

            // Operators
            TokenKind::Plus => "'+'",
            TokenKind::Minus => "'-'",
            TokenKind::Star => "'*'",
            TokenKind::Slash => "'/'",
            TokenKind::Percent => "'%'",
            TokenKind::Eq => "'='",
            TokenKind::EqEq => "'=='",
            TokenKind::BangEq => "'!='",
            TokenKind::Lt => "'<'",
            TokenKind::Gt => "'>'",
            TokenKind::LtEq => "'<='",
            TokenKind::GtEq => "'>='",
            TokenKind::AmpAmp => "'&&'",
            TokenKind::PipePipe => "'||'",
            TokenKind::Bang => "'!'",
            TokenKind::Question => "'?'",
            TokenKind::QuestionQuestion => "'??'",
            TokenKind::QuestionDot => "'?.'",
            TokenKind::FatArrow => "'=>'",
            TokenKind::Dot => "'.'",
            TokenKind::Amp => "'&'",
            TokenKind::Pipe => "'|'",
            TokenKind::Caret => "'^'",
            TokenKind::Tilde => "'~'",
            TokenKind::LtLt => "'<<'",
            TokenKind::PlusPlus => "'++'",
            TokenKind::MinusMinus => "'--'",
            TokenKind::PlusEq => "'+='",
            TokenKind::MinusEq => "'-='",
            TokenKind::StarEq => "'*='",
            TokenKind::SlashEq => "'/='",
            TokenKind::PercentEq => "'%='",
            TokenKind::AmpEq => "'&='",
            TokenKind::PipeEq => "'|='",
            TokenKind::CaretEq => "'^='",
            TokenKind::LtLtEq => "'<<='",
            TokenKind::QuestionQuestionEq => "'??='",

            // Delimiters
            TokenKind::LBrace => "'{'",
            TokenKind::RBrace => "'}'",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBracket => "'['",
            TokenKind::RBracket => "']'",
            TokenKind::Colon => "':'",
            TokenKind::Semi => "';'",
            TokenKind::Comma => "','",

            // Special
            TokenKind::Eof => "end of file",
        }
    }
}
