// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Tokenizer: logos scans raw tokens, a second pass decodes literals and
//! maps keywords.

use logos::Logos;
use querify_ast::token::{InterpolatedToken, Modifier, Token, TokenKind};
use querify_ast::Span;
use thiserror::Error;

/// Token shapes as logos sees them; literal values are decoded afterwards.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
enum RawToken {
    // === Keywords ===
    #[token("using")]
    Using,
    #[token("namespace")]
    Namespace,
    #[token("class")]
    Class,
    #[token("struct")]
    Struct,
    #[token("interface")]
    Interface,
    #[token("enum")]
    Enum,
    #[token("event")]
    Event,
    #[token("operator")]
    Operator,
    #[token("implicit")]
    Implicit,
    #[token("explicit")]
    Explicit,
    #[token("this")]
    This,
    #[token("base")]
    Base,
    #[token("new")]
    New,
    #[token("return")]
    Return,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("do")]
    Do,
    #[token("for")]
    For,
    #[token("foreach")]
    Foreach,
    #[token("in")]
    In,
    #[token("is")]
    Is,
    #[token("as")]
    As,
    #[token("throw")]
    Throw,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("ref")]
    Ref,
    #[token("out")]
    Out,
    #[token("params")]
    Params,
    #[token("typeof")]
    Typeof,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,

    // === Modifiers ===
    #[token("public")]
    Public,
    #[token("private")]
    Private,
    #[token("protected")]
    Protected,
    #[token("internal")]
    Internal,
    #[token("static")]
    Static,
    #[token("abstract")]
    Abstract,
    #[token("virtual")]
    Virtual,
    #[token("override")]
    Override,
    #[token("sealed")]
    Sealed,
    #[token("readonly")]
    Readonly,
    #[token("const")]
    Const,
    #[token("extern")]
    Extern,
    #[token("unsafe")]
    Unsafe,
    #[token("volatile")]
    Volatile,

    // === Operators (order matters - longer first) ===
    // Three-character operators
    #[token("<<=")]
    LtLtEq,
    #[token("??=")]
    QuestionQuestionEq,

    // Two-character operators
    #[token("==")]
    EqEq,
    #[token("!=")]
    BangEq,
    #[token("<=")]
    LtEq,
    #[token(">=")]
    GtEq,
    #[token("&&")]
    AmpAmp,
    #[token("||")]
    PipePipe,
    #[token("??")]
    QuestionQuestion,
    #[token("?.")]
    QuestionDot,
    #[token("=>")]
    FatArrow,
    #[token("<<")]
    LtLt,
    #[token("++")]
    PlusPlus,
    #[token("--")]
    MinusMinus,
    #[token("+=")]
    PlusEq,
    #[token("-=")]
    MinusEq,
    #[token("*=")]
    StarEq,
    #[token("/=")]
    SlashEq,
    #[token("%=")]
    PercentEq,
    #[token("&=")]
    AmpEq,
    #[token("|=")]
    PipeEq,
    #[token("^=")]
    CaretEq,

    // Single-character operators
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("=")]
    Eq,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("!")]
    Bang,
    #[token("?")]
    Question,
    #[token(".")]
    Dot,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("~")]
    Tilde,

    // === Delimiters ===
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(":")]
    Colon,
    #[token(";")]
    Semi,
    #[token(",")]
    Comma,

    // === Comments and preprocessor lines (skip them) ===
    #[regex(r"//[^\n]*", logos::skip)]
    LineComment,

    #[token("/*", block_comment)]
    BlockComment,

    #[regex(r"#[^\n]*", logos::skip)]
    Directive,

    // === Literals ===
    // Hex integers with optional suffix
    #[regex(r"0[xX][0-9a-fA-F_]+([uU][lL]?|[lL][uU]?)?")]
    HexInt,

    // Binary integers with optional suffix
    #[regex(r"0[bB][01_]+([uU][lL]?|[lL][uU]?)?")]
    BinInt,

    // Real literals (must come before decimal int to match properly)
    #[regex(r"[0-9][0-9_]*\.[0-9][0-9_]*([eE][+-]?[0-9]+)?[fFdDmM]?")]
    #[regex(r"[0-9][0-9_]*[eE][+-]?[0-9]+[fFdDmM]?")]
    #[regex(r"[0-9][0-9_]*[fFdDmM]")]
    Float,

    // Decimal integers with optional suffix
    #[regex(r"[0-9][0-9_]*([uU][lL]?|[lL][uU]?)?")]
    DecInt,

    // Character literal
    #[regex(r"'([^'\\\n]|\\.|\\u[0-9a-fA-F]{4}|\\x[0-9a-fA-F]{1,4})'")]
    Char,

    // Verbatim string (`""` escapes a quote)
    #[regex(r#"@"([^"]|"")*""#)]
    VerbatimString,

    // Interpolated string; holes are split out afterwards
    #[regex(r#"\$"([^"\\\n]|\\.)*""#)]
    #[regex(r#"(\$@|@\$)"([^"]|"")*""#)]
    InterpolatedString,

    // Regular string
    #[regex(r#""([^"\\\n]|\\.)*""#)]
    String,

    // === Identifier (must come after keywords; `@` escapes a keyword) ===
    #[regex(r"@?[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,
}

/// Skip a block comment. C# block comments do not nest.
fn block_comment(lexer: &mut logos::Lexer<RawToken>) -> logos::Skip {
    let remainder = lexer.remainder();
    let consumed = match remainder.find("*/") {
        Some(pos) => pos + 2,
        None => remainder.len(), // Unterminated - runs to end of input
    };
    lexer.bump(consumed);
    logos::Skip
}

/// Lexing gives up after this many errors.
const MAX_ERRORS: usize = 20;

/// The lexer for C#-like source code.
pub struct Lexer<'a> {
    source: &'a str,
    errors: Vec<LexError>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { source, errors: Vec::new() }
    }

    /// Scan the whole source. Bad characters are reported and skipped, so
    /// one call reports every error up to `MAX_ERRORS`.
    pub fn tokenize(&mut self) -> LexResult {
        let mut tokens = Vec::new();
        let mut logos_lexer = RawToken::lexer(self.source);

        while let Some(result) = logos_lexer.next() {
            if self.errors.len() >= MAX_ERRORS {
                break;
            }

            let span = logos_lexer.span();
            let slice = logos_lexer.slice();

            let kind = match result {
                Ok(raw) => match self.convert_token(raw, slice, span.start, span.end) {
                    Ok(kind) => kind,
                    Err(e) => {
                        self.errors.push(e);
                        continue;
                    }
                },
                Err(()) => {
                    let ch = self.source[span.start..].chars().next().unwrap_or('?');
                    self.errors.push(LexError::unexpected_char(ch, span.start));
                    continue;
                }
            };

            tokens.push(Token {
                kind,
                span: Span::new(span.start, span.end),
            });
        }

        tokens.push(Token {
            kind: TokenKind::Eof,
            span: Span::new(self.source.len(), self.source.len()),
        });

        LexResult {
            tokens,
            errors: std::mem::take(&mut self.errors),
        }
    }

    /// Convert a raw logos token to our TokenKind, parsing literals.
    fn convert_token(&self, raw: RawToken, slice: &str, start: usize, end: usize) -> Result<TokenKind, LexError> {
        Ok(match raw {
            // Keywords
            RawToken::Using => TokenKind::Using,
            RawToken::Namespace => TokenKind::Namespace,
            RawToken::Class => TokenKind::Class,
            RawToken::Struct => TokenKind::Struct,
            RawToken::Interface => TokenKind::Interface,
            RawToken::Enum => TokenKind::Enum,
            RawToken::Event => TokenKind::Event,
            RawToken::Operator => TokenKind::Operator,
            RawToken::Implicit => TokenKind::Implicit,
            RawToken::Explicit => TokenKind::Explicit,
            RawToken::This => TokenKind::This,
            RawToken::Base => TokenKind::Base,
            RawToken::New => TokenKind::New,
            RawToken::Return => TokenKind::Return,
            RawToken::If => TokenKind::If,
            RawToken::Else => TokenKind::Else,
            RawToken::While => TokenKind::While,
            RawToken::Do => TokenKind::Do,
            RawToken::For => TokenKind::For,
            RawToken::Foreach => TokenKind::Foreach,
            RawToken::In => TokenKind::In,
            RawToken::Is => TokenKind::Is,
            RawToken::As => TokenKind::As,
            RawToken::Throw => TokenKind::Throw,
            RawToken::Break => TokenKind::Break,
            RawToken::Continue => TokenKind::Continue,
            RawToken::Ref => TokenKind::Ref,
            RawToken::Out => TokenKind::Out,
            RawToken::Params => TokenKind::Params,
            RawToken::Typeof => TokenKind::Typeof,
            RawToken::True => TokenKind::Bool(true),
            RawToken::False => TokenKind::Bool(false),
            RawToken::Null => TokenKind::Null,

            // Modifiers
            RawToken::Public => TokenKind::Modifier(Modifier::Public),
            RawToken::Private => TokenKind::Modifier(Modifier::Private),
            RawToken::Protected => TokenKind::Modifier(Modifier::Protected),
            RawToken::Internal => TokenKind::Modifier(Modifier::Internal),
            RawToken::Static => TokenKind::Modifier(Modifier::Static),
            RawToken::Abstract => TokenKind::Modifier(Modifier::Abstract),
            RawToken::Virtual => TokenKind::Modifier(Modifier::Virtual),
            RawToken::Override => TokenKind::Modifier(Modifier::Override),
            RawToken::Sealed => TokenKind::Modifier(Modifier::Sealed),
            RawToken::Readonly => TokenKind::Modifier(Modifier::Readonly),
            RawToken::Const => TokenKind::Modifier(Modifier::Const),
            RawToken::Extern => TokenKind::Modifier(Modifier::Extern),
            RawToken::Unsafe => TokenKind::Modifier(Modifier::Unsafe),
            RawToken::Volatile => TokenKind::Modifier(Modifier::Volatile),

            // Operators
            RawToken::Plus => TokenKind::Plus,
            RawToken::Minus => TokenKind::Minus,
            RawToken::Star => TokenKind::Star,
            RawToken::Slash => TokenKind::Slash,
            RawToken::Percent => TokenKind::Percent,
            RawToken::Eq => TokenKind::Eq,
            RawToken::EqEq => TokenKind::EqEq,
            RawToken::BangEq => TokenKind::BangEq,
            RawToken::Lt => TokenKind::Lt,
            RawToken::Gt => TokenKind::Gt,
            RawToken::LtEq => TokenKind::LtEq,
            RawToken::GtEq => TokenKind::GtEq,
            RawToken::AmpAmp => TokenKind::AmpAmp,
            RawToken::PipePipe => TokenKind::PipePipe,
            RawToken::Bang => TokenKind::Bang,
            RawToken::Question => TokenKind::Question,
            RawToken::QuestionQuestion => TokenKind::QuestionQuestion,
            RawToken::QuestionDot => TokenKind::QuestionDot,
            RawToken::FatArrow => TokenKind::FatArrow,
            RawToken::Dot => TokenKind::Dot,
            RawToken::Amp => TokenKind::Amp,
            RawToken::Pipe => TokenKind::Pipe,
            RawToken::Caret => TokenKind::Caret,
            RawToken::Tilde => TokenKind::Tilde,
            RawToken::LtLt => TokenKind::LtLt,
            RawToken::PlusPlus => TokenKind::PlusPlus,
            RawToken::MinusMinus => TokenKind::MinusMinus,
            RawToken::PlusEq => TokenKind::PlusEq,
            RawToken::MinusEq => TokenKind::MinusEq,
            RawToken::StarEq => TokenKind::StarEq,
            RawToken::SlashEq => TokenKind::SlashEq,
            RawToken::PercentEq => TokenKind::PercentEq,
            RawToken::AmpEq => TokenKind::AmpEq,
            RawToken::PipeEq => TokenKind::PipeEq,
            RawToken::CaretEq => TokenKind::CaretEq,
            RawToken::LtLtEq => TokenKind::LtLtEq,
            RawToken::QuestionQuestionEq => TokenKind::QuestionQuestionEq,

            // Delimiters
            RawToken::LBrace => TokenKind::LBrace,
            RawToken::RBrace => TokenKind::RBrace,
            RawToken::LParen => TokenKind::LParen,
            RawToken::RParen => TokenKind::RParen,
            RawToken::LBracket => TokenKind::LBracket,
            RawToken::RBracket => TokenKind::RBracket,
            RawToken::Colon => TokenKind::Colon,
            RawToken::Semi => TokenKind::Semi,
            RawToken::Comma => TokenKind::Comma,

            // Literals - parse the values
            RawToken::DecInt => {
                let cleaned: String = strip_int_suffix(slice).chars().filter(|c| *c != '_').collect();
                let value = cleaned.parse::<u64>().map_err(|_| LexError::invalid_number(start, end))?;
                TokenKind::Int(value)
            }
            RawToken::HexInt => {
                let stripped = strip_int_suffix(slice);
                let cleaned: String = stripped[2..].chars().filter(|c| *c != '_').collect();
                let value = u64::from_str_radix(&cleaned, 16).map_err(|_| LexError::invalid_number(start, end))?;
                TokenKind::Int(value)
            }
            RawToken::BinInt => {
                let stripped = strip_int_suffix(slice);
                let cleaned: String = stripped[2..].chars().filter(|c| *c != '_').collect();
                let value = u64::from_str_radix(&cleaned, 2).map_err(|_| LexError::invalid_number(start, end))?;
                TokenKind::Int(value)
            }
            RawToken::Float => {
                let cleaned: String = slice
                    .trim_end_matches(|c: char| matches!(c, 'f' | 'F' | 'd' | 'D' | 'm' | 'M'))
                    .chars()
                    .filter(|c| *c != '_')
                    .collect();
                let value = cleaned.parse::<f64>().map_err(|_| LexError::invalid_number(start, end))?;
                TokenKind::Float(value)
            }
            RawToken::Char => {
                let inner = &slice[1..slice.len() - 1];
                TokenKind::Char(parse_char(inner, start)?)
            }
            RawToken::String => {
                let inner = &slice[1..slice.len() - 1];
                TokenKind::String(parse_string(inner, start)?)
            }
            RawToken::VerbatimString => {
                let inner = &slice[2..slice.len() - 1];
                TokenKind::String(inner.replace("\"\"", "\""))
            }
            RawToken::InterpolatedString => {
                let quote = slice.find('"').unwrap_or(0);
                let parts = split_interpolation(&slice[quote + 1..slice.len() - 1], start + quote + 1)?;
                TokenKind::InterpolatedString { prefix: slice[..quote].to_string(), parts }
            }
            RawToken::Ident => TokenKind::Ident(slice.trim_start_matches('@').to_string()),

            RawToken::LineComment | RawToken::BlockComment | RawToken::Directive => {
                unreachable!("skipped by logos")
            }
        })
    }
}

/// Split the body of an interpolated string into text and holes. Hole
/// tokens carry spans into the whole source.
fn split_interpolation(body: &str, offset: usize) -> Result<Vec<InterpolatedToken>, LexError> {
    let bytes = body.as_bytes();
    let mut parts = Vec::new();
    let mut text_start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'{' if bytes.get(i + 1) == Some(&b'{') => i += 2,
            b'{' => {
                if text_start < i {
                    parts.push(InterpolatedToken::Text(body[text_start..i].to_string()));
                }
                let (suffix, close) =
                    hole_bounds(body, i + 1).ok_or_else(|| LexError::unterminated_hole(offset + i))?;
                let tokens = lex_hole(&body[i + 1..suffix], offset + i + 1)?;
                parts.push(InterpolatedToken::Hole { tokens, suffix: body[suffix..close].to_string() });
                i = close + 1;
                text_start = i;
            }
            _ => i += 1,
        }
    }
    if text_start < bytes.len() {
        parts.push(InterpolatedToken::Text(body[text_start..].to_string()));
    }
    Ok(parts)
}

/// Where the suffix of the hole starting at `from` begins, and where its
/// closing brace is. A top-level `,` or `:` starts the suffix.
fn hole_bounds(body: &str, from: usize) -> Option<(usize, usize)> {
    let bytes = body.as_bytes();
    let mut depth = 0usize;
    let mut suffix = None;
    let mut j = from;
    while j < bytes.len() {
        match bytes[j] {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' => depth = depth.saturating_sub(1),
            b'}' if depth == 0 => return Some((suffix.unwrap_or(j), j)),
            b'}' => depth -= 1,
            b',' | b':' if depth == 0 && suffix.is_none() => suffix = Some(j),
            b'\'' => {
                j += 1;
                while j < bytes.len() && bytes[j] != b'\'' {
                    if bytes[j] == b'\\' {
                        j += 1;
                    }
                    j += 1;
                }
            }
            _ => {}
        }
        j += 1;
    }
    None
}

/// Lex the expression of a hole found at `offset` in the source.
fn lex_hole(text: &str, offset: usize) -> Result<Vec<Token>, LexError> {
    let shift = |span: Span| Span::new(span.start + offset, span.end + offset);
    let result = Lexer::new(text).tokenize();
    if let Some(mut err) = result.errors.into_iter().next() {
        err.span = shift(err.span);
        return Err(err);
    }
    Ok(result
        .tokens
        .into_iter()
        .filter(|t| t.kind != TokenKind::Eof)
        .map(|t| Token { span: shift(t.span), ..t })
        .collect())
}

/// Strip integer type suffix (`u`, `l`, `ul`, `lu` in any case) from a number literal.
fn strip_int_suffix(s: &str) -> &str {
    s.trim_end_matches(|c: char| matches!(c, 'u' | 'U' | 'l' | 'L'))
}

/// Decode the body of a `'c'` literal.
fn parse_char(s: &str, pos: usize) -> Result<char, LexError> {
    let mut chars = s.chars();
    match chars.next() {
        Some('\\') => parse_escape(&mut chars, pos),
        Some(c) => Ok(c),
        None => Err(LexError::invalid_escape(pos)),
    }
}

/// Decode the body of a regular string literal.
fn parse_string(s: &str, pos: usize) -> Result<String, LexError> {
    let mut result = String::new();
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c == '\\' {
            result.push(parse_escape(&mut chars, pos)?);
        } else {
            result.push(c);
        }
    }

    Ok(result)
}

/// The character after a backslash.
fn parse_escape(chars: &mut impl Iterator<Item = char>, pos: usize) -> Result<char, LexError> {
    match chars.next() {
        Some('n') => Ok('\n'),
        Some('r') => Ok('\r'),
        Some('t') => Ok('\t'),
        Some('a') => Ok('\u{7}'),
        Some('b') => Ok('\u{8}'),
        Some('f') => Ok('\u{c}'),
        Some('v') => Ok('\u{b}'),
        Some('\\') => Ok('\\'),
        Some('0') => Ok('\0'),
        Some('\'') => Ok('\''),
        Some('"') => Ok('"'),
        Some('u') => parse_hex_escape(chars, 4, 4, pos),
        Some('x') => parse_hex_escape(chars, 1, 4, pos),
        _ => Err(LexError::invalid_escape(pos)),
    }
}

/// Parse the hex digits of a `\uXXXX` or `\xX..` escape.
fn parse_hex_escape(
    chars: &mut impl Iterator<Item = char>,
    min: usize,
    max: usize,
    pos: usize,
) -> Result<char, LexError> {
    let hex: String = chars.take(max).collect();
    if hex.len() < min || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(LexError::invalid_escape(pos));
    }
    let code_point = u32::from_str_radix(&hex, 16).map_err(|_| LexError::invalid_escape(pos))?;
    char::from_u32(code_point).ok_or(LexError::invalid_escape(pos))
}

#[derive(Debug)]
pub struct LexResult {
    pub tokens: Vec<Token>,
    pub errors: Vec<LexError>,
}

impl LexResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct LexError {
    pub span: Span,
    pub message: String,
    pub hint: Option<String>,
}

impl LexError {
    fn unexpected_char(ch: char, pos: usize) -> Self {
        Self {
            span: Span::new(pos, pos + ch.len_utf8()),
            message: format!("unexpected character `{}`", ch),
            hint: None,
        }
    }

    fn invalid_escape(pos: usize) -> Self {
        Self {
            span: Span::new(pos, pos + 1),
            message: "invalid escape sequence".to_string(),
            hint: Some("Valid: \\n \\r \\t \\\\ \\0 \\' \\\" \\uXXXX \\xX".to_string()),
        }
    }

    fn unterminated_hole(pos: usize) -> Self {
        Self {
            span: Span::new(pos, pos + 1),
            message: "unterminated interpolation hole".to_string(),
            hint: Some("Write `{{` for a literal brace".to_string()),
        }
    }

    fn invalid_number(start: usize, end: usize) -> Self {
        Self {
            span: Span::new(start, end),
            message: "malformed number literal".to_string(),
            hint: None,
        }
    }
}
