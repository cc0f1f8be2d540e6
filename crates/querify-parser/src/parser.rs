// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The parser implementation using Pratt parsing for expressions.

use querify_ast::decl::{
    Accessor, AccessorKind, Attribute, ConstructorDecl, ConstructorInitializer, CustomEventDecl, Decl, DeclKind,
    EnumMemberDecl, EventDecl, FieldDecl, IndexerDecl, MemberBody, MethodDecl, NamespaceDecl, OperatorDecl, Param,
    ParamModifier, PropertyDecl, SyntaxTree, TypeDecl, TypeKind, UsingDirective,
};
use querify_ast::expr::{
    AnonymousMember, BinOp, Direction, Expr, ExprKind, InterpolatedPart, LambdaBody, LambdaParam, Ordering, QueryClause,
    UnaryOp,
};
use querify_ast::stmt::{Block, Stmt, StmtKind, VarDeclarator};
use querify_ast::token::{InterpolatedToken, Modifier, Token, TokenKind};
use querify_ast::{NodeId, Span};
use thiserror::Error;

/// Maximum number of errors to collect before stopping.
const MAX_ERRORS: usize = 20;

/// Type names written with keywords in C#; they always start a cast.
const PREDEFINED_TYPES: &[&str] = &[
    "bool", "byte", "sbyte", "char", "decimal", "double", "float", "int", "uint", "long", "ulong", "short",
    "ushort", "object", "string",
];

/// The parser for C#-like source code.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Collected errors during parsing
    errors: Vec<ParseError>,
    /// Counter for generating unique NodeIds
    next_node_id: u32,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if !matches!(tokens.last().map(|t| &t.kind), Some(TokenKind::Eof)) {
            let end = tokens.last().map(|t| t.span.end).unwrap_or(0);
            tokens.push(Token { kind: TokenKind::Eof, span: Span::new(end, end) });
        }
        Self { tokens, pos: 0, errors: Vec::new(), next_node_id: 0 }
    }

    fn next_id(&mut self) -> NodeId {
        let id = NodeId(self.next_node_id);
        self.next_node_id += 1;
        id
    }

    /// Record error, return if should continue.
    fn record_error(&mut self, error: ParseError) -> bool {
        if self.errors.len() < MAX_ERRORS {
            self.errors.push(error);
        }
        self.errors.len() < MAX_ERRORS
    }

    fn too_many_errors(&self) -> bool {
        self.errors.len() >= MAX_ERRORS
    }

    /// Skip to the next member declaration after an error.
    fn synchronize(&mut self) {
        let mut brace_depth = 0usize;

        while !self.at_end() {
            match self.current_kind() {
                TokenKind::LBrace => {
                    brace_depth += 1;
                    self.advance();
                }
                TokenKind::RBrace => {
                    if brace_depth == 0 {
                        // Belongs to the enclosing type or namespace
                        return;
                    }
                    brace_depth -= 1;
                    self.advance();
                    if brace_depth == 0 {
                        return;
                    }
                }
                TokenKind::Semi if brace_depth == 0 => {
                    self.advance();
                    return;
                }
                TokenKind::Class | TokenKind::Struct | TokenKind::Interface | TokenKind::Enum
                | TokenKind::Namespace | TokenKind::Modifier(_) | TokenKind::LBracket
                    if brace_depth == 0 =>
                {
                    return;
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    /// Synchronize within a block - skip to the next statement boundary.
    fn synchronize_in_block(&mut self) {
        let mut depth = 0usize;
        while !self.at_end() {
            match self.current_kind() {
                TokenKind::LBrace | TokenKind::LParen | TokenKind::LBracket => depth += 1,
                TokenKind::RParen | TokenKind::RBracket => depth = depth.saturating_sub(1),
                TokenKind::RBrace => {
                    if depth == 0 {
                        return;
                    }
                    depth -= 1;
                }
                TokenKind::Semi if depth == 0 => {
                    self.advance();
                    return;
                }
                _ => {}
            }
            self.advance();
        }
    }

    // =========================================================================
    // Token Navigation
    // =========================================================================

    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn current_kind(&self) -> &TokenKind {
        &self.current().kind
    }

    fn peek(&self, n: usize) -> &TokenKind {
        self.tokens.get(self.pos + n).map(|t| &t.kind).unwrap_or(&TokenKind::Eof)
    }

    fn at_end(&self) -> bool {
        matches!(self.current_kind(), TokenKind::Eof)
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if !self.at_end() {
            self.pos += 1;
        }
        token
    }

    /// End offset of the last consumed token.
    fn prev_end(&self) -> usize {
        match self.pos.checked_sub(1) {
            Some(i) => self.tokens[i].span.end,
            None => 0,
        }
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.current_kind()) == std::mem::discriminant(kind)
    }

    fn check_word(&self, word: &str) -> bool {
        self.current_kind().is_ident(word)
    }

    fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn match_word(&mut self, word: &str) -> bool {
        if self.check_word(word) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<Token, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(ParseError::expected(kind.display_name(), self.current_kind(), self.current().span))
        }
    }

    fn expect_word(&mut self, word: &str) -> Result<(), ParseError> {
        if self.match_word(word) {
            Ok(())
        } else {
            Err(ParseError::expected(&format!("'{}'", word), self.current_kind(), self.current().span))
        }
    }

    fn expect_ident(&mut self) -> Result<String, ParseError> {
        match self.current_kind().clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(ParseError::expected("a name", self.current_kind(), self.current().span)),
        }
    }

    /// True if the tokens at `pos` and `pos + 1` touch (`>>` written without a space).
    fn adjacent(&self, offset: usize) -> bool {
        match (self.tokens.get(self.pos + offset), self.tokens.get(self.pos + offset + 1)) {
            (Some(a), Some(b)) => a.span.end == b.span.start,
            _ => false,
        }
    }

    fn expr(&mut self, kind: ExprKind, start: usize) -> Expr {
        Expr { id: self.next_id(), kind, span: Span::new(start, self.prev_end()) }
    }

    // =========================================================================
    // Compilation Unit
    // =========================================================================

    /// Parse a whole source file.
    pub fn parse(&mut self) -> ParseResult {
        let mut tree = SyntaxTree::default();
        tree.usings = self.parse_usings();

        while !self.at_end() && !self.too_many_errors() {
            // File-scoped namespace swallows the rest of the file
            if self.check(&TokenKind::Namespace) && self.file_scoped_namespace() {
                match self.parse_file_scoped_namespace() {
                    Ok(decl) => tree.members.push(decl),
                    Err(e) => {
                        self.record_error(e);
                    }
                }
                break;
            }
            self.parse_member_into(&mut tree.members, None);
        }

        ParseResult { tree, errors: std::mem::take(&mut self.errors) }
    }

    /// Parse one member, recording errors and recovering.
    fn parse_member_into(&mut self, members: &mut Vec<Decl>, type_name: Option<&str>) {
        let before = self.pos;
        match self.parse_member(type_name) {
            Ok(decl) => members.push(decl),
            Err(e) => {
                if self.record_error(e) {
                    self.synchronize();
                }
                if self.pos == before {
                    self.advance();
                }
            }
        }
    }

    fn parse_usings(&mut self) -> Vec<UsingDirective> {
        let mut usings = Vec::new();
        while self.check(&TokenKind::Using) {
            match self.parse_using() {
                Ok(using) => usings.push(using),
                Err(e) => {
                    if !self.record_error(e) {
                        break;
                    }
                    self.synchronize();
                }
            }
        }
        usings
    }

    fn parse_using(&mut self) -> Result<UsingDirective, ParseError> {
        let start = self.expect(&TokenKind::Using)?.span.start;
        let is_static = self.match_token(&TokenKind::Modifier(Modifier::Static));
        let alias = if matches!(self.peek(1), TokenKind::Eq) {
            let alias = self.expect_ident()?;
            self.advance();
            Some(alias)
        } else {
            None
        };
        let path = self.parse_type_name()?;
        self.expect(&TokenKind::Semi)?;
        Ok(UsingDirective { path, alias, is_static, span: Span::new(start, self.prev_end()) })
    }

    fn file_scoped_namespace(&self) -> bool {
        let mut i = 1;
        while matches!(self.peek(i), TokenKind::Ident(_) | TokenKind::Dot) {
            i += 1;
        }
        matches!(self.peek(i), TokenKind::Semi)
    }

    fn parse_file_scoped_namespace(&mut self) -> Result<Decl, ParseError> {
        let start = self.expect(&TokenKind::Namespace)?.span.start;
        let name = self.parse_qualified_name()?;
        self.expect(&TokenKind::Semi)?;
        let usings = self.parse_usings();
        let mut members = Vec::new();
        while !self.at_end() && !self.too_many_errors() {
            self.parse_member_into(&mut members, None);
        }
        Ok(Decl {
            id: self.next_id(),
            kind: DeclKind::Namespace(NamespaceDecl { name, usings, members }),
            attributes: Vec::new(),
            modifiers: Vec::new(),
            span: Span::new(start, self.prev_end()),
        })
    }

    fn parse_qualified_name(&mut self) -> Result<String, ParseError> {
        let mut name = self.expect_ident()?;
        while self.check(&TokenKind::Dot) && matches!(self.peek(1), TokenKind::Ident(_)) {
            self.advance();
            name.push('.');
            name.push_str(&self.expect_ident()?);
        }
        Ok(name)
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    /// Parse a namespace, type or type member.
    fn parse_member(&mut self, type_name: Option<&str>) -> Result<Decl, ParseError> {
        let start = self.current().span.start;
        let attributes = self.parse_attributes()?;
        let modifiers = self.parse_modifiers();

        let kind = match self.current_kind() {
            TokenKind::Namespace => self.parse_namespace()?,
            TokenKind::Class => self.parse_type_decl(TypeKind::Class)?,
            TokenKind::Struct => self.parse_type_decl(TypeKind::Struct)?,
            TokenKind::Interface => self.parse_type_decl(TypeKind::Interface)?,
            TokenKind::Enum => self.parse_enum()?,
            TokenKind::Event => self.parse_event()?,
            TokenKind::Implicit | TokenKind::Explicit => self.parse_conversion_operator()?,
            TokenKind::Ident(name)
                if Some(name.as_str()) == type_name && matches!(self.peek(1), TokenKind::LParen) =>
            {
                self.parse_constructor()?
            }
            _ => self.parse_typed_member()?,
        };

        Ok(Decl { id: self.next_id(), kind, attributes, modifiers, span: Span::new(start, self.prev_end()) })
    }

    fn parse_attributes(&mut self) -> Result<Vec<Attribute>, ParseError> {
        let mut attributes = Vec::new();
        while self.check(&TokenKind::LBracket) {
            self.advance();
            let target = if matches!(self.current_kind(), TokenKind::Ident(_)) && matches!(self.peek(1), TokenKind::Colon) {
                let target = self.expect_ident()?;
                self.advance();
                Some(target)
            } else {
                None
            };
            loop {
                let start = self.current().span.start;
                let name = self.parse_type_name()?;
                let args = if self.check(&TokenKind::LParen) { self.parse_args()? } else { Vec::new() };
                attributes.push(Attribute {
                    id: self.next_id(),
                    target: target.clone(),
                    name,
                    args,
                    span: Span::new(start, self.prev_end()),
                });
                if !self.match_token(&TokenKind::Comma) || self.check(&TokenKind::RBracket) {
                    break;
                }
            }
            self.expect(&TokenKind::RBracket)?;
        }
        Ok(attributes)
    }

    fn parse_modifiers(&mut self) -> Vec<Modifier> {
        let mut modifiers = Vec::new();
        loop {
            match self.current_kind() {
                TokenKind::Modifier(m) => {
                    modifiers.push(*m);
                    self.advance();
                }
                // `new` as a member modifier, not an object creation
                TokenKind::New if !matches!(self.peek(1), TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace) => {
                    modifiers.push(Modifier::New);
                    self.advance();
                }
                TokenKind::Ident(word)
                    if word == "partial"
                        && matches!(self.peek(1), TokenKind::Class | TokenKind::Struct | TokenKind::Interface | TokenKind::Ident(_)) =>
                {
                    modifiers.push(Modifier::Partial);
                    self.advance();
                }
                TokenKind::Ident(word) if word == "async" && matches!(self.peek(1), TokenKind::Ident(_)) => {
                    modifiers.push(Modifier::Async);
                    self.advance();
                }
                _ => return modifiers,
            }
        }
    }

    fn parse_namespace(&mut self) -> Result<DeclKind, ParseError> {
        self.expect(&TokenKind::Namespace)?;
        let name = self.parse_qualified_name()?;
        self.expect(&TokenKind::LBrace)?;
        let usings = self.parse_usings();
        let mut members = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.at_end() && !self.too_many_errors() {
            self.parse_member_into(&mut members, None);
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(DeclKind::Namespace(NamespaceDecl { name, usings, members }))
    }

    fn parse_type_decl(&mut self, kind: TypeKind) -> Result<DeclKind, ParseError> {
        self.advance(); // class / struct / interface
        let name = self.expect_ident()?;
        let type_params = self.parse_type_params()?;
        let mut bases = Vec::new();
        if self.match_token(&TokenKind::Colon) {
            loop {
                bases.push(self.parse_type()?);
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.skip_constraints();
        self.expect(&TokenKind::LBrace)?;
        let mut members = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.at_end() && !self.too_many_errors() {
            self.parse_member_into(&mut members, Some(&name));
        }
        self.expect(&TokenKind::RBrace)?;
        self.match_token(&TokenKind::Semi);
        Ok(DeclKind::Type(TypeDecl { kind, name, type_params, bases, members }))
    }

    fn parse_type_params(&mut self) -> Result<Vec<String>, ParseError> {
        let mut params = Vec::new();
        if self.match_token(&TokenKind::Lt) {
            loop {
                // Variance annotations
                if self.check(&TokenKind::In) || self.check(&TokenKind::Out) {
                    self.advance();
                }
                params.push(self.expect_ident()?);
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(&TokenKind::Gt)?;
        }
        Ok(params)
    }

    /// Skip `where T : ...` constraint clauses; they carry nothing we use.
    fn skip_constraints(&mut self) {
        while self.check_word("where") {
            while !matches!(
                self.current_kind(),
                TokenKind::LBrace | TokenKind::Semi | TokenKind::FatArrow | TokenKind::Eof
            ) {
                self.advance();
            }
        }
    }

    fn parse_enum(&mut self) -> Result<DeclKind, ParseError> {
        self.expect(&TokenKind::Enum)?;
        let name = self.expect_ident()?;
        let mut bases = Vec::new();
        if self.match_token(&TokenKind::Colon) {
            bases.push(self.parse_type()?);
        }
        self.expect(&TokenKind::LBrace)?;
        let mut members = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.at_end() {
            let start = self.current().span.start;
            let attributes = self.parse_attributes()?;
            let member_name = self.expect_ident()?;
            let value = if self.match_token(&TokenKind::Eq) { Some(self.parse_expr()?) } else { None };
            members.push(Decl {
                id: self.next_id(),
                kind: DeclKind::EnumMember(EnumMemberDecl { name: member_name, value }),
                attributes,
                modifiers: Vec::new(),
                span: Span::new(start, self.prev_end()),
            });
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RBrace)?;
        self.match_token(&TokenKind::Semi);
        Ok(DeclKind::Type(TypeDecl { kind: TypeKind::Enum, name, type_params: Vec::new(), bases, members }))
    }

    fn parse_event(&mut self) -> Result<DeclKind, ParseError> {
        self.expect(&TokenKind::Event)?;
        let ty = self.parse_type()?;
        if matches!(self.peek(1), TokenKind::LBrace) {
            let name = self.expect_ident()?;
            let accessors = self.parse_accessors()?;
            return Ok(DeclKind::CustomEvent(CustomEventDecl { ty, name, accessors }));
        }
        let vars = self.parse_declarators()?;
        self.expect(&TokenKind::Semi)?;
        Ok(DeclKind::Event(EventDecl { ty, vars }))
    }

    fn parse_conversion_operator(&mut self) -> Result<DeclKind, ParseError> {
        let symbol = if self.advance().kind == TokenKind::Implicit { "implicit" } else { "explicit" };
        self.expect(&TokenKind::Operator)?;
        let return_ty = self.parse_type()?;
        let params = self.parse_params(&TokenKind::LParen, &TokenKind::RParen)?;
        let body = self.parse_member_body()?;
        Ok(DeclKind::Operator(OperatorDecl { return_ty, symbol: symbol.to_string(), params, body }))
    }

    fn parse_constructor(&mut self) -> Result<DeclKind, ParseError> {
        let name = self.expect_ident()?;
        let params = self.parse_params(&TokenKind::LParen, &TokenKind::RParen)?;
        let initializer = if self.match_token(&TokenKind::Colon) {
            let is_base = match self.current_kind() {
                TokenKind::Base => true,
                TokenKind::This => false,
                other => return Err(ParseError::expected("'base' or 'this'", other, self.current().span)),
            };
            self.advance();
            let args = self.parse_args()?;
            Some(ConstructorInitializer { is_base, args })
        } else {
            None
        };
        let body = self.parse_member_body()?;
        Ok(DeclKind::Constructor(ConstructorDecl { name, params, initializer, body }))
    }

    /// Members that start with a type: fields, methods, properties, indexers, operators.
    fn parse_typed_member(&mut self) -> Result<DeclKind, ParseError> {
        let ty = self.parse_type()?;

        if self.match_token(&TokenKind::Operator) {
            let symbol = self.parse_operator_symbol()?;
            let params = self.parse_params(&TokenKind::LParen, &TokenKind::RParen)?;
            let body = self.parse_member_body()?;
            return Ok(DeclKind::Operator(OperatorDecl { return_ty: ty, symbol, params, body }));
        }

        if self.match_token(&TokenKind::This) {
            let params = self.parse_params(&TokenKind::LBracket, &TokenKind::RBracket)?;
            let (accessors, expr_body) = self.parse_property_body()?;
            return Ok(DeclKind::Indexer(IndexerDecl { ty, params, accessors, expr_body }));
        }

        if !matches!(self.current_kind(), TokenKind::Ident(_)) {
            return Err(ParseError::expected("a member name", self.current_kind(), self.current().span)
                .with_hint("members look like 'int Count;' or 'void Run () { }'"));
        }

        if matches!(self.peek(1), TokenKind::Eq | TokenKind::Comma | TokenKind::Semi) {
            let vars = self.parse_declarators()?;
            self.expect(&TokenKind::Semi)?;
            return Ok(DeclKind::Field(FieldDecl { ty, vars }));
        }

        let name = self.parse_member_name()?;
        match self.current_kind() {
            TokenKind::LParen | TokenKind::Lt => {
                let type_params = self.parse_type_params()?;
                let params = self.parse_params(&TokenKind::LParen, &TokenKind::RParen)?;
                self.skip_constraints();
                let body = self.parse_member_body()?;
                Ok(DeclKind::Method(MethodDecl { return_ty: ty, name, type_params, params, body }))
            }
            TokenKind::LBrace | TokenKind::FatArrow => {
                let (accessors, expr_body) = self.parse_property_body()?;
                let init = if expr_body.is_none() && self.match_token(&TokenKind::Eq) {
                    let init = self.parse_expr()?;
                    self.expect(&TokenKind::Semi)?;
                    Some(init)
                } else {
                    None
                };
                Ok(DeclKind::Property(PropertyDecl { ty, name, accessors, expr_body, init }))
            }
            other => Err(ParseError::expected("'('", other, self.current().span)),
        }
    }

    /// Member name, possibly qualified by an explicit interface (`IFoo.Bar`).
    fn parse_member_name(&mut self) -> Result<String, ParseError> {
        let mut name = self.expect_ident()?;
        loop {
            if self.check(&TokenKind::Lt) && self.lookahead_type_args_then_dot() {
                let args = self.parse_type_arg_list()?;
                name.push_str(&format!("<{}>", args.join(", ")));
            }
            if self.check(&TokenKind::Dot) {
                self.advance();
                name.push('.');
                name.push_str(&self.expect_ident()?);
            } else {
                return Ok(name);
            }
        }
    }

    /// `IFoo<T>.Bar`: generic arguments followed by a dot.
    fn lookahead_type_args_then_dot(&mut self) -> bool {
        let saved = self.pos;
        let ok = self.parse_type_arg_list().is_ok() && self.check(&TokenKind::Dot);
        self.pos = saved;
        ok
    }

    fn parse_operator_symbol(&mut self) -> Result<String, ParseError> {
        let token = self.advance();
        let symbol = match &token.kind {
            TokenKind::Gt if self.check(&TokenKind::Gt) && self.tokens[self.pos - 1].span.end == self.current().span.start => {
                self.advance();
                ">>"
            }
            TokenKind::Bool(true) => "true",
            TokenKind::Bool(false) => "false",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::Amp => "&",
            TokenKind::Pipe => "|",
            TokenKind::Caret => "^",
            TokenKind::Bang => "!",
            TokenKind::Tilde => "~",
            TokenKind::PlusPlus => "++",
            TokenKind::MinusMinus => "--",
            TokenKind::LtLt => "<<",
            TokenKind::EqEq => "==",
            TokenKind::BangEq => "!=",
            TokenKind::Lt => "<",
            TokenKind::Gt => ">",
            TokenKind::LtEq => "<=",
            TokenKind::GtEq => ">=",
            other => {
                return Err(ParseError::expected("an overloadable operator", other, token.span));
            }
        };
        Ok(symbol.to_string())
    }

    fn parse_params(&mut self, open: &TokenKind, close: &TokenKind) -> Result<Vec<Param>, ParseError> {
        self.expect(open)?;
        let mut params = Vec::new();
        while !self.check(close) && !self.at_end() {
            let start = self.current().span.start;
            let attributes = self.parse_attributes()?;
            let modifier = match self.current_kind() {
                TokenKind::Ref => Some(ParamModifier::Ref),
                TokenKind::Out => Some(ParamModifier::Out),
                TokenKind::In => Some(ParamModifier::In),
                TokenKind::Params => Some(ParamModifier::Params),
                TokenKind::This => Some(ParamModifier::This),
                _ => None,
            };
            if modifier.is_some() {
                self.advance();
            }
            let ty = self.parse_type()?;
            let name = self.expect_ident()?;
            let default = if self.match_token(&TokenKind::Eq) { Some(self.parse_expr()?) } else { None };
            params.push(Param { name, ty, modifier, default, attributes, span: Span::new(start, self.prev_end()) });
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(close)?;
        Ok(params)
    }

    /// `{ ... }`, `=> expr;` or `;`.
    fn parse_member_body(&mut self) -> Result<Option<MemberBody>, ParseError> {
        match self.current_kind() {
            TokenKind::LBrace => Ok(Some(MemberBody::Block(self.parse_block()?))),
            TokenKind::FatArrow => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(&TokenKind::Semi)?;
                Ok(Some(MemberBody::Expr(expr)))
            }
            TokenKind::Semi => {
                self.advance();
                Ok(None)
            }
            other => Err(ParseError::expected("'{'", other, self.current().span)),
        }
    }

    /// Accessor list or expression body of a property or indexer.
    fn parse_property_body(&mut self) -> Result<(Vec<Accessor>, Option<Expr>), ParseError> {
        if self.match_token(&TokenKind::FatArrow) {
            let expr = self.parse_expr()?;
            self.expect(&TokenKind::Semi)?;
            return Ok((Vec::new(), Some(expr)));
        }
        Ok((self.parse_accessors()?, None))
    }

    fn parse_accessors(&mut self) -> Result<Vec<Accessor>, ParseError> {
        self.expect(&TokenKind::LBrace)?;
        let mut accessors = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.at_end() {
            let start = self.current().span.start;
            let attributes = self.parse_attributes()?;
            let modifiers = self.parse_modifiers();
            let kind = match self.current_kind() {
                TokenKind::Ident(word) => AccessorKind::from_keyword(word),
                _ => None,
            };
            let kind = kind.ok_or_else(|| {
                ParseError::expected("accessor", self.current_kind(), self.current().span)
            })?;
            self.advance();
            let body = self.parse_member_body()?;
            accessors.push(Accessor {
                id: self.next_id(),
                kind,
                attributes,
                modifiers,
                body,
                span: Span::new(start, self.prev_end()),
            });
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(accessors)
    }

    fn parse_declarators(&mut self) -> Result<Vec<VarDeclarator>, ParseError> {
        let mut vars = Vec::new();
        loop {
            let start = self.current().span.start;
            let name = self.expect_ident()?;
            let init = if self.match_token(&TokenKind::Eq) { Some(self.parse_var_init()?) } else { None };
            vars.push(VarDeclarator { name, init, span: Span::new(start, self.prev_end()) });
            if !self.match_token(&TokenKind::Comma) {
                return Ok(vars);
            }
        }
    }

    /// Variable initializer; a bare `{ ... }` is an array initializer.
    fn parse_var_init(&mut self) -> Result<Expr, ParseError> {
        if self.check(&TokenKind::LBrace) {
            let start = self.current().span.start;
            let init = self.parse_initializer()?;
            return Ok(self.expr(ExprKind::NewArray { ty: None, sizes: Vec::new(), init: Some(init) }, start));
        }
        self.parse_expr()
    }

    // =========================================================================
    // Types
    // =========================================================================

    /// Parse a type: qualified name, generic arguments, `?`, array ranks.
    pub(crate) fn parse_type(&mut self) -> Result<String, ParseError> {
        self.parse_type_inner(true)
    }

    fn parse_type_inner(&mut self, allow_nullable: bool) -> Result<String, ParseError> {
        let mut ty = self.parse_type_name()?;
        if allow_nullable
            && self.check(&TokenKind::Question)
            && matches!(
                self.peek(1),
                TokenKind::Ident(_) | TokenKind::RParen | TokenKind::Comma | TokenKind::Gt | TokenKind::LBracket
            )
        {
            self.advance();
            ty.push('?');
        }
        while self.check(&TokenKind::LBracket) && matches!(self.peek(1), TokenKind::RBracket | TokenKind::Comma) {
            self.advance();
            ty.push('[');
            while self.match_token(&TokenKind::Comma) {
                ty.push(',');
            }
            self.expect(&TokenKind::RBracket)?;
            ty.push(']');
        }
        Ok(ty)
    }

    /// Qualified name with generic arguments (`System.Collections.Generic.List<int>`).
    fn parse_type_name(&mut self) -> Result<String, ParseError> {
        let mut name = match self.current_kind().clone() {
            TokenKind::Ident(name) => {
                self.advance();
                name
            }
            other => return Err(ParseError::expected("type", &other, self.current().span)),
        };
        loop {
            if self.check(&TokenKind::Lt) {
                let args = self.parse_type_arg_list()?;
                name.push_str(&format!("<{}>", args.join(", ")));
            }
            if self.check(&TokenKind::Dot) && matches!(self.peek(1), TokenKind::Ident(_)) {
                self.advance();
                name.push('.');
                name.push_str(&self.expect_ident()?);
            } else {
                return Ok(name);
            }
        }
    }

    fn parse_type_arg_list(&mut self) -> Result<Vec<String>, ParseError> {
        self.expect(&TokenKind::Lt)?;
        let mut args = Vec::new();
        loop {
            args.push(self.parse_type()?);
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::Gt)?;
        Ok(args)
    }

    /// Speculatively parse a type; restores the position on failure.
    fn try_parse_type(&mut self) -> Option<String> {
        let saved = self.pos;
        match self.parse_type() {
            Ok(ty) => Some(ty),
            Err(_) => {
                self.pos = saved;
                None
            }
        }
    }

    /// Generic arguments in expression context (`Cast<int> ()`).
    ///
    /// Accepted only when the token after `>` cannot continue a relational
    /// expression.
    fn try_type_args(&mut self) -> Option<Vec<String>> {
        if !self.check(&TokenKind::Lt) {
            return None;
        }
        let saved = self.pos;
        match self.parse_type_arg_list() {
            Ok(args)
                if matches!(
                    self.current_kind(),
                    TokenKind::LParen
                        | TokenKind::RParen
                        | TokenKind::RBracket
                        | TokenKind::RBrace
                        | TokenKind::Colon
                        | TokenKind::Semi
                        | TokenKind::Comma
                        | TokenKind::Dot
                        | TokenKind::QuestionDot
                        | TokenKind::EqEq
                        | TokenKind::BangEq
                        | TokenKind::Eof
                ) =>
            {
                Some(args)
            }
            _ => {
                self.pos = saved;
                None
            }
        }
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn parse_block(&mut self) -> Result<Block, ParseError> {
        let start = self.expect(&TokenKind::LBrace)?.span.start;

        let mut stmts = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.at_end() {
            let before = self.pos;
            match self.parse_stmt() {
                Ok(stmt) => stmts.push(stmt),
                Err(e) => {
                    // Record error but stay within the block
                    if !self.record_error(e) {
                        break;
                    }
                    self.synchronize_in_block();
                    if self.pos == before {
                        self.advance();
                    }
                }
            }
        }

        self.expect(&TokenKind::RBrace)?;
        Ok(Block { stmts, span: Span::new(start, self.prev_end()) })
    }

    fn parse_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current().span.start;
        let kind = match self.current_kind() {
            TokenKind::LBrace => StmtKind::Block(self.parse_block()?),
            TokenKind::Semi => {
                self.advance();
                StmtKind::Empty
            }
            TokenKind::Return => {
                self.advance();
                let value = if self.check(&TokenKind::Semi) { None } else { Some(self.parse_expr()?) };
                self.expect(&TokenKind::Semi)?;
                StmtKind::Return(value)
            }
            TokenKind::Throw => {
                self.advance();
                let value = if self.check(&TokenKind::Semi) { None } else { Some(self.parse_expr()?) };
                self.expect(&TokenKind::Semi)?;
                StmtKind::Throw(value)
            }
            TokenKind::Break => {
                self.advance();
                self.expect(&TokenKind::Semi)?;
                StmtKind::Break
            }
            TokenKind::Continue => {
                self.advance();
                self.expect(&TokenKind::Semi)?;
                StmtKind::Continue
            }
            TokenKind::If => {
                self.advance();
                let cond = self.parse_paren_cond()?;
                let then_branch = Box::new(self.parse_stmt()?);
                let else_branch =
                    if self.match_token(&TokenKind::Else) { Some(Box::new(self.parse_stmt()?)) } else { None };
                StmtKind::If { cond, then_branch, else_branch }
            }
            TokenKind::While => {
                self.advance();
                let cond = self.parse_paren_cond()?;
                let body = Box::new(self.parse_stmt()?);
                StmtKind::While { cond, body }
            }
            TokenKind::Do => {
                self.advance();
                let body = Box::new(self.parse_stmt()?);
                self.expect(&TokenKind::While)?;
                let cond = self.parse_paren_cond()?;
                self.expect(&TokenKind::Semi)?;
                StmtKind::Do { body, cond }
            }
            TokenKind::For => self.parse_for()?,
            TokenKind::Foreach => {
                self.advance();
                self.expect(&TokenKind::LParen)?;
                let ty = self.parse_type()?;
                let var = self.expect_ident()?;
                self.expect(&TokenKind::In)?;
                let iter = self.parse_expr()?;
                self.expect(&TokenKind::RParen)?;
                let body = Box::new(self.parse_stmt()?);
                StmtKind::Foreach { ty, var, iter, body }
            }
            TokenKind::Modifier(Modifier::Const) => {
                self.advance();
                let ty = self.parse_type()?;
                let vars = self.parse_declarators()?;
                self.expect(&TokenKind::Semi)?;
                StmtKind::Local { ty, is_const: true, vars }
            }
            _ => {
                if let Some(ty) = self.try_local_decl_type() {
                    let vars = self.parse_declarators()?;
                    self.expect(&TokenKind::Semi)?;
                    StmtKind::Local { ty, is_const: false, vars }
                } else {
                    let expr = self.parse_expr()?;
                    self.expect(&TokenKind::Semi)?;
                    StmtKind::Expr(expr)
                }
            }
        };
        Ok(Stmt { id: self.next_id(), kind, span: Span::new(start, self.prev_end()) })
    }

    /// `T name =`, `T name;` or `T name,` starts a local declaration.
    fn try_local_decl_type(&mut self) -> Option<String> {
        let saved = self.pos;
        if let Some(ty) = self.try_parse_type() {
            if matches!(self.current_kind(), TokenKind::Ident(_))
                && matches!(self.peek(1), TokenKind::Eq | TokenKind::Semi | TokenKind::Comma)
            {
                return Some(ty);
            }
        }
        self.pos = saved;
        None
    }

    fn parse_paren_cond(&mut self) -> Result<Expr, ParseError> {
        self.expect(&TokenKind::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(&TokenKind::RParen)?;
        Ok(cond)
    }

    fn parse_for(&mut self) -> Result<StmtKind, ParseError> {
        self.expect(&TokenKind::For)?;
        self.expect(&TokenKind::LParen)?;

        let mut init = Vec::new();
        if !self.check(&TokenKind::Semi) {
            let start = self.current().span.start;
            if let Some(ty) = self.try_local_decl_type() {
                let vars = self.parse_declarators()?;
                init.push(Stmt {
                    id: self.next_id(),
                    kind: StmtKind::Local { ty, is_const: false, vars },
                    span: Span::new(start, self.prev_end()),
                });
            } else {
                loop {
                    let start = self.current().span.start;
                    let expr = self.parse_expr()?;
                    init.push(Stmt { id: self.next_id(), kind: StmtKind::Expr(expr), span: Span::new(start, self.prev_end()) });
                    if !self.match_token(&TokenKind::Comma) {
                        break;
                    }
                }
            }
        }
        self.expect(&TokenKind::Semi)?;

        let cond = if self.check(&TokenKind::Semi) { None } else { Some(self.parse_expr()?) };
        self.expect(&TokenKind::Semi)?;

        let mut update = Vec::new();
        while !self.check(&TokenKind::RParen) && !self.at_end() {
            update.push(self.parse_expr()?);
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RParen)?;

        let body = Box::new(self.parse_stmt()?);
        Ok(StmtKind::For { init, cond, update, body })
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    /// Parse a full expression, assignment included.
    pub fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_expr_bp(0)
    }

    fn parse_expr_bp(&mut self, min_bp: u8) -> Result<Expr, ParseError> {
        let start = self.current().span.start;
        let mut lhs = self.parse_prefix()?;

        loop {
            if self.postfix_bp().is_some() {
                lhs = self.parse_postfix(lhs, start)?;
                continue;
            }

            match self.current_kind() {
                TokenKind::Is | TokenKind::As => {
                    let bp = 17;
                    if bp < min_bp {
                        break;
                    }
                    let is_test = self.check(&TokenKind::Is);
                    self.advance();
                    let ty = self.parse_type_inner(false)?;
                    let expr = Box::new(lhs);
                    let kind = if is_test { ExprKind::Is { expr, ty } } else { ExprKind::As { expr, ty } };
                    lhs = self.expr(kind, start);
                    continue;
                }
                TokenKind::Question => {
                    let bp = 2;
                    if bp < min_bp {
                        break;
                    }
                    self.advance();
                    let then_branch = self.parse_expr()?;
                    self.expect(&TokenKind::Colon)?;
                    let else_branch = self.parse_expr()?;
                    lhs = self.expr(
                        ExprKind::Conditional {
                            cond: Box::new(lhs),
                            then_branch: Box::new(then_branch),
                            else_branch: Box::new(else_branch),
                        },
                        start,
                    );
                    continue;
                }
                _ => {}
            }

            if let Some((op, width)) = self.assign_op() {
                let bp = 1;
                if bp < min_bp {
                    break;
                }
                for _ in 0..width {
                    self.advance();
                }
                let value = self.parse_expr()?;
                lhs = self.expr(ExprKind::Assign { op, target: Box::new(lhs), value: Box::new(value) }, start);
                continue;
            }

            if let Some((l_bp, r_bp, op, width)) = self.infix_bp() {
                if l_bp < min_bp {
                    break;
                }
                for _ in 0..width {
                    self.advance();
                }
                let rhs = self.parse_expr_bp(r_bp)?;
                lhs = self.expr(ExprKind::Binary { op, left: Box::new(lhs), right: Box::new(rhs) }, start);
                continue;
            }

            break;
        }

        Ok(lhs)
    }

    fn parse_prefix(&mut self) -> Result<Expr, ParseError> {
        let start = self.current().span.start;

        if self.is_lambda_start() {
            return self.parse_lambda();
        }
        if self.is_query_start() {
            return self.parse_query();
        }

        match self.current_kind().clone() {
            TokenKind::Int(n) => {
                self.advance();
                Ok(self.expr(ExprKind::Int(n), start))
            }
            TokenKind::Float(n) => {
                self.advance();
                Ok(self.expr(ExprKind::Float(n), start))
            }
            TokenKind::String(s) => {
                self.advance();
                Ok(self.expr(ExprKind::String(s), start))
            }
            TokenKind::InterpolatedString { prefix, parts } => {
                self.advance();
                let mut pieces = Vec::with_capacity(parts.len());
                for part in parts {
                    pieces.push(match part {
                        InterpolatedToken::Text(text) => InterpolatedPart::Text(text),
                        InterpolatedToken::Hole { tokens, suffix } => {
                            InterpolatedPart::Hole { expr: self.parse_hole(tokens, start)?, suffix }
                        }
                    });
                }
                Ok(self.expr(ExprKind::Interpolated { prefix, parts: pieces }, start))
            }
            TokenKind::Char(c) => {
                self.advance();
                Ok(self.expr(ExprKind::Char(c), start))
            }
            TokenKind::Bool(b) => {
                self.advance();
                Ok(self.expr(ExprKind::Bool(b), start))
            }
            TokenKind::Null => {
                self.advance();
                Ok(self.expr(ExprKind::Null, start))
            }
            TokenKind::This => {
                self.advance();
                Ok(self.expr(ExprKind::This, start))
            }
            TokenKind::Base => {
                self.advance();
                Ok(self.expr(ExprKind::Base, start))
            }

            TokenKind::Ident(name) => {
                self.advance();
                if let Some(type_args) = self.try_type_args() {
                    if self.check(&TokenKind::LParen) {
                        let func = self.expr(ExprKind::Ident(name), start);
                        let args = self.parse_args()?;
                        return Ok(self.expr(
                            ExprKind::Call { func: Box::new(func), type_args: Some(type_args), args },
                            start,
                        ));
                    }
                    // Generic type used as a member-access target (`List<int>.Empty`)
                    let name = format!("{}<{}>", name, type_args.join(", "));
                    return Ok(self.expr(ExprKind::Ident(name), start));
                }
                Ok(self.expr(ExprKind::Ident(name), start))
            }

            TokenKind::LParen => {
                if let Some(ty) = self.try_cast_type() {
                    let operand = self.parse_expr_bp(25)?;
                    return Ok(self.expr(ExprKind::Cast { ty, expr: Box::new(operand) }, start));
                }
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(&TokenKind::RParen)?;
                Ok(self.expr(ExprKind::Paren(Box::new(inner)), start))
            }

            TokenKind::New => self.parse_new(),

            TokenKind::Typeof => {
                self.advance();
                self.expect(&TokenKind::LParen)?;
                let ty = self.parse_type()?;
                self.expect(&TokenKind::RParen)?;
                Ok(self.expr(ExprKind::Typeof(ty), start))
            }

            TokenKind::Minus
            | TokenKind::Plus
            | TokenKind::Bang
            | TokenKind::Tilde
            | TokenKind::PlusPlus
            | TokenKind::MinusMinus => {
                let op = match self.advance().kind {
                    TokenKind::Minus => UnaryOp::Neg,
                    TokenKind::Plus => UnaryOp::Plus,
                    TokenKind::Bang => UnaryOp::Not,
                    TokenKind::Tilde => UnaryOp::BitNot,
                    TokenKind::PlusPlus => UnaryOp::PreInc,
                    _ => UnaryOp::PreDec,
                };
                let operand = self.parse_expr_bp(25)?;
                Ok(self.expr(ExprKind::Unary { op, operand: Box::new(operand) }, start))
            }

            other => Err(ParseError::expected("expression", &other, self.current().span)),
        }
    }

    /// Parse the tokens of an interpolation hole as one expression.
    fn parse_hole(&mut self, mut tokens: Vec<Token>, at: usize) -> Result<Expr, ParseError> {
        let end = tokens.last().map_or(at, |t| t.span.end);
        tokens.push(Token { kind: TokenKind::Eof, span: Span::new(end, end) });
        let outer = std::mem::replace(&mut self.tokens, tokens);
        let outer_pos = std::mem::replace(&mut self.pos, 0);
        let hole = self.parse_standalone_expr();
        self.tokens = outer;
        self.pos = outer_pos;
        hole
    }

    /// `(T) operand`: the parenthesized type must be followed by something
    /// that can only start an operand.
    fn try_cast_type(&mut self) -> Option<String> {
        let saved = self.pos;
        self.advance(); // (
        if let Some(ty) = self.try_parse_type() {
            if self.match_token(&TokenKind::RParen) {
                let operand_follows = match self.current_kind() {
                    TokenKind::Ident(_)
                    | TokenKind::Int(_)
                    | TokenKind::Float(_)
                    | TokenKind::String(_)
                    | TokenKind::InterpolatedString { .. }
                    | TokenKind::Char(_)
                    | TokenKind::Bool(_)
                    | TokenKind::Null
                    | TokenKind::This
                    | TokenKind::Base
                    | TokenKind::New
                    | TokenKind::Typeof
                    | TokenKind::LParen
                    | TokenKind::Bang
                    | TokenKind::Tilde => true,
                    TokenKind::Minus | TokenKind::Plus => PREDEFINED_TYPES.contains(&ty.trim_end_matches('?')),
                    _ => false,
                };
                if operand_follows {
                    return Some(ty);
                }
            }
        }
        self.pos = saved;
        None
    }

    fn parse_new(&mut self) -> Result<Expr, ParseError> {
        let start = self.expect(&TokenKind::New)?.span.start;

        // Anonymous object
        if self.check(&TokenKind::LBrace) {
            self.advance();
            let mut members = Vec::new();
            while !self.check(&TokenKind::RBrace) && !self.at_end() {
                let name = if matches!(self.current_kind(), TokenKind::Ident(_)) && matches!(self.peek(1), TokenKind::Eq) {
                    let name = self.expect_ident()?;
                    self.advance();
                    Some(name)
                } else {
                    None
                };
                let value = self.parse_expr()?;
                members.push(AnonymousMember { name, value });
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(&TokenKind::RBrace)?;
            return Ok(self.expr(ExprKind::AnonymousObject(members), start));
        }

        // Implicitly typed array
        if self.check(&TokenKind::LBracket) {
            self.advance();
            self.expect(&TokenKind::RBracket)?;
            let init = self.parse_initializer()?;
            return Ok(self.expr(ExprKind::NewArray { ty: None, sizes: Vec::new(), init: Some(init) }, start));
        }

        let ty = self.parse_type()?;

        if self.check(&TokenKind::LBracket) {
            self.advance();
            let mut sizes = Vec::new();
            loop {
                sizes.push(self.parse_expr()?);
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(&TokenKind::RBracket)?;
            let init = if self.check(&TokenKind::LBrace) { Some(self.parse_initializer()?) } else { None };
            return Ok(self.expr(ExprKind::NewArray { ty: Some(ty), sizes, init }, start));
        }

        if let Some(element) = ty.strip_suffix("[]") {
            // `new int[] { 1, 2 }`
            let element = element.to_string();
            let init = self.parse_initializer()?;
            return Ok(self.expr(ExprKind::NewArray { ty: Some(element), sizes: Vec::new(), init: Some(init) }, start));
        }

        let has_args = self.check(&TokenKind::LParen);
        let args = if has_args { self.parse_args()? } else { Vec::new() };
        let init = if self.check(&TokenKind::LBrace) { Some(self.parse_initializer()?) } else { None };
        if !has_args && init.is_none() {
            return Err(ParseError::expected("'('", self.current_kind(), self.current().span)
                .with_hint("object creation needs an argument list: new T ()"));
        }
        Ok(self.expr(ExprKind::NewObject { ty, args, init }, start))
    }

    /// `{ a, b = c, { d } }` of array, object and collection initializers.
    fn parse_initializer(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.expect(&TokenKind::LBrace)?;
        let mut items = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.at_end() {
            items.push(self.parse_var_init()?);
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(items)
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.expect(&TokenKind::LParen)?;
        let mut args = Vec::new();
        while !self.check(&TokenKind::RParen) && !self.at_end() {
            // Argument modifiers carry no meaning for the rewrite
            if matches!(self.current_kind(), TokenKind::Ref | TokenKind::Out | TokenKind::In) {
                self.advance();
            }
            args.push(self.parse_expr()?);
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RParen)?;
        Ok(args)
    }

    fn parse_postfix(&mut self, lhs: Expr, start: usize) -> Result<Expr, ParseError> {
        match self.current_kind() {
            TokenKind::Dot => {
                self.advance();
                let method_start = self.current().span.start;
                let name = self.expect_ident()?;
                let method_span = Span::new(method_start, self.prev_end());
                let type_args = self.try_type_args();
                if self.check(&TokenKind::LParen) {
                    let args = self.parse_args()?;
                    Ok(self.expr(
                        ExprKind::MethodCall { object: Box::new(lhs), method: name, method_span, type_args, args },
                        start,
                    ))
                } else {
                    let field = match type_args {
                        Some(args) => format!("{}<{}>", name, args.join(", ")),
                        None => name,
                    };
                    Ok(self.expr(ExprKind::Field { object: Box::new(lhs), field, null_conditional: false }, start))
                }
            }
            TokenKind::QuestionDot => {
                self.advance();
                let field = self.expect_ident()?;
                Ok(self.expr(ExprKind::Field { object: Box::new(lhs), field, null_conditional: true }, start))
            }
            TokenKind::LParen => {
                let args = self.parse_args()?;
                Ok(self.expr(ExprKind::Call { func: Box::new(lhs), type_args: None, args }, start))
            }
            TokenKind::LBracket => {
                self.advance();
                let mut args = Vec::new();
                loop {
                    args.push(self.parse_expr()?);
                    if !self.match_token(&TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(&TokenKind::RBracket)?;
                Ok(self.expr(ExprKind::Index { object: Box::new(lhs), args }, start))
            }
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                let op = if self.advance().kind == TokenKind::PlusPlus { UnaryOp::PostInc } else { UnaryOp::PostDec };
                Ok(self.expr(ExprKind::Unary { op, operand: Box::new(lhs) }, start))
            }
            other => Err(ParseError::expected("expression", other, self.current().span)),
        }
    }

    // =========================================================================
    // Lambdas
    // =========================================================================

    /// `x =>` or `( ... ) =>`.
    fn is_lambda_start(&self) -> bool {
        match self.current_kind() {
            TokenKind::Ident(_) => matches!(self.peek(1), TokenKind::FatArrow),
            TokenKind::LParen => {
                let mut depth = 0usize;
                let mut i = 0;
                loop {
                    match self.peek(i) {
                        TokenKind::LParen => depth += 1,
                        TokenKind::RParen => {
                            depth -= 1;
                            if depth == 0 {
                                return matches!(self.peek(i + 1), TokenKind::FatArrow);
                            }
                        }
                        TokenKind::Eof | TokenKind::Semi | TokenKind::LBrace | TokenKind::RBrace => return false,
                        _ => {}
                    }
                    i += 1;
                }
            }
            _ => false,
        }
    }

    fn parse_lambda(&mut self) -> Result<Expr, ParseError> {
        let start = self.current().span.start;
        let mut params = Vec::new();
        let parenthesized = self.check(&TokenKind::LParen);

        if parenthesized {
            self.advance();
            while !self.check(&TokenKind::RParen) && !self.at_end() {
                let param_start = self.current().span.start;
                if matches!(self.current_kind(), TokenKind::Ref | TokenKind::Out | TokenKind::In) {
                    self.advance();
                }
                let ty = if matches!(self.current_kind(), TokenKind::Ident(_))
                    && matches!(self.peek(1), TokenKind::Comma | TokenKind::RParen)
                {
                    None
                } else {
                    Some(self.parse_type()?)
                };
                let name = self.expect_ident()?;
                params.push(LambdaParam { name, ty, span: Span::new(param_start, self.prev_end()) });
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(&TokenKind::RParen)?;
        } else {
            let name = self.expect_ident()?;
            params.push(LambdaParam { name, ty: None, span: Span::new(start, self.prev_end()) });
        }

        self.expect(&TokenKind::FatArrow)?;
        let body = if self.check(&TokenKind::LBrace) {
            LambdaBody::Block(self.parse_block()?)
        } else {
            LambdaBody::Expr(Box::new(self.parse_expr()?))
        };
        Ok(self.expr(ExprKind::Lambda { params, parenthesized, body }, start))
    }

    // =========================================================================
    // Query Expressions
    // =========================================================================

    /// `from x in` or `from T x in`.
    fn is_query_start(&mut self) -> bool {
        if !self.check_word("from") {
            return false;
        }
        if matches!(self.peek(1), TokenKind::Ident(_)) && matches!(self.peek(2), TokenKind::In) {
            return true;
        }
        let saved = self.pos;
        self.advance();
        let typed = self.try_parse_type().is_some()
            && matches!(self.current_kind(), TokenKind::Ident(_))
            && matches!(self.peek(1), TokenKind::In);
        self.pos = saved;
        typed
    }

    fn parse_query(&mut self) -> Result<Expr, ParseError> {
        let start = self.current().span.start;
        let mut clauses = vec![self.parse_from_clause()?];

        loop {
            let word = match self.current_kind() {
                TokenKind::Ident(word) => word.clone(),
                other => {
                    return Err(ParseError::expected("query clause", other, self.current().span));
                }
            };
            match word.as_str() {
                "from" => clauses.push(self.parse_from_clause()?),
                "let" => {
                    self.advance();
                    let name = self.expect_ident()?;
                    self.expect(&TokenKind::Eq)?;
                    let value = self.parse_expr()?;
                    clauses.push(QueryClause::Let { name, value });
                }
                "where" => {
                    self.advance();
                    clauses.push(QueryClause::Where(self.parse_expr()?));
                }
                "join" => clauses.push(self.parse_join_clause()?),
                "orderby" => {
                    self.advance();
                    let mut keys = Vec::new();
                    loop {
                        let key = self.parse_expr()?;
                        let direction = if self.match_word("descending") {
                            Direction::Descending
                        } else {
                            self.match_word("ascending");
                            Direction::Ascending
                        };
                        keys.push(Ordering { key, direction });
                        if !self.match_token(&TokenKind::Comma) {
                            break;
                        }
                    }
                    clauses.push(QueryClause::OrderBy(keys));
                }
                "select" => {
                    self.advance();
                    let value = self.parse_expr()?;
                    if self.match_word("into") {
                        let var = self.expect_ident()?;
                        clauses.push(QueryClause::SelectInto { value, var });
                        continue;
                    }
                    clauses.push(QueryClause::Select(value));
                    break;
                }
                "group" => {
                    self.advance();
                    let value = self.parse_expr()?;
                    self.expect_word("by")?;
                    let key = self.parse_expr()?;
                    if self.match_word("into") {
                        let into = Some(self.expect_ident()?);
                        clauses.push(QueryClause::Group { value, key, into });
                        continue;
                    }
                    clauses.push(QueryClause::Group { value, key, into: None });
                    break;
                }
                _ => {
                    return Err(ParseError::expected("query clause", self.current_kind(), self.current().span));
                }
            }
        }

        Ok(self.expr(ExprKind::Query(clauses), start))
    }

    /// Optional type followed by a range variable: `x` or `T x`.
    fn parse_range_var(&mut self) -> Result<(Option<String>, String), ParseError> {
        if matches!(self.current_kind(), TokenKind::Ident(_)) && matches!(self.peek(1), TokenKind::In) {
            return Ok((None, self.expect_ident()?));
        }
        let ty = self.parse_type()?;
        let var = self.expect_ident()?;
        Ok((Some(ty), var))
    }

    fn parse_from_clause(&mut self) -> Result<QueryClause, ParseError> {
        self.expect_word("from")?;
        let (ty, var) = self.parse_range_var()?;
        self.expect(&TokenKind::In)?;
        let source = self.parse_expr()?;
        Ok(QueryClause::From { var, ty, source })
    }

    fn parse_join_clause(&mut self) -> Result<QueryClause, ParseError> {
        self.expect_word("join")?;
        let (ty, var) = self.parse_range_var()?;
        self.expect(&TokenKind::In)?;
        let source = self.parse_expr()?;
        self.expect_word("on")?;
        let outer_key = self.parse_expr()?;
        self.expect_word("equals")?;
        let inner_key = self.parse_expr()?;
        let into = if self.match_word("into") { Some(self.expect_ident()?) } else { None };
        Ok(QueryClause::Join { var, ty, source, outer_key, inner_key, into })
    }

    // =========================================================================
    // Operators
    // =========================================================================

    fn postfix_bp(&self) -> Option<u8> {
        match self.current_kind() {
            TokenKind::LParen
            | TokenKind::LBracket
            | TokenKind::Dot
            | TokenKind::QuestionDot
            | TokenKind::PlusPlus
            | TokenKind::MinusMinus => Some(27),
            _ => None,
        }
    }

    /// Binding powers, operator and token width of the binary operator at the cursor.
    fn infix_bp(&self) -> Option<(u8, u8, BinOp, usize)> {
        let (l, r, op) = match self.current_kind() {
            TokenKind::QuestionQuestion => (4, 3, BinOp::Coalesce),
            TokenKind::PipePipe => (5, 6, BinOp::Or),
            TokenKind::AmpAmp => (7, 8, BinOp::And),
            TokenKind::Pipe => (9, 10, BinOp::BitOr),
            TokenKind::Caret => (11, 12, BinOp::BitXor),
            TokenKind::Amp => (13, 14, BinOp::BitAnd),
            TokenKind::EqEq => (15, 16, BinOp::Eq),
            TokenKind::BangEq => (15, 16, BinOp::Ne),
            TokenKind::Lt => (17, 18, BinOp::Lt),
            TokenKind::Gt if matches!(self.peek(1), TokenKind::Gt) && self.adjacent(0) => {
                return Some((19, 20, BinOp::Shr, 2));
            }
            TokenKind::Gt => (17, 18, BinOp::Gt),
            TokenKind::LtEq => (17, 18, BinOp::Le),
            TokenKind::GtEq => (17, 18, BinOp::Ge),
            TokenKind::LtLt => (19, 20, BinOp::Shl),
            TokenKind::Plus => (21, 22, BinOp::Add),
            TokenKind::Minus => (21, 22, BinOp::Sub),
            TokenKind::Star => (23, 24, BinOp::Mul),
            TokenKind::Slash => (23, 24, BinOp::Div),
            TokenKind::Percent => (23, 24, BinOp::Mod),
            _ => return None,
        };
        Some((l, r, op, 1))
    }

    /// Assignment operator at the cursor and its token width.
    fn assign_op(&self) -> Option<(Option<BinOp>, usize)> {
        let op = match self.current_kind() {
            TokenKind::Eq => None,
            TokenKind::PlusEq => Some(BinOp::Add),
            TokenKind::MinusEq => Some(BinOp::Sub),
            TokenKind::StarEq => Some(BinOp::Mul),
            TokenKind::SlashEq => Some(BinOp::Div),
            TokenKind::PercentEq => Some(BinOp::Mod),
            TokenKind::AmpEq => Some(BinOp::BitAnd),
            TokenKind::PipeEq => Some(BinOp::BitOr),
            TokenKind::CaretEq => Some(BinOp::BitXor),
            TokenKind::LtLtEq => Some(BinOp::Shl),
            TokenKind::QuestionQuestionEq => Some(BinOp::Coalesce),
            // `>>=` arrives as `>` `>=`
            TokenKind::Gt if matches!(self.peek(1), TokenKind::GtEq) && self.adjacent(0) => {
                return Some((Some(BinOp::Shr), 2));
            }
            _ => return None,
        };
        Some((op, 1))
    }
}

/// Result of parsing: the tree plus any errors found.
#[derive(Debug)]
pub struct ParseResult {
    pub tree: SyntaxTree,
    pub errors: Vec<ParseError>,
}

impl ParseResult {
    /// Returns true if parsing completed without errors.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A parser error with location and friendly message.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ParseError {
    pub span: Span,
    pub message: String,
    pub hint: Option<String>,
}

impl ParseError {
    fn expected(expected: &str, found: &TokenKind, span: Span) -> Self {
        let message = format_expected_message(expected, found);
        let hint = crate::hints::for_expected(expected, found).map(String::from);
        Self { span, message, hint }
    }

    fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Input left over after a complete expression.
    pub(crate) fn trailing(found: &TokenKind, span: Span) -> Self {
        Self { span, message: format!("Unexpected {} after expression", found.display_name()), hint: None }
    }
}

/// Format a user-friendly "expected X, found Y" message.
fn format_expected_message(expected: &str, found: &TokenKind) -> String {
    match expected {
        "';'" => format!("Expected ';' after statement, found {}", found.display_name()),
        "'{'" => format!("Expected '{{' to start block, found {}", found.display_name()),
        "'}'" => format!("Expected '}}' to close block, found {}", found.display_name()),
        "')'" => {
            if matches!(found, TokenKind::Eof) {
                "Unclosed '(' - missing ')'".to_string()
            } else {
                format!("Expected ')', found {}", found.display_name())
            }
        }
        "']'" => {
            if matches!(found, TokenKind::Eof) {
                "Unclosed '[' - missing ']'".to_string()
            } else {
                format!("Expected ']', found {}", found.display_name())
            }
        }
        "a name" => format!("Expected name, found {}", found.display_name()),
        "expression" => format!("Expected expression, found {}", found.display_name()),
        "type" => format!("Expected type, found {}", found.display_name()),
        _ => format!("Expected {}, found {}", expected, found.display_name()),
    }
}

impl Parser {
    /// Parse a standalone expression, requiring the input to end after it.
    pub fn parse_standalone_expr(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_expr()?;
        if !self.at_end() {
            return Err(ParseError::trailing(self.current_kind(), self.current().span));
        }
        Ok(expr)
    }
}
