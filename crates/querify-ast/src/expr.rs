// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Expression AST nodes.

use crate::stmt::Block;
use crate::{NodeId, Span};

/// An expression in the AST.
#[derive(Debug, Clone)]
pub struct Expr {
    pub id: NodeId,
    pub kind: ExprKind,
    pub span: Span,
}

/// The kind of expression.
#[derive(Debug, Clone)]
pub enum ExprKind {
    /// Integer literal
    Int(u64),
    /// Float literal
    Float(f64),
    /// String literal, decoded
    String(String),
    /// Interpolated string (`$"..."`); `prefix` is `$`, `$@` or `@$`
    Interpolated {
        prefix: String,
        parts: Vec<InterpolatedPart>,
    },
    /// Character literal
    Char(char),
    /// Boolean literal
    Bool(bool),
    /// `null`
    Null,
    /// Simple name
    Ident(String),
    /// `this`
    This,
    /// `base`
    Base,
    /// Binary operation
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Unary operation, prefix or postfix
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    /// Assignment, plain (`op == None`) or compound
    Assign {
        op: Option<BinOp>,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    /// Conditional (`c ? a : b`)
    Conditional {
        cond: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
    /// Invocation of something that is not a member access (`f (x)`, `F<T> (x)`)
    Call {
        func: Box<Expr>,
        type_args: Option<Vec<String>>,
        args: Vec<Expr>,
    },
    /// Method call (`obj.Name<T> (args)`)
    MethodCall {
        object: Box<Expr>,
        method: String,
        /// Span of the method name alone
        method_span: Span,
        type_args: Option<Vec<String>>,
        args: Vec<Expr>,
    },
    /// Member access (`a.b`, `a?.b`)
    Field {
        object: Box<Expr>,
        field: String,
        null_conditional: bool,
    },
    /// Element access (`a [i, j]`)
    Index {
        object: Box<Expr>,
        args: Vec<Expr>,
    },
    /// Parenthesized expression
    Paren(Box<Expr>),
    /// Array creation (`new int[0]`, `new int[] { 1 }`, `new[] { 1 }`)
    NewArray {
        ty: Option<String>,
        sizes: Vec<Expr>,
        init: Option<Vec<Expr>>,
    },
    /// Object creation (`new T (args) { init }`)
    NewObject {
        ty: String,
        args: Vec<Expr>,
        init: Option<Vec<Expr>>,
    },
    /// Anonymous object creation (`new { a, b = c }`)
    AnonymousObject(Vec<AnonymousMember>),
    /// Lambda expression
    Lambda {
        params: Vec<LambdaParam>,
        /// Whether the parameter list was written in parentheses
        parenthesized: bool,
        body: LambdaBody,
    },
    /// Cast (`(T)x`)
    Cast {
        ty: String,
        expr: Box<Expr>,
    },
    /// Type test (`x is T`)
    Is {
        expr: Box<Expr>,
        ty: String,
    },
    /// Safe conversion (`x as T`)
    As {
        expr: Box<Expr>,
        ty: String,
    },
    /// `typeof (T)`
    Typeof(String),
    /// Query expression
    Query(Vec<QueryClause>),
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Coalesce,
}

impl BinOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::Le => "<=",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
            BinOp::Coalesce => "??",
        }
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
    BitNot,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

impl UnaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Plus => "+",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
            UnaryOp::PreInc | UnaryOp::PostInc => "++",
            UnaryOp::PreDec | UnaryOp::PostDec => "--",
        }
    }

    pub fn is_postfix(&self) -> bool {
        matches!(self, UnaryOp::PostInc | UnaryOp::PostDec)
    }
}

/// A member of an anonymous object initializer.
#[derive(Debug, Clone)]
pub struct AnonymousMember {
    /// Explicit name (`two = w * 2`); `None` for projection initializers (`w`, `a.b`)
    pub name: Option<String>,
    pub value: Expr,
}

impl AnonymousMember {
    /// The member name: explicit, or inferred from a simple name or member access.
    pub fn inferred_name(&self) -> Option<&str> {
        if let Some(name) = &self.name {
            return Some(name);
        }
        match &self.value.kind {
            ExprKind::Ident(name) => Some(name),
            ExprKind::Field { field, .. } => Some(field),
            _ => None,
        }
    }
}

/// A piece of an interpolated string.
#[derive(Debug, Clone)]
pub enum InterpolatedPart {
    /// Literal text as written, escapes and doubled braces included
    Text(String),
    /// `{expr}`, with any `,alignment` or `:format` kept raw in `suffix`
    Hole { expr: Expr, suffix: String },
}

/// A lambda parameter.
#[derive(Debug, Clone)]
pub struct LambdaParam {
    pub name: String,
    pub ty: Option<String>,
    pub span: Span,
}

/// The body of a lambda.
#[derive(Debug, Clone)]
pub enum LambdaBody {
    Expr(Box<Expr>),
    Block(Block),
}

impl LambdaBody {
    /// The returned expression of an expression body or of a block holding only `return e;`.
    pub fn returned_expr(&self) -> Option<&Expr> {
        match self {
            LambdaBody::Expr(expr) => Some(expr),
            LambdaBody::Block(block) => match block.stmts.as_slice() {
                [stmt] => match &stmt.kind {
                    crate::stmt::StmtKind::Return(Some(expr)) => Some(expr),
                    _ => None,
                },
                _ => None,
            },
        }
    }
}

/// Sort direction of an `orderby` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// One key of an `orderby` clause.
#[derive(Debug, Clone)]
pub struct Ordering {
    pub key: Expr,
    pub direction: Direction,
}

/// A clause of a query expression.
#[derive(Debug, Clone)]
pub enum QueryClause {
    /// `from T x in source`
    From {
        var: String,
        ty: Option<String>,
        source: Expr,
    },
    /// `let name = value`
    Let {
        name: String,
        value: Expr,
    },
    /// `where predicate`
    Where(Expr),
    /// `join T x in source on outer equals inner [into g]`
    Join {
        var: String,
        ty: Option<String>,
        source: Expr,
        outer_key: Expr,
        inner_key: Expr,
        into: Option<String>,
    },
    /// `orderby k1, k2 descending`
    OrderBy(Vec<Ordering>),
    /// `select value`
    Select(Expr),
    /// `select value into var` (query continuation)
    SelectInto {
        value: Expr,
        var: String,
    },
    /// `group value by key [into g]`
    Group {
        value: Expr,
        key: Expr,
        into: Option<String>,
    },
}

impl QueryClause {
    /// Expressions directly owned by this clause, in source order.
    pub fn exprs(&self) -> Vec<&Expr> {
        match self {
            QueryClause::From { source, .. } => vec![source],
            QueryClause::Let { value, .. } => vec![value],
            QueryClause::Where(pred) => vec![pred],
            QueryClause::Join { source, outer_key, inner_key, .. } => vec![source, outer_key, inner_key],
            QueryClause::OrderBy(keys) => keys.iter().map(|o| &o.key).collect(),
            QueryClause::Select(value) => vec![value],
            QueryClause::SelectInto { value, .. } => vec![value],
            QueryClause::Group { value, key, .. } => vec![value, key],
        }
    }

    /// Range variable introduced by this clause, if any.
    pub fn introduced_var(&self) -> Option<&str> {
        match self {
            QueryClause::From { var, .. } => Some(var),
            QueryClause::Let { name, .. } => Some(name),
            QueryClause::Join { var, into, .. } => Some(into.as_deref().unwrap_or(var)),
            QueryClause::SelectInto { var, .. } => Some(var),
            QueryClause::Group { into, .. } => into.as_deref(),
            _ => None,
        }
    }
}

impl Expr {
    /// Visit the direct sub-expressions, statements of block lambdas included.
    pub fn for_each_child<'a>(&'a self, f: &mut dyn FnMut(&'a Expr)) {
        match &self.kind {
            ExprKind::Int(_)
            | ExprKind::Float(_)
            | ExprKind::String(_)
            | ExprKind::Char(_)
            | ExprKind::Bool(_)
            | ExprKind::Null
            | ExprKind::Ident(_)
            | ExprKind::This
            | ExprKind::Base
            | ExprKind::Typeof(_) => {}
            ExprKind::Interpolated { parts, .. } => {
                for part in parts {
                    if let InterpolatedPart::Hole { expr, .. } = part {
                        f(expr);
                    }
                }
            }
            ExprKind::Binary { left, right, .. } => {
                f(left);
                f(right);
            }
            ExprKind::Unary { operand, .. } => f(operand),
            ExprKind::Assign { target, value, .. } => {
                f(target);
                f(value);
            }
            ExprKind::Conditional { cond, then_branch, else_branch } => {
                f(cond);
                f(then_branch);
                f(else_branch);
            }
            ExprKind::Call { func, args, .. } => {
                f(func);
                args.iter().for_each(|a| f(a));
            }
            ExprKind::MethodCall { object, args, .. } => {
                f(object);
                args.iter().for_each(|a| f(a));
            }
            ExprKind::Field { object, .. } => f(object),
            ExprKind::Index { object, args } => {
                f(object);
                args.iter().for_each(|a| f(a));
            }
            ExprKind::Paren(inner) => f(inner),
            ExprKind::NewArray { sizes, init, .. } => {
                sizes.iter().for_each(|e| f(e));
                if let Some(init) = init {
                    init.iter().for_each(|e| f(e));
                }
            }
            ExprKind::NewObject { args, init, .. } => {
                args.iter().for_each(|e| f(e));
                if let Some(init) = init {
                    init.iter().for_each(|e| f(e));
                }
            }
            ExprKind::AnonymousObject(members) => members.iter().for_each(|m| f(&m.value)),
            ExprKind::Lambda { body, .. } => match body {
                LambdaBody::Expr(expr) => f(expr),
                LambdaBody::Block(block) => block.for_each_expr(f),
            },
            ExprKind::Cast { expr, .. } | ExprKind::Is { expr, .. } | ExprKind::As { expr, .. } => f(expr),
            ExprKind::Query(clauses) => {
                for clause in clauses {
                    for expr in clause.exprs() {
                        f(expr);
                    }
                }
            }
        }
    }

    /// True if `pred` holds for this node or any node below it.
    pub fn any(&self, pred: &mut dyn FnMut(&Expr) -> bool) -> bool {
        if pred(self) {
            return true;
        }
        let mut found = false;
        self.for_each_child(&mut |child| {
            if !found && child.any(pred) {
                found = true;
            }
        });
        found
    }

    /// Strip any number of enclosing parentheses.
    pub fn unparenthesized(&self) -> &Expr {
        let mut expr = self;
        while let ExprKind::Paren(inner) = &expr.kind {
            expr = inner;
        }
        expr
    }

    pub fn as_ident(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Ident(name) => Some(name),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Expr {
        Expr { id: NodeId(0), kind: ExprKind::Ident(name.to_string()), span: Span::new(0, 1) }
    }

    #[test]
    fn inferred_member_names() {
        let plain = AnonymousMember { name: None, value: ident("w") };
        assert_eq!(plain.inferred_name(), Some("w"));

        let access = AnonymousMember {
            name: None,
            value: Expr {
                id: NodeId(1),
                kind: ExprKind::Field { object: Box::new(ident("h")), field: "w".into(), null_conditional: false },
                span: Span::new(0, 3),
            },
        };
        assert_eq!(access.inferred_name(), Some("w"));

        let named = AnonymousMember { name: Some("two".into()), value: ident("w") };
        assert_eq!(named.inferred_name(), Some("two"));

        let call = AnonymousMember {
            name: None,
            value: Expr {
                id: NodeId(2),
                kind: ExprKind::Call { func: Box::new(ident("f")), type_args: None, args: vec![] },
                span: Span::new(0, 3),
            },
        };
        assert_eq!(call.inferred_name(), None);
    }

    #[test]
    fn any_finds_nested_nodes() {
        let sum = Expr {
            id: NodeId(3),
            kind: ExprKind::Binary { op: BinOp::Add, left: Box::new(ident("a")), right: Box::new(ident("b")) },
            span: Span::new(0, 5),
        };
        assert!(sum.any(&mut |e| e.as_ident() == Some("b")));
        assert!(!sum.any(&mut |e| e.as_ident() == Some("c")));
    }
}
