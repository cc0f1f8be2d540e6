// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Statement AST nodes.

use crate::{NodeId, Span};
use crate::expr::Expr;

/// A statement in the AST.
#[derive(Debug, Clone)]
pub struct Stmt {
    pub id: NodeId,
    pub kind: StmtKind,
    pub span: Span,
}

/// A braced statement list.
#[derive(Debug, Clone)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

/// One declarator of a local or field declaration (`x = 1` in `int x = 1, y;`).
#[derive(Debug, Clone)]
pub struct VarDeclarator {
    pub name: String,
    pub init: Option<Expr>,
    pub span: Span,
}

/// The kind of statement.
#[derive(Debug, Clone)]
pub enum StmtKind {
    /// Nested block
    Block(Block),
    /// Local variable declaration (`var` is kept as the type name)
    Local {
        ty: String,
        is_const: bool,
        vars: Vec<VarDeclarator>,
    },
    /// Expression statement
    Expr(Expr),
    /// Return statement
    Return(Option<Expr>),
    /// If statement
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    /// While loop
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    /// Do-while loop
    Do {
        body: Box<Stmt>,
        cond: Expr,
    },
    /// For loop
    For {
        init: Vec<Stmt>,
        cond: Option<Expr>,
        update: Vec<Expr>,
        body: Box<Stmt>,
    },
    /// Foreach loop
    Foreach {
        ty: String,
        var: String,
        iter: Expr,
        body: Box<Stmt>,
    },
    /// Throw statement
    Throw(Option<Expr>),
    /// Break statement
    Break,
    /// Continue statement
    Continue,
    /// Empty statement (`;`)
    Empty,
}

impl Stmt {
    /// Visit every expression owned by this statement, nested statements included.
    pub fn for_each_expr<'a>(&'a self, f: &mut dyn FnMut(&'a Expr)) {
        match &self.kind {
            StmtKind::Block(block) => block.for_each_expr(f),
            StmtKind::Local { vars, .. } => {
                for var in vars {
                    if let Some(init) = &var.init {
                        f(init);
                    }
                }
            }
            StmtKind::Expr(expr) => f(expr),
            StmtKind::Return(value) | StmtKind::Throw(value) => {
                if let Some(value) = value {
                    f(value);
                }
            }
            StmtKind::If { cond, then_branch, else_branch } => {
                f(cond);
                then_branch.for_each_expr(f);
                if let Some(else_branch) = else_branch {
                    else_branch.for_each_expr(f);
                }
            }
            StmtKind::While { cond, body } | StmtKind::Do { body, cond } => {
                f(cond);
                body.for_each_expr(f);
            }
            StmtKind::For { init, cond, update, body } => {
                for stmt in init {
                    stmt.for_each_expr(f);
                }
                if let Some(cond) = cond {
                    f(cond);
                }
                for expr in update {
                    f(expr);
                }
                body.for_each_expr(f);
            }
            StmtKind::Foreach { iter, body, .. } => {
                f(iter);
                body.for_each_expr(f);
            }
            StmtKind::Break | StmtKind::Continue | StmtKind::Empty => {}
        }
    }
}

impl Block {
    pub fn for_each_expr<'a>(&'a self, f: &mut dyn FnMut(&'a Expr)) {
        for stmt in &self.stmts {
            stmt.for_each_expr(f);
        }
    }
}
