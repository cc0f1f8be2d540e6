// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! AST visitor that finds every recognized operator call and the root of its chain.

use std::collections::HashSet;
use std::mem;
use std::rc::Rc;

use querify_ast::decl::{Accessor, Decl, DeclKind, MemberBody, Param, SyntaxTree};
use querify_ast::expr::{Expr, ExprKind, LambdaBody, QueryClause};
use querify_ast::stmt::{Block, Stmt, StmtKind, VarDeclarator};
use querify_ast::Span;
use querify_rewrite::{extends_chain, recognize};

/// How an expression is embedded in its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// The whole expression of an expression statement
    Statement,
    /// A position that takes any expression unparenthesized (initializer,
    /// argument, lambda body, ...)
    Bare,
    /// An operand of a larger expression
    Operand,
}

/// A recognized operator call and the outermost call of its chain.
#[derive(Debug, Clone)]
pub struct ChainSite<'a> {
    pub call: &'a Expr,
    pub method_span: Span,
    pub root: &'a Expr,
    /// Slot of `root`
    pub slot: Slot,
    /// `root` lies inside a query expression
    pub nested: bool,
    /// Every name written in the member holding `root`: parameters,
    /// locals, lambda parameters, range variables and identifiers
    pub member_names: Rc<HashSet<String>>,
}

impl ChainSite<'_> {
    pub fn is_root(&self) -> bool {
        std::ptr::eq(self.call, self.root)
    }
}

#[derive(Default)]
struct SiteIndex<'a> {
    /// Expressions from the current one up to its statement or declaration
    stack: Vec<(&'a Expr, Slot)>,
    sites: Vec<ChainSite<'a>>,
    /// Names seen so far in the current member
    names: HashSet<String>,
}

/// Every recognized operator call in the tree, in source order.
pub fn chain_sites(tree: &SyntaxTree) -> Vec<ChainSite<'_>> {
    let mut index = SiteIndex::default();
    for decl in &tree.members {
        visit_decl(decl, &mut index);
    }
    index.sites
}

fn visit_decl<'a>(decl: &'a Decl, index: &mut SiteIndex<'a>) {
    let first = index.sites.len();
    visit_member(decl, index);
    if matches!(decl.kind, DeclKind::Namespace(_) | DeclKind::Type(_)) {
        return;
    }
    let names = Rc::new(mem::take(&mut index.names));
    for site in &mut index.sites[first..] {
        site.member_names = Rc::clone(&names);
    }
}

fn visit_member<'a>(decl: &'a Decl, index: &mut SiteIndex<'a>) {
    for attr in &decl.attributes {
        for arg in &attr.args {
            visit_expr(arg, Slot::Bare, index);
        }
    }
    match &decl.kind {
        DeclKind::Namespace(ns) => {
            for member in &ns.members {
                visit_decl(member, index);
            }
        }
        DeclKind::Type(ty) => {
            for member in &ty.members {
                visit_decl(member, index);
            }
        }
        DeclKind::Field(field) => visit_declarators(&field.vars, index),
        DeclKind::Event(event) => visit_declarators(&event.vars, index),
        DeclKind::Method(method) => {
            visit_params(&method.params, index);
            if let Some(body) = &method.body {
                visit_body(body, index);
            }
        }
        DeclKind::Constructor(ctor) => {
            visit_params(&ctor.params, index);
            if let Some(init) = &ctor.initializer {
                for arg in &init.args {
                    visit_expr(arg, Slot::Bare, index);
                }
            }
            if let Some(body) = &ctor.body {
                visit_body(body, index);
            }
        }
        DeclKind::Operator(op) => {
            visit_params(&op.params, index);
            if let Some(body) = &op.body {
                visit_body(body, index);
            }
        }
        DeclKind::Property(prop) => {
            visit_accessors(&prop.accessors, index);
            if let Some(body) = &prop.expr_body {
                visit_expr(body, Slot::Bare, index);
            }
            if let Some(init) = &prop.init {
                visit_expr(init, Slot::Bare, index);
            }
        }
        DeclKind::Indexer(indexer) => {
            visit_params(&indexer.params, index);
            visit_accessors(&indexer.accessors, index);
            if let Some(body) = &indexer.expr_body {
                visit_expr(body, Slot::Bare, index);
            }
        }
        DeclKind::CustomEvent(event) => visit_accessors(&event.accessors, index),
        DeclKind::EnumMember(member) => {
            if let Some(value) = &member.value {
                visit_expr(value, Slot::Bare, index);
            }
        }
    }
}

fn visit_declarators<'a>(vars: &'a [VarDeclarator], index: &mut SiteIndex<'a>) {
    for var in vars {
        index.names.insert(var.name.clone());
        if let Some(init) = &var.init {
            visit_expr(init, Slot::Bare, index);
        }
    }
}

fn visit_params<'a>(params: &'a [Param], index: &mut SiteIndex<'a>) {
    for param in params {
        index.names.insert(param.name.clone());
        if let Some(default) = &param.default {
            visit_expr(default, Slot::Bare, index);
        }
    }
}

fn visit_accessors<'a>(accessors: &'a [Accessor], index: &mut SiteIndex<'a>) {
    for accessor in accessors {
        if let Some(body) = &accessor.body {
            visit_body(body, index);
        }
    }
}

fn visit_body<'a>(body: &'a MemberBody, index: &mut SiteIndex<'a>) {
    match body {
        MemberBody::Block(block) => visit_block(block, index),
        MemberBody::Expr(expr) => visit_expr(expr, Slot::Bare, index),
    }
}

fn visit_block<'a>(block: &'a Block, index: &mut SiteIndex<'a>) {
    for stmt in &block.stmts {
        visit_stmt(stmt, index);
    }
}

fn visit_stmt<'a>(stmt: &'a Stmt, index: &mut SiteIndex<'a>) {
    match &stmt.kind {
        StmtKind::Block(block) => visit_block(block, index),
        StmtKind::Local { vars, .. } => visit_declarators(vars, index),
        StmtKind::Expr(expr) => visit_expr(expr, Slot::Statement, index),
        StmtKind::Return(value) | StmtKind::Throw(value) => {
            if let Some(value) = value {
                visit_expr(value, Slot::Bare, index);
            }
        }
        StmtKind::If { cond, then_branch, else_branch } => {
            visit_expr(cond, Slot::Bare, index);
            visit_stmt(then_branch, index);
            if let Some(else_branch) = else_branch {
                visit_stmt(else_branch, index);
            }
        }
        StmtKind::While { cond, body } | StmtKind::Do { body, cond } => {
            visit_expr(cond, Slot::Bare, index);
            visit_stmt(body, index);
        }
        StmtKind::For { init, cond, update, body } => {
            for stmt in init {
                visit_stmt(stmt, index);
            }
            if let Some(cond) = cond {
                visit_expr(cond, Slot::Bare, index);
            }
            for expr in update {
                visit_expr(expr, Slot::Statement, index);
            }
            visit_stmt(body, index);
        }
        StmtKind::Foreach { var, iter, body, .. } => {
            index.names.insert(var.clone());
            visit_expr(iter, Slot::Bare, index);
            visit_stmt(body, index);
        }
        StmtKind::Break | StmtKind::Continue | StmtKind::Empty => {}
    }
}

fn visit_expr<'a>(expr: &'a Expr, slot: Slot, index: &mut SiteIndex<'a>) {
    index.stack.push((expr, slot));

    if let ExprKind::MethodCall { method_span, .. } = &expr.kind {
        if recognize(expr).is_some() {
            let mut root = index.stack.len() - 1;
            while root > 0 && extends_chain(index.stack[root - 1].0, index.stack[root].0) {
                root -= 1;
            }
            let nested = index.stack[..root].iter().any(|(e, _)| matches!(e.kind, ExprKind::Query(_)));
            let (root, slot) = index.stack[root];
            index.sites.push(ChainSite {
                call: expr,
                method_span: *method_span,
                root,
                slot,
                nested,
                member_names: Rc::default(),
            });
        }
    }

    match &expr.kind {
        ExprKind::Ident(name) => {
            index.names.insert(name.clone());
        }
        ExprKind::Lambda { params, .. } => index.names.extend(params.iter().map(|p| p.name.clone())),
        ExprKind::Query(clauses) => {
            for clause in clauses {
                if let QueryClause::Join { var, .. } = clause {
                    index.names.insert(var.clone());
                }
                index.names.extend(clause.introduced_var().map(str::to_string));
            }
        }
        _ => {}
    }

    match &expr.kind {
        ExprKind::Lambda { body: LambdaBody::Block(block), .. } => visit_block(block, index),
        ExprKind::Lambda { body: LambdaBody::Expr(body), .. } => visit_expr(body, Slot::Bare, index),
        _ => expr.for_each_child(&mut |child| visit_expr(child, slot_of(expr, child), index)),
    }

    index.stack.pop();
}

/// The slot `child` occupies in `parent`.
fn slot_of(parent: &Expr, child: &Expr) -> Slot {
    let is = |e: &Expr| std::ptr::eq(e, child);
    match &parent.kind {
        ExprKind::Paren(_) | ExprKind::AnonymousObject(_) | ExprKind::NewArray { .. } | ExprKind::NewObject { .. } => {
            Slot::Bare
        }
        ExprKind::Call { func, .. } if !is(func) => Slot::Bare,
        ExprKind::MethodCall { object, .. } | ExprKind::Index { object, .. } if !is(object) => Slot::Bare,
        ExprKind::Assign { value, .. } if is(value) => Slot::Bare,
        _ => Slot::Operand,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use querify_parser::parse_source;

    fn wrap(stmts: &str) -> String {
        format!("class C {{ void M () {{ {} }} }}", stmts)
    }

    fn roots(src: &str) -> Vec<(String, Slot)> {
        let parsed = parse_source(src);
        assert!(parsed.is_ok(), "Errors: {:?}", parsed.diagnostics());
        chain_sites(&parsed.tree)
            .iter()
            .filter(|s| s.is_root())
            .map(|s| (s.root.span.text(src).unwrap_or_default().to_string(), s.slot))
            .collect()
    }

    #[test]
    fn every_call_climbs_to_the_root() {
        let src = wrap("var x = xs.Where (t => t > 0).Select (t => t);");
        let parsed = parse_source(&src);
        let sites = chain_sites(&parsed.tree);
        assert_eq!(sites.len(), 2);
        assert!(std::ptr::eq(sites[0].root, sites[1].root));
        assert_eq!(sites[0].root.span.text(&src), Some("xs.Where (t => t > 0).Select (t => t)"));
    }

    #[test]
    fn slots() {
        let src = wrap("var a = xs.Select (t => t) + 1; F (xs.Select (t => t)); xs.Select (t => t);");
        assert_eq!(
            roots(&src),
            vec![
                ("xs.Select (t => t)".to_string(), Slot::Operand),
                ("xs.Select (t => t)".to_string(), Slot::Bare),
                ("xs.Select (t => t)".to_string(), Slot::Statement),
            ]
        );
    }

    #[test]
    fn receiver_of_unrecognized_call_is_an_operand() {
        let src = wrap("var n = xs.Select (t => t).Count ();");
        assert_eq!(roots(&src), vec![("xs.Select (t => t)".to_string(), Slot::Operand)]);
    }

    #[test]
    fn chains_in_lambda_bodies_are_separate() {
        let src = wrap("var x = xs.Select (t => t.Where (u => u > 0));");
        let found = roots(&src);
        assert_eq!(found.len(), 2);
        assert_eq!(found[1], ("t.Where (u => u > 0)".to_string(), Slot::Bare));
    }

    #[test]
    fn chains_inside_queries_are_nested() {
        let src = wrap("var x = from t in xs.Where (u => u > 0) select t; var y = xs.Where (u => u > 0);");
        let parsed = parse_source(&src);
        let nested: Vec<bool> = chain_sites(&parsed.tree).iter().map(|s| s.nested).collect();
        assert_eq!(nested, vec![true, false]);
    }

    #[test]
    fn member_names_cover_the_enclosing_member() {
        let src = "class C { void M (int p) { int _1 = 0; foreach (var e in es) { } var x = xs.Select (t => t); } \
                   void N () { var y = ys.Where (u => u > 0); } }";
        let parsed = parse_source(src);
        let sites = chain_sites(&parsed.tree);
        assert_eq!(sites.len(), 2);
        let names = &sites[0].member_names;
        for name in ["p", "_1", "e", "es", "x", "xs", "t"] {
            assert!(names.contains(name), "missing {}", name);
        }
        assert!(!names.contains("y"));
        assert!(sites[1].member_names.contains("u") && !sites[1].member_names.contains("_1"));
    }

    #[test]
    fn members_outside_methods() {
        let src = "class C { int[] a = xs.Select (t => t).ToArray (); int P => xs.Where (t => t > 0).Count (); }";
        assert_eq!(roots(src).len(), 2);
    }
}
