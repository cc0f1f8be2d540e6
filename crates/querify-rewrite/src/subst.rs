// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Scope-aware substitution through expression trees.
//!
//! Rewrites work on a clone of the input. Every node on the path to a
//! replaced subtree gets `Span::DUMMY` and a fresh id, so the printer knows
//! to render it instead of copying source text.

use std::cell::Cell;
use std::collections::{HashMap, HashSet};

use querify_ast::expr::{Expr, ExprKind, InterpolatedPart, LambdaBody, QueryClause};
use querify_ast::stmt::{Block, Stmt, StmtKind};
use querify_ast::{NodeId, Span};

/// Allocator for ids of synthesized nodes.
///
/// Shared by reference between a rewrite and its visitor.
#[derive(Debug)]
pub struct IdGen {
    next: Cell<u32>,
}

impl IdGen {
    pub fn new() -> Self {
        // Start at a high number to avoid collisions with parser-assigned IDs
        Self { next: Cell::new(1_000_000) }
    }

    pub fn fresh(&self) -> NodeId {
        let id = self.next.get();
        self.next.set(id + 1);
        NodeId(id)
    }

    /// A node with no source text.
    pub fn expr(&self, kind: ExprKind) -> Expr {
        Expr { id: self.fresh(), kind, span: Span::DUMMY }
    }

    pub fn ident(&self, name: &str) -> Expr {
        self.expr(ExprKind::Ident(name.to_string()))
    }
}

impl Default for IdGen {
    fn default() -> Self {
        Self::new()
    }
}

/// What to do with a node reached during a rewrite.
pub enum Visit {
    /// Keep the node and look at its children.
    Descend,
    /// Replace the node; the replacement is not visited.
    Replace(Expr),
}

/// Binders to rename while rewriting, and where their new names come from.
struct Freshen<'f> {
    avoid: &'f HashSet<String>,
    fresh: &'f mut dyn FnMut() -> String,
}

/// Walks a tree in place, tracking the names bound by lambdas, query
/// clauses and block locals on the way down.
struct Rewriter<'a, 'f, 'g> {
    ids: &'a IdGen,
    /// Names bound between the rewrite root and the current node, as written
    shadowed: Vec<String>,
    /// New name of each entry of `shadowed` whose binder was renamed
    renamed: Vec<Option<String>>,
    freshen: Option<Freshen<'g>>,
    visit: &'f mut dyn FnMut(&Expr, &[String]) -> Visit,
}

impl Rewriter<'_, '_, '_> {
    /// Bring `name` into scope, renaming the binder if it must be avoided.
    fn bind(&mut self, name: &mut String) -> bool {
        self.shadowed.push(name.clone());
        let new = match &mut self.freshen {
            Some(freshen) if freshen.avoid.contains(name.as_str()) => (freshen.fresh)(),
            _ => {
                self.renamed.push(None);
                return false;
            }
        };
        *name = new.clone();
        self.renamed.push(Some(new));
        true
    }

    fn unbind(&mut self, depth: usize) {
        self.shadowed.truncate(depth);
        self.renamed.truncate(depth);
    }

    /// Point a use of a renamed binder at its new name.
    fn rename_use(&self, name: &mut String) -> bool {
        let Some(i) = self.shadowed.iter().rposition(|s| s == name) else {
            return false;
        };
        match &self.renamed[i] {
            Some(new) => {
                *name = new.clone();
                true
            }
            None => false,
        }
    }

    fn expr(&mut self, expr: &mut Expr) -> bool {
        if let Visit::Replace(new) = (self.visit)(expr, &self.shadowed) {
            *expr = new;
            return true;
        }

        let changed = match &mut expr.kind {
            ExprKind::Int(_)
            | ExprKind::Float(_)
            | ExprKind::String(_)
            | ExprKind::Char(_)
            | ExprKind::Bool(_)
            | ExprKind::Null
            | ExprKind::This
            | ExprKind::Base
            | ExprKind::Typeof(_) => false,
            ExprKind::Ident(name) => self.rename_use(name),
            ExprKind::Interpolated { parts, .. } => {
                let mut changed = false;
                for part in parts {
                    if let InterpolatedPart::Hole { expr, .. } = part {
                        changed |= self.expr(expr);
                    }
                }
                changed
            }
            ExprKind::Binary { left, right, .. } => self.expr(left) | self.expr(right),
            ExprKind::Unary { operand, .. } => self.expr(operand),
            ExprKind::Assign { target, value, .. } => self.expr(target) | self.expr(value),
            ExprKind::Conditional { cond, then_branch, else_branch } => {
                self.expr(cond) | self.expr(then_branch) | self.expr(else_branch)
            }
            ExprKind::Call { func, args, .. } => self.expr(func) | self.exprs(args),
            ExprKind::MethodCall { object, args, .. } => self.expr(object) | self.exprs(args),
            ExprKind::Field { object, .. } => self.expr(object),
            ExprKind::Index { object, args } => self.expr(object) | self.exprs(args),
            ExprKind::Paren(inner) => self.expr(inner),
            ExprKind::NewArray { sizes, init, .. } => {
                let sizes_changed = self.exprs(sizes);
                sizes_changed | init.as_mut().is_some_and(|init| self.exprs(init))
            }
            ExprKind::NewObject { args, init, .. } => {
                let args_changed = self.exprs(args);
                args_changed | init.as_mut().is_some_and(|init| self.exprs(init))
            }
            ExprKind::AnonymousObject(members) => {
                let mut changed = false;
                for member in members {
                    let before = member.inferred_name().map(str::to_string);
                    if !self.expr(&mut member.value) {
                        continue;
                    }
                    changed = true;
                    // Keep the member name when the projection no longer implies it
                    if member.name.is_none() && member.inferred_name().map(str::to_string) != before {
                        member.name = before;
                    }
                }
                changed
            }
            ExprKind::Lambda { params, body, .. } => {
                let depth = self.shadowed.len();
                let mut changed = false;
                for param in params {
                    changed |= self.bind(&mut param.name);
                }
                changed |= match body {
                    LambdaBody::Expr(e) => self.expr(e),
                    LambdaBody::Block(block) => self.block(block),
                };
                self.unbind(depth);
                changed
            }
            ExprKind::Cast { expr, .. } | ExprKind::Is { expr, .. } | ExprKind::As { expr, .. } => self.expr(expr),
            ExprKind::Query(clauses) => self.query(clauses),
        };

        if changed {
            expr.span = Span::DUMMY;
            expr.id = self.ids.fresh();
        }
        changed
    }

    fn exprs(&mut self, exprs: &mut [Expr]) -> bool {
        let mut changed = false;
        for e in exprs {
            changed |= self.expr(e);
        }
        changed
    }

    fn query(&mut self, clauses: &mut [QueryClause]) -> bool {
        let depth = self.shadowed.len();
        let mut changed = false;
        for clause in clauses {
            match clause {
                QueryClause::From { var, source, .. } => {
                    changed |= self.expr(source);
                    changed |= self.bind(var);
                }
                QueryClause::Let { name, value } => {
                    changed |= self.expr(value);
                    changed |= self.bind(name);
                }
                QueryClause::Where(pred) => changed |= self.expr(pred),
                QueryClause::Join { var, source, outer_key, inner_key, into, .. } => {
                    changed |= self.expr(source);
                    changed |= self.expr(outer_key);
                    let outer_depth = self.shadowed.len();
                    changed |= self.bind(var);
                    changed |= self.expr(inner_key);
                    if let Some(into) = into {
                        self.unbind(outer_depth);
                        changed |= self.bind(into);
                    }
                }
                QueryClause::OrderBy(keys) => {
                    for ordering in keys {
                        changed |= self.expr(&mut ordering.key);
                    }
                }
                QueryClause::Select(value) => changed |= self.expr(value),
                QueryClause::SelectInto { value, var } => {
                    changed |= self.expr(value);
                    // A continuation ends the scope of every earlier range variable
                    self.unbind(depth);
                    changed |= self.bind(var);
                }
                QueryClause::Group { value, key, into } => {
                    changed |= self.expr(value);
                    changed |= self.expr(key);
                    if let Some(into) = into {
                        self.unbind(depth);
                        changed |= self.bind(into);
                    }
                }
            }
        }
        self.unbind(depth);
        changed
    }

    fn block(&mut self, block: &mut Block) -> bool {
        let depth = self.shadowed.len();
        let mut changed = false;
        for stmt in &mut block.stmts {
            changed |= self.stmt(stmt);
        }
        self.unbind(depth);
        changed
    }

    fn stmt(&mut self, stmt: &mut Stmt) -> bool {
        match &mut stmt.kind {
            StmtKind::Block(block) => self.block(block),
            StmtKind::Local { vars, .. } => {
                let mut changed = false;
                for var in vars {
                    if let Some(init) = &mut var.init {
                        changed |= self.expr(init);
                    }
                    changed |= self.bind(&mut var.name);
                }
                changed
            }
            StmtKind::Expr(e) => self.expr(e),
            StmtKind::Return(value) | StmtKind::Throw(value) => value.as_mut().is_some_and(|v| self.expr(v)),
            StmtKind::If { cond, then_branch, else_branch } => {
                let mut changed = self.expr(cond);
                changed |= self.scoped_stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    changed |= self.scoped_stmt(else_branch);
                }
                changed
            }
            StmtKind::While { cond, body } | StmtKind::Do { body, cond } => {
                self.expr(cond) | self.scoped_stmt(body)
            }
            StmtKind::For { init, cond, update, body } => {
                let depth = self.shadowed.len();
                let mut changed = false;
                for s in init {
                    changed |= self.stmt(s);
                }
                if let Some(cond) = cond {
                    changed |= self.expr(cond);
                }
                changed |= self.exprs(update);
                changed |= self.scoped_stmt(body);
                self.unbind(depth);
                changed
            }
            StmtKind::Foreach { var, iter, body, .. } => {
                let depth = self.shadowed.len();
                let mut changed = self.expr(iter);
                changed |= self.bind(var);
                changed |= self.scoped_stmt(body);
                self.unbind(depth);
                changed
            }
            StmtKind::Break | StmtKind::Continue | StmtKind::Empty => false,
        }
    }

    /// A statement in its own scope (loop or branch body).
    fn scoped_stmt(&mut self, stmt: &mut Stmt) -> bool {
        let depth = self.shadowed.len();
        let changed = self.stmt(stmt);
        self.unbind(depth);
        changed
    }
}

/// Rewrite a copy of `expr`. Returns `None` if `visit` replaced nothing.
///
/// `visit` sees every node top-down together with the names bound between
/// `expr` and that node.
pub fn rewrite(expr: &Expr, ids: &IdGen, visit: &mut dyn FnMut(&Expr, &[String]) -> Visit) -> Option<Expr> {
    run(expr, ids, None, visit)
}

/// `rewrite`, first renaming every binder in `expr` whose name is in
/// `avoid` to a name from `fresh`. Replacements that mention those names
/// then cannot be captured. `visit` still sees binders by their written
/// names.
pub fn rewrite_avoiding(
    expr: &Expr,
    ids: &IdGen,
    avoid: &HashSet<String>,
    fresh: &mut dyn FnMut() -> String,
    visit: &mut dyn FnMut(&Expr, &[String]) -> Visit,
) -> Option<Expr> {
    run(expr, ids, Some(Freshen { avoid, fresh }), visit)
}

fn run(
    expr: &Expr,
    ids: &IdGen,
    freshen: Option<Freshen<'_>>,
    visit: &mut dyn FnMut(&Expr, &[String]) -> Visit,
) -> Option<Expr> {
    let mut copy = expr.clone();
    let mut rewriter = Rewriter { ids, shadowed: Vec::new(), renamed: Vec::new(), freshen, visit };
    rewriter.expr(&mut copy).then_some(copy)
}

/// Replace every free occurrence of the names in `map` at once.
///
/// Replacements are not rewritten again, so `{a ↦ b, b ↦ a}` swaps.
pub fn substitute(expr: &Expr, map: &HashMap<String, Expr>, ids: &IdGen) -> Option<Expr> {
    rewrite(expr, ids, &mut |e, shadowed| match &e.kind {
        ExprKind::Ident(name) if !shadowed.contains(name) => match map.get(name) {
            Some(replacement) => Visit::Replace(replacement.clone()),
            None => Visit::Descend,
        },
        _ => Visit::Descend,
    })
}

/// `substitute` without capture: binders that would capture a name used by
/// a replacement are renamed with `fresh` first.
pub fn substitute_avoiding(
    expr: &Expr,
    map: &HashMap<String, Expr>,
    ids: &IdGen,
    fresh: &mut dyn FnMut() -> String,
) -> Option<Expr> {
    let avoid: HashSet<String> = map.values().flat_map(names_in).collect();
    rewrite_avoiding(expr, ids, &avoid, fresh, &mut |e, shadowed| match &e.kind {
        ExprKind::Ident(name) if !shadowed.contains(name) => match map.get(name) {
            Some(replacement) => Visit::Replace(replacement.clone()),
            None => Visit::Descend,
        },
        _ => Visit::Descend,
    })
}

/// `substitute`, keeping the original when nothing matched.
pub fn substitute_or_clone(expr: &Expr, map: &HashMap<String, Expr>, ids: &IdGen) -> Expr {
    substitute(expr, map, ids).unwrap_or_else(|| expr.clone())
}

/// `root.a.b.c` as (`root`, [`a`, `b`, `c`]); `root` alone has an empty path.
pub fn member_path(expr: &Expr) -> Option<(&str, Vec<&str>)> {
    let mut fields = Vec::new();
    let mut current = expr;
    loop {
        match &current.kind {
            ExprKind::Field { object, field, null_conditional: false } => {
                fields.push(field.as_str());
                current = object;
            }
            ExprKind::Ident(name) => {
                fields.reverse();
                return Some((name, fields));
            }
            _ => return None,
        }
    }
}

/// True if `name` occurs free in `expr`.
pub fn mentions(expr: &Expr, name: &str) -> bool {
    let mut found = false;
    rewrite(expr, &IdGen::new(), &mut |e, shadowed| {
        if e.as_ident() == Some(name) && !shadowed.iter().any(|s| s == name) {
            found = true;
        }
        Visit::Descend
    });
    found
}

/// Every name written anywhere in `expr`: identifiers, lambda parameters,
/// range variables and block locals.
pub fn names_in(expr: &Expr) -> HashSet<String> {
    let mut names = HashSet::new();
    rewrite(expr, &IdGen::new(), &mut |e, shadowed| {
        names.extend(shadowed.iter().cloned());
        if let ExprKind::Ident(name) = &e.kind {
            names.insert(name.clone());
        }
        Visit::Descend
    });
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use querify_fmt::print_expr;
    use querify_parser::parse_expression;

    fn subst(src: &str, pairs: &[(&str, &str)]) -> String {
        let expr = parse_expression(src).unwrap_or_else(|e| panic!("Parse error in {:?}: {}", src, e));
        let ids = IdGen::new();
        let map = pairs.iter().map(|(from, to)| (from.to_string(), ids.ident(to))).collect();
        let result = substitute_or_clone(&expr, &map, &ids);
        print_expr(&result, src)
    }

    #[test]
    fn replaces_free_names() {
        assert_eq!(subst("l * r", &[("l", "a"), ("r", "b")]), "a * b");
        assert_eq!(subst("f (x)", &[("x", "y")]), "f (y)");
    }

    #[test]
    fn substitution_is_simultaneous() {
        assert_eq!(subst("a - b", &[("a", "b"), ("b", "a")]), "b - a");
    }

    #[test]
    fn unchanged_subtrees_keep_source_text() {
        assert_eq!(subst("l * r [0]", &[("l", "a")]), "a * r [0]");
        assert_eq!(subst("l*r[0]", &[("l", "a")]), "a * r[0]");
    }

    #[test]
    fn lambda_parameters_shadow() {
        assert_eq!(subst("x + xs.Select (x => x)", &[("x", "y")]), "y + xs.Select (x => x)");
        assert_eq!(subst("xs.Where (t => t > x)", &[("x", "y")]), "xs.Where (t => t > y)");
    }

    #[test]
    fn range_variables_shadow() {
        let src = "from x in xs where x > y select x into z select x";
        let result = subst(src, &[("x", "a"), ("y", "b")]);
        // `x` after the continuation is free again
        assert_eq!(result, "\n\tfrom x in xs\n\twhere x > b\n\tselect x into z\n\tselect a");
    }

    #[test]
    fn interpolation_holes_are_substituted() {
        assert_eq!(subst(r#"$"{l}-{r,3}""#, &[("l", "a"), ("r", "b")]), r#"$"{a}-{b,3}""#);
        let expr = parse_expression(r#"$"{t.Name}""#).unwrap();
        assert!(mentions(&expr, "t"));
    }

    #[test]
    fn inferred_member_names_are_kept() {
        assert_eq!(subst("new { p.a, b }", &[("p", "q")]), "new { q.a, b }");
        assert_eq!(subst("new { a, b }", &[("a", "t")]), "new { a = t, b }");
    }

    #[test]
    fn untouched_input_yields_none() {
        let expr = parse_expression("a + b").unwrap();
        let ids = IdGen::new();
        let map = HashMap::from([("c".to_string(), ids.ident("d"))]);
        assert!(substitute(&expr, &map, &ids).is_none());
    }

    fn subst_avoiding(src: &str, pairs: &[(&str, &str)]) -> String {
        let expr = parse_expression(src).unwrap_or_else(|e| panic!("Parse error in {:?}: {}", src, e));
        let ids = IdGen::new();
        let map = pairs.iter().map(|(from, to)| (from.to_string(), ids.ident(to))).collect();
        let mut counter = 0;
        let mut fresh = || {
            counter += 1;
            format!("_{}", counter)
        };
        let result = substitute_avoiding(&expr, &map, &ids, &mut fresh).unwrap_or_else(|| expr.clone());
        print_expr(&result, src)
    }

    #[test]
    fn binders_that_would_capture_are_renamed() {
        assert_eq!(subst_avoiding("ys.Count (a => a == b)", &[("b", "a")]), "ys.Count (_1 => _1 == a)");
        assert_eq!(
            subst_avoiding("xs.Any (t => { var a = t; return a == b; })", &[("b", "a")]),
            "xs.Any (t => { var _1 = t; return _1 == a; })"
        );
        // Binders that cannot capture keep their names
        assert_eq!(subst_avoiding("ys.Count (c => c == b)", &[("b", "a")]), "ys.Count (c => c == a)");
    }

    #[test]
    fn renamed_binders_respect_inner_shadowing() {
        assert_eq!(
            subst_avoiding("f (a => g (a, b, a => a))", &[("b", "a")]),
            "f (_1 => g (_1, a, _2 => _2))"
        );
    }

    #[test]
    fn member_paths() {
        let expr = parse_expression("_.h.w").unwrap();
        assert_eq!(member_path(&expr), Some(("_", vec!["h", "w"])));
        let expr = parse_expression("f ().w").unwrap();
        assert_eq!(member_path(&expr), None);
    }

    #[test]
    fn free_mentions_and_names() {
        let expr = parse_expression("xs.Select (t => t + u)").unwrap();
        assert!(mentions(&expr, "u"));
        assert!(!mentions(&expr, "t"));
        let names = names_in(&expr);
        assert!(names.contains("xs") && names.contains("t") && names.contains("u"));
    }
}
