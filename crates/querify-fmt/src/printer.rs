// SPDX-License-Identifier: (MIT OR Apache-2.0)

use querify_ast::expr::*;
use querify_ast::stmt::*;

use crate::config::FormatConfig;

/// Renders expressions, copying untouched subtrees from the source.
pub struct Printer<'a> {
    output: String,
    /// Indentation depth of the next query expression.
    depth: usize,
    source: &'a str,
    config: &'a FormatConfig,
}

impl<'a> Printer<'a> {
    pub fn new(source: &'a str, config: &'a FormatConfig) -> Self {
        Self { output: String::new(), depth: 1, source, config }
    }

    pub fn finish(self) -> String {
        self.output
    }

    // --- Helpers ---

    fn emit(&mut self, s: &str) {
        self.output.push_str(s);
    }

    fn emit_line_start(&mut self, depth: usize) {
        self.output.push('\n');
        for _ in 0..depth {
            self.output.push_str(&self.config.indent_unit);
        }
    }

    fn open_paren(&mut self) {
        if self.config.space_before_parens {
            self.emit(" ");
        }
        self.emit("(");
    }

    fn open_bracket(&mut self) {
        if self.config.space_before_brackets {
            self.emit(" ");
        }
        self.emit("[");
    }

    /// Source text of a subtree that came out of the parser unchanged.
    fn verbatim(&self, expr: &Expr) -> Option<&'a str> {
        if !is_pristine(expr) {
            return None;
        }
        expr.span.text(self.source)
    }

    fn format_list(&mut self, exprs: &[Expr]) {
        for (i, e) in exprs.iter().enumerate() {
            if i > 0 {
                self.emit(", ");
            }
            self.format_expr(e);
        }
    }

    fn format_args(&mut self, type_args: &Option<Vec<String>>, args: &[Expr]) {
        if let Some(targs) = type_args {
            self.emit("<");
            self.emit(&targs.join(", "));
            self.emit(">");
        }
        self.open_paren();
        self.format_list(args);
        self.emit(")");
    }

    fn format_initializer(&mut self, items: &[Expr]) {
        if items.is_empty() {
            self.emit(" { }");
            return;
        }
        self.emit(" { ");
        self.format_list(items);
        self.emit(" }");
    }

    // --- Expressions ---

    pub fn format_expr(&mut self, expr: &Expr) {
        if let Some(text) = self.verbatim(expr) {
            self.emit(text);
            return;
        }

        match &expr.kind {
            ExprKind::Int(n) => self.emit(&n.to_string()),
            ExprKind::Float(n) => {
                let text = format!("{:?}", n);
                self.emit(&text);
            }
            ExprKind::String(s) => {
                let text = format!("\"{}\"", escape(s, '"'));
                self.emit(&text);
            }
            ExprKind::Interpolated { prefix, parts } => {
                self.emit(prefix);
                self.emit("\"");
                for part in parts {
                    match part {
                        InterpolatedPart::Text(text) => self.emit(text),
                        InterpolatedPart::Hole { expr, suffix } => {
                            self.emit("{");
                            self.format_expr(expr);
                            self.emit(suffix);
                            self.emit("}");
                        }
                    }
                }
                self.emit("\"");
            }
            ExprKind::Char(c) => {
                let text = format!("'{}'", escape(&c.to_string(), '\''));
                self.emit(&text);
            }
            ExprKind::Bool(b) => self.emit(if *b { "true" } else { "false" }),
            ExprKind::Null => self.emit("null"),
            ExprKind::Ident(name) => self.emit(name),
            ExprKind::This => self.emit("this"),
            ExprKind::Base => self.emit("base"),
            ExprKind::Binary { op, left, right } => {
                let prec = binop_precedence(op);
                // `??` groups to the right, everything else to the left
                let (left_min, right_min) = if *op == BinOp::Coalesce { (prec + 1, prec) } else { (prec, prec + 1) };
                self.format_operand(left, left_min);
                self.emit(" ");
                self.emit(op.symbol());
                self.emit(" ");
                self.format_operand(right, right_min);
            }
            ExprKind::Unary { op, operand } => {
                if op.is_postfix() {
                    self.format_operand(operand, PRIMARY);
                    self.emit(op.symbol());
                } else {
                    self.emit(op.symbol());
                    self.format_operand(operand, UNARY);
                }
            }
            ExprKind::Assign { op, target, value } => {
                self.format_operand(target, UNARY);
                self.emit(" ");
                if let Some(op) = op {
                    self.emit(op.symbol());
                }
                self.emit("= ");
                self.format_expr(value);
            }
            ExprKind::Conditional { cond, then_branch, else_branch } => {
                self.format_operand(cond, CONDITIONAL + 1);
                self.emit(" ? ");
                self.format_operand(then_branch, CONDITIONAL);
                self.emit(" : ");
                self.format_operand(else_branch, CONDITIONAL);
            }
            ExprKind::Call { func, type_args, args } => {
                self.format_operand(func, PRIMARY);
                self.format_args(type_args, args);
            }
            ExprKind::MethodCall { object, method, type_args, args, .. } => {
                self.format_operand(object, PRIMARY);
                self.emit(".");
                self.emit(method);
                self.format_args(type_args, args);
            }
            ExprKind::Field { object, field, null_conditional } => {
                self.format_operand(object, PRIMARY);
                self.emit(if *null_conditional { "?." } else { "." });
                self.emit(field);
            }
            ExprKind::Index { object, args } => {
                self.format_operand(object, PRIMARY);
                self.open_bracket();
                self.format_list(args);
                self.emit("]");
            }
            ExprKind::Paren(inner) => {
                self.emit("(");
                self.format_expr(inner);
                self.emit(")");
            }
            ExprKind::NewArray { ty, sizes, init } => {
                self.emit("new ");
                if let Some(ty) = ty {
                    self.emit(ty);
                }
                if !sizes.is_empty() || ty.is_none() || init.is_some() {
                    self.emit("[");
                    self.format_list(sizes);
                    self.emit("]");
                }
                if let Some(items) = init {
                    self.format_initializer(items);
                }
            }
            ExprKind::NewObject { ty, args, init } => {
                self.emit("new ");
                self.emit(ty);
                self.format_args(&None, args);
                if let Some(items) = init {
                    self.format_initializer(items);
                }
            }
            ExprKind::AnonymousObject(members) => {
                if members.is_empty() {
                    self.emit("new { }");
                    return;
                }
                self.emit("new { ");
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        self.emit(", ");
                    }
                    if let Some(name) = &member.name {
                        self.emit(name);
                        self.emit(" = ");
                    }
                    self.format_expr(&member.value);
                }
                self.emit(" }");
            }
            ExprKind::Lambda { params, parenthesized, body } => {
                let bare = !parenthesized && params.len() == 1 && params[0].ty.is_none();
                if !bare {
                    self.emit("(");
                }
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        self.emit(", ");
                    }
                    if let Some(ty) = &param.ty {
                        self.emit(ty);
                        self.emit(" ");
                    }
                    self.emit(&param.name);
                }
                if !bare {
                    self.emit(")");
                }
                self.emit(" => ");
                match body {
                    LambdaBody::Expr(e) => self.format_expr(e),
                    LambdaBody::Block(block) => self.format_block(block),
                }
            }
            ExprKind::Cast { ty, expr } => {
                self.emit("(");
                self.emit(ty);
                self.emit(")");
                self.format_operand(expr, UNARY);
            }
            ExprKind::Is { expr, ty } => {
                self.format_operand(expr, RELATIONAL);
                self.emit(" is ");
                self.emit(ty);
            }
            ExprKind::As { expr, ty } => {
                self.format_operand(expr, RELATIONAL);
                self.emit(" as ");
                self.emit(ty);
            }
            ExprKind::Typeof(ty) => {
                self.emit("typeof");
                self.open_paren();
                self.emit(ty);
                self.emit(")");
            }
            ExprKind::Query(clauses) => self.format_query(clauses),
        }
    }

    /// Format `expr`, parenthesized if it binds looser than `min_prec`.
    fn format_operand(&mut self, expr: &Expr, min_prec: u8) {
        if expr_precedence(expr) < min_prec {
            self.emit("(");
            self.format_expr(expr);
            self.emit(")");
        } else {
            self.format_expr(expr);
        }
    }

    // --- Queries ---

    /// Each clause goes on its own line, one level deeper than the enclosing query.
    fn format_query(&mut self, clauses: &[QueryClause]) {
        let depth = self.depth;
        for clause in clauses {
            self.emit_line_start(depth);
            self.depth = depth + 1;
            self.format_clause(clause);
            self.depth = depth;
        }
    }

    fn format_clause(&mut self, clause: &QueryClause) {
        match clause {
            QueryClause::From { var, ty, source } => {
                self.emit("from ");
                self.format_range_var(ty, var);
                self.emit(" in ");
                self.format_clause_expr(source);
            }
            QueryClause::Let { name, value } => {
                self.emit("let ");
                self.emit(name);
                self.emit(" = ");
                self.format_clause_expr(value);
            }
            QueryClause::Where(pred) => {
                self.emit("where ");
                self.format_clause_expr(pred);
            }
            QueryClause::Join { var, ty, source, outer_key, inner_key, into } => {
                self.emit("join ");
                self.format_range_var(ty, var);
                self.emit(" in ");
                self.format_clause_expr(source);
                self.emit(" on ");
                self.format_clause_expr(outer_key);
                self.emit(" equals ");
                self.format_clause_expr(inner_key);
                if let Some(into) = into {
                    self.emit(" into ");
                    self.emit(into);
                }
            }
            QueryClause::OrderBy(keys) => {
                self.emit("orderby ");
                for (i, ordering) in keys.iter().enumerate() {
                    if i > 0 {
                        self.emit(", ");
                    }
                    self.format_clause_expr(&ordering.key);
                    if ordering.direction == Direction::Descending {
                        self.emit(" descending");
                    }
                }
            }
            QueryClause::Select(value) => {
                self.emit("select ");
                self.format_clause_expr(value);
            }
            QueryClause::SelectInto { value, var } => {
                self.emit("select ");
                self.format_clause_expr(value);
                self.emit(" into ");
                self.emit(var);
            }
            QueryClause::Group { value, key, into } => {
                self.emit("group ");
                self.format_clause_expr(value);
                self.emit(" by ");
                self.format_clause_expr(key);
                if let Some(into) = into {
                    self.emit(" into ");
                    self.emit(into);
                }
            }
        }
    }

    fn format_range_var(&mut self, ty: &Option<String>, var: &str) {
        if let Some(ty) = ty {
            self.emit(ty);
            self.emit(" ");
        }
        self.emit(var);
    }

    /// A query directly in a clause slot would swallow the following clauses.
    fn format_clause_expr(&mut self, expr: &Expr) {
        if matches!(expr.kind, ExprKind::Query(_)) {
            self.emit("(");
            self.format_expr(expr);
            self.emit(")");
        } else {
            self.format_expr(expr);
        }
    }

    // --- Statements (block lambdas) ---

    fn format_block(&mut self, block: &Block) {
        if block.stmts.is_empty() {
            self.emit("{ }");
            return;
        }
        self.emit("{ ");
        for stmt in &block.stmts {
            self.format_stmt(stmt);
            self.emit(" ");
        }
        self.emit("}");
    }

    fn format_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Block(block) => self.format_block(block),
            StmtKind::Local { ty, is_const, vars } => {
                if *is_const {
                    self.emit("const ");
                }
                self.emit(ty);
                self.emit(" ");
                for (i, var) in vars.iter().enumerate() {
                    if i > 0 {
                        self.emit(", ");
                    }
                    self.emit(&var.name);
                    if let Some(init) = &var.init {
                        self.emit(" = ");
                        self.format_expr(init);
                    }
                }
                self.emit(";");
            }
            StmtKind::Expr(e) => {
                self.format_expr(e);
                self.emit(";");
            }
            StmtKind::Return(value) | StmtKind::Throw(value) => {
                self.emit(if matches!(stmt.kind, StmtKind::Return(_)) { "return" } else { "throw" });
                if let Some(value) = value {
                    self.emit(" ");
                    self.format_expr(value);
                }
                self.emit(";");
            }
            StmtKind::If { cond, then_branch, else_branch } => {
                self.emit("if");
                self.open_paren();
                self.format_expr(cond);
                self.emit(") ");
                self.format_stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.emit(" else ");
                    self.format_stmt(else_branch);
                }
            }
            StmtKind::While { cond, body } => {
                self.emit("while");
                self.open_paren();
                self.format_expr(cond);
                self.emit(") ");
                self.format_stmt(body);
            }
            StmtKind::Do { body, cond } => {
                self.emit("do ");
                self.format_stmt(body);
                self.emit(" while");
                self.open_paren();
                self.format_expr(cond);
                self.emit(");");
            }
            StmtKind::For { init, cond, update, body } => {
                self.emit("for");
                self.open_paren();
                for (i, s) in init.iter().enumerate() {
                    if i > 0 {
                        self.emit(", ");
                    }
                    self.format_for_part(s);
                }
                self.emit("; ");
                if let Some(cond) = cond {
                    self.format_expr(cond);
                }
                self.emit("; ");
                self.format_list(update);
                self.emit(") ");
                self.format_stmt(body);
            }
            StmtKind::Foreach { ty, var, iter, body } => {
                self.emit("foreach");
                self.open_paren();
                self.emit(ty);
                self.emit(" ");
                self.emit(var);
                self.emit(" in ");
                self.format_expr(iter);
                self.emit(") ");
                self.format_stmt(body);
            }
            StmtKind::Break => self.emit("break;"),
            StmtKind::Continue => self.emit("continue;"),
            StmtKind::Empty => self.emit(";"),
        }
    }

    /// `for` initializers print without their terminating `;`.
    fn format_for_part(&mut self, stmt: &Stmt) {
        self.format_stmt(stmt);
        if self.output.ends_with(';') {
            self.output.pop();
        }
    }
}

/// True if `expr` and everything below it came from the parser unchanged.
///
/// Query expressions never count: they are re-laid-out at their new depth.
pub fn is_pristine(expr: &Expr) -> bool {
    !expr.any(&mut |e| e.span.is_dummy() || matches!(e.kind, ExprKind::Query(_)))
}

fn escape(text: &str, quote: char) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\0' => out.push_str("\\0"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}

// --- Operator helpers ---

const ASSIGNMENT: u8 = 0;
const CONDITIONAL: u8 = 1;
const RELATIONAL: u8 = 9;
const UNARY: u8 = 13;
const PRIMARY: u8 = 14;

fn binop_precedence(op: &BinOp) -> u8 {
    match op {
        BinOp::Coalesce => 2,
        BinOp::Or => 3,
        BinOp::And => 4,
        BinOp::BitOr => 5,
        BinOp::BitXor => 6,
        BinOp::BitAnd => 7,
        BinOp::Eq | BinOp::Ne => 8,
        BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge => RELATIONAL,
        BinOp::Shl | BinOp::Shr => 10,
        BinOp::Add | BinOp::Sub => 11,
        BinOp::Mul | BinOp::Div | BinOp::Mod => 12,
    }
}

/// How tightly `expr` binds when placed in an operand position.
pub fn expr_precedence(expr: &Expr) -> u8 {
    match &expr.kind {
        ExprKind::Assign { .. } | ExprKind::Lambda { .. } | ExprKind::Query(_) => ASSIGNMENT,
        ExprKind::Conditional { .. } => CONDITIONAL,
        ExprKind::Binary { op, .. } => binop_precedence(op),
        ExprKind::Is { .. } | ExprKind::As { .. } => RELATIONAL,
        ExprKind::Unary { op, .. } if !op.is_postfix() => UNARY,
        ExprKind::Cast { .. } => UNARY,
        _ => PRIMARY,
    }
}
