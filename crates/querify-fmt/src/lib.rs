// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Rendering of rewritten expressions back to source text.
//!
//! Subtrees that still carry their parser spans are copied from the
//! source verbatim. Synthesized nodes and query expressions are laid out
//! Mono style: a space before `(` and `[`, and every query clause on its
//! own line, indented one level per nesting depth.

mod config;
mod printer;

pub use config::FormatConfig;
pub use printer::{expr_precedence, is_pristine, Printer};

use querify_ast::expr::Expr;

/// Render an expression with the default configuration.
pub fn print_expr(expr: &Expr, source: &str) -> String {
    print_expr_with_config(expr, source, &FormatConfig::default())
}

/// Render an expression; a top-level query is indented one level.
pub fn print_expr_with_config(expr: &Expr, source: &str, config: &FormatConfig) -> String {
    let mut p = Printer::new(source, config);
    p.format_expr(expr);
    p.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use querify_ast::expr::{ExprKind, InterpolatedPart, QueryClause};
    use querify_ast::{NodeId, Span};

    fn parse(src: &str) -> Expr {
        querify_parser::parse_expression(src).unwrap_or_else(|e| panic!("Parse error in {:?}: {}", src, e))
    }

    fn synthesized(kind: ExprKind) -> Expr {
        Expr { id: NodeId::default(), kind, span: Span::DUMMY }
    }

    fn ident(name: &str) -> Expr {
        synthesized(ExprKind::Ident(name.to_string()))
    }

    #[test]
    fn untouched_expressions_are_copied() {
        let src = "xs.Select(t=>t*2)  [ 0 ]";
        assert_eq!(print_expr(&parse(src), src), src);
    }

    #[test]
    fn synthesized_calls_use_mono_spacing() {
        let src = "a.Foo(b)[1]";
        let mut e = parse(src);
        e.span = Span::DUMMY;
        let ExprKind::Index { object, .. } = &mut e.kind else {
            panic!("Expected index");
        };
        object.span = Span::DUMMY;
        assert_eq!(print_expr(&e, src), "a.Foo (b) [1]");
    }

    #[test]
    fn interpolated_strings_keep_text_and_suffixes() {
        let src = r#"$@"{l,-4}\{{x}}{r:X}""#;
        let mut e = parse(src);
        e.span = Span::DUMMY;
        let ExprKind::Interpolated { parts, .. } = &mut e.kind else {
            panic!("Expected interpolated string");
        };
        let InterpolatedPart::Hole { expr, .. } = &mut parts[0] else {
            panic!("Expected a hole");
        };
        *expr = ident("a");
        assert_eq!(print_expr(&e, src), r#"$@"{a,-4}\{{x}}{r:X}""#);
    }

    #[test]
    fn query_clauses_on_separate_lines() {
        let query = synthesized(ExprKind::Query(vec![
            QueryClause::From { var: "t".into(), ty: Some("int".into()), source: ident("xs") },
            QueryClause::Where(ident("ok")),
            QueryClause::SelectInto { value: ident("t"), var: "u".into() },
            QueryClause::Select(ident("u")),
        ]));
        assert_eq!(print_expr(&query, ""), "\n\tfrom int t in xs\n\twhere ok\n\tselect t into u\n\tselect u");
    }

    #[test]
    fn nested_query_is_indented_deeper() {
        let src = "from t in xs select (from g in t select g)";
        let e = parse(src);
        assert_eq!(print_expr(&e, src), "\n\tfrom t in xs\n\tselect (\n\t\tfrom g in t\n\t\tselect g)");
    }

    #[test]
    fn query_in_clause_slot_gets_parens() {
        let inner = synthesized(ExprKind::Query(vec![
            QueryClause::From { var: "a".into(), ty: None, source: ident("xs") },
            QueryClause::Select(ident("a")),
        ]));
        let outer = synthesized(ExprKind::Query(vec![
            QueryClause::From { var: "b".into(), ty: Some("int".into()), source: inner },
            QueryClause::Select(ident("b")),
        ]));
        assert_eq!(
            print_expr(&outer, ""),
            "\n\tfrom int b in (\n\t\tfrom a in xs\n\t\tselect a)\n\tselect b"
        );
    }

    #[test]
    fn operands_are_parenthesized_by_precedence() {
        let src = "(a + b) * c";
        let mut e = parse(src);
        // Drop the source parentheses and rebuild the product
        let ExprKind::Binary { left, .. } = &mut e.kind else {
            panic!("Expected binary");
        };
        let ExprKind::Paren(sum) = &left.kind else {
            panic!("Expected paren");
        };
        let mut sum = (**sum).clone();
        sum.span = Span::DUMMY;
        **left = sum;
        e.span = Span::DUMMY;
        assert_eq!(print_expr(&e, src), "(a + b) * c");
    }

    #[test]
    fn indent_unit_is_configurable() {
        let query = synthesized(ExprKind::Query(vec![
            QueryClause::From { var: "t".into(), ty: None, source: ident("xs") },
            QueryClause::Select(ident("t")),
        ]));
        let config = FormatConfig::with_spaces(4);
        assert_eq!(print_expr_with_config(&query, "", &config), "\n    from t in xs\n    select t");
    }

    #[test]
    fn anonymous_objects_and_lambdas() {
        let src = "new { w, two = w * 2 }";
        let mut e = parse(src);
        e.span = Span::DUMMY;
        assert_eq!(print_expr(&e, src), "new { w, two = w * 2 }");

        let src = "(l, r) => { return l; }";
        let mut e = parse(src);
        e.span = Span::DUMMY;
        assert_eq!(print_expr(&e, src), "(l, r) => { return l; }");
    }

    #[test]
    fn pristine_detection() {
        let src = "a.b + c";
        let e = parse(src);
        assert!(is_pristine(&e));
        assert!(!is_pristine(&ident("x")));
        assert!(!is_pristine(&parse("from t in xs select t")));
    }
}
