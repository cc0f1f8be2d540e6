// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Parser for the C#-like source language.
//!
//! Transforms a token stream into a syntax tree with byte-offset spans.

mod hints;
mod parser;

pub use parser::{ParseError, ParseResult, Parser};

use querify_ast::decl::SyntaxTree;
use querify_ast::expr::Expr;
use querify_ast::Span;
use querify_lexer::{LexError, Lexer};

/// A source file run through the lexer and the parser.
#[derive(Debug)]
pub struct ParsedSource {
    pub tree: SyntaxTree,
    pub lex_errors: Vec<LexError>,
    pub parse_errors: Vec<ParseError>,
}

impl ParsedSource {
    pub fn is_ok(&self) -> bool {
        self.lex_errors.is_empty() && self.parse_errors.is_empty()
    }

    /// All diagnostics as (span, message, hint), lexer errors first.
    pub fn diagnostics(&self) -> Vec<(Span, &str, Option<&str>)> {
        let lex = self.lex_errors.iter().map(|e| (e.span, e.message.as_str(), e.hint.as_deref()));
        let parse = self.parse_errors.iter().map(|e| (e.span, e.message.as_str(), e.hint.as_deref()));
        lex.chain(parse).collect()
    }
}

/// Lex and parse a whole source file.
pub fn parse_source(source: &str) -> ParsedSource {
    let lex_result = Lexer::new(source).tokenize();
    let ParseResult { tree, errors } = Parser::new(lex_result.tokens).parse();
    ParsedSource { tree, lex_errors: lex_result.errors, parse_errors: errors }
}

/// Parse a single expression that makes up the whole input.
pub fn parse_expression(source: &str) -> Result<Expr, ParseError> {
    let lex_result = Lexer::new(source).tokenize();
    if let Some(err) = lex_result.errors.first() {
        return Err(ParseError { span: err.span, message: err.message.clone(), hint: err.hint.clone() });
    }
    Parser::new(lex_result.tokens).parse_standalone_expr()
}

#[cfg(test)]
mod tests {
    use super::*;
    use querify_ast::decl::{DeclKind, TypeKind};
    use querify_ast::expr::{Direction, ExprKind, InterpolatedPart, LambdaBody, QueryClause};
    use querify_ast::stmt::StmtKind;

    fn parse(src: &str) -> ParsedSource {
        let result = parse_source(src);
        assert!(result.is_ok(), "Errors: {:?}", result.diagnostics());
        result
    }

    fn expr(src: &str) -> Expr {
        parse_expression(src).unwrap_or_else(|e| panic!("Parse error in {:?}: {}", src, e))
    }

    fn method_body(src: &str) -> Vec<StmtKind> {
        let result = parse(src);
        let DeclKind::Type(ty) = &result.tree.members[0].kind else {
            panic!("Expected type declaration");
        };
        let DeclKind::Method(method) = &ty.members[0].kind else {
            panic!("Expected method declaration");
        };
        match &method.body {
            Some(querify_ast::decl::MemberBody::Block(block)) => block.stmts.iter().map(|s| s.kind.clone()).collect(),
            _ => panic!("Expected block body"),
        }
    }

    #[test]
    fn parse_class_with_method() {
        let result = parse("using System.Linq;\n\nclass TestClass\n{\n\tvoid TestMethod ()\n\t{\n\t}\n}");
        assert_eq!(result.tree.usings.len(), 1);
        assert_eq!(result.tree.usings[0].path, "System.Linq");
        let DeclKind::Type(ty) = &result.tree.members[0].kind else {
            panic!("Expected type declaration");
        };
        assert_eq!(ty.kind, TypeKind::Class);
        assert_eq!(ty.name, "TestClass");
        assert_eq!(ty.members[0].name(), Some("TestMethod"));
    }

    #[test]
    fn parse_method_chain() {
        let e = expr("new int[0].Where (t => t > 0).Select (t => t * 2)");
        let ExprKind::MethodCall { object, method, args, .. } = &e.kind else {
            panic!("Expected method call, got {:?}", e.kind);
        };
        assert_eq!(method, "Select");
        assert_eq!(args.len(), 1);
        let ExprKind::MethodCall { method: inner, object: source, .. } = &object.kind else {
            panic!("Expected inner method call");
        };
        assert_eq!(inner, "Where");
        assert!(matches!(source.kind, ExprKind::NewArray { .. }));
    }

    #[test]
    fn method_span_covers_the_name() {
        let src = "xs.Select (t => t)";
        let e = expr(src);
        let ExprKind::MethodCall { method_span, .. } = &e.kind else {
            panic!("Expected method call");
        };
        assert_eq!(method_span.text(src), Some("Select"));
        assert_eq!(e.span.text(src), Some(src));
    }

    #[test]
    fn parse_generic_method_call() {
        let e = expr("new int[0].Cast<int> ()");
        let ExprKind::MethodCall { method, type_args, args, .. } = &e.kind else {
            panic!("Expected method call");
        };
        assert_eq!(method, "Cast");
        assert_eq!(type_args.as_deref(), Some(&["int".to_string()][..]));
        assert!(args.is_empty());

        let e = expr("Enumerable.Empty<int[]> ()");
        let ExprKind::MethodCall { type_args, .. } = &e.kind else {
            panic!("Expected method call");
        };
        assert_eq!(type_args.as_deref(), Some(&["int[]".to_string()][..]));
    }

    #[test]
    fn less_than_is_not_generic() {
        let e = expr("a < b && c > d");
        let ExprKind::Binary { left, .. } = &e.kind else {
            panic!("Expected binary");
        };
        assert!(matches!(left.kind, ExprKind::Binary { op: querify_ast::expr::BinOp::Lt, .. }));
    }

    #[test]
    fn shift_operators_from_adjacent_tokens() {
        let e = expr("a >> 2");
        assert!(matches!(e.kind, ExprKind::Binary { op: querify_ast::expr::BinOp::Shr, .. }));
        assert!(parse_expression("a > > 2").is_err());
    }

    #[test]
    fn parse_lambdas() {
        let e = expr("(l, r) => l * r");
        let ExprKind::Lambda { params, parenthesized, body } = &e.kind else {
            panic!("Expected lambda");
        };
        assert!(parenthesized);
        assert_eq!(params.len(), 2);
        assert!(matches!(body, LambdaBody::Expr(_)));

        let e = expr("t => { return t; }");
        let ExprKind::Lambda { body, .. } = &e.kind else {
            panic!("Expected lambda");
        };
        assert!(body.returned_expr().is_some());
    }

    #[test]
    fn parse_interpolated_string() {
        let src = r#"$"{l}-{r.Name,4}""#;
        let e = expr(src);
        let ExprKind::Interpolated { prefix, parts } = &e.kind else {
            panic!("Expected interpolated string, got {:?}", e.kind);
        };
        assert_eq!(prefix, "$");
        assert_eq!(parts.len(), 3);
        let InterpolatedPart::Hole { expr: hole, suffix } = &parts[2] else {
            panic!("Expected a hole");
        };
        assert!(matches!(hole.kind, ExprKind::Field { .. }));
        assert_eq!(hole.span.text(src), Some("r.Name"));
        assert_eq!(suffix, ",4");
        assert_eq!(e.span.text(src), Some(src));
    }

    #[test]
    fn bad_hole_is_an_error() {
        assert!(parse_expression(r#"$"{a +}""#).is_err());
    }

    #[test]
    fn parse_anonymous_object() {
        let e = expr("new { w, two = w * 2 }");
        let ExprKind::AnonymousObject(members) = &e.kind else {
            panic!("Expected anonymous object");
        };
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].inferred_name(), Some("w"));
        assert_eq!(members[1].name.as_deref(), Some("two"));
    }

    #[test]
    fn parse_query_expression() {
        let e = expr(
            "from char a in xs join float b in ys on a * 2 equals b into r \
             let s = a where s > 0 orderby a, s descending select a into u select u",
        );
        let ExprKind::Query(clauses) = &e.kind else {
            panic!("Expected query");
        };
        assert!(matches!(&clauses[0], QueryClause::From { ty: Some(t), var, .. } if t == "char" && var == "a"));
        assert!(matches!(&clauses[1], QueryClause::Join { into: Some(g), .. } if g == "r"));
        assert!(matches!(&clauses[2], QueryClause::Let { .. }));
        assert!(matches!(&clauses[3], QueryClause::Where(_)));
        let QueryClause::OrderBy(keys) = &clauses[4] else {
            panic!("Expected orderby");
        };
        assert_eq!(keys[1].direction, Direction::Descending);
        assert!(matches!(&clauses[5], QueryClause::SelectInto { var, .. } if var == "u"));
        assert!(matches!(&clauses[6], QueryClause::Select(_)));
    }

    #[test]
    fn from_as_identifier() {
        let e = expr("from + 1");
        assert!(matches!(e.kind, ExprKind::Binary { .. }));
    }

    #[test]
    fn parse_casts_and_parens() {
        assert!(matches!(expr("(int)x").kind, ExprKind::Cast { .. }));
        assert!(matches!(expr("(a) + b").kind, ExprKind::Binary { .. }));
        assert!(matches!(expr("(int)-1").kind, ExprKind::Cast { .. }));
        assert!(matches!(expr("(x) - 1").kind, ExprKind::Binary { .. }));
    }

    #[test]
    fn parse_statements() {
        let stmts = method_body(
            "class C { void M () {
                var x = new int[0].Select (t => t) + 1;
                int a = 1, b;
                x.Select (t => t);
                foreach (var v in xs) { if (v > 0) continue; else break; }
                for (int i = 0; i < 10; i++) { }
                return;
            } }",
        );
        assert!(matches!(&stmts[0], StmtKind::Local { ty, vars, .. } if ty == "var" && vars.len() == 1));
        assert!(matches!(&stmts[1], StmtKind::Local { vars, .. } if vars.len() == 2));
        assert!(matches!(&stmts[2], StmtKind::Expr(_)));
        assert!(matches!(&stmts[3], StmtKind::Foreach { .. }));
        assert!(matches!(&stmts[4], StmtKind::For { .. }));
        assert!(matches!(&stmts[5], StmtKind::Return(None)));
    }

    #[test]
    fn parse_members() {
        let result = parse(
            "namespace N {
                [Serializable]
                public sealed class C<T> : Base, IFoo where T : class {
                    int count = 0;
                    public C (int x) : base (x) { }
                    public int Count { get; private set; } = 3;
                    public string Name => \"c\";
                    public int this [int i] { get { return i; } }
                    public static C<T> operator + (C<T> a, C<T> b) => a;
                    public static implicit operator int (C<T> c) => 0;
                    public event EventHandler Changed;
                    T Get<U> (ref U u, params object[] rest) where U : struct { return default_value; }
                    enum Kind { A, B = 2 }
                }
            }",
        );
        let DeclKind::Namespace(ns) = &result.tree.members[0].kind else {
            panic!("Expected namespace");
        };
        let DeclKind::Type(ty) = &ns.members[0].kind else {
            panic!("Expected class");
        };
        assert_eq!(ty.type_params, vec!["T"]);
        assert_eq!(ty.bases, vec!["Base", "IFoo"]);
        assert_eq!(ns.members[0].attributes[0].name, "Serializable");
        let kinds: Vec<&str> = ty
            .members
            .iter()
            .map(|m| match &m.kind {
                DeclKind::Field(_) => "field",
                DeclKind::Constructor(_) => "ctor",
                DeclKind::Property(_) => "property",
                DeclKind::Indexer(_) => "indexer",
                DeclKind::Operator(_) => "operator",
                DeclKind::Event(_) => "event",
                DeclKind::Method(_) => "method",
                DeclKind::Type(_) => "type",
                _ => "other",
            })
            .collect();
        assert_eq!(
            kinds,
            vec!["field", "ctor", "property", "property", "indexer", "operator", "operator", "event", "method", "type"]
        );
    }

    #[test]
    fn file_scoped_namespace() {
        let result = parse("namespace A.B;\nclass C { }\nclass D { }");
        let DeclKind::Namespace(ns) = &result.tree.members[0].kind else {
            panic!("Expected namespace");
        };
        assert_eq!(ns.name, "A.B");
        assert_eq!(ns.members.len(), 2);
    }

    #[test]
    fn missing_semicolon_is_reported_and_recovered() {
        let result = parse_source("class C { void M () { var x = 1 var y = 2; } void N () { } }");
        assert!(!result.is_ok());
        assert!(result.parse_errors[0].message.contains("';'"));
        let DeclKind::Type(ty) = &result.tree.members[0].kind else {
            panic!("Expected class");
        };
        assert_eq!(ty.members.len(), 2);
    }

    #[test]
    fn trailing_input_is_an_error() {
        assert!(parse_expression("a b").is_err());
    }
}
