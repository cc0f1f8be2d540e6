// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Fixture tests for the code action. Each input is a statement inside a
//! method body; `$` marks the caret and is removed before parsing.

use querify_action::{convert, find_applicable, is_applicable, ActionError};
use querify_rewrite::QueryOperator;

fn in_method(stmt: &str) -> String {
    format!(
        "\nusing System.Linq;\n\nclass TestClass\n{{\n\tvoid TestMethod ()\n\t{{\n\t\t{}\n\t}}\n}}",
        stmt
    )
}

/// Source without the caret marker, and the caret offset.
fn split_caret(stmt: &str) -> (String, usize) {
    let marked = in_method(stmt);
    let offset = marked.find('$').expect("fixture has no caret");
    (marked.replacen('$', "", 1), offset)
}

fn check(input: &str, expected: &str) {
    let (source, offset) = split_caret(input);
    assert!(is_applicable(&source, offset), "Not applicable: {:?}", input);
    let edit = convert(&source, offset).unwrap_or_else(|e| panic!("Convert failed for {:?}: {}", input, e));
    assert_eq!(edit.apply(&source), in_method(expected));
}

fn check_not_applicable(input: &str) {
    let (source, offset) = split_caret(input);
    assert!(!is_applicable(&source, offset), "Applicable: {:?}", input);
    assert!(matches!(convert(&source, offset), Err(ActionError::NotApplicable { .. })));
}

#[test]
fn basic_case() {
    check(
        "var x = new int[0].$Select (t => t);",
        "var x = \n\tfrom t in new int[0]\n\tselect t;",
    );
}

#[test]
fn added_parenthesis() {
    check(
        "var x = new int[0].$Select (t => t) + 1;",
        "var x = (\n\tfrom t in new int[0]\n\tselect t) + 1;",
    );
}

#[test]
fn cast() {
    check(
        "var x = new int[0].$Cast<int> ();",
        "var x = \n\tfrom int _1 in new int[0]\n\tselect _1;",
    );
}

#[test]
fn let_clause() {
    check(
        "var x = new int[0].Select (w => new { w, two = w * 2 }).$Select (_ => _.two);",
        "var x = \n\tfrom w in new int[0]\n\tlet two = w * 2\n\tselect two;",
    );
}

#[test]
fn long_let_chain() {
    check(
        "var x = new int[0].Select (w => new { w, two = w * 2 }).Select(h => new { h, three = h.w * 3 }).$Select (_ => _.h.w);",
        "var x = \n\tfrom w in new int[0]\n\tlet two = w * 2\n\tlet three = w * 3\n\tselect w;",
    );
}

#[test]
fn cast_select() {
    check(
        "var x = new int[0].$Cast<int> ().Select (t => t * 2);",
        "var x = \n\tfrom int t in new int[0]\n\tselect t * 2;",
    );
}

#[test]
fn select_where() {
    check(
        "var x = new int[0].$Where (t => t > 0).Select (t => t * 2);",
        "var x = \n\tfrom t in new int[0]\n\twhere t > 0\n\tselect t * 2;",
    );
}

#[test]
fn sorting() {
    check(
        "var x = new int[0].$OrderBy (t => t).ThenByDescending (t => t);",
        "var x = \n\tfrom t in new int[0]\n\torderby t, t descending\n\tselect t;",
    );
}

#[test]
fn degenerate_where() {
    check(
        "var x = new int[0].$Where (t => t > 0);",
        "var x = \n\tfrom t in new int[0]\n\twhere t > 0\n\tselect t;",
    );
}

#[test]
fn chain() {
    check(
        "var x = new int[0].Where (t => t > 0).$Where (u => u > 0);",
        "var x = \n\tfrom t in new int[0]\n\twhere t > 0\n\tselect t into u\n\twhere u > 0\n\tselect u;",
    );
}

#[test]
fn join() {
    check(
        "var x = new int[0].Cast<char> ().$Join(new int[0].Cast<float> (), a => a * 2, b => b, (l, r) => l * r);",
        "var x = \n\tfrom char a in new int[0]\n\tjoin float b in new int[0] on a * 2 equals b\n\tselect a * b;",
    );
}

#[test]
fn group_join() {
    check(
        "var x = new int[0].Cast<char> ().$GroupJoin(new int[0].Cast<float> (), a => a * 2, b => b, (l, r) => l * r [0]);",
        "var x = \n\tfrom char a in new int[0]\n\tjoin float b in new int[0] on a * 2 equals b into r\n\tselect a * r [0];",
    );
}

#[test]
fn non_recursive() {
    check(
        "var x = Enumerable.Empty<int[]> ().$Select (t => t.Select (v => v));",
        "var x = \n\tfrom t in Enumerable.Empty<int[]> ()\n\tselect t.Select (v => v);",
    );
}

#[test]
fn non_recursive_combine_queries() {
    check(
        "var x = Enumerable.Empty<int[]> ().$Select (t => (from g in t select g));",
        "var x = \n\tfrom t in Enumerable.Empty<int[]> ()\n\tselect (\n\t\tfrom g in t\n\t\tselect g);",
    );
}

#[test]
fn chain_as_argument_is_not_parenthesized() {
    check(
        "Use (new int[0].$Where (t => t > 0));",
        "Use (\n\tfrom t in new int[0]\n\twhere t > 0\n\tselect t);",
    );
}

#[test]
fn receiver_of_other_call_is_parenthesized() {
    check(
        "var n = new int[0].$Select (t => t + 1).Count ();",
        "var n = (\n\tfrom t in new int[0]\n\tselect t + 1).Count ();",
    );
}

#[test]
fn caret_at_end_of_name() {
    check(
        "var x = new int[0].Select$ (t => t);",
        "var x = \n\tfrom t in new int[0]\n\tselect t;",
    );
}

#[test]
fn inner_chain_in_lambda_converts_alone() {
    check(
        "var x = xs.Select (t => t.$Where (u => u > 0));",
        "var x = xs.Select (t => \n\tfrom u in t\n\twhere u > 0\n\tselect u);",
    );
}

#[test]
fn chain_inside_query_keeps_join_sources() {
    check(
        "var x = from t in xs.$Join (ys.Where (y => y > 0), a => a, b => b, (l, r) => r) select t;",
        "var x = from t in (\n\tfrom a in xs\n\tjoin b in ys.Where (y => y > 0) on a equals b\n\tselect b) select t;",
    );
}

#[test]
fn generated_names_avoid_locals_of_the_method() {
    check(
        "int _1 = 0; var x = new int[0].$Cast<int> ();",
        "int _1 = 0; var x = \n\tfrom int _2 in new int[0]\n\tselect _2;",
    );
}

#[test]
fn not_applicable() {
    // Unrecognized operator
    check_not_applicable("var x = new int[0].$ToList ();");
    // Caret on an argument, not on an operator name
    check_not_applicable("var x = new int[0].Select (t => $t);");
    // A query is not a statement
    check_not_applicable("new int[0].$Select (t => t);");
    // Indexed overload
    check_not_applicable("var x = new int[0].$Select ((t, i) => t);");
    // ThenBy without an ordering before it
    check_not_applicable("var x = new int[0].$ThenBy (t => t);");
}

#[test]
fn lists_every_applicable_chain() {
    let source = in_method(
        "var a = xs.Where (t => t > 0).Select (t => t);\n\t\txs.Select (t => t);\n\t\tvar b = ys.Cast<int> ().Count ();",
    );
    let sites = find_applicable(&source);
    assert_eq!(sites.len(), 2);
    assert_eq!(sites[0].operators, vec![QueryOperator::Where, QueryOperator::Select]);
    assert!(!sites[0].parenthesize);
    assert_eq!(sites[1].operators, vec![QueryOperator::Cast]);
    assert!(sites[1].parenthesize);
    assert_eq!(sites[1].chain.text(&source), Some("ys.Cast<int> ()"));
}
