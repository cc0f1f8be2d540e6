// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! End-to-end tests for chain rewriting: parse an expression, rewrite it,
//! print the result.

use querify_fmt::print_expr;
use querify_parser::parse_expression;
use querify_rewrite::{rewrite_chain, RewriteContext, RewriteError};

fn convert(src: &str) -> String {
    convert_with(src, RewriteContext::default())
}

fn convert_with(src: &str, ctx: RewriteContext) -> String {
    let expr = parse_expression(src).unwrap_or_else(|e| panic!("Parse error in {:?}: {}", src, e));
    let query = rewrite_chain(&expr, ctx).unwrap_or_else(|e| panic!("Rewrite failed for {:?}: {}", src, e));
    print_expr(&query, src)
}

#[test]
fn identity_select() {
    assert_eq!(convert("new int[0].Select (t => t)"), "\n\tfrom t in new int[0]\n\tselect t");
}

#[test]
fn parenthesized_result() {
    let ctx = RewriteContext { parenthesize: true, ..Default::default() };
    assert_eq!(convert_with("xs.Select (t => t)", ctx), "(\n\tfrom t in xs\n\tselect t)");
}

#[test]
fn where_then_select() {
    assert_eq!(
        convert("xs.Where (t => t > 0).Select (t => t * 2)"),
        "\n\tfrom t in xs\n\twhere t > 0\n\tselect t * 2"
    );
}

#[test]
fn trailing_where_selects_the_range_variable() {
    assert_eq!(convert("xs.Where (t => t > 0)"), "\n\tfrom t in xs\n\twhere t > 0\n\tselect t");
}

#[test]
fn cast_alone_gets_a_generated_variable() {
    assert_eq!(convert("xs.Cast<int> ()"), "\n\tfrom int _1 in xs\n\tselect _1");
    // `_1` is taken by the source
    assert_eq!(convert("_1.Cast<int> ()"), "\n\tfrom int _2 in _1\n\tselect _2");
}

#[test]
fn anonymous_projection_becomes_lets() {
    assert_eq!(
        convert("xs.Select (w => new { w, two = w * 2 }).Select (h => h.two)"),
        "\n\tfrom w in xs\n\tlet two = w * 2\n\tselect two"
    );
}

#[test]
fn nested_records_keep_unused_lets() {
    assert_eq!(
        convert(
            "xs.Select (w => new { w, two = w * 2 })\
             .Select (h => new { h, three = h.w * 3 })\
             .Select (_ => _.h.w)"
        ),
        "\n\tfrom w in xs\n\tlet two = w * 2\n\tlet three = w * 3\n\tselect w"
    );
}

#[test]
fn record_used_whole_is_continued() {
    assert_eq!(
        convert("xs.Select (t => new { t, u = t * 2 }).Select (p => f (p))"),
        "\n\tfrom t in xs\n\tselect new { t, u = t * 2 } into p\n\tselect f (p)"
    );
}

#[test]
fn record_field_shadowed_by_lambda_is_continued() {
    assert_eq!(
        convert("xs.Select (t => new { t, n = t + 1 }).Select (p => ys.Select (n => p.n + n))"),
        "\n\tfrom t in xs\n\tselect new { t, n = t + 1 } into p\n\tselect ys.Select (n => p.n + n)"
    );
}

#[test]
fn trailing_anonymous_projection_is_rebuilt() {
    assert_eq!(
        convert("xs.Select (t => new { t, k = t % 3 }).OrderBy (p => p.k).ThenBy (p => p.t)"),
        "\n\tfrom t in xs\n\tlet k = t % 3\n\torderby k, t\n\tselect new { t, k }"
    );
}

#[test]
fn orderings_share_one_clause() {
    assert_eq!(
        convert("xs.OrderBy (t => t).ThenByDescending (t => -t).ThenBy (t => t)"),
        "\n\tfrom t in xs\n\torderby t, -t descending, t\n\tselect t"
    );
    assert_eq!(
        convert("xs.OrderByDescending (t => t).OrderBy (t => t)"),
        "\n\tfrom t in xs\n\torderby t descending\n\torderby t\n\tselect t"
    );
}

#[test]
fn new_parameter_name_continues() {
    assert_eq!(
        convert("xs.Where (t => t > 0).Select (t => t).Where (u => u > 0)"),
        "\n\tfrom t in xs\n\twhere t > 0\n\tselect t into u\n\twhere u > 0\n\tselect u"
    );
}

#[test]
fn then_by_renames_instead_of_continuing() {
    assert_eq!(
        convert("xs.OrderBy (a => a).ThenBy (b => b.Length)"),
        "\n\tfrom a in xs\n\torderby a, a.Length\n\tselect a"
    );
}

#[test]
fn then_by_key_lambdas_do_not_capture_the_range_variable() {
    assert_eq!(
        convert("xs.OrderBy (a => a).ThenBy (b => ys.Count (a => a == b))"),
        "\n\tfrom a in xs\n\torderby a, ys.Count (_1 => _1 == a)\n\tselect a"
    );
}

#[test]
fn join_result_lambdas_do_not_capture_range_variables() {
    assert_eq!(
        convert("xs.Join (ys, a => a, b => b, (l, r) => zs.Any (a => a == l))"),
        "\n\tfrom a in xs\n\tjoin b in ys on a equals b\n\tselect zs.Any (_1 => _1 == a)"
    );
    assert_eq!(
        convert("xs.Join (ys, a => a, b => b, (l, r) => zs.Any (b => b == r))"),
        "\n\tfrom a in xs\n\tjoin b in ys on a equals b\n\tselect zs.Any (_1 => _1 == b)"
    );
}

#[test]
fn renamed_parameters_reach_interpolation_holes() {
    assert_eq!(
        convert(r#"xs.Join (ys, a => a, b => b, (l, r) => $"{l}-{r}")"#),
        "\n\tfrom a in xs\n\tjoin b in ys on a equals b\n\tselect $\"{a}-{b}\""
    );
    assert_eq!(
        convert(r#"xs.OrderBy (a => a).ThenBy (b => $"{b}")"#),
        "\n\tfrom a in xs\n\torderby a, $\"{a}\"\n\tselect a"
    );
    assert_eq!(
        convert(r#"xs.Select (w => new { w, two = w * 2 }).Select (h => $"{h.two:D3}")"#),
        "\n\tfrom w in xs\n\tlet two = w * 2\n\tselect $\"{two:D3}\""
    );
}

#[test]
fn cast_after_operators_nests_the_query() {
    assert_eq!(
        convert("xs.Where (t => t > 0).Cast<long> ().Select (s => s * 2)"),
        "\n\tfrom long s in (\n\t\tfrom t in xs\n\t\twhere t > 0\n\t\tselect t)\n\tselect s * 2"
    );
}

#[test]
fn join_with_typed_sources() {
    assert_eq!(
        convert("xs.Cast<char> ().Join (ys.Cast<float> (), a => a * 2, b => b, (l, r) => l * r)"),
        "\n\tfrom char a in xs\n\tjoin float b in ys on a * 2 equals b\n\tselect a * b"
    );
}

#[test]
fn group_join_binds_the_group() {
    assert_eq!(
        convert("xs.GroupJoin (ys, a => a, b => b, (l, r) => r.Count ())"),
        "\n\tfrom a in xs\n\tjoin b in ys on a equals b into r\n\tselect r.Count ()"
    );
}

#[test]
fn join_variable_is_renamed_on_collision() {
    assert_eq!(
        convert("xs.Join (ys, a => a, a => a, (l, r) => l + r)"),
        "\n\tfrom a in xs\n\tjoin _1 in ys on a equals _1\n\tselect a + _1"
    );
}

#[test]
fn join_source_chain_is_rewritten() {
    assert_eq!(
        convert("xs.Join (ys.Where (y => y > 0), a => a, b => b, (l, r) => r)"),
        "\n\tfrom a in xs\n\tjoin b in (\n\t\tfrom y in ys\n\t\twhere y > 0\n\t\tselect y) on a equals b\n\tselect b"
    );
}

#[test]
fn nested_rewrite_keeps_join_sources() {
    let ctx = RewriteContext { nested: true, ..Default::default() };
    assert_eq!(
        convert_with("xs.Join (ys.Where (y => y > 0), a => a, b => b, (l, r) => r)", ctx),
        "\n\tfrom a in xs\n\tjoin b in ys.Where (y => y > 0) on a equals b\n\tselect b"
    );
}

#[test]
fn lambda_bodies_are_left_alone() {
    assert_eq!(
        convert("xs.Select (t => t.Where (u => u > 0))"),
        "\n\tfrom t in xs\n\tselect t.Where (u => u > 0)"
    );
}

#[test]
fn unrecognized_calls_stay_in_the_source() {
    assert_eq!(
        convert("xs.Distinct ().Select (t => t + 1)"),
        "\n\tfrom t in xs.Distinct ()\n\tselect t + 1"
    );
}

#[test]
fn non_chain_is_an_error() {
    let expr = parse_expression("xs.ToList ()").unwrap();
    let err = rewrite_chain(&expr, RewriteContext::default()).unwrap_err();
    assert!(matches!(err, RewriteError::NotAChain { .. }));
    assert_eq!(err.span(), expr.span);
}
