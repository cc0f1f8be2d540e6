// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Splitting a fluent call chain into its operator calls and source.

use querify_ast::expr::Expr;
use tracing::trace;

use crate::operator::{recognize, OperatorCall};

/// A decomposed chain: `source.Op1 (...).Op2 (...)...`.
#[derive(Debug, Clone)]
pub struct Chain<'a> {
    /// The expression the first operator is invoked on
    pub source: &'a Expr,
    /// Operator calls, innermost (applied first) to outermost
    pub calls: Vec<OperatorCall<'a>>,
}

/// Peel recognized operator calls off `root`, outermost first.
///
/// Returns `None` if `root` itself is not a recognized call. The first
/// unrecognized receiver, whatever it is, becomes the source.
pub fn decompose(root: &Expr) -> Option<Chain<'_>> {
    let mut calls = Vec::new();
    let mut current = root;
    while let Some(call) = recognize(current) {
        trace!("chain link {} at {}..{}", call.op.name(), call.call.span.start, call.call.span.end);
        current = call.receiver;
        calls.push(call);
    }
    if calls.is_empty() {
        return None;
    }
    calls.reverse();
    Some(Chain { source: current, calls })
}

/// True if `parent` is a recognized operator call invoked directly on `child`.
///
/// Used to climb from the call under the caret to the outermost call of its chain.
pub fn extends_chain(parent: &Expr, child: &Expr) -> bool {
    recognize(parent).is_some_and(|call| std::ptr::eq(call.receiver, child))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::QueryOperator;
    use querify_ast::expr::ExprKind;
    use querify_parser::parse_expression;

    fn ops(chain: &Chain<'_>) -> Vec<QueryOperator> {
        chain.calls.iter().map(|c| c.op).collect()
    }

    #[test]
    fn decompose_whole_chain() {
        let expr = parse_expression("xs.Cast<int> ().Where (t => t > 0).OrderBy (t => t).ThenBy (t => -t)").unwrap();
        let chain = decompose(&expr).expect("chain");
        assert_eq!(
            ops(&chain),
            vec![QueryOperator::Cast, QueryOperator::Where, QueryOperator::OrderBy, QueryOperator::ThenBy]
        );
        assert_eq!(chain.source.as_ident(), Some("xs"));
    }

    #[test]
    fn unrecognized_call_becomes_the_source() {
        let expr = parse_expression("xs.Distinct ().Select (t => t)").unwrap();
        let chain = decompose(&expr).expect("chain");
        assert_eq!(ops(&chain), vec![QueryOperator::Select]);
        assert!(matches!(&chain.source.kind, ExprKind::MethodCall { method, .. } if method == "Distinct"));
    }

    #[test]
    fn unrecognized_root_is_not_a_chain() {
        let expr = parse_expression("xs.Select (t => t).ToList ()").unwrap();
        assert!(decompose(&expr).is_none());
    }

    #[test]
    fn lambda_bodies_are_not_searched() {
        let expr = parse_expression("xs.Select (t => t.Where (u => u))").unwrap();
        let chain = decompose(&expr).expect("chain");
        assert_eq!(chain.calls.len(), 1);
    }

    #[test]
    fn extends_chain_checks_the_receiver() {
        let expr = parse_expression("xs.Where (t => t).Select (t => t)").unwrap();
        let ExprKind::MethodCall { object, args, .. } = &expr.kind else {
            panic!("Expected method call");
        };
        assert!(extends_chain(&expr, object));
        assert!(!extends_chain(&expr, &args[0]));
    }
}
