// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Rewriting of fluent query operator chains into query expressions.
//!
//! `xs.Where (t => t > 0).Select (t => t * 2)` becomes
//! `from t in xs where t > 0 select t * 2`. The result is a new tree; nodes
//! taken over unchanged keep their spans so the printer can copy their text.

mod decompose;
mod error;
mod operator;
mod shape;
mod subst;
mod synthesize;

pub use decompose::{decompose, extends_chain, Chain};
pub use error::RewriteError;
pub use operator::{recognize, Lambda, OperatorCall, QueryOperator};

use std::collections::HashSet;

use querify_ast::expr::{Expr, ExprKind};
use tracing::debug;

use crate::subst::{names_in, IdGen};
use crate::synthesize::{Names, Synthesizer};

/// How the rewritten chain sits in the surrounding code.
#[derive(Debug, Clone, Copy, Default)]
pub struct RewriteContext {
    /// Wrap the query in parentheses; it is an operand of a larger expression.
    pub parenthesize: bool,
    /// The chain already sits inside a query expression. Chains used as join
    /// sources are then left as written instead of becoming nested queries.
    pub nested: bool,
}

/// Rewrite the chain whose outermost operator call is `root`.
pub fn rewrite_chain(root: &Expr, ctx: RewriteContext) -> Result<Expr, RewriteError> {
    rewrite_chain_avoiding(root, ctx, &HashSet::new())
}

/// `rewrite_chain`, also keeping generated range variables and `let` names
/// clear of `taken`, the names of the code around the chain.
pub fn rewrite_chain_avoiding(root: &Expr, ctx: RewriteContext, taken: &HashSet<String>) -> Result<Expr, RewriteError> {
    let chain = decompose(root).ok_or(RewriteError::NotAChain { span: root.span })?;
    debug!(
        "rewriting {} at {}..{}",
        chain.calls.iter().map(|c| c.op.name()).collect::<Vec<_>>().join("."),
        root.span.start,
        root.span.end
    );

    let ids = IdGen::new();
    let mut written = names_in(root);
    written.extend(taken.iter().cloned());
    let mut names = Names::new(written);
    let query = Synthesizer::new(&ids, &mut names).nested(ctx.nested).run(&chain);

    if ctx.parenthesize {
        Ok(ids.expr(ExprKind::Paren(Box::new(query))))
    } else {
        Ok(query)
    }
}
