// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The closed vocabulary of query operators and their accepted call shapes.

use querify_ast::expr::{Expr, ExprKind};

/// A query operator the rewrite understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOperator {
    Select,
    Where,
    OrderBy,
    OrderByDescending,
    ThenBy,
    ThenByDescending,
    Cast,
    Join,
    GroupJoin,
}

impl QueryOperator {
    pub fn from_name(name: &str) -> Option<Self> {
        let op = match name {
            "Select" => QueryOperator::Select,
            "Where" => QueryOperator::Where,
            "OrderBy" => QueryOperator::OrderBy,
            "OrderByDescending" => QueryOperator::OrderByDescending,
            "ThenBy" => QueryOperator::ThenBy,
            "ThenByDescending" => QueryOperator::ThenByDescending,
            "Cast" => QueryOperator::Cast,
            "Join" => QueryOperator::Join,
            "GroupJoin" => QueryOperator::GroupJoin,
            _ => return None,
        };
        Some(op)
    }

    pub fn name(&self) -> &'static str {
        match self {
            QueryOperator::Select => "Select",
            QueryOperator::Where => "Where",
            QueryOperator::OrderBy => "OrderBy",
            QueryOperator::OrderByDescending => "OrderByDescending",
            QueryOperator::ThenBy => "ThenBy",
            QueryOperator::ThenByDescending => "ThenByDescending",
            QueryOperator::Cast => "Cast",
            QueryOperator::Join => "Join",
            QueryOperator::GroupJoin => "GroupJoin",
        }
    }

    /// `OrderBy*` and `ThenBy*`: the operators a `ThenBy*` may follow.
    pub fn is_ordering(&self) -> bool {
        matches!(
            self,
            QueryOperator::OrderBy
                | QueryOperator::OrderByDescending
                | QueryOperator::ThenBy
                | QueryOperator::ThenByDescending
        )
    }

    pub fn is_descending(&self) -> bool {
        matches!(self, QueryOperator::OrderByDescending | QueryOperator::ThenByDescending)
    }
}

/// A lambda argument with an expression body (or a block that only returns one).
#[derive(Debug, Clone)]
pub struct Lambda<'a> {
    pub params: Vec<&'a str>,
    pub body: &'a Expr,
}

impl<'a> Lambda<'a> {
    pub fn from_expr(expr: &'a Expr) -> Option<Self> {
        match &expr.kind {
            ExprKind::Lambda { params, body, .. } => Some(Lambda {
                params: params.iter().map(|p| p.name.as_str()).collect(),
                body: body.returned_expr()?,
            }),
            _ => None,
        }
    }

    fn with_arity(expr: &'a Expr, arity: usize) -> Option<Self> {
        Self::from_expr(expr).filter(|l| l.params.len() == arity)
    }

    /// The parameter of a single-parameter lambda.
    pub fn param(&self) -> &'a str {
        self.params[0]
    }
}

/// A recognized operator invocation, borrowed from the syntax tree.
#[derive(Debug, Clone)]
pub struct OperatorCall<'a> {
    pub op: QueryOperator,
    /// `T` of `Cast<T> ()`
    pub type_argument: Option<&'a str>,
    pub args: &'a [Expr],
    /// The expression the operator is invoked on
    pub receiver: &'a Expr,
    /// The whole call expression
    pub call: &'a Expr,
}

impl<'a> OperatorCall<'a> {
    /// The single-parameter lambda of `Select`, `Where` and the ordering operators.
    pub fn selector(&self) -> Option<Lambda<'a>> {
        match self.op {
            QueryOperator::Cast | QueryOperator::Join | QueryOperator::GroupJoin => None,
            _ => Lambda::with_arity(&self.args[0], 1),
        }
    }

    /// Inner source, outer key, inner key and result selector of a join.
    pub fn join_parts(&self) -> Option<(&'a Expr, Lambda<'a>, Lambda<'a>, Lambda<'a>)> {
        match (self.op, self.args) {
            (QueryOperator::Join | QueryOperator::GroupJoin, [inner, outer_key, inner_key, result]) => Some((
                inner,
                Lambda::with_arity(outer_key, 1)?,
                Lambda::with_arity(inner_key, 1)?,
                Lambda::with_arity(result, 2)?,
            )),
            _ => None,
        }
    }

    /// Name of the parameter bound to one element of the receiver sequence.
    pub fn element_param(&self) -> Option<&'a str> {
        match self.op {
            QueryOperator::Cast => None,
            QueryOperator::Join | QueryOperator::GroupJoin => self.join_parts().map(|(_, outer, _, _)| outer.param()),
            _ => self.selector().map(|l| l.param()),
        }
    }
}

/// Recognize `expr` as a call of one of the query operators in a supported shape.
pub fn recognize(expr: &Expr) -> Option<OperatorCall<'_>> {
    let ExprKind::MethodCall { object, method, type_args, args, .. } = &expr.kind else {
        return None;
    };
    let op = QueryOperator::from_name(method)?;
    let call = OperatorCall {
        op,
        type_argument: None,
        args: args.as_slice(),
        receiver: object,
        call: expr,
    };

    match op {
        QueryOperator::Cast => match (type_args.as_deref(), args.is_empty()) {
            (Some([ty]), true) => Some(OperatorCall { type_argument: Some(ty.as_str()), ..call }),
            _ => None,
        },
        QueryOperator::Join | QueryOperator::GroupJoin => {
            if type_args.is_some() {
                return None;
            }
            call.join_parts()?;
            Some(call)
        }
        QueryOperator::ThenBy | QueryOperator::ThenByDescending => {
            if args.len() != 1 || type_args.is_some() {
                return None;
            }
            call.selector()?;
            // Only valid directly on an ordered sequence
            if !recognize(object).is_some_and(|receiver| receiver.op.is_ordering()) {
                return None;
            }
            Some(call)
        }
        QueryOperator::Select | QueryOperator::Where | QueryOperator::OrderBy | QueryOperator::OrderByDescending => {
            if args.len() != 1 || type_args.is_some() {
                return None;
            }
            call.selector()?;
            Some(call)
        }
    }
}
