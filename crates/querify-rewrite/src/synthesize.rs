// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Clause synthesis: turning a decomposed chain into a query expression.
//!
//! Operators are applied innermost first. The synthesizer tracks the range
//! variables in scope and what the current sequence element is in terms of
//! them. A projection to an anonymous object is kept as a record, so later
//! lambdas can read its fields through `let` clauses instead of closing the
//! query with `select ... into`.

use std::collections::{HashMap, HashSet};
use std::mem;

use querify_ast::expr::{Direction, Expr, ExprKind, Ordering, QueryClause};
use querify_ast::NodeId;
use tracing::{debug, trace};

use crate::decompose::{decompose, Chain};
use crate::operator::{recognize, Lambda, OperatorCall, QueryOperator};
use crate::shape::{Element, Record, Resolved};
use crate::subst::{
    member_path, mentions, names_in, rewrite, rewrite_avoiding, substitute_avoiding, substitute_or_clone, IdGen, Visit,
};

/// Names written in the chain plus every name generated so far.
#[derive(Debug, Default)]
pub struct Names {
    taken: HashSet<String>,
    counter: u32,
}

impl Names {
    pub fn new(taken: HashSet<String>) -> Self {
        Self { taken, counter: 0 }
    }

    /// The next `_N` not used anywhere.
    pub fn fresh(&mut self) -> String {
        loop {
            self.counter += 1;
            let name = format!("_{}", self.counter);
            if self.taken.insert(name.clone()) {
                return name;
            }
        }
    }

    pub fn taken(&self) -> &HashSet<String> {
        &self.taken
    }
}

pub struct Synthesizer<'s> {
    ids: &'s IdGen,
    names: &'s mut Names,
    clauses: Vec<QueryClause>,
    /// Range variables visible to the next clause
    scope: Vec<String>,
    element: Element,
    /// Set once the final `select` has been emitted
    closed: bool,
    /// Building a nested query source; join sources are kept as written
    nested: bool,
}

impl<'s> Synthesizer<'s> {
    pub fn new(ids: &'s IdGen, names: &'s mut Names) -> Self {
        Self {
            ids,
            names,
            clauses: Vec::new(),
            scope: Vec::new(),
            element: Element::Var(String::new()),
            closed: false,
            nested: false,
        }
    }

    pub fn nested(mut self, nested: bool) -> Self {
        self.nested = nested;
        self
    }

    /// Build the query for `chain`.
    pub fn run(mut self, chain: &Chain<'_>) -> Expr {
        let mut calls = chain.calls.as_slice();
        let mut ty = None;
        if let Some((first, rest)) = calls.split_first() {
            if first.op == QueryOperator::Cast {
                ty = first.type_argument.map(str::to_string);
                calls = rest;
            }
        }

        let var = self.var_for(calls.first());
        debug!("from {} over {} operators", var, chain.calls.len());
        self.open(var, ty, chain.source.clone());

        for (i, call) in calls.iter().enumerate() {
            self.apply(call, calls.get(i + 1));
        }
        self.close()
    }

    fn apply(&mut self, call: &OperatorCall<'_>, next: Option<&OperatorCall<'_>>) {
        trace!("apply {}", call.op.name());
        match call.op {
            QueryOperator::Select => {
                let Some(lambda) = call.selector() else { return };
                let body = self.bind(&lambda, true);
                let anonymous = matches!(body.unparenthesized().kind, ExprKind::AnonymousObject(_));
                if next.is_none() && !anonymous {
                    self.clauses.push(QueryClause::Select(body));
                    self.closed = true;
                } else {
                    self.element = Element::from_projection(&body, &self.scope);
                }
            }
            QueryOperator::Where => {
                let Some(lambda) = call.selector() else { return };
                let predicate = self.bind(&lambda, false);
                self.clauses.push(QueryClause::Where(predicate));
            }
            QueryOperator::OrderBy | QueryOperator::OrderByDescending => {
                let Some(lambda) = call.selector() else { return };
                let key = self.bind(&lambda, false);
                let ordering = Ordering { key, direction: direction(call.op) };
                self.clauses.push(QueryClause::OrderBy(vec![ordering]));
            }
            QueryOperator::ThenBy | QueryOperator::ThenByDescending => {
                let Some(lambda) = call.selector() else { return };
                // A continuation here would drop the ordering, so the key is renamed instead
                let key = self.project(lambda.param(), lambda.body, &HashMap::new());
                let ordering = Ordering { key, direction: direction(call.op) };
                match self.clauses.last_mut() {
                    Some(QueryClause::OrderBy(keys)) => keys.push(ordering),
                    _ => self.clauses.push(QueryClause::OrderBy(vec![ordering])),
                }
            }
            QueryOperator::Cast => self.restart(call.type_argument, next),
            QueryOperator::Join | QueryOperator::GroupJoin => self.join(call),
        }
    }

    fn var_for(&mut self, call: Option<&OperatorCall<'_>>) -> String {
        match call.and_then(|c| c.element_param()) {
            Some(param) => param.to_string(),
            None => self.names.fresh(),
        }
    }

    fn open(&mut self, var: String, ty: Option<String>, source: Expr) {
        self.clauses.push(QueryClause::From { var: var.clone(), ty, source });
        self.scope = vec![var.clone()];
        self.element = Element::Var(var);
    }

    fn close(mut self) -> Expr {
        if !self.closed {
            let value = self.element.to_expr(self.ids);
            self.clauses.push(QueryClause::Select(value));
        }
        self.ids.expr(ExprKind::Query(self.clauses))
    }

    /// Make the lambda's parameter stand for the current element and return
    /// its body in terms of the range variables.
    ///
    /// `projection` allows a member of a top-level anonymous object in the
    /// body to take a whole record.
    fn bind(&mut self, lambda: &Lambda<'_>, projection: bool) -> Expr {
        let param = lambda.param();
        match &self.element {
            Element::Var(var) if var == param => return lambda.body.clone(),
            Element::Record(record) => {
                let record = record.clone();
                if let Some(body) = self.fuse(record, param, lambda.body, projection) {
                    return body;
                }
            }
            _ => {}
        }
        self.continue_as(param);
        lambda.body.clone()
    }

    /// Close the query so far with `select <element> into param`.
    fn continue_as(&mut self, param: &str) {
        debug!("continuation into {}", param);
        let value = self.element.to_expr(self.ids);
        self.clauses.push(QueryClause::SelectInto { value, var: param.to_string() });
        self.scope = vec![param.to_string()];
        self.element = Element::Var(param.to_string());
    }

    /// Read the record's fields through `let` clauses. Returns `None`, having
    /// emitted nothing, if some use of `param` cannot be resolved to a field.
    fn fuse(&mut self, mut record: Record, param: &str, body: &Expr, projection: bool) -> Option<Expr> {
        if !record.can_materialize(&self.scope, self.names.taken()) {
            trace!("record fields of {} clash with names in use", param);
            return None;
        }
        let lets = record.materialize();

        let members: HashSet<NodeId> = match (&body.unparenthesized().kind, projection) {
            (ExprKind::AnonymousObject(members), true) => members.iter().map(|m| m.value.id).collect(),
            _ => HashSet::new(),
        };

        let ids = self.ids;
        let mut resolved = true;
        let fused = rewrite(body, ids, &mut |e, shadowed| {
            let Some((root, path)) = member_path(e) else {
                return Visit::Descend;
            };
            if root != param || shadowed.iter().any(|s| s == param) {
                return Visit::Descend;
            }
            match record.resolve(&path) {
                Resolved::Var { name, consumed } if !shadowed.contains(&name) => {
                    Visit::Replace(with_fields(ids, ids.ident(&name), &path[consumed..]))
                }
                Resolved::Record(inner)
                    if members.contains(&e.id) && inner.var_names().iter().all(|v| !shadowed.iter().any(|s| s == v)) =>
                {
                    Visit::Replace(inner.to_anonymous(ids))
                }
                _ => {
                    resolved = false;
                    Visit::Descend
                }
            }
        });
        if !resolved {
            trace!("{} is used as a whole record", param);
            return None;
        }

        debug!("fused {} into {} let clauses", param, lets.len());
        for (name, value) in lets {
            self.clauses.push(QueryClause::Let { name: name.clone(), value });
            self.scope.push(name);
        }
        self.element = Element::Record(record);
        Some(fused.unwrap_or_else(|| body.clone()))
    }

    /// Rewrite `body` with `param` replaced by the current element and the
    /// names in `extra` replaced by their expressions. Never continues.
    ///
    /// Lambdas and other binders inside `body` that reuse a range variable
    /// or a name from a replacement are renamed.
    fn project(&mut self, param: &str, body: &Expr, extra: &HashMap<String, Expr>) -> Expr {
        let ids = self.ids;
        let mut record = match &self.element {
            Element::Record(record) => record.clone(),
            element => {
                let mut map = extra.clone();
                map.insert(param.to_string(), element.to_expr(ids));
                let names = &mut *self.names;
                return substitute_avoiding(body, &map, ids, &mut || names.fresh()).unwrap_or_else(|| body.clone());
            }
        };

        if !record.pending_names().is_empty() && record.can_materialize(&self.scope, self.names.taken()) {
            for (name, value) in record.materialize() {
                self.clauses.push(QueryClause::Let { name: name.clone(), value });
                self.scope.push(name);
            }
            self.element = Element::Record(record.clone());
        }
        let materialized = record.pending_names().is_empty();

        let mut avoid: HashSet<String> = self.scope.iter().cloned().collect();
        avoid.extend(names_in(&record.to_anonymous(ids)));
        avoid.extend(extra.values().flat_map(names_in));
        let names = &mut *self.names;
        let mut fresh = || names.fresh();
        let projected = rewrite_avoiding(body, ids, &avoid, &mut fresh, &mut |e, shadowed| {
            if let ExprKind::Ident(name) = &e.kind {
                if let Some(replacement) = extra.get(name).filter(|_| !shadowed.contains(name)) {
                    return Visit::Replace(replacement.clone());
                }
            }
            let Some((root, path)) = member_path(e) else {
                return Visit::Descend;
            };
            if root != param || shadowed.iter().any(|s| s == param) {
                return Visit::Descend;
            }
            let replacement = match record.resolve(&path) {
                Resolved::Var { name, consumed } if materialized => with_fields(ids, ids.ident(&name), &path[consumed..]),
                Resolved::Record(inner) if materialized => inner.to_anonymous(ids),
                _ => with_fields(ids, record.to_anonymous(ids), &path),
            };
            Visit::Replace(replacement)
        });
        projected.unwrap_or_else(|| body.clone())
    }

    /// `Cast<T> ()` after other operators: the query so far becomes the
    /// source of a new `from T x in (...)`.
    fn restart(&mut self, ty: Option<&str>, next: Option<&OperatorCall<'_>>) {
        let value = self.element.to_expr(self.ids);
        let mut clauses = mem::take(&mut self.clauses);
        clauses.push(QueryClause::Select(value));
        let inner = self.ids.expr(ExprKind::Query(clauses));

        let var = self.var_for(next);
        debug!("cast restarts the query as from {}", var);
        self.open(var, ty.map(str::to_string), inner);
    }

    fn join(&mut self, call: &OperatorCall<'_>) {
        let Some((inner, outer_key, inner_key, result)) = call.join_parts() else {
            return;
        };
        let outer = self.bind(&outer_key, false);

        let (left, right) = (result.params[0], result.params[1]);
        let mut var = inner_key.param().to_string();
        let captured = var != left && var != right && mentions(result.body, &var);
        if self.scope.contains(&var) || captured {
            var = self.names.fresh();
        }
        let inner_key_body = if var == inner_key.param() {
            inner_key.body.clone()
        } else {
            let map = HashMap::from([(inner_key.param().to_string(), self.ids.ident(&var))]);
            substitute_or_clone(inner_key.body, &map, self.ids)
        };

        let (ty, source) = self.join_source(inner);

        let into = match call.op {
            QueryOperator::GroupJoin => {
                let mut group = right.to_string();
                if self.scope.contains(&group) || group == var {
                    group = self.names.fresh();
                }
                Some(group)
            }
            _ => None,
        };
        let bound = into.clone().unwrap_or_else(|| var.clone());
        debug!("{} binds {}", call.op.name(), bound);

        self.clauses.push(QueryClause::Join {
            var,
            ty,
            source,
            outer_key: outer,
            inner_key: inner_key_body,
            into,
        });

        let extra = HashMap::from([(right.to_string(), self.ids.ident(&bound))]);
        let body = self.project(left, result.body, &extra);
        self.scope.push(bound);
        self.element = Element::from_projection(&body, &self.scope);
    }

    /// Type and source of a join. `S.Cast<T> ()` becomes `join T y in S`, and
    /// a chain in the source position is rewritten into its own query.
    fn join_source(&mut self, inner: &Expr) -> (Option<String>, Expr) {
        let (ty, source) = match recognize(inner) {
            Some(call) if call.op == QueryOperator::Cast => (call.type_argument.map(str::to_string), call.receiver),
            _ => (None, inner),
        };
        match decompose(source).filter(|_| !self.nested) {
            Some(chain) => {
                debug!("join source is a chain of {} operators", chain.calls.len());
                let query = Synthesizer::new(self.ids, self.names).nested(true).run(&chain);
                (ty, query)
            }
            None => (ty, source.clone()),
        }
    }
}

fn direction(op: QueryOperator) -> Direction {
    if op.is_descending() {
        Direction::Descending
    } else {
        Direction::Ascending
    }
}

/// `base.f1.f2...`
fn with_fields(ids: &IdGen, base: Expr, fields: &[&str]) -> Expr {
    fields.iter().fold(base, |object, field| {
        ids.expr(ExprKind::Field {
            object: Box::new(object),
            field: field.to_string(),
            null_conditional: false,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_names_skip_taken() {
        let mut names = Names::new(HashSet::from(["_1".to_string(), "_3".to_string()]));
        assert_eq!(names.fresh(), "_2");
        assert_eq!(names.fresh(), "_4");
        assert!(names.taken().contains("_4"));
    }
}
