// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! What one element of the sequence is at a given point of the query.

use std::collections::HashSet;

use querify_ast::expr::{AnonymousMember, Expr, ExprKind};

use crate::subst::IdGen;

/// The current element of the sequence being built.
#[derive(Debug, Clone)]
pub enum Element {
    /// A range variable.
    Var(String),
    /// An anonymous object whose fields have not been projected yet.
    Record(Record),
    /// Any other projected value.
    Value(Expr),
}

/// Fields of a pending anonymous object, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct Record {
    pub fields: Vec<(String, Field)>,
}

#[derive(Debug, Clone)]
pub enum Field {
    /// Bound to a range variable.
    Var(String),
    /// A nested record (`new { h, three = ... }` where `h` was a record).
    Record(Record),
    /// An expression that becomes a `let` once the record is fused.
    Pending(Expr),
}

/// Outcome of following a member path into a record.
#[derive(Debug)]
pub enum Resolved<'r> {
    /// The path reaches a variable (or a pending field named after its `let`)
    /// after `consumed` steps.
    Var { name: String, consumed: usize },
    /// The path ends on a record.
    Record(&'r Record),
    /// A step names no field.
    Missing,
}

impl Element {
    /// The element as an expression over the range variables in scope.
    pub fn to_expr(&self, ids: &IdGen) -> Expr {
        match self {
            Element::Var(name) => ids.ident(name),
            Element::Record(record) => record.to_anonymous(ids),
            Element::Value(value) => value.clone(),
        }
    }

    /// Classify the body of a projection as the next element.
    pub fn from_projection(body: &Expr, scope: &[String]) -> Element {
        match &body.unparenthesized().kind {
            ExprKind::Ident(name) if scope.contains(name) => Element::Var(name.clone()),
            ExprKind::AnonymousObject(members) => match Record::from_members(members, scope) {
                Some(record) => Element::Record(record),
                None => Element::Value(body.clone()),
            },
            _ => Element::Value(body.clone()),
        }
    }
}

impl Record {
    /// Build a record from anonymous object members.
    ///
    /// Returns `None` when a member has no name or two members share one.
    pub fn from_members(members: &[AnonymousMember], scope: &[String]) -> Option<Record> {
        let mut fields: Vec<(String, Field)> = Vec::with_capacity(members.len());
        for member in members {
            let name = member.inferred_name()?.to_string();
            if fields.iter().any(|(existing, _)| *existing == name) {
                return None;
            }
            let field = match &member.value.unparenthesized().kind {
                ExprKind::Ident(var) if scope.contains(var) => Field::Var(var.clone()),
                ExprKind::AnonymousObject(inner) => match Record::from_members(inner, scope) {
                    Some(record) => Field::Record(record),
                    None => Field::Pending(member.value.clone()),
                },
                _ => Field::Pending(member.value.clone()),
            };
            fields.push((name, field));
        }
        Some(Record { fields })
    }

    fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|(field, _)| field == name).map(|(_, f)| f)
    }

    /// Follow `path` from this record. Pending fields resolve to their field
    /// name, the name their `let` will get.
    pub fn resolve(&self, path: &[&str]) -> Resolved<'_> {
        let mut record = self;
        for (i, step) in path.iter().enumerate() {
            match record.field(step) {
                Some(Field::Var(var)) => return Resolved::Var { name: var.clone(), consumed: i + 1 },
                Some(Field::Pending(_)) => return Resolved::Var { name: step.to_string(), consumed: i + 1 },
                Some(Field::Record(inner)) => record = inner,
                None => return Resolved::Missing,
            }
        }
        Resolved::Record(record)
    }

    /// Names of all pending fields, nested records first, in field order.
    pub fn pending_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_pending(&mut names);
        names
    }

    fn collect_pending<'r>(&'r self, names: &mut Vec<&'r str>) {
        for (name, field) in &self.fields {
            match field {
                Field::Pending(_) => names.push(name),
                Field::Record(inner) => inner.collect_pending(names),
                Field::Var(_) => {}
            }
        }
    }

    /// Range variables the record refers to, nested records included.
    pub fn var_names(&self) -> Vec<&str> {
        let mut vars = Vec::new();
        for (_, field) in &self.fields {
            match field {
                Field::Var(var) => vars.push(var.as_str()),
                Field::Record(inner) => vars.extend(inner.var_names()),
                Field::Pending(_) => {}
            }
        }
        vars
    }

    /// True if every pending field can become a `let` of its own name:
    /// names are distinct and clash neither with `taken` nor with range variables.
    pub fn can_materialize(&self, scope: &[String], taken: &HashSet<String>) -> bool {
        let names = self.pending_names();
        let mut seen = HashSet::new();
        names.iter().all(|name| seen.insert(*name) && !scope.iter().any(|s| s == name) && !taken.contains(*name))
    }

    /// Turn every pending field into a `let`, nested records first.
    /// Returns the `(name, value)` pairs in emission order.
    pub fn materialize(&mut self) -> Vec<(String, Expr)> {
        let mut lets = Vec::new();
        self.materialize_into(&mut lets);
        lets
    }

    fn materialize_into(&mut self, lets: &mut Vec<(String, Expr)>) {
        for (name, field) in &mut self.fields {
            match field {
                Field::Pending(value) => {
                    lets.push((name.clone(), value.clone()));
                    *field = Field::Var(name.clone());
                }
                Field::Record(inner) => inner.materialize_into(lets),
                Field::Var(_) => {}
            }
        }
    }

    /// Rebuild the anonymous object creation this record stands for.
    pub fn to_anonymous(&self, ids: &IdGen) -> Expr {
        let members = self
            .fields
            .iter()
            .map(|(name, field)| {
                let value = match field {
                    Field::Var(var) => ids.ident(var),
                    Field::Record(inner) => inner.to_anonymous(ids),
                    Field::Pending(value) => value.clone(),
                };
                let implied = AnonymousMember { name: None, value };
                if implied.inferred_name() == Some(name.as_str()) {
                    implied
                } else {
                    AnonymousMember { name: Some(name.clone()), value: implied.value }
                }
            })
            .collect();
        ids.expr(ExprKind::AnonymousObject(members))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use querify_fmt::print_expr;
    use querify_parser::parse_expression;

    fn record(src: &str, scope: &[&str]) -> Record {
        let expr = parse_expression(src).unwrap();
        let ExprKind::AnonymousObject(members) = &expr.kind else {
            panic!("Expected anonymous object");
        };
        let scope: Vec<String> = scope.iter().map(|s| s.to_string()).collect();
        Record::from_members(members, &scope).expect("record")
    }

    #[test]
    fn fields_classified() {
        let r = record("new { w, two = w * 2, nested = new { w } }", &["w"]);
        assert!(matches!(&r.fields[0], (n, Field::Var(v)) if n == "w" && v == "w"));
        assert!(matches!(&r.fields[1], (n, Field::Pending(_)) if n == "two"));
        assert!(matches!(&r.fields[2], (n, Field::Record(_)) if n == "nested"));
    }

    #[test]
    fn out_of_scope_names_are_pending() {
        let r = record("new { x }", &["w"]);
        assert!(matches!(&r.fields[0].1, Field::Pending(_)));
    }

    #[test]
    fn unnamed_members_are_not_records() {
        let expr = parse_expression("new { f (w) }").unwrap();
        let ExprKind::AnonymousObject(members) = &expr.kind else {
            panic!("Expected anonymous object");
        };
        assert!(Record::from_members(members, &["w".to_string()]).is_none());
    }

    #[test]
    fn resolve_paths() {
        let mut outer = record("new { h = new { w, two = w * 2 }, three = w * 3 }", &["w"]);
        assert!(matches!(outer.resolve(&["h", "w"]), Resolved::Var { name, consumed: 2 } if name == "w"));
        assert!(matches!(outer.resolve(&["h", "two", "Length"]), Resolved::Var { name, consumed: 2 } if name == "two"));
        assert!(matches!(outer.resolve(&["h"]), Resolved::Record(_)));
        assert!(matches!(outer.resolve(&["four"]), Resolved::Missing));

        assert_eq!(outer.pending_names(), vec!["two", "three"]);
        let lets = outer.materialize();
        assert_eq!(lets.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>(), vec!["two", "three"]);
        assert!(outer.pending_names().is_empty());
    }

    #[test]
    fn materialize_requires_fresh_names() {
        let r = record("new { w, two = w * 2 }", &["w"]);
        assert!(r.can_materialize(&["w".to_string()], &HashSet::new()));
        assert!(!r.can_materialize(&["w".to_string(), "two".to_string()], &HashSet::new()));
        assert!(!r.can_materialize(&["w".to_string()], &HashSet::from(["two".to_string()])));
    }

    #[test]
    fn rebuild_anonymous_object() {
        let src = "new { w, two = w * 2, t = w }";
        let r = record(src, &["w"]);
        let ids = IdGen::new();
        assert_eq!(print_expr(&r.to_anonymous(&ids), src), "new { w, two = w * 2, t = w }");
    }
}
