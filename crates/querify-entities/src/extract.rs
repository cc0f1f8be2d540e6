// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Extract entities from a parsed syntax tree.

use querify_ast::decl::*;

use crate::types::*;

/// Every entity declared in `tree`, in declaration order. Types come before
/// their members; accessors and attributes are nested in their owner.
pub fn collect_entities(tree: &SyntaxTree) -> Vec<Entity> {
    let mut entities = Vec::new();
    for decl in &tree.members {
        collect_decl(decl, None, &mut entities);
    }
    entities
}

fn decl_ref(decl: &Decl) -> DeclRef {
    DeclRef { id: decl.id, span: decl.span }
}

fn qualify(parent: Option<&str>, name: &str) -> String {
    match parent {
        Some(parent) => format!("{}.{}", parent, name),
        None => name.to_string(),
    }
}

fn collect_decl(decl: &Decl, parent: Option<&str>, out: &mut Vec<Entity>) {
    match &decl.kind {
        DeclKind::Namespace(ns) => {
            let path = qualify(parent, &ns.name);
            for member in &ns.members {
                collect_decl(member, Some(&path), out);
            }
        }
        DeclKind::Type(ty) => {
            let kind = match ty.kind {
                TypeKind::Class => EntityKind::Class,
                TypeKind::Struct => EntityKind::Struct,
                TypeKind::Interface => EntityKind::Interface,
                TypeKind::Enum => EntityKind::Enum,
            };
            out.push(entity(decl, kind, &ty.name, parent));
            let path = qualify(parent, &ty.name);
            for member in &ty.members {
                collect_decl(member, Some(&path), out);
            }
        }
        DeclKind::Field(field) => {
            // One entity per declarator, all tagged with the declaration
            for var in &field.vars {
                let mut e = entity(decl, EntityKind::Field, &var.name, parent);
                e.ty = Some(field.ty.clone());
                out.push(e);
            }
        }
        DeclKind::Event(event) => {
            for var in &event.vars {
                let mut e = entity(decl, EntityKind::Event, &var.name, parent);
                e.ty = Some(event.ty.clone());
                out.push(e);
            }
        }
        DeclKind::Method(method) => {
            let mut e = entity(decl, EntityKind::Method, &method.name, parent);
            e.ty = Some(method.return_ty.clone());
            e.params = params(&method.params);
            out.push(e);
        }
        DeclKind::Constructor(ctor) => {
            let mut e = entity(decl, EntityKind::Constructor, &ctor.name, parent);
            e.params = params(&ctor.params);
            out.push(e);
        }
        DeclKind::Operator(op) => {
            let mut e = entity(decl, EntityKind::Operator, &op.metadata_name(), parent);
            e.ty = Some(op.return_ty.clone());
            e.params = params(&op.params);
            out.push(e);
        }
        DeclKind::Property(prop) => {
            let mut e = entity(decl, EntityKind::Property, &prop.name, parent);
            e.ty = Some(prop.ty.clone());
            e.accessors = accessors(&prop.accessors, &prop.name);
            out.push(e);
        }
        DeclKind::Indexer(indexer) => {
            let mut e = entity(decl, EntityKind::Indexer, "Item", parent);
            e.ty = Some(indexer.ty.clone());
            e.params = params(&indexer.params);
            e.accessors = accessors(&indexer.accessors, "Item");
            out.push(e);
        }
        DeclKind::CustomEvent(event) => {
            let mut e = entity(decl, EntityKind::CustomEvent, &event.name, parent);
            e.ty = Some(event.ty.clone());
            e.accessors = accessors(&event.accessors, &event.name);
            out.push(e);
        }
        DeclKind::EnumMember(member) => {
            out.push(entity(decl, EntityKind::EnumMember, &member.name, parent));
        }
    }
}

fn entity(decl: &Decl, kind: EntityKind, name: &str, parent: Option<&str>) -> Entity {
    let mut e = Entity::new(kind, name, decl_ref(decl));
    e.parent = parent.map(str::to_string);
    e.modifiers = decl.modifiers.iter().map(|m| m.as_str().to_string()).collect();
    e.attributes = attributes(&decl.attributes);
    e
}

fn attributes(attrs: &[Attribute]) -> Vec<Entity> {
    attrs
        .iter()
        .map(|attr| Entity::new(EntityKind::Attribute, attr.name.clone(), DeclRef { id: attr.id, span: attr.span }))
        .collect()
}

/// Accessors are named like their metadata methods: `get_Count`, `add_Changed`.
fn accessors(accessors: &[Accessor], owner: &str) -> Vec<Entity> {
    accessors
        .iter()
        .map(|acc| {
            let name = format!("{}_{}", acc.kind.keyword(), owner);
            let mut e = Entity::new(EntityKind::Accessor, name, DeclRef { id: acc.id, span: acc.span });
            e.modifiers = acc.modifiers.iter().map(|m| m.as_str().to_string()).collect();
            e.attributes = attributes(&acc.attributes);
            e
        })
        .collect()
}

fn params(params: &[Param]) -> Vec<ParamEntity> {
    params
        .iter()
        .map(|p| ParamEntity { name: p.name.clone(), ty: p.ty.clone() })
        .collect()
}
