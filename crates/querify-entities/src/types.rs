// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Output types for the declaration outline.

use querify_ast::{NodeId, Span};
use serde::Serialize;

/// Back-reference to the syntax node an entity was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeclRef {
    pub id: NodeId,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Class,
    Struct,
    Interface,
    Enum,
    Field,
    Method,
    Operator,
    Constructor,
    Property,
    Indexer,
    Accessor,
    EnumMember,
    /// Field-like event
    Event,
    /// Event with `add`/`remove` accessors
    CustomEvent,
    Attribute,
}

impl EntityKind {
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Class => "class",
            EntityKind::Struct => "struct",
            EntityKind::Interface => "interface",
            EntityKind::Enum => "enum",
            EntityKind::Field => "field",
            EntityKind::Method => "method",
            EntityKind::Operator => "operator",
            EntityKind::Constructor => "constructor",
            EntityKind::Property => "property",
            EntityKind::Indexer => "indexer",
            EntityKind::Accessor => "accessor",
            EntityKind::EnumMember => "enum member",
            EntityKind::Event => "event",
            EntityKind::CustomEvent => "event",
            EntityKind::Attribute => "attribute",
        }
    }
}

/// An unresolved entity: what a declaration declares, before any name
/// resolution.
#[derive(Debug, Clone, Serialize)]
pub struct Entity {
    pub kind: EntityKind,
    pub name: String,
    /// Full name of the declaring type or namespace
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Field, property or return type
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub ty: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub modifiers: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<ParamEntity>,
    /// Getter, setter, `add` and `remove` accessors
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub accessors: Vec<Entity>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Entity>,
    pub decl: DeclRef,
}

impl Entity {
    pub fn new(kind: EntityKind, name: impl Into<String>, decl: DeclRef) -> Self {
        Self {
            kind,
            name: name.into(),
            parent: None,
            ty: None,
            modifiers: Vec::new(),
            params: Vec::new(),
            accessors: Vec::new(),
            attributes: Vec::new(),
            decl,
        }
    }

    /// `Parent.Name`, or just the name at the top level.
    pub fn full_name(&self) -> String {
        match &self.parent {
            Some(parent) => format!("{}.{}", parent, self.name),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ParamEntity {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}
