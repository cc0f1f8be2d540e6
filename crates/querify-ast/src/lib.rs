// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Syntax tree types for the C#-like source language handled by querify.
//!
//! This crate defines the nodes shared between the lexer, parser, printer,
//! the query rewriting engine and the code action.

pub mod span;
pub mod token;
pub mod expr;
pub mod stmt;
pub mod decl;

pub use span::{Span, LineMap};

/// Unique identifier for syntax nodes.
///
/// Nodes built by rewriting passes use ids from a separate range so they
/// never collide with parser-assigned ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId(pub u32);

impl NodeId {
    pub const DUMMY: NodeId = NodeId(u32::MAX);
}
