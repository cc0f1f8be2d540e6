// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Declaration outline: unresolved entity summaries, each tagged with the
//! syntax node that declared it.

pub mod extract;
pub mod text;
pub mod types;

pub use extract::collect_entities;
pub use types::{DeclRef, Entity, EntityKind, ParamEntity};

/// Parse source and collect its entities. Declarations the parser recovered
/// from are still listed.
pub fn outline(source: &str) -> Vec<Entity> {
    let parsed = querify_parser::parse_source(source);
    collect_entities(&parsed.tree)
}

/// Serialize entities to JSON.
pub fn outline_json(entities: &[Entity]) -> String {
    serde_json::to_string_pretty(entities).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
}

/// Format entities as human-readable text.
pub fn outline_text(entities: &[Entity], source: &str) -> String {
    text::format_text(entities, source)
}
