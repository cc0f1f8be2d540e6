// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Human-readable text output for the outline.

use querify_ast::LineMap;

use crate::types::*;

/// One line per entity: position, kind, full name and type. Accessors and
/// attributes are indented under their owner.
pub fn format_text(entities: &[Entity], source: &str) -> String {
    let lines = LineMap::new(source);
    let mut out = String::new();
    for entity in entities {
        format_entity(&mut out, entity, &lines, 0);
    }
    out
}

fn format_entity(out: &mut String, e: &Entity, lines: &LineMap, indent: usize) {
    let (line, col) = lines.offset_to_line_col(e.decl.span.start);
    out.push_str(&format!("{:>4}:{:<3} {}", line, col, "  ".repeat(indent)));
    for modifier in &e.modifiers {
        out.push_str(modifier);
        out.push(' ');
    }
    out.push_str(e.kind.label());
    out.push(' ');
    out.push_str(&e.full_name());
    if !e.params.is_empty() || matches!(e.kind, EntityKind::Method | EntityKind::Constructor | EntityKind::Operator) {
        let params: Vec<String> = e.params.iter().map(|p| format!("{} {}", p.ty, p.name)).collect();
        out.push_str(&format!(" ({})", params.join(", ")));
    }
    if let Some(ty) = &e.ty {
        out.push_str(&format!(": {}", ty));
    }
    out.push('\n');

    for attr in &e.attributes {
        format_entity(out, attr, lines, indent + 1);
    }
    for accessor in &e.accessors {
        format_entity(out, accessor, lines, indent + 1);
    }
}
