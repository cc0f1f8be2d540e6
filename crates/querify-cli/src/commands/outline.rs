// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! `outline`: list the declarations of a file.

use querify_entities::{collect_entities, outline_json, outline_text};

use super::parse_or_exit;
use crate::{read_source, Format};

pub fn cmd_outline(path: &str, format: Format) {
    let source = read_source(path);
    let parsed = parse_or_exit(&source, path);
    let entities = collect_entities(&parsed.tree);

    match format {
        Format::Human => print!("{}", outline_text(&entities, &source)),
        Format::Json => println!("{}", outline_json(&entities)),
    }
}
