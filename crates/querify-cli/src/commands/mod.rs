// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! CLI command implementations.

pub mod action;
pub mod outline;
pub mod phase;

use querify_parser::{parse_source, ParsedSource};
use std::process;

use crate::{output, show_diagnostics};

/// Parse `source`, or report its syntax errors and exit.
pub fn parse_or_exit(source: &str, path: &str) -> ParsedSource {
    let parsed = parse_source(source);
    if !parsed.is_ok() {
        let shown = show_diagnostics(source, path, parsed.diagnostics());
        eprintln!("\n{}", output::banner_fail("Parse", shown));
        process::exit(1);
    }
    parsed
}
