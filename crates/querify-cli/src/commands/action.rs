// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! `actions` and `convert`: the query expression code action on files.

use querify_action::{convert, convert_with_config, find_applicable, ActionError};
use querify_ast::{LineMap, Span};
use querify_fmt::FormatConfig;
use serde::Serialize;
use std::fs;
use std::process;
use tracing::debug;

use super::parse_or_exit;
use crate::{output, read_source, show_diagnostics, Format};

/// One convertible chain, as listed by `actions`.
#[derive(Debug, Serialize)]
struct ActionEntry {
    line: u32,
    col: u32,
    /// Operator name of the outermost call
    call: Span,
    chain: Span,
    operators: Vec<&'static str>,
    parenthesize: bool,
    /// First clause of the converted query
    preview: String,
}

pub fn cmd_actions(path: &str, format: Format) {
    let source = read_source(path);
    parse_or_exit(&source, path);

    let lines = LineMap::new(&source);
    let entries: Vec<ActionEntry> = find_applicable(&source)
        .into_iter()
        .map(|site| {
            let (line, col) = lines.offset_to_line_col(site.call.start);
            let preview = match convert(&source, site.call.start) {
                Ok(edit) => first_clause(&edit.replacement),
                Err(e) => {
                    debug!("no preview for {}:{}: {}", line, col, e);
                    String::new()
                }
            };
            ActionEntry {
                line,
                col,
                call: site.call,
                chain: site.chain,
                operators: site.operators.iter().map(|op| op.name()).collect(),
                parenthesize: site.parenthesize,
                preview,
            }
        })
        .collect();

    match format {
        Format::Json => {
            let json = serde_json::to_string_pretty(&entries)
                .unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e));
            println!("{}", json);
        }
        Format::Human => {
            if entries.is_empty() {
                println!("No convertible chains in {}", output::file_path(path));
                return;
            }
            for entry in &entries {
                println!(
                    "{:>9}  {}  {}",
                    output::position(entry.line, entry.col).to_string(),
                    output::operators(&entry.operators.join(".")),
                    entry.preview
                );
            }
        }
    }
}

fn first_clause(replacement: &str) -> String {
    replacement
        .lines()
        .map(|l| l.trim().trim_start_matches('('))
        .find(|l| !l.is_empty())
        .unwrap_or_default()
        .to_string()
}

#[derive(Debug, Default)]
pub struct ConvertOpts {
    /// Rewrite the file instead of printing the result
    pub write: bool,
    pub indent: Option<String>,
}

pub fn cmd_convert(path: &str, position: &str, opts: &ConvertOpts) {
    let source = read_source(path);

    let config = match opts.indent.as_deref().map(indent_config).unwrap_or_else(|| Ok(FormatConfig::default())) {
        Ok(config) => config,
        Err(msg) => fail(&msg),
    };
    let Some(offset) = parse_position(&source, position) else {
        fail(&format!("invalid position `{}`: expected <line:col> or a byte offset", position));
    };

    match convert_with_config(&source, offset, &config) {
        Ok(edit) => {
            let converted = edit.apply(&source);
            if !opts.write {
                print!("{}", converted);
                return;
            }
            if let Err(e) = fs::write(path, &converted) {
                fail(&format!("writing {}: {}", path, e));
            }
            let (line, col) = LineMap::new(&source).offset_to_line_col(edit.span.start);
            println!("{} Converted {}:{}:{}", output::status_pass(), output::file_path(path), line, col);
        }
        Err(ActionError::Syntax { diagnostics }) => {
            let diags = diagnostics.iter().map(|d| (d.span, d.message.as_str(), d.hint.as_deref()));
            let shown = show_diagnostics(&source, path, diags);
            eprintln!("\n{}", output::banner_fail("Parse", shown));
            process::exit(1);
        }
        Err(e) => fail(&e.to_string()),
    }
}

fn fail(message: &str) -> ! {
    eprintln!("{}: {}", output::error_label(), message);
    process::exit(1);
}

/// `<line>:<col>` (1-based) or a byte offset.
fn parse_position(source: &str, position: &str) -> Option<usize> {
    match position.split_once(':') {
        Some((line, col)) => {
            let line: u32 = line.parse().ok()?;
            let col: u32 = col.parse().ok()?;
            LineMap::new(source).line_col_to_offset(source, line, col)
        }
        None => position.parse().ok().filter(|&offset| offset <= source.len()),
    }
}

fn indent_config(indent: &str) -> Result<FormatConfig, String> {
    if indent == "tab" {
        return Ok(FormatConfig::default());
    }
    match indent.parse::<usize>() {
        Ok(width) if width > 0 => Ok(FormatConfig::with_spaces(width)),
        _ => Err(format!("invalid indent `{}`: expected a number of spaces or `tab`", indent)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions() {
        let source = "ab\ncd\n";
        assert_eq!(parse_position(source, "2:2"), Some(4));
        assert_eq!(parse_position(source, "4"), Some(4));
        assert_eq!(parse_position(source, "9:1"), None);
        assert_eq!(parse_position(source, "99"), None);
        assert_eq!(parse_position(source, "x:1"), None);
    }

    #[test]
    fn indents() {
        assert_eq!(indent_config("tab").map(|c| c.indent_unit), Ok("\t".to_string()));
        assert_eq!(indent_config("4").map(|c| c.indent_unit), Ok("    ".to_string()));
        assert!(indent_config("0").is_err());
        assert!(indent_config("wide").is_err());
    }

    #[test]
    fn first_clause_skips_layout() {
        assert_eq!(first_clause("\n\tfrom t in xs\n\tselect t"), "from t in xs");
        assert_eq!(first_clause("(\n\tfrom t in xs\n\tselect t)"), "from t in xs");
    }
}
