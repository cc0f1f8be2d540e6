// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! querify CLI - inspect sources and apply the query expression action.

mod commands;
mod help;
mod logging;
mod output;

use querify_ast::{LineMap, Span};
use std::env;
use std::fs;
use std::process;

/// Output format for commands that support `--json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Human,
    Json,
}

fn main() {
    output::init();

    let mut args: Vec<String> = env::args().collect();
    let verbose = take_flag(&mut args, &["-v", "--verbose"]);
    logging::init(verbose, output::colors_enabled());

    if args.len() < 2 {
        help::print_usage();
        return;
    }

    let format = if take_flag(&mut args, &["--json"]) { Format::Json } else { Format::Human };

    match args[1].as_str() {
        "lex" => {
            let path = required(&args, 2, "querify lex <file>");
            commands::phase::cmd_lex(path);
        }
        "parse" => {
            let path = required(&args, 2, "querify parse <file>");
            commands::phase::cmd_parse(path);
        }
        "actions" => {
            let path = required(&args, 2, "querify actions <file> [--json]");
            commands::action::cmd_actions(path, format);
        }
        "convert" => {
            let write = take_flag(&mut args, &["--write"]);
            let indent = take_option(&mut args, "--indent");
            let usage = "querify convert <file> <line:col|offset> [--write] [--indent N|tab]";
            let path = required(&args, 2, usage);
            let position = required(&args, 3, usage);
            let opts = commands::action::ConvertOpts { write, indent };
            commands::action::cmd_convert(path, position, &opts);
        }
        "outline" => {
            let path = required(&args, 2, "querify outline <file> [--json]");
            commands::outline::cmd_outline(path, format);
        }
        "help" | "--help" | "-h" => help::print_usage(),
        "version" | "--version" | "-V" => println!("querify {}", help::VERSION),
        other => {
            eprintln!("{}: unknown command: {}", output::error_label(), other);
            help::print_usage();
            process::exit(1);
        }
    }
}

/// Remove every occurrence of the given flags; true if any was present.
fn take_flag(args: &mut Vec<String>, names: &[&str]) -> bool {
    let before = args.len();
    args.retain(|a| !names.contains(&a.as_str()));
    args.len() != before
}

/// Remove `name <value>` and return the value.
fn take_option(args: &mut Vec<String>, name: &str) -> Option<String> {
    let idx = args.iter().position(|a| a == name)?;
    if idx + 1 >= args.len() {
        eprintln!("{}: {} needs a value", output::error_label(), name);
        process::exit(1);
    }
    let value = args.remove(idx + 1);
    args.remove(idx);
    Some(value)
}

fn required<'a>(args: &'a [String], idx: usize, usage: &str) -> &'a str {
    match args.get(idx) {
        Some(arg) => arg,
        None => {
            eprintln!("Usage: {}", usage);
            process::exit(1);
        }
    }
}

pub fn read_source(path: &str) -> String {
    match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}: reading {}: {}", output::error_label(), output::file_path(path), e);
            process::exit(1);
        }
    }
}

/// Print one diagnostic with its source line and a caret under the span.
pub fn show_error(source: &str, path: &str, span: Span, message: &str, hint: Option<&str>) {
    let lines = LineMap::new(source);
    let (line, col) = lines.offset_to_line_col(span.start);
    let text = lines.line_text(source, line).unwrap_or_default();
    let width = span.end.saturating_sub(span.start).min(text.len().saturating_sub(col as usize - 1));

    eprintln!();
    eprintln!("{}: {}", output::error_label(), message);
    eprintln!("  {} {}:{}:{}", output::error_arrow(), output::file_path(path), line, col);
    eprintln!("    {}", output::pipe());
    eprintln!("{} {} {}", output::line_number(line), output::pipe(), text);
    eprintln!("    {} {}{}", output::pipe(), " ".repeat(col as usize - 1), output::caret(width));

    if let Some(hint) = hint {
        eprintln!("    {}", output::pipe());
        eprintln!("    = {}: {}", output::hint_label(), hint);
    }
}

/// Show diagnostics, one per line, and return how many were shown.
pub fn show_diagnostics<'a, I>(source: &str, path: &str, diagnostics: I) -> usize
where
    I: IntoIterator<Item = (Span, &'a str, Option<&'a str>)>,
{
    let lines = LineMap::new(source);
    let mut last_line = None;
    let mut shown = 0;
    for (span, message, hint) in diagnostics {
        let (line, _) = lines.offset_to_line_col(span.start);
        if last_line != Some(line) {
            show_error(source, path, span, message, hint);
            shown += 1;
            last_line = Some(line);
        }
    }
    shown
}
