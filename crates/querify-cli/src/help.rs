// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Help text for CLI commands.

use crate::output;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn print_usage() {
    println!(
        "{} {} - Rewrite fluent query operator chains as query expressions",
        output::title("querify"),
        output::version(VERSION)
    );
    println!();
    println!(
        "{}: {} {} {}",
        output::section_header("Usage"),
        output::command("querify"),
        output::arg("<command>"),
        output::arg("[args]")
    );
    println!();
    println!("{}", output::section_header("Actions:"));
    println!("  {} {}            List chains that can be converted", output::command("actions"), output::arg("<file>"));
    println!(
        "  {} {} {} Convert the chain at a position",
        output::command("convert"),
        output::arg("<file>"),
        output::arg("<line:col|offset>")
    );
    println!("  {} {}            List declarations", output::command("outline"), output::arg("<file>"));

    println!();
    println!("{}", output::section_header("Front end:"));
    println!("  {} {}                Tokenize a file and print tokens", output::command("lex"), output::arg("<file>"));
    println!("  {} {}              Parse a file and report errors", output::command("parse"), output::arg("<file>"));

    println!();
    println!("  {}                      Show this help", output::command("help"));
    println!("  {}                   Show version", output::command("version"));

    println!();
    println!("{}", output::section_header("Options:"));
    println!("  {}             Output as structured JSON (actions, outline)", output::arg("--json"));
    println!("  {}            Rewrite the file in place (convert)", output::arg("--write"));
    println!("  {}   Indent query clauses with N spaces or a tab (convert)", output::arg("--indent <N|tab>"));
    println!("  {}        Debug logging (or set QUERIFY_LOG)", output::arg("-v, --verbose"));
}
