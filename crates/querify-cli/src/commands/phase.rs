// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Front end inspection commands: lex, parse.

use colored::Colorize;
use querify_lexer::Lexer;
use std::process;

use super::parse_or_exit;
use crate::{output, read_source, show_diagnostics};

pub fn cmd_lex(path: &str) {
    let source = read_source(path);
    let result = Lexer::new(&source).tokenize();

    if !result.is_ok() {
        let diags = result.errors.iter().map(|e| (e.span, e.message.as_str(), e.hint.as_deref()));
        let shown = show_diagnostics(&source, path, diags);
        eprintln!("\n{}", output::banner_fail("Lex", shown));
        process::exit(1);
    }

    println!("{} Tokens ({}) {}\n", "===".dimmed(), result.tokens.len(), "===".dimmed());
    for tok in &result.tokens {
        println!("{:4}:{:<3} {:?}", tok.span.start, tok.span.end, tok.kind);
    }
    println!("\n{}", output::banner_ok(&format!("Lex: {} tokens", result.tokens.len())));
}

pub fn cmd_parse(path: &str) {
    let source = read_source(path);
    let parsed = parse_or_exit(&source, path);

    for using in &parsed.tree.usings {
        println!("using {}", using.path);
    }
    for decl in &parsed.tree.members {
        println!("{:#?}", decl);
    }
    println!(
        "\n{}",
        output::banner_ok(&format!("Parse: {} declarations", parsed.tree.members.len()))
    );
}
