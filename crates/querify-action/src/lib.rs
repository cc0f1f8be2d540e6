// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The "convert to query expression" code action.
//!
//! Given a source file and a caret offset on a query operator call, produce
//! the edit that replaces the whole chain with an equivalent query
//! expression.

mod locate;

use querify_ast::Span;
use querify_fmt::{print_expr_with_config, FormatConfig};
use querify_parser::{parse_source, ParsedSource};
use querify_rewrite::{decompose, rewrite_chain_avoiding, QueryOperator, RewriteContext, RewriteError};
use thiserror::Error;
use tracing::debug;

use crate::locate::{chain_sites, ChainSite, Slot};

/// A text replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub span: Span,
    pub replacement: String,
}

impl Edit {
    /// Apply to the source the edit was computed from.
    pub fn apply(&self, source: &str) -> String {
        let mut out = String::with_capacity(source.len() + self.replacement.len());
        out.push_str(&source[..self.span.start]);
        out.push_str(&self.replacement);
        out.push_str(&source[self.span.end..]);
        out
    }
}

/// A chain the action can be invoked on.
#[derive(Debug, Clone)]
pub struct ActionSite {
    /// Name of the outermost operator call
    pub call: Span,
    /// The expression the edit replaces
    pub chain: Span,
    /// Operators of the chain, in application order
    pub operators: Vec<QueryOperator>,
    /// Whether the query will be wrapped in parentheses
    pub parenthesize: bool,
}

/// A lexer or parser error reported by the action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub span: Span,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Error)]
pub enum ActionError {
    #[error("source has {} syntax error(s)", .diagnostics.len())]
    Syntax { diagnostics: Vec<Diagnostic> },

    #[error("no query operator chain at offset {offset}")]
    NotApplicable { offset: usize },

    #[error(transparent)]
    Rewrite(#[from] RewriteError),
}

fn parse_checked(source: &str) -> Result<ParsedSource, ActionError> {
    let parsed = parse_source(source);
    if parsed.is_ok() {
        return Ok(parsed);
    }
    let diagnostics = parsed
        .diagnostics()
        .into_iter()
        .map(|(span, message, hint)| Diagnostic {
            span,
            message: message.to_string(),
            hint: hint.map(str::to_string),
        })
        .collect();
    Err(ActionError::Syntax { diagnostics })
}

/// The site whose operator name contains `offset`, unless its chain is a
/// whole expression statement (a query is not a valid statement).
fn site_at<'s, 'a>(sites: &'s [ChainSite<'a>], offset: usize) -> Option<&'s ChainSite<'a>> {
    sites
        .iter()
        .find(|site| site.method_span.contains(offset))
        .filter(|site| site.slot != Slot::Statement)
}

/// True if the action applies at `offset`.
pub fn is_applicable(source: &str, offset: usize) -> bool {
    match parse_checked(source) {
        Ok(parsed) => site_at(&chain_sites(&parsed.tree), offset).is_some(),
        Err(_) => false,
    }
}

/// Convert the chain at `offset` with the default layout.
pub fn convert(source: &str, offset: usize) -> Result<Edit, ActionError> {
    convert_with_config(source, offset, &FormatConfig::default())
}

pub fn convert_with_config(source: &str, offset: usize, config: &FormatConfig) -> Result<Edit, ActionError> {
    let parsed = parse_checked(source)?;
    let sites = chain_sites(&parsed.tree);
    let site = site_at(&sites, offset).ok_or(ActionError::NotApplicable { offset })?;

    let ctx = RewriteContext {
        parenthesize: site.slot == Slot::Operand,
        nested: site.nested,
    };
    debug!(
        "converting chain at {}..{} (parenthesize: {}, nested: {})",
        site.root.span.start, site.root.span.end, ctx.parenthesize, ctx.nested
    );
    let query = rewrite_chain_avoiding(site.root, ctx, &site.member_names)?;
    Ok(Edit {
        span: site.root.span,
        replacement: print_expr_with_config(&query, source, config),
    })
}

/// Every chain in `source` the action applies to, in source order.
///
/// A source with syntax errors has none.
pub fn find_applicable(source: &str) -> Vec<ActionSite> {
    let parsed = match parse_checked(source) {
        Ok(parsed) => parsed,
        Err(err) => {
            debug!("no actions: {}", err);
            return Vec::new();
        }
    };
    chain_sites(&parsed.tree)
        .iter()
        .filter(|site| site.is_root() && site.slot != Slot::Statement)
        .map(|site| ActionSite {
            call: site.method_span,
            chain: site.root.span,
            operators: decompose(site.root)
                .map(|chain| chain.calls.iter().map(|call| call.op).collect())
                .unwrap_or_default(),
            parenthesize: site.slot == Slot::Operand,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edit_apply() {
        let edit = Edit { span: Span::new(4, 7), replacement: "xyz".to_string() };
        assert_eq!(edit.apply("var abc;"), "var xyz;");
    }

    #[test]
    fn syntax_errors_are_reported() {
        let err = convert("class C { void M () { var x = ; } }", 30).unwrap_err();
        let ActionError::Syntax { diagnostics } = err else {
            panic!("Expected syntax error");
        };
        assert!(!diagnostics.is_empty());
    }
}
