// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Rewrite errors.

use querify_ast::Span;
use thiserror::Error;

/// Why a chain could not be rewritten.
#[derive(Debug, Clone, Error)]
pub enum RewriteError {
    /// The root is not a call of a query operator in a supported shape.
    #[error("expression is not a query operator chain")]
    NotAChain { span: Span },
}

impl RewriteError {
    pub fn span(&self) -> Span {
        match self {
            RewriteError::NotAChain { span } => *span,
        }
    }
}
