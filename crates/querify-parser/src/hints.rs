// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Fix-it hints attached to parse errors.

use querify_ast::token::TokenKind;

/// Hint for "expected `expected`, found `found`", if one applies.
pub fn for_expected(expected: &str, found: &TokenKind) -> Option<&'static str> {
    match (expected, found) {
        // Statement terminator
        ("';'", TokenKind::RBrace) => Some("the last statement of a block still needs ';'"),
        ("';'", _) => Some("end statements with ';'"),

        // Block hints
        ("'{'", _) => Some("blocks start with '{'"),
        ("'}'", _) => Some("every '{' needs a matching '}'"),

        // Parentheses hints
        ("'('", _) => Some("method calls need parentheses"),
        ("')'", TokenKind::Eof) => Some("add ')' to close the parenthesis"),
        ("')'", _) => None,

        // Bracket hints
        ("']'", TokenKind::Eof) => Some("add ']' to close the bracket"),
        ("']'", _) => None,

        // Generic angle bracket
        ("'>'", _) => Some("close the type argument list with '>'"),

        // Expression hints
        ("expression", TokenKind::Eq) => Some("put the value after '='"),
        ("expression", TokenKind::Semi) => Some("statement is incomplete"),
        ("expression", _) => Some("try a value, variable, or method call"),

        // Name/identifier hints
        ("a name", TokenKind::Int(_)) => Some("names can't start with a number"),
        ("a name", TokenKind::Modifier(_)) | ("a name", TokenKind::Class) => {
            Some("keywords can be used as names with an '@' prefix")
        }
        ("a name", _) => Some("names start with a letter or '_'"),

        // Type hints
        ("type", _) => Some("try a type like 'int', 'string', or a class name"),

        // Query hints
        ("query clause", _) => Some("a query ends with 'select' or 'group ... by'"),
        ("'equals'", TokenKind::EqEq) => Some("join conditions use 'equals', not '=='"),
        ("'in'", _) => Some("range variables are introduced as 'from x in source'"),

        // Constructor initializer
        ("'base' or 'this'", _) => Some("constructor initializers call ': base (...)' or ': this (...)'"),

        _ => None,
    }
}
