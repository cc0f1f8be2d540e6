// SPDX-License-Identifier: (MIT OR Apache-2.0)

/// Layout of rendered code.
#[derive(Debug, Clone)]
pub struct FormatConfig {
    /// One level of query clause indentation.
    pub indent_unit: String,
    /// `f (x)` rather than `f(x)`.
    pub space_before_parens: bool,
    /// `a [i]` rather than `a[i]`.
    pub space_before_brackets: bool,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            indent_unit: "\t".to_string(),
            space_before_parens: true,
            space_before_brackets: true,
        }
    }
}

impl FormatConfig {
    /// Indent with `width` spaces instead of tabs.
    pub fn with_spaces(width: usize) -> Self {
        Self { indent_unit: " ".repeat(width), ..Self::default() }
    }
}
