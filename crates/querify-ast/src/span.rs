// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Byte spans and line/column conversion.

/// A byte range in the source code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    /// Span of a node that has no source text (built by a rewrite).
    pub const DUMMY: Span = Span { start: usize::MAX, end: usize::MAX };

    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn is_dummy(&self) -> bool {
        *self == Span::DUMMY
    }

    /// True if `offset` lies inside the span or touches either end.
    pub fn contains(&self, offset: usize) -> bool {
        !self.is_dummy() && self.start <= offset && offset <= self.end
    }

    /// The covered text, if the span is real and in bounds.
    pub fn text<'a>(&self, source: &'a str) -> Option<&'a str> {
        if self.is_dummy() {
            return None;
        }
        source.get(self.start..self.end)
    }
}

/// Line starts of a source, for mapping between offsets and editor positions.
#[derive(Debug, Clone)]
pub struct LineMap {
    /// Offset of each line's first byte; the first entry is 0.
    line_starts: Vec<u32>,
}

impl LineMap {
        pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0u32];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push((i + 1) as u32);
            }
        }
        LineMap { line_starts }
    }

    /// 1-based line and column of a byte offset.
    pub fn offset_to_line_col(&self, offset: usize) -> (u32, u32) {
        let offset = offset as u32;
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        let line = (line_idx + 1) as u32;
        let col = offset - self.line_starts[line_idx] + 1;
        (line, col)
    }

    /// Convert a 1-based (line, col) back to a byte offset.
    ///
    /// Returns `None` when the line does not exist. Columns past the end of
    /// the line clamp to the line end.
    pub fn line_col_to_offset(&self, source: &str, line: u32, col: u32) -> Option<usize> {
        let text = self.line_text(source, line)?;
        let start = self.line_starts[(line - 1) as usize] as usize;
        let col = (col.max(1) - 1) as usize;
        Some(start + col.min(text.len()))
    }

    /// Text of a 1-based line without its newline.
    pub fn line_text<'a>(&self, source: &'a str, line: u32) -> Option<&'a str> {
        let idx = (line as usize).checked_sub(1)?;
        let start = *self.line_starts.get(idx)? as usize;
        let end = self
            .line_starts
            .get(idx + 1)
            .map(|&s| (s as usize).saturating_sub(1))
            .unwrap_or(source.len());
        source.get(start..end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_source() {
        let lm = LineMap::new("");
        assert_eq!(lm.offset_to_line_col(0), (1, 1));
        assert_eq!(lm.line_text("", 1), Some(""));
    }

    #[test]
    fn multi_line() {
        let src = "abc\ndef\nghi";
        let lm = LineMap::new(src);
        assert_eq!(lm.offset_to_line_col(0), (1, 1));
        assert_eq!(lm.offset_to_line_col(4), (2, 1));
        assert_eq!(lm.offset_to_line_col(6), (2, 3));
        assert_eq!(lm.offset_to_line_col(8), (3, 1));

        assert_eq!(lm.line_text(src, 2), Some("def"));
        assert_eq!(lm.line_text(src, 4), None);
    }

    #[test]
    fn line_col_round_trip() {
        let src = "class C\n{\n\tvoid M () {}\n}";
        let lm = LineMap::new(src);
        let offset = lm.line_col_to_offset(src, 3, 7).unwrap();
        assert_eq!(&src[offset..offset + 1], "M");
        assert_eq!(lm.offset_to_line_col(offset), (3, 7));
        // Past the end of the line clamps
        assert_eq!(lm.line_col_to_offset(src, 2, 40), Some(9));
        assert_eq!(lm.line_col_to_offset(src, 9, 1), None);
    }

    #[test]
    fn dummy_span_contains_nothing() {
        assert!(!Span::DUMMY.contains(0));
        assert!(Span::new(3, 6).contains(3));
        assert!(Span::new(3, 6).contains(6));
        assert!(!Span::new(3, 6).contains(7));
        assert_eq!(Span::DUMMY.text("abc"), None);
        assert_eq!(Span::new(1, 3).text("abcd"), Some("bc"));
    }
}
