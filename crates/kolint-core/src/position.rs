//! Offset to line/column mapping.
//!
//! The index is built from the rendered text of a tree. `\r\n`, `\n` and a
//! lone `\r` each count as a single line break. Columns are 1-based and count
//! characters, not bytes; content of multi-line strings and comments is
//! counted literally.

use serde::{Deserialize, Serialize};

/// A 1-based line and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LineColumn {
    /// Line number (1-indexed).
    pub line: usize,
    /// Column number (1-indexed, in characters).
    pub column: usize,
}

impl LineColumn {
    /// Creates a new line/column pair.
    #[must_use]
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl std::fmt::Display for LineColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Maps byte offsets of a text to line/column positions.
#[derive(Debug, Clone, Default)]
pub struct PositionIndex {
    text: String,
    /// Byte offset at which each line starts.
    line_starts: Vec<usize>,
    /// Byte offset at which each line's content ends (before the terminator).
    line_ends: Vec<usize>,
}

impl PositionIndex {
    /// Builds the index for `text`.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let bytes = text.as_bytes();
        let mut line_starts = vec![0];
        let mut line_ends = Vec::new();

        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'\r' if bytes.get(i + 1) == Some(&b'\n') => {
                    line_ends.push(i);
                    line_starts.push(i + 2);
                    i += 2;
                }
                b'\r' | b'\n' => {
                    line_ends.push(i);
                    line_starts.push(i + 1);
                    i += 1;
                }
                _ => i += 1,
            }
        }
        line_ends.push(bytes.len());

        Self {
            text,
            line_starts,
            line_ends,
        }
    }

    /// Returns the indexed text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the number of lines. An empty text has one (empty) line.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Returns the 1-based line containing `offset`.
    ///
    /// Offsets past the end map to the last line.
    #[must_use]
    pub fn line_of(&self, offset: usize) -> usize {
        let offset = offset.min(self.text.len());
        self.line_starts.partition_point(|&start| start <= offset)
    }

    /// Maps `offset` to a 1-based line and column.
    ///
    /// An offset equal to the text length maps to the column right after the
    /// last character.
    #[must_use]
    pub fn line_col(&self, offset: usize) -> LineColumn {
        let offset = offset.min(self.text.len());
        let line = self.line_of(offset);
        let start = self.line_starts[line - 1];
        let column = self
            .text
            .get(start..offset)
            .map_or(offset - start, |prefix| prefix.chars().count())
            + 1;
        LineColumn { line, column }
    }

    /// Returns the byte offset at which `line` (1-based) starts.
    #[must_use]
    pub fn line_start(&self, line: usize) -> usize {
        self.line_starts
            .get(line.saturating_sub(1))
            .copied()
            .unwrap_or(self.text.len())
    }

    /// Returns the byte offset at which the content of `line` ends, before its
    /// line terminator.
    #[must_use]
    pub fn line_end(&self, line: usize) -> usize {
        self.line_ends
            .get(line.saturating_sub(1))
            .copied()
            .unwrap_or(self.text.len())
    }

    /// Returns the content of `line` without its terminator.
    #[must_use]
    pub fn line_text(&self, line: usize) -> &str {
        self.text
            .get(self.line_start(line)..self.line_end(line))
            .unwrap_or("")
    }

    /// Maps a 1-based line and column back to a byte offset.
    #[must_use]
    pub fn offset_of(&self, position: LineColumn) -> Option<usize> {
        if position.line == 0 || position.line > self.line_count() || position.column == 0 {
            return None;
        }
        let start = self.line_start(position.line);
        let content = self.line_text(position.line);
        if position.column == content.chars().count() + 1 {
            return Some(start + content.len());
        }
        content
            .char_indices()
            .nth(position.column - 1)
            .map(|(i, _)| start + i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_offsets_on_lf_text() {
        let index = PositionIndex::new("ab\ncd\n");
        assert_eq!(index.line_count(), 3);
        assert_eq!(index.line_col(0), LineColumn::new(1, 1));
        assert_eq!(index.line_col(2), LineColumn::new(1, 3));
        assert_eq!(index.line_col(3), LineColumn::new(2, 1));
        assert_eq!(index.line_col(6), LineColumn::new(3, 1));
    }

    #[test]
    fn crlf_and_lone_cr_count_as_single_break() {
        let crlf = PositionIndex::new("ab\r\ncd");
        assert_eq!(crlf.line_count(), 2);
        assert_eq!(crlf.line_col(4), LineColumn::new(2, 1));
        assert_eq!(crlf.line_text(1), "ab");

        let cr = PositionIndex::new("ab\rcd");
        assert_eq!(cr.line_count(), 2);
        assert_eq!(cr.line_col(3), LineColumn::new(2, 1));
    }

    #[test]
    fn columns_count_characters() {
        let index = PositionIndex::new("val ä = \"ü\"");
        // 'ä' is two bytes; the '=' is the 7th character.
        let eq = index.text().find('=').unwrap();
        assert_eq!(index.line_col(eq), LineColumn::new(1, 7));
    }

    #[test]
    fn end_of_text_maps_after_last_char() {
        let index = PositionIndex::new("fun a() {\n}");
        assert_eq!(index.line_col(11), LineColumn::new(2, 2));
        assert_eq!(index.line_col(100), LineColumn::new(2, 2));
    }

    #[test]
    fn multi_line_string_content_is_counted_literally() {
        let index = PositionIndex::new("val s = \"\"\"\n\\n  x\n\"\"\"");
        let x = index.text().find('x').unwrap();
        assert_eq!(index.line_col(x), LineColumn::new(2, 5));
    }

    #[test]
    fn offset_of_round_trips_line_col() {
        let index = PositionIndex::new("a\r\nbc\nd");
        for offset in [0, 3, 4, 5, 6, 7] {
            let position = index.line_col(offset);
            assert_eq!(index.offset_of(position), Some(offset), "{position}");
        }
        assert_eq!(index.offset_of(LineColumn::new(9, 1)), None);
    }
}
