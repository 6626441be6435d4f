//! Byte-offset to line/column conversion.
//!
//! The lexer works in byte offsets (`text_size::TextSize`); everything
//! above it works in line/column positions. A `LineIndex` is built once
//! per source text and converts between the two.

use text_size::{TextRange, TextSize};

use super::{Position, Range};

/// Maps byte offsets to 0-indexed line/column positions
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Byte offset of the start of each line
    line_starts: Vec<TextSize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![TextSize::new(0)];
        for (i, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(TextSize::new(i as u32 + 1));
            }
        }
        Self { line_starts }
    }

    /// Convert a byte offset to a position. Offsets past the last line
    /// start clamp to the final line.
    pub fn position(&self, offset: TextSize) -> Position {
        let line = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        let col = u32::from(offset) - u32::from(self.line_starts[line]);
        Position::new(line as u32, col)
    }

    /// Convert a byte range to a line/column range
    pub fn range(&self, range: TextRange) -> Range {
        Range::new(self.position(range.start()), self.position(range.end()))
    }

    /// Byte offset of a position; `None` when the line is out of range
    pub fn offset_of(&self, position: Position) -> Option<TextSize> {
        let start = self.line_starts.get(position.line as usize)?;
        Some(*start + TextSize::new(position.column))
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_across_lines() {
        let index = LineIndex::new("ab\ncd\n\nef");
        assert_eq!(index.position(TextSize::new(0)), Position::new(0, 0));
        assert_eq!(index.position(TextSize::new(2)), Position::new(0, 2));
        assert_eq!(index.position(TextSize::new(3)), Position::new(1, 0));
        assert_eq!(index.position(TextSize::new(6)), Position::new(2, 0));
        assert_eq!(index.position(TextSize::new(8)), Position::new(3, 1));
    }

    #[test]
    fn line_count_includes_trailing_line() {
        assert_eq!(LineIndex::new("a\nb").line_count(), 2);
        assert_eq!(LineIndex::new("a\n").line_count(), 2);
        assert_eq!(LineIndex::new("").line_count(), 1);
    }
}
