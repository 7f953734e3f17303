//! Offsets, spans, and line/character positions.
//!
//! The DOM works with byte offsets into the document text. Editors talk in
//! zero-based `(line, character)` positions where `character` counts UTF-16
//! code units. [`LineIndex`] converts between the two.

use crate::error::BadLocation;
use serde::{Deserialize, Serialize};

/// A half-open `[start, end)` byte range into the document text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// `start <= offset < end`.
    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    /// `start <= offset <= end`, used when the cursor may sit right after a token.
    pub fn touches(&self, offset: usize) -> bool {
        self.start <= offset && offset <= self.end
    }

    /// The slice of `text` covered by this span, or `""` when out of bounds.
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        text.get(self.start..self.end).unwrap_or_default()
    }
}

/// Zero-based line and character, as editors report the cursor.
///
/// Character offsets are measured in UTF-16 code units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.line
            .cmp(&other.line)
            .then(self.character.cmp(&other.character))
    }
}

/// A span of the text in editor coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Range {
    /// Inclusive.
    pub start: Position,
    /// Exclusive.
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// An empty range at `pos`, e.g. an insertion point.
    pub fn point(pos: Position) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.start <= pos && pos < self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// True when the two ranges share at least one position (touching counts).
    pub fn intersects(&self, other: &Range) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

/// Line-start index built once per parse.
///
/// Stores the byte offset of every `\n`, so both directions of conversion
/// are a binary search plus a scan of a single line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineIndex {
    line_breaks: Vec<usize>,
    total_length: usize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let line_breaks = memchr::memchr_iter(b'\n', text.as_bytes()).collect();
        Self {
            line_breaks,
            total_length: text.len(),
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_breaks.len() + 1
    }

    pub fn total_length(&self) -> usize {
        self.total_length
    }

    /// Byte offset of the first character of `line`.
    pub fn line_start(&self, line: usize) -> Option<usize> {
        match line {
            0 => Some(0),
            n => self.line_breaks.get(n - 1).map(|b| b + 1),
        }
    }

    /// Byte offset of the `\n` ending `line`, or the text length for the last line.
    pub fn line_end(&self, line: usize) -> Option<usize> {
        if line >= self.line_count() {
            return None;
        }
        Some(
            self.line_breaks
                .get(line)
                .copied()
                .unwrap_or(self.total_length),
        )
    }

    /// Zero-based line containing `offset`. A `\n` belongs to the line it ends.
    pub fn line_of(&self, offset: usize) -> usize {
        match self.line_breaks.binary_search(&offset) {
            Ok(idx) | Err(idx) => idx,
        }
    }

    /// Convert a byte offset to a line/character position.
    pub fn position_at(&self, text: &str, offset: usize) -> Result<Position, BadLocation> {
        if offset > self.total_length {
            return Err(BadLocation::OffsetOutOfRange {
                offset,
                length: self.total_length,
            });
        }
        if !text.is_char_boundary(offset) {
            return Err(BadLocation::NotCharBoundary { offset });
        }
        let line = self.line_of(offset);
        let line_start = self.line_start(line).unwrap_or(0);
        let character = text[line_start..offset].encode_utf16().count();
        Ok(Position::new(line as u32, character as u32))
    }

    /// Convert a line/character position to a byte offset.
    ///
    /// A character past the end of its line (or inside a surrogate pair) is
    /// rejected rather than clamped.
    pub fn offset_at(&self, text: &str, position: Position) -> Result<usize, BadLocation> {
        let line = position.line as usize;
        let (Some(start), Some(end)) = (self.line_start(line), self.line_end(line)) else {
            return Err(BadLocation::LineOutOfRange {
                line: position.line,
                line_count: self.line_count(),
            });
        };
        let out_of_range = BadLocation::CharacterOutOfRange {
            line: position.line,
            character: position.character,
        };
        let mut units = 0u32;
        for (idx, ch) in text[start..end].char_indices() {
            if units == position.character {
                return Ok(start + idx);
            }
            units += ch.len_utf16() as u32;
            if units > position.character {
                return Err(out_of_range);
            }
        }
        if units == position.character {
            Ok(end)
        } else {
            Err(out_of_range)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_ordering() {
        assert!(Position::new(0, 5) < Position::new(1, 0));
        assert!(Position::new(2, 1) < Position::new(2, 3));
        assert_eq!(Position::new(1, 1).cmp(&Position::new(1, 1)), std::cmp::Ordering::Equal);
    }

    #[test]
    fn test_range_contains() {
        let range = Range::new(Position::new(0, 2), Position::new(1, 0));
        assert!(range.contains(Position::new(0, 2)));
        assert!(range.contains(Position::new(0, 40)));
        assert!(!range.contains(Position::new(1, 0)));
        assert!(Range::point(Position::new(3, 3)).is_empty());
    }

    #[test]
    fn test_position_at_lines() {
        let text = "<a>\n  <b/>\n</a>";
        let index = LineIndex::new(text);
        assert_eq!(index.line_count(), 3);
        assert_eq!(index.position_at(text, 0).unwrap(), Position::new(0, 0));
        assert_eq!(index.position_at(text, 3).unwrap(), Position::new(0, 3));
        assert_eq!(index.position_at(text, 4).unwrap(), Position::new(1, 0));
        assert_eq!(index.position_at(text, 6).unwrap(), Position::new(1, 2));
        assert_eq!(
            index.position_at(text, text.len()).unwrap(),
            Position::new(2, 4)
        );
    }

    #[test]
    fn test_offset_at_round_trips() {
        let text = "<a>\r\n  <b/>\n</a>\n";
        let index = LineIndex::new(text);
        for offset in 0..=text.len() {
            let pos = index.position_at(text, offset).unwrap();
            assert_eq!(index.offset_at(text, pos).unwrap(), offset);
        }
    }

    #[test]
    fn test_utf16_columns() {
        // 'é' is two bytes and one UTF-16 unit, '😀' is four bytes and two units.
        let text = "<é a='😀x'/>";
        let index = LineIndex::new(text);
        let x = text.find('x').unwrap();
        assert_eq!(index.position_at(text, x).unwrap(), Position::new(0, 8));
        assert_eq!(index.offset_at(text, Position::new(0, 8)).unwrap(), x);
        assert!(matches!(
            index.offset_at(text, Position::new(0, 7)),
            Err(BadLocation::CharacterOutOfRange { .. })
        ));
    }

    #[test]
    fn test_bad_locations() {
        let text = "ab\ncd";
        let index = LineIndex::new(text);
        assert_eq!(
            index.offset_at(text, Position::new(2, 0)),
            Err(BadLocation::LineOutOfRange {
                line: 2,
                line_count: 2
            })
        );
        assert_eq!(
            index.offset_at(text, Position::new(0, 3)),
            Err(BadLocation::CharacterOutOfRange {
                line: 0,
                character: 3
            })
        );
        assert_eq!(
            index.position_at(text, 6),
            Err(BadLocation::OffsetOutOfRange {
                offset: 6,
                length: 5
            })
        );
    }

    #[test]
    fn test_not_char_boundary() {
        let text = "é";
        let index = LineIndex::new(text);
        assert_eq!(
            index.position_at(text, 1),
            Err(BadLocation::NotCharBoundary { offset: 1 })
        );
    }

    #[test]
    fn test_range_serializes_with_lsp_field_names() {
        let range = Range::new(Position::new(1, 2), Position::new(1, 4));
        assert_eq!(
            serde_json::to_value(range).unwrap(),
            serde_json::json!({
                "start": { "line": 1, "character": 2 },
                "end": { "line": 1, "character": 4 }
            })
        );
    }
}
