use serde::Serialize;
use tower_lsp_server::ls_types;

/// Zero-based (line, character) coordinate.
///
/// `character` counts UTF-16 code units, matching the LSP convention.
/// Ordering is lexicographic by line, then character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub const fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }

    /// Same position moved by `delta` lines, saturating at zero.
    pub fn with_line_offset(self, delta: i64) -> Self {
        let line = (self.line as i64).saturating_add(delta).clamp(0, u32::MAX as i64) as u32;
        Self { line, ..self }
    }
}

impl From<ls_types::Position> for Position {
    fn from(p: ls_types::Position) -> Self {
        Self::new(p.line, p.character)
    }
}

impl From<Position> for ls_types::Position {
    fn from(p: Position) -> Self {
        ls_types::Position::new(p.line, p.character)
    }
}

/// Half-open range between two positions, `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Range {
    start: Position,
    end: Position,
}

impl Range {
    /// Build a range; reversed endpoints are swapped so the invariant holds.
    pub fn new(start: Position, end: Position) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    /// Zero-width range at `position`.
    pub fn empty(position: Position) -> Self {
        Self {
            start: position,
            end: position,
        }
    }

    /// Range on a single line between two character columns.
    pub fn on_line(line: u32, start_character: u32, end_character: u32) -> Self {
        Self::new(
            Position::new(line, start_character),
            Position::new(line, end_character),
        )
    }

    pub fn start(&self) -> Position {
        self.start
    }

    pub fn end(&self) -> Position {
        self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Inclusive on both ends.
    pub fn contains(&self, position: Position) -> bool {
        self.start <= position && position <= self.end
    }

    pub fn contains_range(&self, other: &Range) -> bool {
        self.contains(other.start) && self.contains(other.end)
    }

    /// True when the two ranges share more than a touching endpoint.
    pub fn overlaps(&self, other: &Range) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl From<ls_types::Range> for Range {
    fn from(r: ls_types::Range) -> Self {
        Self::new(r.start.into(), r.end.into())
    }
}

impl From<Range> for ls_types::Range {
    fn from(r: Range) -> Self {
        ls_types::Range::new(r.start.into(), r.end.into())
    }
}

/// Convert UTF-16 position to byte position within a line
/// Returns None if the UTF-16 position is beyond the end of the line
#[inline(always)]
pub fn convert_utf16_to_byte_in_line(line_text: &str, utf16_pos: usize) -> Option<usize> {
    let mut byte_offset = 0;
    let mut utf16_offset = 0;

    for ch in line_text.chars() {
        if utf16_offset >= utf16_pos {
            return Some(byte_offset);
        }
        utf16_offset += ch.len_utf16();
        byte_offset += ch.len_utf8();
    }

    if utf16_offset == utf16_pos {
        Some(byte_offset)
    } else {
        None
    }
}

/// Convert byte position to UTF-16 position within a line
/// Returns None if the byte position is in the middle of a character or past the line end
#[inline(always)]
pub fn convert_byte_to_utf16_in_line(line_text: &str, byte_pos: usize) -> Option<usize> {
    let mut utf16_offset = 0;
    let mut byte_count = 0;

    for ch in line_text.chars() {
        if byte_count == byte_pos {
            return Some(utf16_offset);
        }
        let ch_bytes = ch.len_utf8();
        if byte_count + ch_bytes > byte_pos {
            return None;
        }
        byte_count += ch_bytes;
        utf16_offset += ch.len_utf16();
    }

    if byte_count == byte_pos {
        Some(utf16_offset)
    } else {
        None
    }
}

/// Length of a string in UTF-16 code units.
pub fn utf16_len(text: &str) -> u32 {
    text.chars().map(char::len_utf16).sum::<usize>() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_order_by_line_then_character() {
        assert!(Position::new(0, 10) < Position::new(1, 0));
        assert!(Position::new(2, 1) < Position::new(2, 3));
        assert_eq!(Position::new(4, 4), Position::new(4, 4));
    }

    #[test]
    fn range_new_never_stores_reversed_endpoints() {
        let range = Range::new(Position::new(3, 0), Position::new(1, 2));
        assert_eq!(range.start(), Position::new(1, 2));
        assert_eq!(range.end(), Position::new(3, 0));
    }

    #[test]
    fn contains_is_inclusive_on_both_ends() {
        let range = Range::on_line(1, 2, 5);
        assert!(range.contains(Position::new(1, 2)));
        assert!(range.contains(Position::new(1, 5)));
        assert!(!range.contains(Position::new(1, 6)));
        assert!(!range.contains(Position::new(0, 3)));
    }

    #[test]
    fn touching_ranges_do_not_overlap() {
        let a = Range::on_line(0, 0, 4);
        let b = Range::on_line(0, 4, 8);
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&Range::on_line(0, 3, 6)));
    }

    #[test]
    fn utf16_conversion_handles_surrogate_pairs() {
        let line = "a😀b";
        assert_eq!(convert_utf16_to_byte_in_line(line, 1), Some(1));
        assert_eq!(convert_utf16_to_byte_in_line(line, 3), Some(5));
        assert_eq!(convert_byte_to_utf16_in_line(line, 5), Some(3));
        assert_eq!(convert_byte_to_utf16_in_line(line, 2), None);
        assert_eq!(utf16_len(line), 4);
    }

    #[test]
    fn line_offset_saturates_at_zero() {
        assert_eq!(Position::new(2, 7).with_line_offset(-5), Position::new(0, 7));
        assert_eq!(Position::new(2, 7).with_line_offset(3), Position::new(5, 7));
    }
}
