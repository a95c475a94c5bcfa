//! Line-indexed view over raw request-file text.
//!
//! Each line remembers the terminator it originally had so that slicing a
//! range reproduces the exact source bytes, even when LF and CRLF are mixed.

use super::position::{
    Position, Range, convert_byte_to_utf16_in_line, convert_utf16_to_byte_in_line, utf16_len,
};

/// Line terminator recorded for a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineBreak {
    Lf,
    CrLf,
    /// The last line of the document has no terminator.
    None,
}

impl LineBreak {
    pub fn as_str(self) -> &'static str {
        match self {
            LineBreak::Lf => "\n",
            LineBreak::CrLf => "\r\n",
            LineBreak::None => "",
        }
    }

    fn byte_len(self) -> usize {
        self.as_str().len()
    }
}

#[derive(Debug, Clone)]
struct Line {
    /// Byte offset of the first character of the line
    start: usize,
    /// Byte length of the content, terminator excluded
    len: usize,
    terminator: LineBreak,
}

/// Immutable text split into lines.
#[derive(Debug, Clone)]
pub struct LineDocument {
    text: String,
    lines: Vec<Line>,
}

impl LineDocument {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut lines = Vec::new();
        let mut start = 0;
        let bytes = text.as_bytes();

        for (index, byte) in bytes.iter().enumerate() {
            if *byte == b'\n' {
                let (len, terminator) = if index > start && bytes[index - 1] == b'\r' {
                    (index - 1 - start, LineBreak::CrLf)
                } else {
                    (index - start, LineBreak::Lf)
                };
                lines.push(Line {
                    start,
                    len,
                    terminator,
                });
                start = index + 1;
            }
        }
        lines.push(Line {
            start,
            len: text.len() - start,
            terminator: LineBreak::None,
        });

        Self { text, lines }
    }

    /// Number of lines; an empty document has one empty line.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Content of line `index` without its terminator.
    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines
            .get(index)
            .map(|line| &self.text[line.start..line.start + line.len])
    }

    pub fn line_break(&self, index: usize) -> Option<LineBreak> {
        self.lines.get(index).map(|line| line.terminator)
    }

    pub fn is_last_line(&self, index: usize) -> bool {
        index + 1 == self.lines.len()
    }

    /// Position just after the last character of line `index` (before its terminator).
    pub fn line_end(&self, index: usize) -> Position {
        let character = self.line(index).map(utf16_len).unwrap_or(0);
        Position::new(index as u32, character)
    }

    /// Range covering the content of line `index`.
    pub fn line_range(&self, index: usize) -> Range {
        Range::new(Position::new(index as u32, 0), self.line_end(index))
    }

    /// Position after the final character of the document.
    pub fn end_position(&self) -> Position {
        self.line_end(self.lines.len() - 1)
    }

    /// Whole document text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Exact substring spanned by `range`, line breaks included as they were.
    pub fn get_text(&self, range: Range) -> &str {
        let start = self.offset_at(range.start());
        let end = self.offset_at(range.end());
        &self.text[start..end]
    }

    /// Byte offset of `position`. Positions past a line's end clamp to the
    /// end of that line, lines past the document clamp to the document end.
    pub fn offset_at(&self, position: Position) -> usize {
        let Some(line) = self.lines.get(position.line as usize) else {
            return self.text.len();
        };
        let content = &self.text[line.start..line.start + line.len];
        let within = convert_utf16_to_byte_in_line(content, position.character as usize)
            .unwrap_or(line.len);
        line.start + within
    }

    /// Position of a byte offset. Offsets inside a line terminator map to
    /// the end of that line; offsets inside a character snap to its start.
    pub fn position_at(&self, offset: usize) -> Position {
        let offset = offset.min(self.text.len());
        let index = match self.lines.binary_search_by(|line| line.start.cmp(&offset)) {
            Ok(index) => index,
            Err(index) => index.saturating_sub(1),
        };
        let line = &self.lines[index];
        let within = (offset - line.start).min(line.len);
        let content = &self.text[line.start..line.start + line.len];

        let mut byte = within;
        let character = loop {
            if let Some(utf16) = convert_byte_to_utf16_in_line(content, byte) {
                break utf16;
            }
            byte -= 1;
        };
        Position::new(index as u32, character as u32)
    }

    /// Byte offset of the start of the line following `index`, or the end of the text.
    pub fn next_line_offset(&self, index: usize) -> usize {
        self.lines
            .get(index)
            .map(|line| line.start + line.len + line.terminator.byte_len())
            .unwrap_or(self.text.len())
    }
}
