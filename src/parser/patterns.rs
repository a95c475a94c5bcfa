//! Line grammars of the request-file format.

use std::sync::LazyLock;

use regex::Regex;

use crate::text::{Range, utf16_len};

/// `name {` or `name [`, where the name may contain `:` or `-` separators.
static BLOCK_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z0-9_-]+(?::[A-Za-z0-9_-]+)*)\s*([\{\[])\s*$")
        .expect("block start pattern is valid")
});

static DICTIONARY_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\S+)\s*:\s*(.*)$").expect("field pattern is valid"));

static ARRAY_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z0-9_.\-]*)\s*,$").expect("array entry pattern is valid")
});

static LAST_ARRAY_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z0-9_.\-]*)\s*$").expect("last array entry pattern is valid")
});

/// A recognised block header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BlockStart<'a> {
    pub(crate) name: &'a str,
    pub(crate) bracket: char,
    /// Byte offset of the name within the line
    pub(crate) name_start: usize,
    /// Byte offset of the opening bracket (last occurrence on the line)
    pub(crate) bracket_offset: usize,
}

pub(crate) fn match_block_start(line: &str) -> Option<BlockStart<'_>> {
    let captures = BLOCK_START.captures(line)?;
    let name = captures.get(1)?.as_str();
    let bracket = captures.get(2)?.as_str().chars().next()?;
    Some(BlockStart {
        name,
        bracket,
        name_start: line.find(name)?,
        bracket_offset: line.rfind(bracket)?,
    })
}

pub(crate) fn is_block_start(line: &str) -> bool {
    BLOCK_START.is_match(line)
}

/// A `key: value` line with byte offsets of both parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FieldMatch<'a> {
    pub(crate) key: &'a str,
    pub(crate) key_start: usize,
    /// Value with trailing whitespace removed
    pub(crate) value: &'a str,
    pub(crate) value_start: usize,
}

pub(crate) fn match_field(line: &str) -> Option<FieldMatch<'_>> {
    let captures = DICTIONARY_FIELD.captures(line)?;
    let key = captures.get(1)?;
    let value = captures.get(2)?;
    Some(FieldMatch {
        key: key.as_str(),
        key_start: key.start(),
        value: value.as_str().trim_end(),
        value_start: value.start(),
    })
}

/// Entry text and its byte offset; `last` selects the no-trailing-comma form.
pub(crate) fn match_array_entry(line: &str, last: bool) -> Option<(&str, usize)> {
    let pattern = if last { &LAST_ARRAY_ENTRY } else { &ARRAY_ENTRY };
    let entry = pattern.captures(line)?.get(1)?;
    Some((entry.as_str(), entry.start()))
}

/// Range of `len` bytes starting at byte `start` on `line_text`, in UTF-16 columns.
pub(crate) fn span_on_line(line: u32, line_text: &str, start: usize, len: usize) -> Range {
    let start_character = utf16_len(&line_text[..start]);
    let end_character = start_character + utf16_len(&line_text[start..start + len]);
    Range::on_line(line, start_character, end_character)
}
