//! Array blocks: one entry per line, every line but the last ends with `,`.
//!
//! The first line that breaks the grammar is demoted to plain text together
//! with every line after it, so a missing comma never silently merges or
//! splits entries.

use crate::text::{Position, Range, utf16_len};

use super::block::{ArrayEntry, ArrayItem, BlockContent, PlainTextLine};
use super::patterns::{match_array_entry, span_on_line};
use super::{BlockContext, ParsedBody};

/// One candidate entry line. `text` may be a prefix of the document line
/// when the closing bracket shares the line.
pub(super) struct EntryLine<'a> {
    pub(super) line: usize,
    pub(super) text: &'a str,
}

pub(super) fn parse(context: &BlockContext<'_>) -> Option<ParsedBody> {
    let document = context.document;
    let (close_line, close_offset) = (context.first_content_line()..document.line_count())
        .find_map(|line| {
            let text = document.line(line).unwrap_or_default();
            text.find(']').map(|offset| (line, offset))
        })?;

    let mut lines: Vec<EntryLine<'_>> = (context.first_content_line()..close_line)
        .map(|line| EntryLine {
            line,
            text: document.line(line).unwrap_or_default(),
        })
        .collect();

    let closing_text = document.line(close_line).unwrap_or_default();
    let prefix = &closing_text[..close_offset];
    if !prefix.trim().is_empty() {
        lines.push(EntryLine {
            line: close_line,
            text: prefix,
        });
    }

    Some(ParsedBody {
        close: Position::new(close_line as u32, utf16_len(prefix)),
        content: BlockContent::Array(parse_entry_lines(&lines)),
    })
}

pub(super) fn parse_entry_lines(lines: &[EntryLine<'_>]) -> Vec<ArrayItem> {
    let mut items = Vec::new();
    let mut valid = true;

    for (index, entry_line) in lines.iter().enumerate() {
        let last = index + 1 == lines.len();

        if valid {
            match match_array_entry(entry_line.text, last) {
                Some(("", _)) if last => continue,
                Some((entry, start)) if !entry.is_empty() => {
                    items.push(ArrayItem::Entry(ArrayEntry {
                        entry: entry.to_string(),
                        entry_range: span_on_line(
                            entry_line.line as u32,
                            entry_line.text,
                            start,
                            entry.len(),
                        ),
                    }));
                    continue;
                }
                _ => valid = false,
            }
        }

        items.push(ArrayItem::PlainText(PlainTextLine {
            text: entry_line.text.to_string(),
            range: Range::on_line(entry_line.line as u32, 0, utf16_len(entry_line.text)),
        }));
    }

    items
}

#[cfg(test)]
mod tests {
    use crate::config::BlockNameSettings;
    use crate::parser::{ArrayItem, BlockContent, ConfiguredBlockNames, parse};
    use crate::text::Range;

    fn items(text: &str) -> Vec<ArrayItem> {
        let names = ConfiguredBlockNames::from_settings(&BlockNameSettings::default());
        let parsed = parse(text, &names).unwrap();
        match &parsed.blocks[0].content {
            BlockContent::Array(items) => items.clone(),
            other => panic!("expected array, got {other:?}"),
        }
    }

    fn entries(items: &[ArrayItem]) -> Vec<&str> {
        items
            .iter()
            .filter_map(|item| match item {
                ArrayItem::Entry(entry) => Some(entry.entry.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn well_formed_entries_keep_original_columns() {
        let items = items("tags [\n  foo,\n    bar\n]");
        assert_eq!(entries(&items), vec!["foo", "bar"]);
        match &items[1] {
            ArrayItem::Entry(entry) => assert_eq!(entry.entry_range, Range::on_line(2, 4, 7)),
            other => panic!("expected entry, got {other:?}"),
        }
    }

    #[test]
    fn missing_comma_demotes_the_rest_of_the_block() {
        let items = items("tags [\n  foo,\n  bar\n  baz\n]");
        assert_eq!(entries(&items), vec!["foo"]);
        let demoted: Vec<_> = items
            .iter()
            .filter_map(|item| match item {
                ArrayItem::PlainText(line) => Some(line.text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(demoted, vec!["  bar", "  baz"]);
    }

    #[test]
    fn trailing_comma_on_last_line_is_demoted() {
        let items = items("tags [\n  foo,\n  bar,\n]");
        assert_eq!(entries(&items), vec!["foo"]);
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn blank_last_line_is_ignored() {
        let items = items("tags [\n  foo,\n\n]");
        assert_eq!(items.len(), 1);
        assert_eq!(entries(&items), vec!["foo"]);
    }

    #[test]
    fn entry_on_closing_line_is_parsed() {
        let items = items("tags [\n  foo,\n  bar ]");
        assert_eq!(entries(&items), vec!["foo", "bar"]);
    }

    #[test]
    fn missing_closing_bracket_is_not_a_block() {
        let names = ConfiguredBlockNames::from_settings(&BlockNameSettings::default());
        let parsed = parse("tags [\n  foo,\n", &names).unwrap();
        assert!(parsed.blocks.is_empty());
        assert_eq!(parsed.text_outside_of_blocks.len(), 1);
    }
}
