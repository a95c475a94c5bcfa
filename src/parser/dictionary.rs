//! Dictionary blocks: `key: value` lines closed by a balancing `}`.
//!
//! Field lines are never inspected for brackets. Every other line,
//! block headers included, contributes its unescaped `{`/`}` to the depth count, and the line that
//! brings the depth back to zero closes the block.

use crate::text::{Position, Range, utf16_len};

use super::array::{EntryLine, parse_entry_lines};
use super::block::{
    ArrayItem, ArrayValuedField, BlockContent, DictionaryField, DictionaryItem, PlainTextLine,
};
use super::patterns::{is_block_start, match_field, span_on_line};
use super::{BlockContext, ParsedBody};

pub(super) fn parse(context: &BlockContext<'_>) -> Option<ParsedBody> {
    let document = context.document;
    let mut items = Vec::new();
    let mut depth: i64 = 1;
    let mut line = context.first_content_line();

    while line < document.line_count() {
        let text = document.line(line).unwrap_or_default();

        // A header line nests a block; it counts brackets like any non-field line
        if let Some(field) = match_field(text).filter(|_| !is_block_start(text)) {
            let key_range = span_on_line(line as u32, text, field.key_start, field.key.len());

            if field.value == "[" {
                if let Some(close_line) = find_array_value_end(context, line) {
                    push_array_field(context, &mut items, field.key, key_range, line, close_line);
                    line = close_line + 1;
                    continue;
                }
            }

            let value_range = if field.value.is_empty() {
                Range::empty(document.line_end(line))
            } else {
                span_on_line(line as u32, text, field.value_start, field.value.len())
            };
            items.push(DictionaryItem::Field(DictionaryField {
                key: field.key.to_string(),
                value: field.value.to_string(),
                key_range,
                value_range,
            }));
            line += 1;
            continue;
        }

        if let Some(close_offset) = closing_bracket_offset(text, &mut depth) {
            let close = Position::new(line as u32, utf16_len(&text[..close_offset]));
            let prefix = &text[..close_offset];
            if !prefix.trim().is_empty() {
                items.push(DictionaryItem::PlainText(PlainTextLine {
                    text: prefix.to_string(),
                    range: Range::new(Position::new(line as u32, 0), close),
                }));
            }
            return Some(ParsedBody {
                close,
                content: BlockContent::Dictionary(items),
            });
        }

        items.push(DictionaryItem::PlainText(PlainTextLine {
            text: text.to_string(),
            range: document.line_range(line),
        }));
        line += 1;
    }

    None
}

/// Update `depth` with the unescaped brackets of `text`; returns the byte
/// offset of the `}` that brings it to zero.
fn closing_bracket_offset(text: &str, depth: &mut i64) -> Option<usize> {
    let mut previous = None;
    for (offset, ch) in text.char_indices() {
        let escaped = previous == Some('\\');
        previous = Some(ch);
        if escaped {
            continue;
        }
        match ch {
            '{' => *depth += 1,
            '}' => {
                *depth -= 1;
                if *depth == 0 {
                    return Some(offset);
                }
            }
            _ => {}
        }
    }
    None
}

/// Line whose trimmed text is `]`, searched before any dictionary-closing line.
fn find_array_value_end(context: &BlockContext<'_>, key_line: usize) -> Option<usize> {
    let document = context.document;
    (key_line + 1..document.line_count())
        .map(|line| (line, document.line(line).unwrap_or_default().trim()))
        .take_while(|(_, text)| *text != "}")
        .find(|(_, text)| *text == "]")
        .map(|(line, _)| line)
}

fn push_array_field(
    context: &BlockContext<'_>,
    items: &mut Vec<DictionaryItem>,
    key: &str,
    key_range: Range,
    key_line: usize,
    close_line: usize,
) {
    let document = context.document;
    let lines: Vec<EntryLine<'_>> = (key_line + 1..close_line)
        .map(|line| EntryLine {
            line,
            text: document.line(line).unwrap_or_default(),
        })
        .collect();

    let mut values = Vec::new();
    let mut demoted = Vec::new();
    for item in parse_entry_lines(&lines) {
        match item {
            ArrayItem::Entry(entry) => values.push(entry),
            ArrayItem::PlainText(line) => demoted.push(DictionaryItem::PlainText(line)),
        }
    }

    items.push(DictionaryItem::ArrayField(ArrayValuedField {
        key: key.to_string(),
        key_range,
        values,
    }));
    items.extend(demoted);
}

#[cfg(test)]
mod tests {
    use crate::config::BlockNameSettings;
    use crate::parser::{BlockContent, ConfiguredBlockNames, DictionaryItem, parse};
    use crate::text::Range;

    fn items(text: &str) -> Vec<DictionaryItem> {
        let names = ConfiguredBlockNames::from_settings(&BlockNameSettings::default());
        let parsed = parse(text, &names).unwrap();
        match &parsed.blocks[0].content {
            BlockContent::Dictionary(items) => items.clone(),
            other => panic!("expected dictionary, got {other:?}"),
        }
    }

    #[test]
    fn non_field_lines_are_kept_as_plain_text() {
        let items = items("headers {\n  a: 1\n  not a field\n\n}");
        assert_eq!(items.len(), 3);
        match &items[1] {
            DictionaryItem::PlainText(line) => {
                assert_eq!(line.text, "  not a field");
                assert_eq!(line.range, Range::on_line(2, 0, 13));
            }
            other => panic!("expected plain text, got {other:?}"),
        }
        assert!(matches!(&items[2], DictionaryItem::PlainText(line) if line.text.is_empty()));
    }

    #[test]
    fn nested_brackets_on_non_field_lines_are_balanced() {
        let text = "auth {\n  inner {\n    k: v\n  }\n  mode: none\n}\nafter";
        let names = ConfiguredBlockNames::from_settings(&BlockNameSettings::default());
        let parsed = parse(text, &names).unwrap();
        assert_eq!(parsed.blocks.len(), 1);
        assert_eq!(parsed.blocks[0].range.end().line, 5);
        assert_eq!(parsed.blocks[0].field("mode").unwrap().value, "none");
    }

    #[test]
    fn block_header_lines_are_not_fields() {
        let text = "headers {\n  a: b\n\nbody:json {\n  {}\n}\n";
        let names = ConfiguredBlockNames::from_settings(&BlockNameSettings::default());
        let parsed = parse(text, &names).unwrap();
        assert!(parsed.blocks.is_empty());
        assert_eq!(parsed.text_outside_of_blocks.len(), 1);
        assert_eq!(parsed.text_outside_of_blocks[0].text, text);
    }

    #[test]
    fn brackets_inside_field_values_are_ignored() {
        let items = items("vars {\n  body: {\n  other: }\n}");
        assert_eq!(items.len(), 2);
        assert!(matches!(&items[0], DictionaryItem::Field(f) if f.value == "{"));
        assert!(matches!(&items[1], DictionaryItem::Field(f) if f.value == "}"));
    }

    #[test]
    fn escaped_brackets_do_not_count() {
        let items = items("headers {\n  \\}\n}");
        assert_eq!(items.len(), 1);
        assert!(matches!(&items[0], DictionaryItem::PlainText(line) if line.text == "  \\}"));
    }

    #[test]
    fn empty_value_gets_zero_width_range_at_line_end() {
        let items = items("headers {\n  token:\n}");
        match &items[0] {
            DictionaryItem::Field(field) => {
                assert_eq!(field.value, "");
                assert_eq!(field.value_range, Range::on_line(1, 8, 8));
            }
            other => panic!("expected field, got {other:?}"),
        }
    }

    #[test]
    fn array_valued_field_collects_entries() {
        let items = items("settings {\n  scopes: [\n    read,\n    write\n  ]\n  mode: x\n}");
        assert_eq!(items.len(), 2);
        match &items[0] {
            DictionaryItem::ArrayField(field) => {
                assert_eq!(field.key, "scopes");
                let values: Vec<_> = field.values.iter().map(|v| v.entry.as_str()).collect();
                assert_eq!(values, vec!["read", "write"]);
                assert_eq!(field.values[1].entry_range, Range::on_line(3, 4, 9));
            }
            other => panic!("expected array field, got {other:?}"),
        }
    }

    #[test]
    fn unclosed_array_value_falls_back_to_simple_field() {
        let items = items("settings {\n  scopes: [\n    read\n}");
        assert!(matches!(&items[0], DictionaryItem::Field(f) if f.value == "["));
    }
}
