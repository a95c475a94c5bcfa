//! Formatting method for ReqfileLs.
//!
//! Dictionary and array bodies are re-indented to two spaces per level and
//! fields are normalised to `key: value`. Lines that did not parse are left
//! alone, and an entry keeps or lacks its trailing comma exactly as written.
//! A closing bracket sharing a line with the last entry stays on that line.

use tower_lsp_server::jsonrpc::Result;
use tower_lsp_server::ls_types::*;

use crate::intelligence::CodeIntelligence;
use crate::parser::{ArrayEntry, ArrayItem, BlockContent, DictionaryField, DictionaryItem, ParsedDocument};
use crate::text::{LineDocument, convert_utf16_to_byte_in_line};

use super::super::{ReqfileLs, uri_to_url};

const INDENT: &str = "  ";

fn field_line(field: &DictionaryField) -> String {
    if field.value.is_empty() {
        format!("{}{}:", INDENT, field.key)
    } else {
        format!("{}{}: {}", INDENT, field.key, field.value)
    }
}

/// Re-indent an entry line. Whatever follows the entry, a comma or a
/// closing bracket sharing the line, is kept.
fn entry_line(document: &LineDocument, entry: &ArrayEntry, depth: usize) -> Option<(usize, String)> {
    let line = entry.entry_range.start().line as usize;
    let text = document.line(line)?;
    let end = convert_utf16_to_byte_in_line(text, entry.entry_range.end().character as usize)?;
    let rest = text[end..].trim_end();
    let rest = if rest.trim_start().starts_with(',') {
        rest.trim_start()
    } else {
        rest
    };
    Some((line, format!("{}{}{}", INDENT.repeat(depth), entry.entry, rest)))
}

fn array_close_line(document: &LineDocument, key_line: usize) -> Option<usize> {
    (key_line + 1..document.line_count())
        .find(|&line| document.line(line).map(str::trim) == Some("]"))
}

/// Whole-line edits that normalise every dictionary and array block.
pub(crate) fn format_edits(text: &str, parsed: &ParsedDocument) -> Vec<TextEdit> {
    let document = LineDocument::new(text);
    let mut desired: Vec<(usize, String)> = Vec::new();

    for block in &parsed.blocks {
        match &block.content {
            BlockContent::Dictionary(items) => {
                for item in items {
                    match item {
                        DictionaryItem::Field(field) => {
                            desired.push((field.key_range.start().line as usize, field_line(field)));
                        }
                        DictionaryItem::ArrayField(field) => {
                            let key_line = field.key_range.start().line as usize;
                            desired.push((key_line, format!("{}{}: [", INDENT, field.key)));
                            desired.extend(
                                field
                                    .values
                                    .iter()
                                    .filter_map(|entry| entry_line(&document, entry, 2)),
                            );
                            if let Some(close) = array_close_line(&document, key_line) {
                                desired.push((close, format!("{}]", INDENT)));
                            }
                        }
                        DictionaryItem::PlainText(_) => {}
                    }
                }
            }
            BlockContent::Array(items) => {
                desired.extend(items.iter().filter_map(|item| match item {
                    ArrayItem::Entry(entry) => entry_line(&document, entry, 1),
                    ArrayItem::PlainText(_) => None,
                }));
            }
            _ => {}
        }
    }

    desired
        .into_iter()
        .filter_map(|(line, new_text)| {
            let current = document.line(line)?;
            (current != new_text)
                .then(|| TextEdit::new(document.line_range(line).into(), new_text))
        })
        .collect()
}

impl<C: CodeIntelligence> ReqfileLs<C> {
    pub(crate) async fn formatting_impl(
        &self,
        params: DocumentFormattingParams,
    ) -> Result<Option<Vec<TextEdit>>> {
        let Some(url) = uri_to_url(&params.text_document.uri) else {
            return Ok(None);
        };
        let Some(document) = self.documents.get(&url) else {
            return Ok(None);
        };
        let Some(parsed) = document.parsed() else {
            return Ok(None);
        };
        Ok(Some(format_edits(&document.text, parsed)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BlockNameSettings;
    use crate::parser::{ConfiguredBlockNames, parse};

    fn format(text: &str) -> (usize, String) {
        let parsed = parse(
            text,
            &ConfiguredBlockNames::from_settings(&BlockNameSettings::default()),
        )
        .unwrap();
        let edits = format_edits(text, &parsed);
        let mut lines: Vec<String> = text.split('\n').map(str::to_string).collect();
        for edit in &edits {
            assert_eq!(edit.range.start.line, edit.range.end.line);
            lines[edit.range.start.line as usize] = edit.new_text.clone();
        }
        (edits.len(), lines.join("\n"))
    }

    #[test]
    fn normalises_fields_and_entries() {
        let (count, formatted) = format(
            "headers {\nContent-Type:application/json\n    accept :  x\n  ok: fine\n}\n\ntags [\n foo,\n   bar\n]\n",
        );
        assert_eq!(count, 4);
        assert_eq!(
            formatted,
            "headers {\n  Content-Type: application/json\n  accept: x\n  ok: fine\n}\n\ntags [\n  foo,\n  bar\n]\n"
        );
    }

    #[test]
    fn array_valued_fields_nest_one_level_deeper() {
        let (_, formatted) = format("vars {\n ids: [\n a,\n      b\n   ]\n}\n");
        assert_eq!(formatted, "vars {\n  ids: [\n    a,\n    b\n  ]\n}\n");
    }

    #[test]
    fn closing_bracket_on_entry_line_is_kept() {
        let (count, formatted) = format("tags [\n  foo,\n    bar ]\n");
        assert_eq!(count, 1);
        assert_eq!(formatted, "tags [\n  foo,\n  bar ]\n");
    }

    #[test]
    fn space_before_comma_is_dropped() {
        let (_, formatted) = format("tags [\n  foo  ,\n  bar\n]\n");
        assert_eq!(formatted, "tags [\n  foo,\n  bar\n]\n");
    }

    #[test]
    fn code_and_unparsed_lines_are_untouched() {
        let text = "headers {\n      not a field\n}\n\ntests {\n      ok();\n}\n";
        let (count, formatted) = format(text);
        assert_eq!(count, 0);
        assert_eq!(formatted, text);
    }
}
