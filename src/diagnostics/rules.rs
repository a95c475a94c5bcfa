//! Built-in rules.

use std::collections::HashMap;

use crate::parser::{BlockContent, BlockKind, DictionaryItem};
use crate::text::{Position, Range, utf16_len};

use super::{Diagnostic, Rule, RuleContext, Severity};

pub const RULES: &[Rule] = &[
    duplicate_block,
    missing_required_block,
    text_outside_blocks,
    invalid_dictionary_line,
    invalid_array_entry,
    duplicate_key,
];

fn duplicate_block(context: &RuleContext<'_>) -> Vec<Diagnostic> {
    let mut first_seen: HashMap<&str, Range> = HashMap::new();
    let mut diagnostics = Vec::new();

    for block in context.blocks {
        match first_seen.get(block.name.as_str()) {
            Some(&first) => diagnostics.push(
                Diagnostic::new(
                    "duplicate-block",
                    Severity::Error,
                    block.name_range,
                    format!("Block '{}' is defined more than once", block.name),
                )
                .with_related(context.uri, first, "First definition"),
            ),
            None => {
                first_seen.insert(&block.name, block.name_range);
            }
        }
    }
    diagnostics
}

fn missing_required_block(context: &RuleContext<'_>) -> Vec<Diagnostic> {
    context
        .settings
        .required_blocks
        .iter()
        .filter(|name| !context.blocks.iter().any(|block| &block.name == *name))
        .map(|name| {
            Diagnostic::new(
                "missing-required-block",
                Severity::Error,
                Range::empty(Position::new(0, 0)),
                format!("Missing required block '{}'", name),
            )
        })
        .collect()
}

/// Non-blank lines between blocks that are not `#` comments.
fn text_outside_blocks(context: &RuleContext<'_>) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    for span in context.text_outside_of_blocks {
        let start = span.range.start();
        for (index, line) in span.text.split('\n').enumerate() {
            let line = line.strip_suffix('\r').unwrap_or(line);
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let base = if index == 0 { start.character } else { 0 };
            let leading = utf16_len(&line[..line.len() - line.trim_start().len()]);
            let first = base + leading;
            diagnostics.push(Diagnostic::new(
                "text-outside-blocks",
                Severity::Warning,
                Range::on_line(start.line + index as u32, first, first + utf16_len(trimmed)),
                "Text outside of blocks is ignored",
            ));
        }
    }
    diagnostics
}

fn invalid_dictionary_line(context: &RuleContext<'_>) -> Vec<Diagnostic> {
    invalid_lines(context, BlockKind::Dictionary, "invalid-dictionary-line", |name| {
        format!("Expected `key: value` in block '{}'", name)
    })
}

fn invalid_array_entry(context: &RuleContext<'_>) -> Vec<Diagnostic> {
    invalid_lines(context, BlockKind::Array, "invalid-array-entry", |name| {
        format!(
            "Invalid entry in block '{}'; every entry but the last must end with `,`",
            name
        )
    })
}

fn invalid_lines(
    context: &RuleContext<'_>,
    kind: BlockKind,
    code: &'static str,
    message: impl Fn(&str) -> String,
) -> Vec<Diagnostic> {
    context
        .blocks
        .iter()
        .filter(|block| block.kind() == kind)
        .flat_map(|block| {
            block
                .plain_text_lines()
                .into_iter()
                .filter(|line| !line.text.trim().is_empty())
                .map(|line| Diagnostic::new(code, Severity::Error, line.range, message(&block.name)))
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Keys prefixed with `~` are disabled and may repeat.
fn duplicate_key(context: &RuleContext<'_>) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    for block in context.blocks {
        let BlockContent::Dictionary(items) = &block.content else {
            continue;
        };
        let mut first_seen: HashMap<&str, Range> = HashMap::new();
        let keys = items.iter().filter_map(|item| match item {
            DictionaryItem::Field(field) => Some((field.key.as_str(), field.key_range)),
            DictionaryItem::ArrayField(field) => Some((field.key.as_str(), field.key_range)),
            DictionaryItem::PlainText(_) => None,
        });

        for (key, range) in keys {
            if key.starts_with('~') {
                continue;
            }
            match first_seen.get(key) {
                Some(&first) => diagnostics.push(
                    Diagnostic::new(
                        "duplicate-key",
                        Severity::Warning,
                        range,
                        format!("Key '{}' is repeated in block '{}'", key, block.name),
                    )
                    .with_related(context.uri, first, "First occurrence"),
                ),
                None => {
                    first_seen.insert(key, range);
                }
            }
        }
    }
    diagnostics
}
