//! JSON body blocks.
//!
//! The end of a JSON block is taken as the last line consisting only of `}`
//! before the next block header, so a following block is never swallowed.
//! A JSON-aware bracket scan then has to agree that the text from the
//! opening bracket to that line is one balanced value. When it does not, the
//! two strategies disagree and parsing fails with
//! [`ParseError::JsonBlockEndMismatch`].

use crate::error::ParseError;
use crate::text::{Position, Range, utf16_len};

use super::block::BlockContent;
use super::patterns::is_block_start;
use super::{BlockContext, ParsedBody};

pub(super) fn parse(context: &BlockContext<'_>) -> Result<Option<ParsedBody>, ParseError> {
    let Some(close) = find_last_closing_line(context) else {
        return Ok(None);
    };

    let value_range = Range::new(
        context.open_bracket,
        Position::new(close.line, close.character + 1),
    );
    let candidate = context.document.get_text(value_range);
    if balanced_value_end(candidate) != Some(candidate.len() - 1) {
        return Err(ParseError::JsonBlockEndMismatch {
            block: context.name.to_string(),
            line: context.open_line as u32,
            closing_line: close.line,
        });
    }

    let text = context.document.get_text(context.content_range(close));
    Ok(Some(ParsedBody {
        close,
        content: BlockContent::Json(text.to_string()),
    }))
}

fn find_last_closing_line(context: &BlockContext<'_>) -> Option<Position> {
    let document = context.document;
    let limit = (context.first_content_line()..document.line_count())
        .find(|&line| is_block_start(document.line(line).unwrap_or_default()))
        .unwrap_or(document.line_count());

    (context.first_content_line()..limit).rev().find_map(|line| {
        let text = document.line(line).unwrap_or_default();
        (text.trim() == "}").then(|| {
            let offset = text.find('}').unwrap_or_default();
            Position::new(line as u32, utf16_len(&text[..offset]))
        })
    })
}

/// Byte offset at which the value opened by the first character of `text`
/// closes, honouring JSON string literals and escapes.
fn balanced_value_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(offset);
                }
            }
            _ => {}
        }
    }
    None
}
