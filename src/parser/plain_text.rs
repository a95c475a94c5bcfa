//! Free-form text blocks, closed by a line that is exactly `}`.

use crate::text::{Position, utf16_len};

use super::block::BlockContent;
use super::{BlockContext, ParsedBody};

pub(super) fn parse(context: &BlockContext<'_>) -> Option<ParsedBody> {
    let close = find_closing_line(context)?;
    let text = context.document.get_text(context.content_range(close));
    Some(ParsedBody {
        close,
        content: BlockContent::PlainText(text.to_string()),
    })
}

/// Position of the `}` on the first line consisting only of that bracket.
pub(super) fn find_closing_line(context: &BlockContext<'_>) -> Option<Position> {
    let document = context.document;
    (context.first_content_line()..document.line_count()).find_map(|line| {
        let text = document.line(line).unwrap_or_default();
        (text.trim() == "}").then(|| {
            let offset = text.find('}').unwrap_or_default();
            Position::new(line as u32, utf16_len(&text[..offset]))
        })
    })
}

#[cfg(test)]
mod tests {
    use crate::config::BlockNameSettings;
    use crate::parser::{ConfiguredBlockNames, parse};

    #[test]
    fn content_is_verbatim_including_brackets_inside() {
        let names = ConfiguredBlockNames::from_settings(&BlockNameSettings::default());
        let text = "docs {\n  # Title\n  { not a block }\n  }x\n}\n";
        let parsed = parse(text, &names).unwrap();
        assert_eq!(parsed.blocks.len(), 1);
        assert_eq!(
            parsed.blocks[0].text(),
            Some("  # Title\n  { not a block }\n  }x")
        );
    }

    #[test]
    fn indented_closing_bracket_closes_block() {
        let names = ConfiguredBlockNames::from_settings(&BlockNameSettings::default());
        let parsed = parse("docs {\n  hi\n   }  \n", &names).unwrap();
        assert_eq!(parsed.blocks.len(), 1);
        assert_eq!(parsed.blocks[0].text(), Some("  hi"));
    }
}
