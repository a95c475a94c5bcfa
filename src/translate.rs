//! Coordinate mapping between request files and their shadow documents.
//!
//! The function bodies are found again by scanning the shadow text for each
//! code block's header line, in source order. Inside a body, line `n` is
//! line `n` of the block's content range and columns are unchanged.
//! Positions in generated lines have no source counterpart.

use crate::parser::{Block, BlockKind};
use crate::shadow::function_header;
use crate::text::{LineDocument, Position, Range};

/// Where one code block's body sits in the shadow document.
#[derive(Debug, Clone, Copy)]
struct Body<'a> {
    block: &'a Block,
    /// Shadow line of the first body line
    first_line: u32,
    line_count: u32,
}

impl Body<'_> {
    fn contains_line(&self, line: u32) -> bool {
        line >= self.first_line && line < self.first_line + self.line_count
    }

    fn source_start_line(&self) -> u32 {
        self.block.content_range.start().line
    }

    fn to_source(&self, position: Position) -> Position {
        Position::new(
            self.source_start_line() + (position.line - self.first_line),
            position.character,
        )
    }
}

fn locate_bodies<'a>(shadow_text: &str, blocks: &'a [Block]) -> Vec<Body<'a>> {
    let document = LineDocument::new(shadow_text);
    let mut bodies = Vec::new();
    let mut cursor = 0;

    for block in blocks.iter().filter(|block| block.kind() == BlockKind::Code) {
        let Some(code) = block.code() else {
            continue;
        };
        let header = function_header(&block.name);
        let Some(header_line) = (cursor..document.line_count())
            .find(|&line| document.line(line) == Some(header.as_str()))
        else {
            break;
        };
        let line_count = code.text.split('\n').count() as u32;
        bodies.push(Body {
            block,
            first_line: header_line as u32 + 1,
            line_count,
        });
        cursor = header_line + 1 + line_count as usize;
    }
    bodies
}

/// Map a shadow-document range back into the request file. `None` when the
/// range touches generated lines or spans two blocks.
pub fn translate_range(shadow_text: &str, range: Range, blocks: &[Block]) -> Option<Range> {
    let bodies = locate_bodies(shadow_text, blocks);
    let body = bodies
        .iter()
        .find(|body| body.contains_line(range.start().line))?;
    let start = body.to_source(range.start());

    let end = range.end();
    let end = if body.contains_line(end.line) {
        body.to_source(end)
    } else if end == Position::new(body.first_line + body.line_count, 0) {
        // Range runs to the end of the body's last line
        body.block.content_range.end()
    } else {
        return None;
    };
    Some(Range::new(start, end))
}

pub fn translate_position(shadow_text: &str, position: Position, blocks: &[Block]) -> Option<Position> {
    translate_range(shadow_text, Range::empty(position), blocks).map(|range| range.start())
}

/// Map a request-file position into the shadow document.
pub fn to_shadow_position(shadow_text: &str, position: Position, blocks: &[Block]) -> Option<Position> {
    locate_bodies(shadow_text, blocks)
        .into_iter()
        .find(|body| {
            let start = body.source_start_line();
            body.block.content_range.contains(position)
                && position.line >= start
                && position.line < start + body.line_count
        })
        .map(|body| {
            Position::new(
                body.first_line + (position.line - body.source_start_line()),
                position.character,
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BlockNameSettings;
    use crate::parser::{ConfiguredBlockNames, ParsedDocument, parse};
    use crate::shadow::build_shadow_document;

    const SOURCE: &str = "meta {\n  name: a\n}\n\nscript:pre-request {\n  const token = 1;\n  use(token);\n}\n\ntests {\n  expect(token);\n}\n";

    fn fixture() -> (ParsedDocument, String) {
        let names = ConfiguredBlockNames::from_settings(&BlockNameSettings::default());
        let parsed = parse(SOURCE, &names).unwrap();
        let shadow = build_shadow_document("a.bru", &parsed.blocks);
        (parsed, shadow)
    }

    #[test]
    fn body_lines_map_back_to_block_content() {
        let (parsed, shadow) = fixture();
        // Shadow: 0 header, 1 blank, 2 function, 3-4 body, 5 }, 6 blank, 7 function, 8 body
        let range = Range::on_line(4, 6, 11);
        assert_eq!(
            translate_range(&shadow, range, &parsed.blocks),
            Some(Range::on_line(6, 6, 11))
        );
        assert_eq!(
            translate_position(&shadow, Position::new(8, 2), &parsed.blocks),
            Some(Position::new(10, 2))
        );
    }

    #[test]
    fn generated_lines_are_unmappable() {
        let (parsed, shadow) = fixture();
        for line in [0, 1, 2, 5, 6, 7, 9] {
            assert_eq!(
                translate_position(&shadow, Position::new(line, 0), &parsed.blocks),
                None,
                "line {line} should not map"
            );
        }
    }

    #[test]
    fn range_across_blocks_is_unmappable() {
        let (parsed, shadow) = fixture();
        let range = Range::new(Position::new(3, 0), Position::new(8, 3));
        assert_eq!(translate_range(&shadow, range, &parsed.blocks), None);
    }

    #[test]
    fn range_to_end_of_body_maps_to_content_end() {
        let (parsed, shadow) = fixture();
        let range = Range::new(Position::new(3, 0), Position::new(5, 0));
        assert_eq!(
            translate_range(&shadow, range, &parsed.blocks),
            Some(Range::new(Position::new(5, 0), Position::new(6, 13)))
        );
    }

    #[test]
    fn source_positions_map_into_shadow_and_back() {
        let (parsed, shadow) = fixture();
        let source = Position::new(6, 4);
        let shadow_position = to_shadow_position(&shadow, source, &parsed.blocks).unwrap();
        assert_eq!(shadow_position, Position::new(4, 4));
        assert_eq!(
            translate_position(&shadow, shadow_position, &parsed.blocks),
            Some(source)
        );
    }

    #[test]
    fn positions_outside_code_blocks_do_not_map_into_shadow() {
        let (parsed, shadow) = fixture();
        assert_eq!(to_shadow_position(&shadow, Position::new(1, 2), &parsed.blocks), None);
        assert_eq!(to_shadow_position(&shadow, Position::new(4, 0), &parsed.blocks), None);
    }

    #[test]
    fn stale_shadow_without_headers_maps_nothing() {
        let (parsed, _) = fixture();
        assert_eq!(
            translate_position("// empty\n", Position::new(0, 0), &parsed.blocks),
            None
        );
    }
}
