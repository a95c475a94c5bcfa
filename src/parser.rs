//! Block parser for request files.
//!
//! The parser scans a [`LineDocument`] line by line. Each line matching the
//! block-start grammar hands the cursor to a kind-specific sub-parser, which
//! reports where the block closes. Everything between blocks is collected as
//! [`TextOutsideOfBlocks`].
//!
//! A block that never closes is never emitted: the rest of the document from
//! its header onwards becomes one trailing outside-of-block span and the
//! scan stops.

mod array;
pub mod block;
mod code;
mod dictionary;
mod json;
pub mod names;
pub(crate) mod patterns;
mod plain_text;

pub use block::{
    ArrayEntry, ArrayItem, ArrayValuedField, Block, BlockContent, CodeBlockContent,
    DictionaryField, DictionaryItem, ParsedDocument, PlainTextLine, TextOutsideOfBlocks,
};
pub use names::{BlockKind, BlockNames, ConfiguredBlockNames, resolve_kind};

use crate::error::ParseError;
use crate::text::{LineDocument, Position, Range, utf16_len};

use patterns::match_block_start;

const LOG_TARGET: &str = "reqfile_ls::parser";

/// Parse request-file text into blocks and outside-of-block spans.
pub fn parse(text: &str, names: &dyn BlockNames) -> Result<ParsedDocument, ParseError> {
    let document = LineDocument::new(text);
    parse_document(&document, names)
}

/// Parse an already line-indexed document.
pub fn parse_document(
    document: &LineDocument,
    names: &dyn BlockNames,
) -> Result<ParsedDocument, ParseError> {
    BlockParser::new(document, names).run()
}

/// Header facts shared by all sub-parsers.
pub(crate) struct BlockContext<'a> {
    pub(crate) document: &'a LineDocument,
    pub(crate) name: &'a str,
    pub(crate) open_line: usize,
    /// Position of the opening bracket
    pub(crate) open_bracket: Position,
}

impl BlockContext<'_> {
    pub(crate) fn first_content_line(&self) -> usize {
        self.open_line + 1
    }

    /// Content between the bracket lines. When the closing bracket shares
    /// its line with other text, that leading text belongs to the content.
    pub(crate) fn content_range(&self, close: Position) -> Range {
        let start = Position::new(self.first_content_line() as u32, 0);
        if self.closing_prefix(close).trim().is_empty() {
            if close.line as usize <= self.first_content_line() {
                Range::empty(start)
            } else {
                Range::new(start, self.document.line_end(close.line as usize - 1))
            }
        } else {
            Range::new(start, close)
        }
    }

    /// Text on the closing line before the closing bracket.
    pub(crate) fn closing_prefix(&self, close: Position) -> &str {
        let line_start = Position::new(close.line, 0);
        self.document.get_text(Range::new(line_start, close))
    }
}

/// Where a sub-parser found the block end and what it contained.
pub(crate) struct ParsedBody {
    /// Position of the closing bracket
    pub(crate) close: Position,
    pub(crate) content: BlockContent,
}

struct BlockParser<'a> {
    document: &'a LineDocument,
    names: &'a dyn BlockNames,
    blocks: Vec<Block>,
    outside: Vec<TextOutsideOfBlocks>,
    /// Start of the pending outside-of-block span
    outside_start: Position,
}

impl<'a> BlockParser<'a> {
    fn new(document: &'a LineDocument, names: &'a dyn BlockNames) -> Self {
        Self {
            document,
            names,
            blocks: Vec::new(),
            outside: Vec::new(),
            outside_start: Position::new(0, 0),
        }
    }

    fn run(mut self) -> Result<ParsedDocument, ParseError> {
        let document = self.document;
        let mut line = 0;

        while line < document.line_count() {
            let text = document.line(line).unwrap_or_default();
            let Some(start) = match_block_start(text) else {
                line += 1;
                continue;
            };

            let header_start = Position::new(line as u32, 0);
            self.flush_outside(header_start);

            let kind = resolve_kind(self.names, start.name, start.bracket);
            let context = BlockContext {
                document,
                name: start.name,
                open_line: line,
                open_bracket: Position::new(
                    line as u32,
                    utf16_len(&text[..start.bracket_offset]),
                ),
            };

            let body = match kind {
                BlockKind::Dictionary => dictionary::parse(&context),
                BlockKind::Array => array::parse(&context),
                BlockKind::PlainText => plain_text::parse(&context),
                BlockKind::Json => json::parse(&context)?,
                BlockKind::Code => code::parse(&context),
            };

            let Some(body) = body else {
                log::debug!(
                    target: LOG_TARGET,
                    "Block '{}' on line {} is not terminated; remainder is outside of blocks",
                    start.name,
                    line
                );
                self.outside_start = header_start;
                break;
            };

            let close_line = body.close.line as usize;
            let name_start = utf16_len(&text[..start.name_start]);
            self.blocks.push(Block {
                name: start.name.to_string(),
                name_range: Range::on_line(
                    line as u32,
                    name_start,
                    name_start + utf16_len(start.name),
                ),
                range: Range::new(header_start, document.line_end(close_line)),
                content_range: context.content_range(body.close),
                content: body.content,
            });

            self.outside_start = document.line_end(close_line);
            line = close_line + 1;
        }

        self.flush_outside(document.end_position());
        Ok(ParsedDocument {
            blocks: self.blocks,
            text_outside_of_blocks: self.outside,
        })
    }

    fn flush_outside(&mut self, end: Position) {
        let range = Range::new(self.outside_start, end);
        if !range.is_empty() {
            self.outside.push(TextOutsideOfBlocks {
                text: self.document.get_text(range).to_string(),
                range,
            });
        }
        self.outside_start = end;
    }
}
