//! Embedded-code blocks.
//!
//! The end of the body is the brace that balances the statement list, as
//! found by a JavaScript-aware scan. The body is also parsed into a syntax
//! tree kept alongside the text.

use std::sync::Arc;

use crate::embedded::{JavaScriptSyntax, SyntaxSpan, find_block_end};

use super::block::{BlockContent, CodeBlockContent};
use super::{BlockContext, ParsedBody};

pub(super) fn parse(context: &BlockContext<'_>) -> Option<ParsedBody> {
    let document = context.document;
    let body_start = document.offset_at(context.open_bracket) + 1;
    let end = find_block_end(document.text(), body_start)?;
    let close = document.position_at(end);

    let text = document.get_text(context.content_range(close));
    let syntax = JavaScriptSyntax::parse(text).map(|syntax| Arc::new(syntax) as Arc<dyn SyntaxSpan>);

    Some(ParsedBody {
        close,
        content: BlockContent::Code(CodeBlockContent::new(text.to_string(), syntax)),
    })
}
