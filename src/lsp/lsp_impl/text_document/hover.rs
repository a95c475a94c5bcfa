//! Hover method for ReqfileLs.

use tower_lsp_server::jsonrpc::Result;
use tower_lsp_server::ls_types::*;

use crate::intelligence::CodeIntelligence;
use crate::parser::{Block, ParsedDocument};
use crate::text;

use super::super::{ReqfileLs, uri_to_url};

const LOG_TARGET: &str = "reqfile_ls::hover";

fn markdown(value: String) -> HoverContents {
    HoverContents::Markup(MarkupContent {
        kind: MarkupKind::Markdown,
        value,
    })
}

fn block_name_at(parsed: &ParsedDocument, position: text::Position) -> Option<&Block> {
    parsed
        .blocks
        .iter()
        .find(|block| block.name_range.contains(position))
}

pub(crate) fn block_name_hover(parsed: &ParsedDocument, position: text::Position) -> Option<Hover> {
    let block = block_name_at(parsed, position)?;
    Some(Hover {
        contents: markdown(format!("**{}**\n\n{}", block.name, block.kind().describe())),
        range: Some(block.name_range.into()),
    })
}

impl<C: CodeIntelligence> ReqfileLs<C> {
    pub(crate) async fn hover_impl(&self, params: HoverParams) -> Result<Option<Hover>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = text::Position::from(params.text_document_position_params.position);

        let name_hover = uri_to_url(&uri).and_then(|url| {
            let document = self.documents.get(&url)?;
            block_name_hover(document.parsed()?, position)
        });
        if name_hover.is_some() {
            return Ok(name_hover);
        }

        let Some(context) = self.shadow_context(&uri, position).await else {
            return Ok(None);
        };
        let Some(info) = self.intelligence.hover(&context.request).await else {
            return Ok(None);
        };

        let range = match info.range {
            Some(range) => match context.to_source(range) {
                Some(range) => Some(range.into()),
                None => {
                    log::debug!(target: LOG_TARGET, "Dropping hover with unmappable range {:?}", range);
                    return Ok(None);
                }
            },
            None => None,
        };
        Ok(Some(Hover {
            contents: markdown(info.contents),
            range,
        }))
    }
}
