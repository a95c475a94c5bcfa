//! Completion method for ReqfileLs.
//!
//! Outside of blocks, a line holding only a partial header completes to the
//! block names not yet used in the file. Inside code blocks the request is
//! forwarded to the code intelligence engine.

use tower_lsp_server::jsonrpc::Result;
use tower_lsp_server::ls_types::*;

use crate::intelligence::{CandidateKind, CodeIntelligence, CompletionCandidate};
use crate::parser::{BlockNames, ParsedDocument, resolve_kind};
use crate::text::{self, LineDocument, convert_utf16_to_byte_in_line, utf16_len};

use super::super::{ReqfileLs, uri_to_url};

const LOG_TARGET: &str = "reqfile_ls::completion";

fn is_header_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, ':' | '-' | '_')
}

/// Block-name items for `position`, or `None` when the cursor is not on a
/// partial block header.
pub(crate) fn block_name_items(
    text: &str,
    parsed: &ParsedDocument,
    names: &dyn BlockNames,
    position: text::Position,
) -> Option<Vec<CompletionItem>> {
    if parsed.block_at(position).is_some() {
        return None;
    }
    let document = LineDocument::new(text);
    let line = document.line(position.line as usize)?;
    let end = convert_utf16_to_byte_in_line(line, position.character as usize)?;
    let prefix = line[..end].trim_start();
    if !prefix.chars().all(is_header_char) {
        return None;
    }

    let replace = text::Range::new(
        text::Position::new(position.line, position.character - utf16_len(prefix)),
        position,
    );
    let items = names
        .known_names()
        .into_iter()
        .filter(|name| name.starts_with(prefix) && parsed.block(name).is_none())
        .map(|name| CompletionItem {
            label: name.clone(),
            kind: Some(CompletionItemKind::MODULE),
            detail: Some(resolve_kind(names, &name, '{').describe().to_string()),
            text_edit: Some(CompletionTextEdit::Edit(TextEdit::new(replace.into(), name))),
            ..CompletionItem::default()
        })
        .collect();
    Some(items)
}

fn to_completion_item(candidate: CompletionCandidate) -> CompletionItem {
    let kind = match candidate.kind {
        CandidateKind::Variable => CompletionItemKind::VARIABLE,
        CandidateKind::Function => CompletionItemKind::FUNCTION,
        CandidateKind::Module => CompletionItemKind::MODULE,
    };
    CompletionItem {
        label: candidate.label,
        kind: Some(kind),
        detail: candidate.detail,
        ..CompletionItem::default()
    }
}

impl<C: CodeIntelligence> ReqfileLs<C> {
    pub(crate) async fn completion_impl(
        &self,
        params: CompletionParams,
    ) -> Result<Option<CompletionResponse>> {
        let uri = params.text_document_position.text_document.uri;
        let position = text::Position::from(params.text_document_position.position);

        let names = self.settings_manager.block_names();
        let header_items = uri_to_url(&uri).and_then(|url| {
            let document = self.documents.get(&url)?;
            block_name_items(&document.text, document.parsed()?, names.as_ref(), position)
        });
        if let Some(items) = header_items {
            return Ok(Some(CompletionResponse::Array(items)));
        }

        let Some(context) = self.shadow_context(&uri, position).await else {
            return Ok(None);
        };
        let candidates = self.intelligence.completion(&context.request).await;
        log::debug!(
            target: LOG_TARGET,
            "{} candidates from code intelligence for {}",
            candidates.len(),
            uri.as_str()
        );
        if candidates.is_empty() {
            return Ok(None);
        }
        Ok(Some(CompletionResponse::Array(
            candidates.into_iter().map(to_completion_item).collect(),
        )))
    }
}
