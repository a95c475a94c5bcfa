//! Document symbol method for ReqfileLs.
//!
//! One symbol per block; dictionary keys and array entries become children.

use tower_lsp_server::jsonrpc::Result;
use tower_lsp_server::ls_types::*;

use crate::intelligence::CodeIntelligence;
use crate::parser::{
    ArrayEntry, ArrayItem, ArrayValuedField, Block, BlockContent, BlockKind, DictionaryField,
    DictionaryItem, ParsedDocument,
};
use crate::text;

use super::super::{ReqfileLs, uri_to_url};

#[allow(deprecated)]
fn symbol(
    name: String,
    detail: Option<String>,
    kind: SymbolKind,
    range: text::Range,
    selection_range: text::Range,
    children: Vec<DocumentSymbol>,
) -> DocumentSymbol {
    DocumentSymbol {
        name,
        detail,
        kind,
        tags: None,
        deprecated: None,
        range: range.into(),
        selection_range: selection_range.into(),
        children: (!children.is_empty()).then_some(children),
    }
}

fn block_symbol_kind(kind: BlockKind) -> SymbolKind {
    match kind {
        BlockKind::Dictionary => SymbolKind::NAMESPACE,
        BlockKind::Array => SymbolKind::ARRAY,
        BlockKind::PlainText => SymbolKind::STRING,
        BlockKind::Json => SymbolKind::OBJECT,
        BlockKind::Code => SymbolKind::FUNCTION,
    }
}

fn field_symbol(field: &DictionaryField) -> DocumentSymbol {
    symbol(
        field.key.clone(),
        (!field.value.is_empty()).then(|| field.value.clone()),
        SymbolKind::KEY,
        text::Range::new(field.key_range.start(), field.value_range.end()),
        field.key_range,
        Vec::new(),
    )
}

fn entry_symbol(entry: &ArrayEntry) -> DocumentSymbol {
    symbol(
        entry.entry.clone(),
        None,
        SymbolKind::STRING,
        entry.entry_range,
        entry.entry_range,
        Vec::new(),
    )
}

fn array_field_symbol(field: &ArrayValuedField) -> DocumentSymbol {
    let end = field
        .values
        .last()
        .map(|entry| entry.entry_range.end())
        .unwrap_or(field.key_range.end());
    symbol(
        field.key.clone(),
        None,
        SymbolKind::ARRAY,
        text::Range::new(field.key_range.start(), end),
        field.key_range,
        field.values.iter().map(entry_symbol).collect(),
    )
}

fn block_symbol(block: &Block) -> DocumentSymbol {
    let children = match &block.content {
        BlockContent::Dictionary(items) => items
            .iter()
            .filter_map(|item| match item {
                DictionaryItem::Field(field) => Some(field_symbol(field)),
                DictionaryItem::ArrayField(field) => Some(array_field_symbol(field)),
                DictionaryItem::PlainText(_) => None,
            })
            .collect(),
        BlockContent::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                ArrayItem::Entry(entry) => Some(entry_symbol(entry)),
                ArrayItem::PlainText(_) => None,
            })
            .collect(),
        _ => Vec::new(),
    };
    symbol(
        block.name.clone(),
        Some(block.kind().describe().to_string()),
        block_symbol_kind(block.kind()),
        block.range,
        block.name_range,
        children,
    )
}

pub(crate) fn document_symbols(parsed: &ParsedDocument) -> Vec<DocumentSymbol> {
    parsed.blocks.iter().map(block_symbol).collect()
}

impl<C: CodeIntelligence> ReqfileLs<C> {
    pub(crate) async fn document_symbol_impl(
        &self,
        params: DocumentSymbolParams,
    ) -> Result<Option<DocumentSymbolResponse>> {
        let Some(url) = uri_to_url(&params.text_document.uri) else {
            return Ok(None);
        };
        let Some(document) = self.documents.get(&url) else {
            return Ok(None);
        };
        let Some(parsed) = document.parsed() else {
            return Ok(None);
        };
        Ok(Some(DocumentSymbolResponse::Nested(document_symbols(parsed))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BlockNameSettings;
    use crate::parser::{ConfiguredBlockNames, parse};

    #[test]
    fn blocks_with_key_children() {
        let text = "headers {\n  accept: json\n  ids: [\n    a,\n    b\n  ]\n}\n\ntags [\n  smoke\n]\n\ntests {\n  ok();\n}\n";
        let parsed = parse(
            text,
            &ConfiguredBlockNames::from_settings(&BlockNameSettings::default()),
        )
        .unwrap();
        let symbols = document_symbols(&parsed);

        let names: Vec<&str> = symbols.iter().map(|symbol| symbol.name.as_str()).collect();
        assert_eq!(names, vec!["headers", "tags", "tests"]);
        assert_eq!(symbols[2].kind, SymbolKind::FUNCTION);
        assert!(symbols[2].children.is_none());

        let headers = symbols[0].children.as_ref().unwrap();
        assert_eq!(headers[0].name, "accept");
        assert_eq!(headers[0].detail.as_deref(), Some("json"));
        assert_eq!(headers[1].name, "ids");
        assert_eq!(headers[1].children.as_ref().unwrap().len(), 2);

        let tags = symbols[1].children.as_ref().unwrap();
        assert_eq!(tags[0].name, "smoke");
        assert_eq!(tags[0].selection_range, text::Range::on_line(9, 2, 7).into());
    }
}
