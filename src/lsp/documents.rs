//! Open request files and their parse results.

use dashmap::DashMap;
use dashmap::mapref::one::Ref;
use url::Url;

use crate::error::ParseError;
use crate::parser::{BlockNames, ParsedDocument, parse};

#[derive(Debug, Clone)]
pub(crate) struct DocumentState {
    pub(crate) text: String,
    pub(crate) version: Option<i32>,
    pub(crate) parsed: Result<ParsedDocument, ParseError>,
}

impl DocumentState {
    pub(crate) fn new(text: String, version: Option<i32>, names: &dyn BlockNames) -> Self {
        let parsed = parse(&text, names);
        Self {
            text,
            version,
            parsed,
        }
    }

    pub(crate) fn parsed(&self) -> Option<&ParsedDocument> {
        self.parsed.as_ref().ok()
    }
}

#[derive(Debug, Default)]
pub(crate) struct DocumentStore {
    documents: DashMap<Url, DocumentState>,
}

impl DocumentStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Parse `text` and store it, returning the stored state.
    pub(crate) fn update(
        &self,
        url: Url,
        text: String,
        version: Option<i32>,
        names: &dyn BlockNames,
    ) -> DocumentState {
        let state = DocumentState::new(text, version, names);
        self.documents.insert(url, state.clone());
        state
    }

    pub(crate) fn get(&self, url: &Url) -> Option<Ref<'_, Url, DocumentState>> {
        self.documents.get(url)
    }

    pub(crate) fn remove(&self, url: &Url) -> Option<DocumentState> {
        self.documents.remove(url).map(|(_, state)| state)
    }

    /// Re-parse every open document, e.g. after the block-name table changed.
    pub(crate) fn reparse_all(&self, names: &dyn BlockNames) -> Vec<(Url, DocumentState)> {
        let mut updated = Vec::new();
        for mut entry in self.documents.iter_mut() {
            let state = DocumentState::new(entry.text.clone(), entry.version, names);
            *entry.value_mut() = state.clone();
            updated.push((entry.key().clone(), state));
        }
        updated
    }
}
