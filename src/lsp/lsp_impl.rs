use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tower_lsp_server::jsonrpc::Result;
use tower_lsp_server::ls_types::*;
use tower_lsp_server::{Client, LanguageServer};
use url::Url;

use crate::config::{
    Settings, SettingsEvent, SettingsEventKind, SettingsSource, load_settings,
};
use crate::intelligence::{CodeIntelligence, ShadowRequest, SyntaxIntelligence};
use crate::parser::{Block, BlockKind};
use crate::shadow::{FileSystemHost, HostEvent, ShadowSession};
use crate::text;
use crate::translate::{to_shadow_position, translate_range};

use super::documents::DocumentStore;
use super::settings_manager::SettingsManager;

mod text_document;

const LOG_TARGET: &str = "reqfile_ls::lsp";

/// Marker file of a request collection.
const COLLECTION_MARKER: &str = "bruno.json";

/// Key under which editors nest our settings in `didChangeConfiguration`.
const SETTINGS_SECTION: &str = "reqfileLs";

pub(crate) fn uri_to_url(uri: &Uri) -> Option<Url> {
    Url::parse(uri.as_str()).ok()
}

pub(crate) fn url_to_uri(url: &Url) -> Option<Uri> {
    Uri::from_str(url.as_str()).ok()
}

/// Directory whose shadow session serves `source`: the nearest ancestor
/// holding a collection marker, else the workspace root when it contains
/// the file, else the file's own directory.
pub(crate) fn collection_root(source: &Path, workspace_root: Option<&Path>) -> PathBuf {
    let parent = source.parent().unwrap_or(Path::new("/"));
    if let Some(marked) = parent
        .ancestors()
        .find(|dir| dir.join(COLLECTION_MARKER).is_file())
    {
        return marked.to_path_buf();
    }
    match workspace_root {
        Some(root) if source.starts_with(root) => root.to_path_buf(),
        _ => parent.to_path_buf(),
    }
}

/// A request positioned inside a code block, already forwarded into the
/// shadow document.
pub(crate) struct ShadowContext {
    pub(crate) source_uri: Uri,
    pub(crate) blocks: Vec<Block>,
    pub(crate) request: ShadowRequest,
}

impl ShadowContext {
    /// Map a shadow-document range back into the request file.
    pub(crate) fn to_source(&self, range: text::Range) -> Option<text::Range> {
        translate_range(&self.request.shadow_text, range, &self.blocks)
    }
}

pub struct ReqfileLs<C = SyntaxIntelligence> {
    client: Client,
    documents: DocumentStore,
    settings_manager: SettingsManager,
    host: Arc<FileSystemHost>,
    sessions: DashMap<PathBuf, Arc<ShadowSession<FileSystemHost>>>,
    /// Cancels the previous shadow sync of a document when a newer edit arrives
    pending_syncs: DashMap<Url, CancellationToken>,
    intelligence: Arc<C>,
}

impl<C> std::fmt::Debug for ReqfileLs<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqfileLs")
            .field("client", &self.client)
            .field("settings_manager", &self.settings_manager)
            .field("sessions", &self.sessions.len())
            .finish_non_exhaustive()
    }
}

impl<C: CodeIntelligence> ReqfileLs<C> {
    pub fn new(
        client: Client,
        intelligence: C,
        settings: Settings,
        explicit_config: Option<PathBuf>,
    ) -> Self {
        Self {
            client,
            documents: DocumentStore::new(),
            settings_manager: SettingsManager::new(settings, explicit_config),
            host: Arc::new(FileSystemHost::new()),
            sessions: DashMap::new(),
            pending_syncs: DashMap::new(),
            intelligence: Arc::new(intelligence),
        }
    }

    fn session_for(&self, source: &Path) -> Arc<ShadowSession<FileSystemHost>> {
        let workspace_root = self.settings_manager.root_path();
        let root = collection_root(source, workspace_root.as_ref().as_deref());
        self.sessions
            .entry(root.clone())
            .or_insert_with(|| {
                log::debug!(target: LOG_TARGET, "Opening shadow session for {}", root.display());
                let settings = self.settings_manager.load_settings();
                Arc::new(ShadowSession::new(
                    root,
                    settings.shadow.clone(),
                    self.settings_manager.block_names(),
                    Arc::clone(&self.host),
                ))
            })
            .clone()
    }

    /// Fresh token for a document's shadow sync, cancelling the previous one.
    fn replace_pending_sync(&self, url: &Url) -> CancellationToken {
        let token = CancellationToken::new();
        if let Some(previous) = self.pending_syncs.insert(url.clone(), token.clone()) {
            previous.cancel();
        }
        token
    }

    async fn report_settings_events(&self, events: &[SettingsEvent]) {
        for event in events {
            let level = match event.kind {
                SettingsEventKind::Info => MessageType::INFO,
                SettingsEventKind::Warning => MessageType::WARNING,
            };
            self.client.log_message(level, &event.message).await;
        }
    }

    async fn reload_settings(&self, source: SettingsSource, value: serde_json::Value) {
        let outcome = load_settings(self.settings_manager.explicit_config(), Some((source, value)));
        self.report_settings_events(&outcome.events).await;
        self.settings_manager.apply_settings(outcome.settings);

        // Sessions hold the old shadow settings and block names
        self.sessions.clear();
        let names = self.settings_manager.block_names();
        for (url, state) in self.documents.reparse_all(names.as_ref()) {
            self.publish_document_diagnostics(&url, &state).await;
        }
    }

    /// Store new text, publish its diagnostics and bring its shadow up to date.
    async fn update_document(&self, url: Url, text: String, version: Option<i32>) {
        let names = self.settings_manager.block_names();
        let state = self.documents.update(url.clone(), text, version, names.as_ref());
        self.publish_document_diagnostics(&url, &state).await;

        let Ok(path) = url.to_file_path() else {
            return;
        };
        let has_code = state
            .parsed()
            .is_some_and(|parsed| parsed.code_blocks().next().is_some());
        if !has_code {
            return;
        }
        let session = self.session_for(&path);
        let cancel = self.replace_pending_sync(&url);
        tokio::spawn(async move {
            if !session.sync_source(&path, &state.text, cancel).await {
                log::debug!(target: LOG_TARGET, "Shadow sync for {} did not complete", path.display());
            }
        });
    }

    /// Resolve a position inside a code block to a shadow-document request,
    /// waiting until the engine sees the current shadow text.
    pub(crate) async fn shadow_context(
        &self,
        uri: &Uri,
        position: text::Position,
    ) -> Option<ShadowContext> {
        let url = uri_to_url(uri)?;
        let path = url.to_file_path().ok()?;
        let (source_text, blocks) = {
            let document = self.documents.get(&url)?;
            let parsed = document.parsed()?;
            let block = parsed.block_at(position)?;
            if block.kind() != BlockKind::Code || !block.content_range.contains(position) {
                return None;
            }
            (document.text.clone(), parsed.blocks.clone())
        };

        let session = self.session_for(&path);
        let timeout = self.settings_manager.load_settings().shadow.timeout();
        let cancel = CancellationToken::new();
        let synced = async {
            session.sync_source(&path, &source_text, cancel.clone()).await;
            session.wait_for_in_sync(&path, &cancel).await
        };
        let shadow_text = match tokio::time::timeout(timeout, synced).await {
            Ok(text) => text?,
            Err(_) => {
                cancel.cancel();
                log::warn!(
                    target: LOG_TARGET,
                    "Shadow document for {} not in sync after {}ms",
                    path.display(),
                    timeout.as_millis()
                );
                return None;
            }
        };

        let shadow_position = to_shadow_position(&shadow_text, position, &blocks)?;
        Some(ShadowContext {
            source_uri: uri.clone(),
            blocks,
            request: ShadowRequest {
                shadow_path: session.shadow_path(&path),
                shadow_text,
                position: shadow_position,
            },
        })
    }
}

impl<C: CodeIntelligence> LanguageServer for ReqfileLs<C> {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        log::info!(target: LOG_TARGET, "Received initialization request");

        #[allow(deprecated)]
        let root_path = if let Some(folders) = &params.workspace_folders {
            folders
                .first()
                .and_then(|folder| uri_to_url(&folder.uri))
                .and_then(|url| url.to_file_path().ok())
        } else if let Some(root_uri) = &params.root_uri {
            uri_to_url(root_uri).and_then(|url| url.to_file_path().ok())
        } else {
            std::env::current_dir().ok()
        };
        self.settings_manager.set_root_path(root_path);

        if let Some(options) = params.initialization_options {
            let outcome = load_settings(
                self.settings_manager.explicit_config(),
                Some((SettingsSource::InitializationOptions, options)),
            );
            self.report_settings_events(&outcome.events).await;
            self.settings_manager.apply_settings(outcome.settings);
        }

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                completion_provider: Some(CompletionOptions {
                    trigger_characters: Some(vec![".".to_string()]),
                    ..CompletionOptions::default()
                }),
                definition_provider: Some(OneOf::Left(true)),
                signature_help_provider: Some(SignatureHelpOptions {
                    trigger_characters: Some(vec!["(".to_string(), ",".to_string()]),
                    ..SignatureHelpOptions::default()
                }),
                document_symbol_provider: Some(OneOf::Left(true)),
                document_formatting_provider: Some(OneOf::Left(true)),
                ..ServerCapabilities::default()
            },
            server_info: Some(ServerInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
            ..InitializeResult::default()
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        self.client
            .log_message(MessageType::INFO, "reqfile-ls initialized")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        for entry in self.pending_syncs.iter() {
            entry.value().cancel();
        }
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let Some(url) = uri_to_url(&params.text_document.uri) else {
            return;
        };
        self.update_document(url, params.text_document.text, Some(params.text_document.version))
            .await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let Some(url) = uri_to_url(&params.text_document.uri) else {
            return;
        };
        // Full sync: the last change carries the whole text
        let Some(change) = params.content_changes.into_iter().last() else {
            return;
        };
        if let Ok(path) = url.to_file_path() {
            self.host.emit(HostEvent::SourceChanged(path));
        }
        self.update_document(url, change.text, Some(params.text_document.version))
            .await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        let Some(url) = uri_to_url(&uri) else {
            return;
        };
        if let Some((_, pending)) = self.pending_syncs.remove(&url) {
            pending.cancel();
        }
        self.documents.remove(&url);
        self.client.publish_diagnostics(uri, Vec::new(), None).await;

        let Ok(path) = url.to_file_path() else {
            return;
        };
        let session = self.session_for(&path);
        tokio::spawn(async move {
            if !session.remove_shadow(&path).await {
                log::debug!(target: LOG_TARGET, "Shadow removal for {} did not complete", path.display());
            }
        });
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        let value = match params.settings {
            serde_json::Value::Object(mut map) if map.contains_key(SETTINGS_SECTION) => map
                .remove(SETTINGS_SECTION)
                .unwrap_or(serde_json::Value::Null),
            other => other,
        };
        self.reload_settings(SettingsSource::ClientConfiguration, value)
            .await;
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        self.hover_impl(params).await
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        self.completion_impl(params).await
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        self.definition_impl(params).await
    }

    async fn signature_help(&self, params: SignatureHelpParams) -> Result<Option<SignatureHelp>> {
        self.signature_help_impl(params).await
    }

    async fn document_symbol(
        &self,
        params: DocumentSymbolParams,
    ) -> Result<Option<DocumentSymbolResponse>> {
        self.document_symbol_impl(params).await
    }

    async fn formatting(&self, params: DocumentFormattingParams) -> Result<Option<Vec<TextEdit>>> {
        self.formatting_impl(params).await
    }
}
