//! One collection root's shadow documents.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;

use crate::config::ShadowSettings;
use crate::parser::{BlockNames, parse};

use super::builder::build_shadow_document;
use super::host::ShadowHost;
use super::queue::{QueueTimings, ShadowQueue};
use super::request::UpdateRequest;
use super::sync;

const LOG_TARGET: &str = "reqfile_ls::shadow_session";

/// Owns the shadow paths, queue and host for one collection root.
pub struct ShadowSession<H> {
    root: PathBuf,
    settings: ShadowSettings,
    names: Arc<dyn BlockNames>,
    queue: ShadowQueue<H>,
    /// Latest shadow text wanted for each source file
    desired: DashMap<PathBuf, String>,
}

impl<H: ShadowHost> ShadowSession<H> {
    pub fn new(
        root: impl Into<PathBuf>,
        settings: ShadowSettings,
        names: Arc<dyn BlockNames>,
        host: Arc<H>,
    ) -> Self {
        let queue = ShadowQueue::new(host, QueueTimings::from(&settings));
        Self {
            root: root.into(),
            settings,
            names,
            queue,
            desired: DashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn queue(&self) -> &ShadowQueue<H> {
        &self.queue
    }

    pub fn host(&self) -> &Arc<H> {
        self.queue.host()
    }

    /// `<root>/<directory>/<source dir relative to root>/<source stem>.<extension>`.
    /// Sources outside the root are placed directly under the directory.
    pub fn shadow_path(&self, source_path: &Path) -> PathBuf {
        let stem = source_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "request".to_string());
        let relative_dir = source_path
            .strip_prefix(&self.root)
            .ok()
            .and_then(Path::parent)
            .unwrap_or(Path::new(""));
        self.root
            .join(&self.settings.directory_name)
            .join(relative_dir)
            .join(format!("{}.{}", stem, self.settings.file_extension))
    }

    /// Shadow text for `text`, or `None` if the file cannot be parsed.
    pub fn render(&self, source_path: &Path, text: &str) -> Option<String> {
        let source_name = source_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        match parse(text, self.names.as_ref()) {
            Ok(parsed) => Some(build_shadow_document(&source_name, &parsed.blocks)),
            Err(err) => {
                log::warn!(
                    target: LOG_TARGET,
                    "Cannot build shadow document for {}: {}",
                    source_path.display(),
                    err
                );
                None
            }
        }
    }

    /// Bring the shadow document of `source_path` up to date with `text`.
    pub async fn sync_source(&self, source_path: &Path, text: &str, cancel: CancellationToken) -> bool {
        let Some(content) = self.render(source_path, text) else {
            return false;
        };
        self.desired
            .insert(source_path.to_path_buf(), content.clone());
        let request = UpdateRequest::creation(self.shadow_path(source_path), content).with_cancel(cancel);
        self.queue.submit(request).await
    }

    /// Delete the shadow document of `source_path`.
    pub async fn remove_shadow(&self, source_path: &Path) -> bool {
        self.desired.remove(source_path);
        let request = UpdateRequest::deletion(vec![self.shadow_path(source_path)]);
        self.queue.submit(request).await
    }

    /// Wait until the engine sees the shadow text wanted for `source_path`.
    /// Returns that text, or `None` when cancelled.
    pub async fn wait_for_in_sync(&self, source_path: &Path, cancel: &CancellationToken) -> Option<String> {
        sync::wait_for_in_sync(self, source_path, cancel).await
    }

    /// Desired shadow text, rebuilt from the source on disk when nothing has
    /// been synced for it yet.
    pub(super) async fn desired_content(&self, source_path: &Path) -> Option<String> {
        if let Some(content) = self.desired.get(source_path) {
            return Some(content.clone());
        }
        let text = self.host().read(source_path).await.ok()?;
        let content = self.render(source_path, &text)?;
        self.desired
            .insert(source_path.to_path_buf(), content.clone());
        Some(content)
    }

    /// Forget the cached desired text so the next wait starts from the source.
    pub fn invalidate(&self, source_path: &Path) {
        self.desired.remove(source_path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BlockNameSettings;
    use crate::parser::ConfiguredBlockNames;
    use crate::shadow::memory::MemoryHost;

    fn session() -> (Arc<MemoryHost>, ShadowSession<MemoryHost>) {
        let host = Arc::new(MemoryHost::new());
        let names = Arc::new(ConfiguredBlockNames::from_settings(&BlockNameSettings::default()));
        let session = ShadowSession::new("/collection", ShadowSettings::default(), names, Arc::clone(&host));
        (host, session)
    }

    #[test]
    fn shadow_path_uses_configured_directory_and_extension() {
        let (_, session) = session();
        assert_eq!(
            session.shadow_path(Path::new("/collection/users/login.bru")),
            PathBuf::from("/collection/.reqfile-ls/users/login.js")
        );
        assert_eq!(
            session.shadow_path(Path::new("/elsewhere/login.bru")),
            PathBuf::from("/collection/.reqfile-ls/login.js")
        );
    }

    #[tokio::test]
    async fn same_named_sources_in_different_folders_keep_separate_shadows() {
        let (host, session) = session();
        let users = Path::new("/collection/users/login.bru");
        let admin = Path::new("/collection/admin/login.bru");
        assert_ne!(session.shadow_path(users), session.shadow_path(admin));

        assert!(session.sync_source(users, "tests {\n  user();\n}\n", CancellationToken::new()).await);
        assert!(session.sync_source(admin, "tests {\n  admin();\n}\n", CancellationToken::new()).await);

        let users_shadow = host.writes_to(&session.shadow_path(users));
        let admin_shadow = host.writes_to(&session.shadow_path(admin));
        assert_eq!(users_shadow.len(), 1);
        assert_eq!(admin_shadow.len(), 1);
        assert!(users_shadow[0].contains("user();"));
        assert!(admin_shadow[0].contains("admin();"));
    }

    #[tokio::test]
    async fn sync_source_writes_generated_document() {
        let (host, session) = session();
        let source = Path::new("/collection/login.bru");
        let text = "tests {\n  ok();\n}\n";

        assert!(session.sync_source(source, text, CancellationToken::new()).await);
        let written = host.writes_to(&session.shadow_path(source));
        assert_eq!(
            written,
            vec!["// Generated from login.bru. Do not edit.\n\nfunction tests() {\n  ok();\n}\n".to_string()]
        );
    }

    #[tokio::test]
    async fn unparsable_source_is_not_synced() {
        let (host, session) = session();
        let text = "body:json {\n  {\"a\": \"}\n}\n";
        assert!(!session.sync_source(Path::new("/collection/a.bru"), text, CancellationToken::new()).await);
        assert!(host.writes().is_empty());
    }

    #[tokio::test]
    async fn desired_content_falls_back_to_source_on_disk() {
        let (host, session) = session();
        let source = Path::new("/collection/a.bru");
        host.insert(source, "tests {\n  x();\n}\n");
        let content = session.desired_content(source).await.unwrap();
        assert!(content.contains("function tests() {\n  x();\n}"));
    }
}
