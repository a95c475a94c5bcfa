//! [`ShadowHost`] backed by the local file system.
//!
//! The engine is assumed to read shadow documents straight from disk, so the
//! observed text is the file content. Events for this host's own writes and
//! removals are broadcast after the operation completes; anything else
//! (source edits, bulk operations) is fed in through [`FileSystemHost::emit`].

use std::io;
use std::path::Path;

use tokio::sync::broadcast;

use super::host::{HostEvent, ShadowHost};

const LOG_TARGET: &str = "reqfile_ls::shadow_host";
const EVENT_CAPACITY: usize = 64;

pub struct FileSystemHost {
    events: broadcast::Sender<HostEvent>,
}

impl Default for FileSystemHost {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystemHost {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { events }
    }

    /// Broadcast an event observed outside this host.
    pub fn emit(&self, event: HostEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

impl ShadowHost for FileSystemHost {
    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    async fn read(&self, path: &Path) -> io::Result<String> {
        tokio::fs::read_to_string(path).await
    }

    async fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, content).await?;
        log::debug!(target: LOG_TARGET, "Wrote {} bytes to {}", content.len(), path.display());
        self.emit(HostEvent::ShadowChanged(path.to_path_buf()));
        Ok(())
    }

    async fn remove(&self, path: &Path) -> io::Result<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(err),
        }
        self.emit(HostEvent::ShadowDeleted(path.to_path_buf()));
        Ok(())
    }

    async fn observed_text(&self, path: &Path) -> Option<String> {
        tokio::fs::read_to_string(path).await.ok()
    }

    fn subscribe(&self) -> broadcast::Receiver<HostEvent> {
        self.events.subscribe()
    }
}
