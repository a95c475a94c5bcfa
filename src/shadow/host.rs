//! The environment the shadow document lives in.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};

use tokio::sync::broadcast;

/// Notifications a host broadcasts about shadow and source files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// The code-intelligence engine now sees new shadow text
    ShadowChanged(PathBuf),
    /// The engine closed the shadow document
    ShadowClosed(PathBuf),
    ShadowDeleted(PathBuf),
    /// A request file changed outside the queue's control
    SourceChanged(PathBuf),
    /// A collaborator started moving or renaming files in bulk
    BulkOperationStarted,
}

/// File primitives and change notifications supplied by the host.
pub trait ShadowHost: Send + Sync + 'static {
    fn exists(&self, path: &Path) -> impl Future<Output = bool> + Send;

    fn read(&self, path: &Path) -> impl Future<Output = io::Result<String>> + Send;

    /// Create or replace `path`, creating parent directories as needed.
    fn write(&self, path: &Path, content: &str) -> impl Future<Output = io::Result<()>> + Send;

    fn remove(&self, path: &Path) -> impl Future<Output = io::Result<()>> + Send;

    /// The text the code-intelligence engine currently sees for `path`, or
    /// `None` when it does not have the document open.
    fn observed_text(&self, path: &Path) -> impl Future<Output = Option<String>> + Send;

    fn subscribe(&self) -> broadcast::Receiver<HostEvent>;
}
