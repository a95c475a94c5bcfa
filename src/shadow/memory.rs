//! In-process [`ShadowHost`] used by tools and tests.
//!
//! Files live in a map. Writes can be held at a gate or forced to fail,
//! which makes queue interleavings reproducible.

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::sync::{Semaphore, broadcast};

use crate::error::LockResultExt;

use super::host::{HostEvent, ShadowHost};

const EVENT_CAPACITY: usize = 64;

#[derive(Default)]
struct MemoryState {
    files: HashMap<PathBuf, String>,
    /// Every completed write, in order
    writes: Vec<(PathBuf, String)>,
    removals: Vec<PathBuf>,
    gates: HashMap<PathBuf, Arc<Semaphore>>,
    failing: HashSet<PathBuf>,
    /// Paths the engine does not have open
    closed: HashSet<PathBuf>,
}

pub struct MemoryHost {
    state: Mutex<MemoryState>,
    events: broadcast::Sender<HostEvent>,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHost {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Mutex::new(MemoryState::default()),
            events,
        }
    }

    pub fn emit(&self, event: HostEvent) {
        let _ = self.events.send(event);
    }

    /// Make writes to `path` wait until [`MemoryHost::release`] is called.
    pub fn hold(&self, path: impl Into<PathBuf>) {
        self.lock()
            .gates
            .insert(path.into(), Arc::new(Semaphore::new(0)));
    }

    /// Let one held write to `path` through.
    pub fn release(&self, path: &Path) {
        if let Some(gate) = self.lock().gates.get(path) {
            gate.add_permits(1);
        }
    }

    pub fn fail_writes(&self, path: impl Into<PathBuf>) {
        self.lock().failing.insert(path.into());
    }

    /// Simulate the engine closing its view of `path`.
    pub fn close(&self, path: &Path) {
        self.lock().closed.insert(path.to_path_buf());
        self.emit(HostEvent::ShadowClosed(path.to_path_buf()));
    }

    /// Put text into a file without going through the queue.
    pub fn insert(&self, path: impl Into<PathBuf>, content: impl Into<String>) {
        self.lock().files.insert(path.into(), content.into());
    }

    pub fn writes(&self) -> Vec<(PathBuf, String)> {
        self.lock().writes.clone()
    }

    pub fn writes_to(&self, path: &Path) -> Vec<String> {
        self.lock()
            .writes
            .iter()
            .filter(|(written, _)| written == path)
            .map(|(_, content)| content.clone())
            .collect()
    }

    pub fn removals(&self) -> Vec<PathBuf> {
        self.lock().removals.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().recover_poison("MemoryHost::state")
    }
}

impl ShadowHost for MemoryHost {
    async fn exists(&self, path: &Path) -> bool {
        self.lock().files.contains_key(path)
    }

    async fn read(&self, path: &Path) -> io::Result<String> {
        self.lock()
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
    }

    async fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        let gate = self.lock().gates.get(path).cloned();
        if let Some(gate) = gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|_| io::Error::other("gate closed"))?;
            permit.forget();
        }

        {
            let mut state = self.lock();
            if state.failing.contains(path) {
                return Err(io::Error::new(
                    io::ErrorKind::PermissionDenied,
                    format!("write to {} refused", path.display()),
                ));
            }
            state.files.insert(path.to_path_buf(), content.to_string());
            state.writes.push((path.to_path_buf(), content.to_string()));
            state.closed.remove(path);
        }
        self.emit(HostEvent::ShadowChanged(path.to_path_buf()));
        Ok(())
    }

    async fn remove(&self, path: &Path) -> io::Result<()> {
        {
            let mut state = self.lock();
            state.files.remove(path);
            state.removals.push(path.to_path_buf());
        }
        self.emit(HostEvent::ShadowDeleted(path.to_path_buf()));
        Ok(())
    }

    async fn observed_text(&self, path: &Path) -> Option<String> {
        let state = self.lock();
        if state.closed.contains(path) {
            return None;
        }
        state.files.get(path).cloned()
    }

    fn subscribe(&self) -> broadcast::Receiver<HostEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn held_write_completes_after_release() {
        let host = Arc::new(MemoryHost::new());
        let path = PathBuf::from("/shadow/a.js");
        host.hold(path.clone());

        let writer = {
            let host = Arc::clone(&host);
            let path = path.clone();
            tokio::spawn(async move { host.write(&path, "x").await })
        };
        tokio::task::yield_now().await;
        assert!(host.writes().is_empty());

        host.release(&path);
        writer.await.unwrap().unwrap();
        assert_eq!(host.writes_to(&path), vec!["x".to_string()]);
    }

    #[tokio::test]
    async fn closed_documents_are_not_observed() {
        let host = MemoryHost::new();
        let path = PathBuf::from("/shadow/a.js");
        host.write(&path, "x").await.unwrap();
        host.close(&path);
        assert_eq!(host.observed_text(&path).await, None);
        assert_eq!(host.read(&path).await.unwrap(), "x");
    }
}
