//! Serialised updates of shadow documents.
//!
//! # Turn taking
//!
//! Entries wait in FIFO order and at most one is active. A submission that
//! finds the queue empty runs immediately; any other waits for a turn
//! signal, sent when the entry reaches the head of the queue. The mutation
//! itself runs on a spawned task, so a caller that gives up mid-flight
//! cannot interrupt half-finished I/O.
//!
//! # Superseding
//!
//! A queued (not active) creation is replaced in place by a newer creation
//! for the same target, so the target keeps its place in line. A submission
//! with the same effect as an entry already queued or active follows that
//! entry and shares its result.
//!
//! # Failure
//!
//! I/O errors and timeouts reset the whole queue. Waiting callers see their
//! turn signal dropped and report failure; they must resubmit.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::{Notify, broadcast, oneshot};
use tokio_util::sync::CancellationToken;

use crate::config::ShadowSettings;
use crate::error::{LockResultExt, ShadowError};

use super::host::{HostEvent, ShadowHost};
use super::request::{QueueEntry, ShadowOperation, UpdateRequest};

const LOG_TARGET: &str = "reqfile_ls::shadow_queue";
const NOTICE_CAPACITY: usize = 16;

/// Progress reports for callers that want to tell the user something.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueNotice {
    /// A creation has been running longer than the soft limit
    SlowCreation { target_path: PathBuf },
}

/// Timing knobs of the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueTimings {
    pub timeout: Duration,
    pub slow_notice: Duration,
    pub deletion_grace: Duration,
}

impl From<&ShadowSettings> for QueueTimings {
    fn from(settings: &ShadowSettings) -> Self {
        Self {
            timeout: settings.timeout(),
            slow_notice: settings.slow_notice(),
            deletion_grace: settings.deletion_grace(),
        }
    }
}

impl Default for QueueTimings {
    fn default() -> Self {
        QueueTimings::from(&ShadowSettings::default())
    }
}

/// Signal delivered to a waiting submission.
enum Turn {
    Run,
    Superseded,
}

enum Admission {
    RunNow(String),
    Wait(String, oneshot::Receiver<Turn>),
    Follow(oneshot::Receiver<bool>),
}

#[derive(Default)]
struct QueueState {
    /// Pending entries; the active one, if any, is at the front
    entries: VecDeque<QueueEntry>,
    active: Option<String>,
    turns: HashMap<String, oneshot::Sender<Turn>>,
    /// Submissions sharing the outcome of another entry
    followers: HashMap<String, Vec<oneshot::Sender<bool>>>,
    last_written: HashMap<PathBuf, String>,
    /// Targets of the deletion currently waiting out its grace period
    staged_deletion: Option<Vec<PathBuf>>,
}

struct QueueInner<H> {
    host: Arc<H>,
    timings: QueueTimings,
    state: Mutex<QueueState>,
    abandon_deletion: Notify,
    notices: broadcast::Sender<QueueNotice>,
}

/// Queue of shadow document mutations. Cloning shares the queue.
pub struct ShadowQueue<H> {
    inner: Arc<QueueInner<H>>,
}

impl<H> Clone for ShadowQueue<H> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<H: ShadowHost> ShadowQueue<H> {
    pub fn new(host: Arc<H>, timings: QueueTimings) -> Self {
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        Self {
            inner: Arc::new(QueueInner {
                host,
                timings,
                state: Mutex::new(QueueState::default()),
                abandon_deletion: Notify::new(),
                notices,
            }),
        }
    }

    pub fn host(&self) -> &Arc<H> {
        &self.inner.host
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<QueueNotice> {
        self.inner.notices.subscribe()
    }

    /// Number of entries waiting or running.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Submit a request; `true` when the mutation completed.
    pub async fn submit(&self, request: UpdateRequest) -> bool {
        let description = request.operation.describe();
        match self.try_submit(request).await {
            Ok(()) => true,
            Err(err) => {
                log::debug!(target: LOG_TARGET, "{} did not complete: {}", description, err);
                false
            }
        }
    }

    /// Submit a request, reporting why it did not complete.
    pub async fn try_submit(&self, request: UpdateRequest) -> Result<(), ShadowError> {
        if request.cancel.is_cancelled() {
            return Err(ShadowError::Cancelled);
        }

        let inner = &self.inner;
        let slow_target = match &request.operation {
            ShadowOperation::Creation { target_path, .. } => Some(target_path.clone()),
            ShadowOperation::Deletion { .. } => None,
        };

        let submission = self.run_submission(request);
        tokio::pin!(submission);

        let with_notice = async {
            let Some(target_path) = slow_target else {
                return submission.await;
            };
            tokio::select! {
                result = &mut submission => result,
                _ = tokio::time::sleep(inner.timings.slow_notice) => {
                    log::info!(
                        target: LOG_TARGET,
                        "Creation of {} is taking a while",
                        target_path.display()
                    );
                    let _ = inner.notices.send(QueueNotice::SlowCreation { target_path });
                    submission.await
                }
            }
        };

        match tokio::time::timeout(inner.timings.timeout, with_notice).await {
            Ok(result) => result,
            Err(_) => {
                let millis = inner.timings.timeout.as_millis() as u64;
                log::warn!(target: LOG_TARGET, "Shadow update timed out after {}ms", millis);
                inner.reset("timeout");
                Err(ShadowError::Timeout { millis })
            }
        }
    }

    async fn run_submission(&self, request: UpdateRequest) -> Result<(), ShadowError> {
        let UpdateRequest { operation, cancel } = request;
        let inner = &self.inner;

        if let ShadowOperation::Creation {
            target_path,
            desired_content,
        } = &operation
        {
            let already_written = inner.lock().last_written.get(target_path) == Some(desired_content);
            if already_written && inner.host.exists(target_path).await {
                log::debug!(
                    target: LOG_TARGET,
                    "{} already holds the desired content",
                    target_path.display()
                );
                return Ok(());
            }
        }

        let id = match inner.admit(operation.clone()) {
            Admission::RunNow(id) => id,
            Admission::Follow(receiver) => {
                return tokio::select! {
                    _ = cancel.cancelled() => Err(ShadowError::Cancelled),
                    shared = receiver => match shared {
                        Ok(true) => Ok(()),
                        Ok(false) | Err(_) => Err(ShadowError::Reset),
                    },
                };
            }
            Admission::Wait(id, turn) => {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        inner.withdraw(&id);
                        return Err(ShadowError::Cancelled);
                    }
                    turn = turn => match turn {
                        Ok(Turn::Run) => id,
                        Ok(Turn::Superseded) => return Err(ShadowError::Superseded),
                        Err(_) => return Err(ShadowError::Reset),
                    },
                }
            }
        };

        let execution = {
            let inner = Arc::clone(inner);
            let cancel = cancel.clone();
            tokio::spawn(async move { inner.execute(id, operation, cancel).await })
        };

        tokio::select! {
            _ = cancel.cancelled() => {
                log::debug!(
                    target: LOG_TARGET,
                    "Cancelled while active; the running update continues"
                );
                Err(ShadowError::Cancelled)
            }
            finished = execution => finished.unwrap_or(Err(ShadowError::Reset)),
        }
    }
}

impl<H: ShadowHost> QueueInner<H> {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().recover_poison("ShadowQueue::state")
    }

    /// Place an operation in the queue.
    fn admit(&self, operation: ShadowOperation) -> Admission {
        let mut state = self.lock();

        if let Some(existing) = state
            .entries
            .iter()
            .find(|entry| entry.operation.is_same_effect(&operation))
            .map(|entry| entry.id.clone())
        {
            log::debug!(
                target: LOG_TARGET,
                "{} follows identical entry {}",
                operation.describe(),
                existing
            );
            let (sender, receiver) = oneshot::channel();
            state.followers.entry(existing).or_default().push(sender);
            return Admission::Follow(receiver);
        }

        if let Some(staged) = &state.staged_deletion {
            let targets: Vec<&Path> = operation.targets();
            if staged.iter().map(PathBuf::as_path).ne(targets) {
                self.abandon_deletion.notify_waiters();
            }
        }

        let entry = QueueEntry::new(operation);
        let id = entry.id.clone();
        let active = state.active.clone();
        let outdated = state.entries.iter().position(|queued| {
            Some(&queued.id) != active.as_ref() && queued.operation.is_outdated_by(&entry.operation)
        });

        match outdated {
            Some(index) => {
                let replaced = std::mem::replace(&mut state.entries[index], entry);
                log::debug!(
                    target: LOG_TARGET,
                    "Entry {} superseded by {}",
                    replaced.id,
                    id
                );
                if let Some(turn) = state.turns.remove(&replaced.id) {
                    let _ = turn.send(Turn::Superseded);
                }
                if let Some(followers) = state.followers.remove(&replaced.id) {
                    for follower in followers {
                        let _ = follower.send(false);
                    }
                }
            }
            None => state.entries.push_back(entry),
        }
        log::debug!(
            target: LOG_TARGET,
            "Submitted {} ({} queued)",
            id,
            state.entries.len()
        );

        if state.entries.len() == 1 && state.active.is_none() {
            state.active = Some(id.clone());
            return Admission::RunNow(id);
        }

        let (sender, receiver) = oneshot::channel();
        state.turns.insert(id.clone(), sender);
        Admission::Wait(id, receiver)
    }

    /// Remove a cancelled entry, handing the turn on if it was promoted.
    fn withdraw(&self, id: &str) {
        let mut state = self.lock();
        state.entries.retain(|entry| entry.id != id);
        state.turns.remove(id);
        if let Some(followers) = state.followers.remove(id) {
            for follower in followers {
                let _ = follower.send(false);
            }
        }
        if state.active.as_deref() == Some(id) {
            state.active = None;
            promote_next(&mut state);
        }
        log::debug!(target: LOG_TARGET, "Withdrew cancelled entry {}", id);
    }

    async fn execute(
        &self,
        id: String,
        operation: ShadowOperation,
        cancel: CancellationToken,
    ) -> Result<(), ShadowError> {
        let result = match &operation {
            ShadowOperation::Creation {
                target_path,
                desired_content,
            } => self.create(target_path, desired_content).await,
            ShadowOperation::Deletion { target_paths } => {
                self.delete(target_paths, &cancel).await
            }
        };

        match &result {
            Ok(()) => self.finish(&id, &operation, true),
            Err(ShadowError::Abandoned) => self.finish(&id, &operation, false),
            Err(err) => {
                log::error!(
                    target: LOG_TARGET,
                    "{} failed: {}",
                    operation.describe(),
                    err
                );
                self.reset("update failed");
            }
        }
        result
    }

    async fn create(&self, target_path: &Path, content: &str) -> Result<(), ShadowError> {
        let mut events = self.host.subscribe();
        self.host
            .write(target_path, content)
            .await
            .map_err(|source| ShadowError::io(target_path, source))?;

        // Wait for the engine to see the new text, unless it has nothing open.
        loop {
            match self.host.observed_text(target_path).await {
                None => return Ok(()),
                Some(observed) if observed == content => return Ok(()),
                Some(_) => {}
            }
            match events.recv().await {
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => return Ok(()),
            }
        }
    }

    async fn delete(
        &self,
        target_paths: &[PathBuf],
        cancel: &CancellationToken,
    ) -> Result<(), ShadowError> {
        let mut events = self.host.subscribe();
        let abandoned = self.abandon_deletion.notified();
        tokio::pin!(abandoned);
        abandoned.as_mut().enable();
        self.lock().staged_deletion = Some(target_paths.to_vec());

        let bulk_operation = async {
            loop {
                match events.recv().await {
                    Ok(HostEvent::BulkOperationStarted) => return,
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => std::future::pending::<()>().await,
                }
            }
        };

        let proceed = tokio::select! {
            _ = tokio::time::sleep(self.timings.deletion_grace) => true,
            _ = &mut abandoned => {
                log::debug!(target: LOG_TARGET, "Deletion abandoned for newer work");
                false
            }
            _ = bulk_operation => {
                log::debug!(target: LOG_TARGET, "Deletion abandoned for bulk operation");
                false
            }
            _ = cancel.cancelled() => false,
        };
        self.lock().staged_deletion = None;

        if !proceed {
            return Err(ShadowError::Abandoned);
        }

        for path in target_paths {
            if self.host.exists(path).await {
                self.host
                    .remove(path)
                    .await
                    .map_err(|source| ShadowError::io(path, source))?;
            }
        }
        Ok(())
    }

    /// Retire the active entry and hand the turn to the next one.
    fn finish(&self, id: &str, operation: &ShadowOperation, completed: bool) {
        let mut state = self.lock();
        if state.active.as_deref() != Some(id) {
            // The queue was reset while this entry ran
            return;
        }

        state.entries.retain(|entry| entry.id != id);
        state.active = None;

        if completed {
            match operation {
                ShadowOperation::Creation {
                    target_path,
                    desired_content,
                } => {
                    state
                        .last_written
                        .insert(target_path.clone(), desired_content.clone());
                }
                ShadowOperation::Deletion { target_paths } => {
                    for path in target_paths {
                        state.last_written.remove(path);
                    }
                }
            }
        }
        if let Some(followers) = state.followers.remove(id) {
            for follower in followers {
                let _ = follower.send(completed);
            }
        }

        promote_next(&mut state);
    }

    /// Drop every entry. Waiters observe their turn signal closing.
    fn reset(&self, reason: &str) {
        let mut state = self.lock();
        let dropped = state.entries.len();
        *state = QueueState::default();
        log::warn!(
            target: LOG_TARGET,
            "Shadow update queue reset ({}); dropped {} entries",
            reason,
            dropped
        );
    }
}

/// Promote the oldest entry whose submitter is still waiting.
fn promote_next(state: &mut QueueState) {
    while state.active.is_none() {
        let Some(next) = state.entries.front().map(|entry| entry.id.clone()) else {
            return;
        };
        let promoted = state
            .turns
            .remove(&next)
            .is_some_and(|turn| turn.send(Turn::Run).is_ok());
        if promoted {
            log::debug!(target: LOG_TARGET, "Promoted {}", next);
            state.active = Some(next);
        } else {
            log::debug!(target: LOG_TARGET, "Dropping abandoned entry {}", next);
            state.entries.pop_front();
            if let Some(followers) = state.followers.remove(&next) {
                for follower in followers {
                    let _ = follower.send(false);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shadow::memory::MemoryHost;

    fn timings() -> QueueTimings {
        QueueTimings {
            timeout: Duration::from_secs(10),
            slow_notice: Duration::from_secs(5),
            deletion_grace: Duration::from_secs(5),
        }
    }

    fn queue() -> (Arc<MemoryHost>, ShadowQueue<MemoryHost>) {
        let host = Arc::new(MemoryHost::new());
        let queue = ShadowQueue::new(Arc::clone(&host), timings());
        (host, queue)
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn uncontended_creation_runs_immediately() {
        let (host, queue) = queue();
        assert!(queue.submit(UpdateRequest::creation("/s/a.js", "one")).await);
        assert_eq!(host.writes_to(Path::new("/s/a.js")), vec!["one".to_string()]);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn repeated_content_is_not_rewritten() {
        let (host, queue) = queue();
        assert!(queue.submit(UpdateRequest::creation("/s/a.js", "one")).await);
        assert!(queue.submit(UpdateRequest::creation("/s/a.js", "one")).await);
        assert_eq!(host.writes().len(), 1);
    }

    #[tokio::test]
    async fn cancelled_before_submission_never_enters() {
        let (host, queue) = queue();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let request = UpdateRequest::creation("/s/a.js", "one").with_cancel(cancel);
        assert!(matches!(
            queue.try_submit(request).await,
            Err(ShadowError::Cancelled)
        ));
        assert!(host.writes().is_empty());
    }

    #[tokio::test]
    async fn cancelling_queued_entry_removes_it() {
        let (host, queue) = queue();
        host.hold("/s/b.js");

        let blocker = tokio::spawn({
            let queue = queue.clone();
            async move { queue.submit(UpdateRequest::creation("/s/b.js", "b")).await }
        });
        settle().await;

        let cancel = CancellationToken::new();
        let waiting = tokio::spawn({
            let queue = queue.clone();
            let request = UpdateRequest::creation("/s/a.js", "a").with_cancel(cancel.clone());
            async move { queue.try_submit(request).await }
        });
        settle().await;
        assert_eq!(queue.len(), 2);

        cancel.cancel();
        assert!(matches!(waiting.await.unwrap(), Err(ShadowError::Cancelled)));
        assert_eq!(queue.len(), 1);

        host.release(Path::new("/s/b.js"));
        assert!(blocker.await.unwrap());
        assert!(host.writes_to(Path::new("/s/a.js")).is_empty());
    }

    #[tokio::test]
    async fn identical_submissions_share_one_write() {
        let (host, queue) = queue();
        host.hold("/s/a.js");

        let first = tokio::spawn({
            let queue = queue.clone();
            async move { queue.submit(UpdateRequest::creation("/s/a.js", "a")).await }
        });
        settle().await;
        let second = tokio::spawn({
            let queue = queue.clone();
            async move { queue.submit(UpdateRequest::creation("/s/a.js", "a")).await }
        });
        settle().await;

        host.release(Path::new("/s/a.js"));
        assert!(first.await.unwrap());
        assert!(second.await.unwrap());
        assert_eq!(host.writes().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn staged_deletion_runs_after_grace_period() {
        let (host, queue) = queue();
        host.insert("/s/a.js", "a");
        assert!(queue.submit(UpdateRequest::deletion(vec!["/s/a.js".into()])).await);
        assert_eq!(host.removals(), vec![PathBuf::from("/s/a.js")]);
    }

    #[tokio::test(start_paused = true)]
    async fn staged_deletion_gives_way_to_other_targets() {
        let (host, queue) = queue();
        host.insert("/s/a.js", "a");

        let deletion = tokio::spawn({
            let queue = queue.clone();
            async move {
                queue
                    .try_submit(UpdateRequest::deletion(vec!["/s/a.js".into()]))
                    .await
            }
        });
        settle().await;

        assert!(queue.submit(UpdateRequest::creation("/s/b.js", "b")).await);
        assert!(matches!(deletion.await.unwrap(), Err(ShadowError::Abandoned)));
        assert!(host.removals().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn bulk_operation_abandons_staged_deletion() {
        let (host, queue) = queue();
        host.insert("/s/a.js", "a");

        let deletion = tokio::spawn({
            let queue = queue.clone();
            async move {
                queue
                    .try_submit(UpdateRequest::deletion(vec!["/s/a.js".into()]))
                    .await
            }
        });
        settle().await;

        host.emit(HostEvent::BulkOperationStarted);
        assert!(matches!(deletion.await.unwrap(), Err(ShadowError::Abandoned)));
        assert!(host.removals().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_creation_sends_notice_then_times_out() {
        let (host, queue) = queue();
        host.hold("/s/a.js");
        let mut notices = queue.subscribe_notices();

        let result = queue.try_submit(UpdateRequest::creation("/s/a.js", "a")).await;
        assert!(matches!(result, Err(ShadowError::Timeout { millis: 10_000 })));
        assert_eq!(
            notices.try_recv().unwrap(),
            QueueNotice::SlowCreation {
                target_path: PathBuf::from("/s/a.js")
            }
        );
        assert!(queue.is_empty());
    }
}
