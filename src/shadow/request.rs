//! Requests accepted by the shadow update queue.

use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;
use ulid::Ulid;

/// What a request does to the shadow document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShadowOperation {
    /// Write `desired_content` to `target_path`
    Creation {
        target_path: PathBuf,
        desired_content: String,
    },
    /// Remove every path in `target_paths`
    Deletion { target_paths: Vec<PathBuf> },
}

impl ShadowOperation {
    pub fn targets(&self) -> Vec<&Path> {
        match self {
            ShadowOperation::Creation { target_path, .. } => vec![target_path.as_path()],
            ShadowOperation::Deletion { target_paths } => {
                target_paths.iter().map(PathBuf::as_path).collect()
            }
        }
    }

    /// Whether `self`, queued earlier, is made pointless by `newer`.
    ///
    /// A newer creation for the same target replaces an older creation with
    /// different content.
    pub fn is_outdated_by(&self, newer: &ShadowOperation) -> bool {
        match (self, newer) {
            (
                ShadowOperation::Creation {
                    target_path: old_target,
                    desired_content: old_content,
                },
                ShadowOperation::Creation {
                    target_path,
                    desired_content,
                },
            ) => old_target == target_path && old_content != desired_content,
            _ => false,
        }
    }

    /// Whether two operations would have exactly the same effect.
    pub fn is_same_effect(&self, other: &ShadowOperation) -> bool {
        match (self, other) {
            (
                ShadowOperation::Deletion { target_paths: a },
                ShadowOperation::Deletion { target_paths: b },
            ) => {
                let mut a = a.clone();
                let mut b = b.clone();
                a.sort();
                b.sort();
                a == b
            }
            _ => self == other,
        }
    }

    pub fn is_deletion(&self) -> bool {
        matches!(self, ShadowOperation::Deletion { .. })
    }

    pub fn describe(&self) -> String {
        match self {
            ShadowOperation::Creation { target_path, .. } => {
                format!("creation of {}", target_path.display())
            }
            ShadowOperation::Deletion { target_paths } => {
                format!("deletion of {} path(s)", target_paths.len())
            }
        }
    }
}

/// One submission to the queue.
#[derive(Debug, Clone)]
pub struct UpdateRequest {
    pub operation: ShadowOperation,
    pub cancel: CancellationToken,
}

impl UpdateRequest {
    pub fn creation(target_path: impl Into<PathBuf>, desired_content: impl Into<String>) -> Self {
        Self {
            operation: ShadowOperation::Creation {
                target_path: target_path.into(),
                desired_content: desired_content.into(),
            },
            cancel: CancellationToken::new(),
        }
    }

    pub fn deletion(target_paths: Vec<PathBuf>) -> Self {
        Self {
            operation: ShadowOperation::Deletion { target_paths },
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// A request as stored in the queue.
#[derive(Debug, Clone)]
pub(crate) struct QueueEntry {
    pub(crate) id: String,
    pub(crate) operation: ShadowOperation,
}

impl QueueEntry {
    pub(crate) fn new(operation: ShadowOperation) -> Self {
        Self {
            id: Ulid::new().to_string(),
            operation,
        }
    }
}
