//! Error handling types for reqfile-ls
//!
//! This module provides the error types shared by the parser, the shadow
//! document machinery and the configuration layer.

use std::path::PathBuf;
use std::sync::PoisonError;
use thiserror::Error;

/// Errors surfaced by the block parser.
///
/// Unterminated blocks are not errors; they come back as trailing
/// outside-of-block text. The only hard failure is the JSON sub-parser
/// disagreeing with itself about where a block ends.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The closing-bracket scan and the JSON tokenizer disagree about the end of a block
    #[error(
        "JSON block '{block}' starting on line {line}: closing bracket on line {closing_line} does not end a balanced JSON value"
    )]
    JsonBlockEndMismatch {
        block: String,
        line: u32,
        closing_line: u32,
    },
}

/// Errors produced while mutating or observing the shadow document.
#[derive(Debug, Error)]
pub enum ShadowError {
    /// The host failed to read, write or remove a file
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The submission did not finish within the absolute timeout
    #[error("Shadow update timed out after {millis}ms")]
    Timeout { millis: u64 },

    /// The caller cancelled the request
    #[error("Shadow update cancelled")]
    Cancelled,

    /// The queue was reset while the request was pending
    #[error("Shadow update queue was reset")]
    Reset,

    /// A newer request for the same target replaced this one
    #[error("Shadow update superseded by a newer request")]
    Superseded,

    /// A staged deletion gave way to other work
    #[error("Shadow deletion abandoned")]
    Abandoned,
}

impl ShadowError {
    /// Create an IO error for a path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ShadowError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors produced while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for our settings
    #[error("Invalid config {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Settings received over LSP were not valid
    #[error("Invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Comprehensive error type for reqfile-ls operations
#[derive(Debug, Error)]
pub enum ReqlsError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Shadow(#[from] ShadowError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A request file could not be read
    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot serialize output: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for reqfile-ls operations
pub type ReqlsResult<T> = Result<T, ReqlsError>;

impl ReqlsError {
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ReqlsError::Read {
            path: path.into(),
            source,
        }
    }
}

/// Helper trait to recover the guard from a poisoned lock
pub trait LockResultExt<T> {
    /// Return the guard even if the lock was poisoned, logging the recovery.
    ///
    /// The context parameter identifies which operation triggered lock recovery.
    fn recover_poison(self, context: &str) -> T;
}

impl<T> LockResultExt<T> for Result<T, PoisonError<T>> {
    fn recover_poison(self, context: &str) -> T {
        match self {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!(
                    target: "reqfile_ls::lock_recovery",
                    "Recovered from poisoned lock in {}",
                    context
                );
                poisoned.into_inner()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::thread;

    #[test]
    fn recover_poison_returns_inner_guard() {
        let shared = Arc::new(Mutex::new(1));
        let clone = Arc::clone(&shared);

        let _ = thread::spawn(move || {
            let _guard = clone.lock().unwrap();
            panic!("Intentional panic to poison the lock");
        })
        .join();

        assert!(shared.is_poisoned());
        let mut guard = shared.lock().recover_poison("test");
        *guard += 1;
        assert_eq!(*guard, 2);
    }

    #[test]
    fn json_mismatch_message_names_block_and_lines() {
        let err = ParseError::JsonBlockEndMismatch {
            block: "body:json".to_string(),
            line: 3,
            closing_line: 9,
        };
        let message = err.to_string();
        assert!(message.contains("body:json"));
        assert!(message.contains("line 3"));
        assert!(message.contains("line 9"));
    }
}
