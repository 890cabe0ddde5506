use std::io;
use std::time::Duration;
use thiserror::Error;

use crate::config::settings::ConfigError;
use crate::security::validator::ValidationError;

/// Errors that can occur during git operations
#[derive(Debug, Error)]
pub enum GitError {
    #[error("Not a git repository")]
    NotARepository,

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Failed to execute '{command}': {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("Command '{command}' failed with exit code {exit_code}: {message}")]
    CommandFailed {
        command: String,
        message: String,
        exit_code: i32,
    },

    #[error("Command '{command}' timed out after {}s and was terminated", timeout.as_secs())]
    Timeout { command: String, timeout: Duration },

    #[error("Git command rejected: {0}")]
    Rejected(#[from] ValidationError),

    #[error("Failed to parse git output: {0}")]
    ParseError(String),

    #[error("Git version {0} is too old. Minimum required: 2.23")]
    GitVersionTooOld(String),

    #[error("Failed to detect git version: {0}")]
    GitVersionDetectionFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

impl GitError {
    /// Exit code of a failed command, if the process ran to completion
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            GitError::CommandFailed { exit_code, .. } => Some(*exit_code),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, GitError::Timeout { .. })
    }
}

/// Errors raised while starting or running a working tree watcher
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("Watch root does not exist: {0}")]
    MissingRoot(String),

    #[error("Filesystem notification error: {0}")]
    Notify(#[from] notify::Error),

    #[error("Failed to start watcher thread: {0}")]
    Thread(#[from] io::Error),
}

/// Top-level application error that wraps all module-specific errors
///
/// All module errors convert to AppError via the `From` trait, so the binary
/// can use `?` across git, config and watcher calls.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Git error: {0}")]
    Git(#[from] GitError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Watcher error: {0}")]
    Watch(#[from] WatchError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for git operations
pub type GitResult<T> = std::result::Result<T, GitError>;

/// Alias kept for call sites that only deal with git
pub type Result<T> = GitResult<T>;

/// Result type for application-level operations
pub type AppResult<T> = std::result::Result<T, AppError>;
