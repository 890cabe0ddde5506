pub mod audit;
pub mod config;
pub mod error;
pub mod git;
pub mod security;
pub mod watcher;

// Re-export commonly used types for convenience
pub use config::Config;
pub use error::{AppError, AppResult, GitError, GitResult, Result, WatchError};
pub use git::{
    CommandRunner, DiffStats, FileDiff, FileStatus, GitExecutor, GitVersion, Repository,
    RepositoryStatus,
};
pub use watcher::ChangeWatcher;
