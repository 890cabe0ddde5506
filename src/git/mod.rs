pub mod executor;
pub mod parser;
pub mod repository;
pub mod types;
pub mod version;

// Re-export commonly used types
pub use executor::{CommandOutput, CommandRunner, GitExecutor, DEFAULT_TIMEOUT};
pub use parser::{
    HunkRange, parse_ahead_behind, parse_diff, parse_hunk_header, parse_numstat,
    parse_status_porcelain_v2,
};
pub use repository::Repository;
pub use types::{
    AheadBehind, DiffHunk, DiffLine, DiffLineKind, DiffStats, FileDiff, FileStatus,
    FileStatusKind, RepositoryStatus,
};
pub use version::GitVersion;
