pub mod validator;

pub use validator::{CommandValidator, ValidationError};

/// Allowlist of permitted git subcommands
///
/// Every invocation the repository facade builds starts with one of these.
/// The executor refuses to spawn anything else.
///
/// Adding a new subcommand requires careful security review.
pub const ALLOWED_GIT_SUBCOMMANDS: &[&str] = &[
    // Read operations
    "status",
    "diff",
    "branch",
    "log",
    "rev-list",
    "version",
    // Write operations (index and working tree only)
    "add",
    "restore",
    "reset",
    "commit",
];

/// Global options that change where or how git runs and are never passed
/// ahead of the subcommand.
pub const FORBIDDEN_GLOBAL_OPTIONS: &[&str] = &[
    "-c",
    "-C",
    "--exec-path",
    "--git-dir",
    "--work-tree",
    "--namespace",
];
