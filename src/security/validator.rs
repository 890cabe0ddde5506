use std::collections::HashSet;
use thiserror::Error;
use crate::security::{ALLOWED_GIT_SUBCOMMANDS, FORBIDDEN_GLOBAL_OPTIONS};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Git subcommand not allowed: {0}")]
    DisallowedSubcommand(String),

    #[error("Command contains dangerous flags: {0}")]
    DangerousFlags(String),

    #[error("Argument contains a NUL byte: {0:?}")]
    NulByte(String),

    #[error("Invalid command format")]
    InvalidFormat,

    #[error("Empty command")]
    EmptyCommand,
}

/// Checks an argument vector against the subcommand allowlist before it is
/// handed to the git binary.
///
/// Arguments are never passed through a shell, so there is no operator
/// injection to look for. What matters is that the first argument is an
/// allowed subcommand and that no global option precedes it.
#[derive(Debug, Clone)]
pub struct CommandValidator {
    allowed_subcommands: HashSet<&'static str>,
    forbidden_options: HashSet<&'static str>,
}

impl CommandValidator {
    pub fn new() -> Self {
        Self {
            allowed_subcommands: ALLOWED_GIT_SUBCOMMANDS.iter().copied().collect(),
            forbidden_options: FORBIDDEN_GLOBAL_OPTIONS.iter().copied().collect(),
        }
    }

    /// Validate a git argument vector (without the leading `git`)
    pub fn validate<S: AsRef<str>>(&self, args: &[S]) -> Result<(), ValidationError> {
        let first = match args.first() {
            Some(first) => first.as_ref(),
            None => return Err(ValidationError::EmptyCommand),
        };

        if first.trim().is_empty() {
            return Err(ValidationError::EmptyCommand);
        }

        if first.starts_with('-') {
            let option = first.split('=').next().unwrap_or(first);
            if self.forbidden_options.contains(option) {
                return Err(ValidationError::DangerousFlags(option.to_string()));
            }
            return Err(ValidationError::InvalidFormat);
        }

        if !self.check_subcommand(first) {
            return Err(ValidationError::DisallowedSubcommand(first.to_string()));
        }

        if let Some(arg) = args.iter().map(AsRef::as_ref).find(|arg| arg.contains('\0')) {
            return Err(ValidationError::NulByte(arg.replace('\0', "\\0")));
        }

        Ok(())
    }

    /// Check if subcommand is in allowlist
    fn check_subcommand(&self, subcommand: &str) -> bool {
        self.allowed_subcommands.contains(subcommand)
    }
}

impl Default for CommandValidator {
    fn default() -> Self {
        Self::new()
    }
}
