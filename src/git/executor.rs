use crate::audit::{AuditLogger, CommandOutcome};
use crate::config::Config;
use crate::error::{GitError, Result};
use crate::security::CommandValidator;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, warn};

/// Default wall-clock limit for a single git invocation
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Result of executing a git command, without success/failure interpretation
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub success: bool,
}

/// Runs whitelisted git invocations in a working directory
///
/// This is the seam the repository facade depends on, so tests and callers
/// can substitute their own runner.
pub trait CommandRunner: Send + Sync {
    /// Run git and return trimmed stdout; a non-zero exit is an error
    fn run(&self, args: &[&str], working_dir: &Path) -> Result<String>;

    /// Run git and return both streams and the exit code, whatever it is
    fn run_raw(&self, args: &[&str], working_dir: &Path) -> Result<CommandOutput>;
}

/// Executes git commands as child processes with a timeout
#[derive(Debug, Clone)]
pub struct GitExecutor {
    binary: PathBuf,
    timeout: Duration,
    validator: CommandValidator,
    audit: Option<Arc<AuditLogger>>,
}

impl GitExecutor {
    /// Create an executor for `git` on PATH with the default timeout
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from("git"),
            timeout: DEFAULT_TIMEOUT,
            validator: CommandValidator::new(),
            audit: None,
        }
    }

    /// Build an executor from the `[git]` and `[audit]` config sections
    pub fn from_config(config: &Config) -> std::io::Result<Self> {
        let mut executor = Self::new()
            .with_binary(&config.git.binary)
            .with_timeout(config.git.timeout());

        if config.audit.log_commands {
            let logger = match &config.audit.log_path {
                Some(path) => AuditLogger::with_path(path)?,
                None => AuditLogger::new()?,
            };
            executor = executor.with_audit_log(logger);
        }

        Ok(executor)
    }

    pub fn with_binary<P: AsRef<Path>>(mut self, binary: P) -> Self {
        self.binary = binary.as_ref().to_path_buf();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_audit_log(mut self, logger: AuditLogger) -> Self {
        self.audit = Some(Arc::new(logger));
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run a git command without blocking the calling task
    pub async fn run_async(&self, args: &[&str], working_dir: &Path) -> Result<String> {
        let output = self.run_raw_async(args, working_dir).await?;
        self.interpret(args, output)
    }

    /// Async counterpart of [`CommandRunner::run_raw`]
    ///
    /// The child is killed when the timeout elapses; the returned error is
    /// [`GitError::Timeout`], never the partial output.
    pub async fn run_raw_async(&self, args: &[&str], working_dir: &Path) -> Result<CommandOutput> {
        self.validator.validate(args)?;

        let command = self.command_line(args);
        let started = Instant::now();

        let child = Command::new(&self.binary)
            .args(args)
            .current_dir(working_dir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(source) => {
                self.audit(&command, working_dir, CommandOutcome::SpawnFailed, started.elapsed());
                return Err(GitError::SpawnFailed { command, source });
            }
        };

        // Dropping the wait future on timeout drops the child, which kills it
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                warn!(
                    command = %command,
                    dir = %working_dir.display(),
                    timeout_secs = self.timeout.as_secs(),
                    "git command timed out, process killed"
                );
                self.audit(&command, working_dir, CommandOutcome::TimedOut, started.elapsed());
                return Err(GitError::Timeout {
                    command,
                    timeout: self.timeout,
                });
            }
        };

        let output = Self::process_output(output);
        let elapsed = started.elapsed();
        debug!(
            command = %command,
            dir = %working_dir.display(),
            exit_code = output.exit_code,
            elapsed_ms = elapsed.as_millis() as u64,
            "git command finished"
        );
        self.audit(&command, working_dir, CommandOutcome::Exited(output.exit_code), elapsed);

        Ok(output)
    }

    /// Decode both streams as UTF-8 and trim surrounding whitespace
    fn process_output(output: Output) -> CommandOutput {
        CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            exit_code: output.status.code().unwrap_or(-1),
            success: output.status.success(),
        }
    }

    /// Turn raw output into stdout or a `CommandFailed` error
    fn interpret(&self, args: &[&str], output: CommandOutput) -> Result<String> {
        if output.success {
            return Ok(output.stdout);
        }

        let message = if output.stderr.is_empty() {
            output.stdout
        } else {
            output.stderr
        };

        Err(GitError::CommandFailed {
            command: self.command_line(args),
            message,
            exit_code: output.exit_code,
        })
    }

    fn command_line(&self, args: &[&str]) -> String {
        let mut line = self.binary.display().to_string();
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }

    fn audit(&self, command: &str, working_dir: &Path, outcome: CommandOutcome, elapsed: Duration) {
        if let Some(logger) = &self.audit {
            if let Err(e) = logger.log_command(command, working_dir, outcome, elapsed) {
                warn!(
                    error = %e,
                    path = %logger.log_path().display(),
                    "failed to write command audit log"
                );
            }
        }
    }

    /// Drive an executor future to completion from synchronous code
    ///
    /// Uses a private current-thread runtime. When the caller is already inside
    /// a tokio runtime the work moves to a scoped thread, since a runtime cannot
    /// be entered twice on one thread.
    fn block_on<T, F>(future: F) -> Result<T>
    where
        T: Send,
        F: Future<Output = Result<T>> + Send,
    {
        let drive = move || -> Result<T> {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            runtime.block_on(future)
        };

        if tokio::runtime::Handle::try_current().is_err() {
            return drive();
        }

        std::thread::scope(|scope| match scope.spawn(drive).join() {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        })
    }
}

impl Default for GitExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for GitExecutor {
    fn run(&self, args: &[&str], working_dir: &Path) -> Result<String> {
        Self::block_on(self.run_async(args, working_dir))
    }

    fn run_raw(&self, args: &[&str], working_dir: &Path) -> Result<CommandOutput> {
        Self::block_on(self.run_raw_async(args, working_dir))
    }
}
