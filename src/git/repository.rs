use crate::error::{GitError, Result};
use crate::git::executor::{CommandRunner, GitExecutor};
use crate::git::parser;
use crate::git::types::{AheadBehind, DiffStats, FileDiff, RepositoryStatus};
use std::env;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// A git working tree and the operations the UI performs on it
///
/// Read operations never fail: when git cannot answer they log the cause and
/// return an empty or zero value. Mutating operations return the error.
///
/// Calls are not serialized against each other. Callers that mutate while
/// reading on another thread must order those calls themselves.
#[derive(Clone)]
pub struct Repository {
    path: PathBuf,
    runner: Arc<dyn CommandRunner>,
}

impl Repository {
    /// Detect git repository from current working directory
    pub fn discover() -> Result<Self> {
        let current_dir = env::current_dir()?;
        Self::discover_from(&current_dir)
    }

    /// Detect git repository starting from a specific directory
    ///
    /// A relative start path is resolved against the current directory first,
    /// so the returned repository path is always absolute.
    pub fn discover_from<P: AsRef<Path>>(start_path: P) -> Result<Self> {
        let mut current = resolve_start(start_path.as_ref())?;

        loop {
            // `.git` is a directory in a normal clone and a file in a linked worktree
            if current.join(".git").exists() {
                return Ok(Self::new(current));
            }

            if !current.pop() {
                return Err(GitError::NotARepository);
            }
        }
    }

    /// Create a Repository for a known git directory using the default executor
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self::with_runner(path, Arc::new(GitExecutor::new()))
    }

    /// Like [`Repository::new`], but checks that `path` is a directory
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_dir() {
            return Err(GitError::InvalidPath(path.display().to_string()));
        }
        Ok(Self::new(path))
    }

    /// Create a Repository that runs git through `runner`
    pub fn with_runner<P: AsRef<Path>>(path: P, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            runner,
        }
    }

    /// Get the repository path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the command runner for this repository
    pub fn runner(&self) -> &Arc<dyn CommandRunner> {
        &self.runner
    }

    /// Branch, upstream, ahead/behind and per-file status
    pub fn status(&self) -> RepositoryStatus {
        self.read(&["status", "--porcelain=v2", "--branch"])
            .map(|output| parser::parse_status_porcelain_v2(&output))
            .unwrap_or_default()
    }

    /// True when git reports no changes at all; false if git cannot tell
    pub fn is_clean(&self) -> bool {
        self.read(&["status", "--porcelain"])
            .is_some_and(|output| output.is_empty())
    }

    /// Parsed diff of the working tree (or the index when `staged`),
    /// optionally limited to one path
    pub fn diff(&self, file: Option<&str>, staged: bool) -> Vec<FileDiff> {
        let mut args = vec!["diff", "--no-color"];
        if staged {
            args.push("--staged");
        }
        if let Some(file) = file {
            args.push("--");
            args.push(file);
        }

        match self.read(&args) {
            Some(output) if !output.is_empty() => parser::parse_diff(&output),
            _ => Vec::new(),
        }
    }

    /// Insertion/deletion totals
    ///
    /// With `include_untracked` (ignored when `staged`), every untracked file
    /// is sized by diffing it against an empty file and added to the totals.
    pub fn diff_stats(&self, staged: bool, include_untracked: bool) -> DiffStats {
        let mut args = vec!["diff", "--stat", "--numstat"];
        if staged {
            args.push("--staged");
        }

        let mut stats = self
            .read(&args)
            .map(|output| parser::parse_numstat(&output))
            .unwrap_or_default();

        if !staged && include_untracked {
            let status = self.status();
            for file in status.untracked_files() {
                stats += self.untracked_stats(&file.path);
            }
        }

        stats
    }

    /// `--no-index` exits with 1 whenever the inputs differ, so both 0 and 1
    /// are successful outcomes here
    fn untracked_stats(&self, path: &str) -> DiffStats {
        let args = ["diff", "--numstat", "--no-index", "--", "/dev/null", path];
        match self.runner.run_raw(&args, &self.path) {
            Ok(output) if output.exit_code == 0 || output.exit_code == 1 => {
                parser::parse_numstat(&output.stdout)
            }
            Ok(output) => {
                debug!(
                    path,
                    exit_code = output.exit_code,
                    stderr = %output.stderr,
                    "could not size untracked file"
                );
                DiffStats::default()
            }
            Err(e) => {
                self.log_read_failure(&e);
                DiffStats::default()
            }
        }
    }

    /// Stage the given paths; no-op for an empty list
    pub fn stage<S: AsRef<str>>(&self, paths: &[S]) -> Result<()> {
        self.mutate_paths(&["add", "--"], paths)
    }

    /// Remove the given paths from the index, keeping working tree changes
    pub fn unstage<S: AsRef<str>>(&self, paths: &[S]) -> Result<()> {
        self.mutate_paths(&["restore", "--staged", "--"], paths)
    }

    /// Throw away working tree changes to the given paths
    pub fn discard_changes<S: AsRef<str>>(&self, paths: &[S]) -> Result<()> {
        self.mutate_paths(&["restore", "--"], paths)
    }

    pub fn stage_all(&self) -> Result<()> {
        self.mutate(&["add", "-A"])
    }

    pub fn unstage_all(&self) -> Result<()> {
        self.mutate(&["reset", "HEAD"])
    }

    pub fn commit(&self, message: &str) -> Result<()> {
        self.mutate(&["commit", "-m", message])
    }

    /// Current branch name; `None` when detached or when git fails
    pub fn current_branch(&self) -> Option<String> {
        self.read(&["branch", "--show-current"])
            .filter(|branch| !branch.is_empty())
    }

    /// True if HEAD has commits its upstream does not
    pub fn has_unpushed_commits(&self) -> bool {
        self.read(&["log", "@{u}..", "--oneline"])
            .is_some_and(|output| !output.is_empty())
    }

    /// Commits ahead of and behind the upstream; zeros without an upstream
    pub fn ahead_behind(&self) -> AheadBehind {
        self.read(&["rev-list", "--left-right", "--count", "@{u}...HEAD"])
            .map(|output| parser::parse_ahead_behind(&output))
            .unwrap_or_default()
    }

    /// Run a read query, logging and swallowing any failure
    fn read(&self, args: &[&str]) -> Option<String> {
        match self.runner.run(args, &self.path) {
            Ok(output) => Some(output),
            Err(e) => {
                self.log_read_failure(&e);
                None
            }
        }
    }

    fn log_read_failure(&self, error: &GitError) {
        match error {
            // Expected in fresh repos and on branches without an upstream
            GitError::CommandFailed { .. } => {
                debug!(
                    repo = %self.path.display(),
                    error = %error,
                    "git read failed, using default"
                );
            }
            _ => {
                warn!(
                    repo = %self.path.display(),
                    error = %error,
                    "git read failed, using default"
                );
            }
        }
    }

    fn mutate(&self, args: &[&str]) -> Result<()> {
        self.runner.run(args, &self.path).map(|_| ())
    }

    fn mutate_paths<S: AsRef<str>>(&self, base: &[&str], paths: &[S]) -> Result<()> {
        if paths.is_empty() {
            return Ok(());
        }

        let mut args: Vec<&str> = base.to_vec();
        for path in paths {
            let path = path.as_ref();
            if path.is_empty() {
                return Err(GitError::InvalidPath(path.to_string()));
            }
            args.push(path);
        }

        self.mutate(&args)
    }
}

/// Make `path` absolute and drop `.` and `..` components without touching
/// symlinks
fn resolve_start(path: &Path) -> Result<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(GitError::InvalidPath(String::new()));
    }

    let absolute = std::path::absolute(path)?;
    let mut resolved = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            other => resolved.push(other),
        }
    }
    Ok(resolved)
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::executor::CommandOutput;
    use crate::git::types::FileStatusKind;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    enum Reply {
        Output(&'static str),
        Exit(i32, &'static str),
        Timeout,
    }

    /// Runner that answers from a table keyed by the joined argument list
    #[derive(Default)]
    struct FakeRunner {
        replies: HashMap<String, Reply>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeRunner {
        fn reply(mut self, args: &str, reply: Reply) -> Self {
            self.replies.insert(args.to_string(), reply);
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl CommandRunner for FakeRunner {
        fn run(&self, args: &[&str], working_dir: &Path) -> Result<String> {
            let output = self.run_raw(args, working_dir)?;
            if output.success {
                Ok(output.stdout)
            } else {
                Err(GitError::CommandFailed {
                    command: format!("git {}", args.join(" ")),
                    message: output.stderr,
                    exit_code: output.exit_code,
                })
            }
        }

        fn run_raw(&self, args: &[&str], _working_dir: &Path) -> Result<CommandOutput> {
            let key = args.join(" ");
            self.calls.lock().unwrap().push(key.clone());

            match self.replies.get(&key) {
                Some(Reply::Output(stdout)) => Ok(CommandOutput {
                    stdout: stdout.to_string(),
                    stderr: String::new(),
                    exit_code: 0,
                    success: true,
                }),
                Some(Reply::Exit(code, stdout)) => Ok(CommandOutput {
                    stdout: stdout.to_string(),
                    stderr: "fatal: failed".to_string(),
                    exit_code: *code,
                    success: *code == 0,
                }),
                Some(Reply::Timeout) => Err(GitError::Timeout {
                    command: key,
                    timeout: Duration::from_secs(30),
                }),
                None => Ok(CommandOutput {
                    stdout: String::new(),
                    stderr: format!("no reply for {}", key),
                    exit_code: 128,
                    success: false,
                }),
            }
        }
    }

    fn fake_repo(runner: FakeRunner) -> (Repository, Arc<FakeRunner>) {
        let runner = Arc::new(runner);
        let repo = Repository::with_runner("/repo", runner.clone());
        (repo, runner)
    }

    #[test]
    fn test_status_parses_output() {
        let (repo, _) = fake_repo(FakeRunner::default().reply(
            "status --porcelain=v2 --branch",
            Reply::Output("# branch.head main\n# branch.ab +1 -0\n? new.txt"),
        ));

        let status = repo.status();
        assert_eq!(status.branch.as_deref(), Some("main"));
        assert_eq!(status.ahead, 1);
        assert_eq!(status.files[0].staged_status, Some(FileStatusKind::Untracked));
    }

    #[test]
    fn test_status_failure_yields_default() {
        let (repo, _) = fake_repo(
            FakeRunner::default().reply("status --porcelain=v2 --branch", Reply::Timeout),
        );
        assert_eq!(repo.status(), RepositoryStatus::default());
    }

    #[test]
    fn test_is_clean() {
        let (repo, _) =
            fake_repo(FakeRunner::default().reply("status --porcelain", Reply::Output("")));
        assert!(repo.is_clean());

        let (repo, _) =
            fake_repo(FakeRunner::default().reply("status --porcelain", Reply::Output(" M a.rs")));
        assert!(!repo.is_clean());

        let (repo, _) = fake_repo(FakeRunner::default());
        assert!(!repo.is_clean());
    }

    #[test]
    fn test_diff_arguments() {
        let (repo, runner) = fake_repo(FakeRunner::default());

        assert!(repo.diff(None, false).is_empty());
        assert!(repo.diff(Some("src/lib.rs"), true).is_empty());

        assert_eq!(
            runner.calls(),
            vec!["diff --no-color", "diff --no-color --staged -- src/lib.rs"]
        );
    }

    #[test]
    fn test_diff_parses_output() {
        let (repo, _) = fake_repo(FakeRunner::default().reply(
            "diff --no-color",
            Reply::Output("diff --git a/a b/a\n--- a/a\n+++ b/a\n@@ -1 +1 @@\n-x\n+y"),
        ));

        let files = repo.diff(None, false);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].additions(), 1);
    }

    #[test]
    fn test_diff_stats_with_untracked() {
        let (repo, runner) = fake_repo(
            FakeRunner::default()
                .reply("diff --stat --numstat", Reply::Output("10\t5\tfile.rs\n-\t-\timage.png"))
                .reply(
                    "status --porcelain=v2 --branch",
                    Reply::Output(
                        "# branch.head main\n? a.txt\n? b.txt\n\
                         1 .M N... 100644 100644 100644 x y file.rs",
                    ),
                )
                .reply(
                    "diff --numstat --no-index -- /dev/null a.txt",
                    Reply::Exit(1, "3\t0\ta.txt"),
                )
                .reply(
                    "diff --numstat --no-index -- /dev/null b.txt",
                    Reply::Exit(1, "7\t0\tb.txt"),
                ),
        );

        let stats = repo.diff_stats(false, true);
        assert_eq!((stats.insertions, stats.deletions, stats.files_changed), (20, 5, 3));
        assert_eq!(runner.calls().len(), 4);
    }

    #[test]
    fn test_diff_stats_staged_skips_untracked() {
        let (repo, runner) = fake_repo(
            FakeRunner::default()
                .reply("diff --stat --numstat --staged", Reply::Output("1\t1\ta.rs")),
        );

        let stats = repo.diff_stats(true, true);
        assert_eq!(stats.files_changed, 1);
        assert_eq!(runner.calls(), vec!["diff --stat --numstat --staged"]);
    }

    #[test]
    fn test_untracked_sizing_failure_is_ignored() {
        let (repo, _) = fake_repo(
            FakeRunner::default()
                .reply("diff --stat --numstat", Reply::Output(""))
                .reply("status --porcelain=v2 --branch", Reply::Output("? dir/"))
                .reply("diff --numstat --no-index -- /dev/null dir/", Reply::Exit(128, "")),
        );

        assert_eq!(repo.diff_stats(false, true), DiffStats::default());
    }

    #[test]
    fn test_mutations_build_whitelisted_commands() {
        let (repo, runner) = fake_repo(
            FakeRunner::default()
                .reply("add -- a.rs b.rs", Reply::Output(""))
                .reply("restore --staged -- a.rs", Reply::Output(""))
                .reply("restore -- -weird", Reply::Output(""))
                .reply("add -A", Reply::Output(""))
                .reply("reset HEAD", Reply::Output(""))
                .reply("commit -m Fix the thing", Reply::Output("[main abc123] Fix the thing")),
        );

        repo.stage(&["a.rs", "b.rs"]).unwrap();
        repo.unstage(&["a.rs"]).unwrap();
        repo.discard_changes(&["-weird"]).unwrap();
        repo.stage_all().unwrap();
        repo.unstage_all().unwrap();
        repo.commit("Fix the thing").unwrap();

        assert_eq!(runner.calls().len(), 6);
    }

    #[test]
    fn test_mutations_with_no_paths_are_noops() {
        let (repo, runner) = fake_repo(FakeRunner::default());
        let none: [&str; 0] = [];

        repo.stage(&none).unwrap();
        repo.unstage(&none).unwrap();
        repo.discard_changes(&none).unwrap();

        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_mutation_failure_propagates() {
        let (repo, _) = fake_repo(
            FakeRunner::default().reply("commit -m msg", Reply::Exit(1, "nothing to commit")),
        );

        let err = repo.commit("msg").unwrap_err();
        assert_eq!(err.exit_code(), Some(1));

        let (repo, _) = fake_repo(FakeRunner::default().reply("add -A", Reply::Timeout));
        assert!(repo.stage_all().unwrap_err().is_timeout());
    }

    #[test]
    fn test_empty_path_rejected() {
        let (repo, runner) = fake_repo(FakeRunner::default());

        let err = repo.stage(&["ok.rs", ""]).unwrap_err();
        assert!(matches!(err, GitError::InvalidPath(_)));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_current_branch() {
        let (repo, _) = fake_repo(
            FakeRunner::default().reply("branch --show-current", Reply::Output("feature/x")),
        );
        assert_eq!(repo.current_branch().as_deref(), Some("feature/x"));

        // Detached HEAD prints nothing
        let (repo, _) =
            fake_repo(FakeRunner::default().reply("branch --show-current", Reply::Output("")));
        assert_eq!(repo.current_branch(), None);

        let (repo, _) = fake_repo(FakeRunner::default());
        assert_eq!(repo.current_branch(), None);
    }

    #[test]
    fn test_has_unpushed_commits() {
        let (repo, _) = fake_repo(
            FakeRunner::default().reply("log @{u}.. --oneline", Reply::Output("abc123 Local work")),
        );
        assert!(repo.has_unpushed_commits());

        let (repo, _) =
            fake_repo(FakeRunner::default().reply("log @{u}.. --oneline", Reply::Output("")));
        assert!(!repo.has_unpushed_commits());

        // No upstream configured
        let (repo, _) = fake_repo(FakeRunner::default());
        assert!(!repo.has_unpushed_commits());
    }

    #[test]
    fn test_ahead_behind() {
        let (repo, _) = fake_repo(
            FakeRunner::default()
                .reply("rev-list --left-right --count @{u}...HEAD", Reply::Output("3\t5")),
        );
        assert_eq!(
            repo.ahead_behind(),
            AheadBehind {
                ahead: 5,
                behind: 3
            }
        );

        let (repo, _) = fake_repo(
            FakeRunner::default()
                .reply("rev-list --left-right --count @{u}...HEAD", Reply::Output("garbage")),
        );
        assert_eq!(repo.ahead_behind(), AheadBehind::default());

        let (repo, _) = fake_repo(FakeRunner::default());
        assert_eq!(repo.ahead_behind(), AheadBehind::default());
    }

    #[test]
    fn test_open_rejects_missing_directory() {
        let err = Repository::open("/definitely/not/here").unwrap_err();
        assert!(matches!(err, GitError::InvalidPath(_)));
    }

    #[test]
    fn test_discover_not_a_repo() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let result = Repository::discover_from(temp_dir.path());

        assert!(matches!(result.unwrap_err(), GitError::NotARepository));
    }

    #[test]
    fn test_resolve_start_normalizes_components() {
        let resolved = resolve_start(Path::new("/repo/src/./nested/../..")).unwrap();
        assert_eq!(resolved, PathBuf::from("/repo"));
    }

    #[test]
    fn test_resolve_start_makes_relative_paths_absolute() {
        let cwd = env::current_dir().unwrap();

        assert_eq!(resolve_start(Path::new("src")).unwrap(), cwd.join("src"));
        assert_eq!(resolve_start(Path::new(".")).unwrap(), cwd);
        assert!(matches!(
            resolve_start(Path::new("")),
            Err(GitError::InvalidPath(_))
        ));
    }
}
