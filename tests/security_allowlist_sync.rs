// Every command the repository facade issues must pass the allowlist

use gitsense::git::{CommandOutput, CommandRunner, Repository};
use gitsense::security::{ALLOWED_GIT_SUBCOMMANDS, CommandValidator, FORBIDDEN_GLOBAL_OPTIONS};
use gitsense::GitResult;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Runner that records argument vectors and answers with empty output
#[derive(Default)]
struct RecordingRunner {
    calls: Mutex<Vec<Vec<String>>>,
}

impl RecordingRunner {
    fn record(&self, args: &[&str]) {
        let owned = args.iter().map(|a| a.to_string()).collect();
        self.calls.lock().unwrap().push(owned);
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, args: &[&str], _working_dir: &Path) -> GitResult<String> {
        self.record(args);
        Ok(match args.first() {
            // Give diff_stats an untracked file so it also sizes it
            Some(&"status") if args.contains(&"--branch") => "? new.txt".to_string(),
            _ => String::new(),
        })
    }

    fn run_raw(&self, args: &[&str], _working_dir: &Path) -> GitResult<CommandOutput> {
        self.record(args);
        Ok(CommandOutput {
            stdout: String::new(),
            stderr: String::new(),
            exit_code: 1,
            success: false,
        })
    }
}

#[test]
fn test_allowlist_is_not_empty() {
    assert!(!ALLOWED_GIT_SUBCOMMANDS.is_empty());
}

#[test]
fn test_allowlist_excludes_remote_operations() {
    for cmd in ["push", "pull", "fetch", "clone", "merge", "rebase", "clean"] {
        assert!(
            !ALLOWED_GIT_SUBCOMMANDS.contains(&cmd),
            "Allowlist should not contain '{}'",
            cmd
        );
    }
}

#[test]
fn test_validator_uses_shared_allowlist() {
    let validator = CommandValidator::new();

    for subcommand in ALLOWED_GIT_SUBCOMMANDS {
        let result = validator.validate(&[*subcommand]);
        assert!(
            result.is_ok(),
            "Validator rejected allowed subcommand '{}': {:?}",
            subcommand,
            result
        );
    }

    for option in FORBIDDEN_GLOBAL_OPTIONS {
        assert!(validator.validate(&[*option, "status"]).is_err());
    }
}

#[test]
fn test_every_facade_command_is_allowed() {
    let runner = Arc::new(RecordingRunner::default());
    let repo = Repository::with_runner("/repo", runner.clone());

    repo.status();
    repo.is_clean();
    repo.diff(None, false);
    repo.diff(Some("a.rs"), true);
    repo.diff_stats(false, true);
    repo.diff_stats(true, false);
    repo.stage(&["a.rs"]).unwrap();
    repo.unstage(&["a.rs"]).unwrap();
    repo.discard_changes(&["a.rs"]).unwrap();
    repo.stage_all().unwrap();
    repo.unstage_all().unwrap();
    repo.commit("message").unwrap();
    repo.current_branch();
    repo.has_unpushed_commits();
    repo.ahead_behind();

    let validator = CommandValidator::new();
    let calls = runner.calls.lock().unwrap();
    assert!(calls.len() >= 16);

    for args in calls.iter() {
        assert!(
            validator.validate(args.as_slice()).is_ok(),
            "Facade issued a command outside the allowlist: {:?}",
            args
        );
    }

    let subcommands: Vec<&str> = calls.iter().map(|args| args[0].as_str()).collect();
    let expected = [
        "status", "diff", "add", "restore", "reset", "commit", "branch", "log", "rev-list",
    ];
    for used in expected {
        assert!(subcommands.contains(&used), "facade never issued '{}'", used);
    }
}
