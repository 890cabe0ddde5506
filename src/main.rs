use gitsense::git::{DiffLineKind, FileStatusKind};
use gitsense::{
    AppResult, ChangeWatcher, Config, DiffStats, FileDiff, GitExecutor, GitVersion, Repository,
    RepositoryStatus,
};
use std::env;
use std::io;
use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "Usage: gitsense [status|diff|stats|watch] [path]";

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> AppResult<()> {
    let mut args = env::args().skip(1);
    let command = args.next().unwrap_or_else(|| "status".to_string());
    if matches!(command.as_str(), "-h" | "--help" | "help") {
        println!("{}", USAGE);
        return Ok(());
    }

    let start = match args.next() {
        Some(path) => PathBuf::from(path),
        None => env::current_dir()?,
    };

    let config = Config::load()?;
    let executor = Arc::new(GitExecutor::from_config(&config)?);

    let version = GitVersion::validate(executor.as_ref())?;
    tracing::info!(%version, "git version");

    let discovered = Repository::discover_from(&start)?;
    let repo = Repository::with_runner(discovered.path(), executor);

    match command.as_str() {
        "status" => print_status(&repo.status()),
        "diff" => print_diffs(&repo.diff(None, false)),
        "stats" => print_stats(&repo.diff_stats(false, true)),
        "watch" => watch(&repo, &config)?,
        other => {
            eprintln!("{}", USAGE);
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unknown command: {}", other),
            )
            .into());
        }
    }

    Ok(())
}

/// Re-print the status after every debounced change until interrupted
fn watch(repo: &Repository, config: &Config) -> AppResult<()> {
    let (tx, rx) = mpsc::channel();
    let mut watcher = ChangeWatcher::with_config(repo.path(), config.watcher.clone(), move || {
        let _ = tx.send(());
    });
    watcher.start()?;

    print_status(&repo.status());
    // The callback runs on the watcher thread; refresh from here instead
    for () in rx {
        println!();
        print_status(&repo.status());
    }

    Ok(())
}

fn status_code(kind: Option<FileStatusKind>) -> char {
    kind.map_or('.', |k| k.code())
}

fn print_status(status: &RepositoryStatus) {
    let branch = status.branch.as_deref().unwrap_or("(no branch)");
    match &status.upstream {
        Some(upstream) => println!(
            "On branch {} [{}] ahead {}, behind {}",
            branch, upstream, status.ahead, status.behind
        ),
        None => println!("On branch {}", branch),
    }

    if status.is_clean() {
        println!("Nothing to commit, working tree clean");
        return;
    }

    for file in &status.files {
        let code = format!(
            "{}{}",
            status_code(file.staged_status),
            status_code(file.unstaged_status)
        );
        match &file.original_path {
            Some(original) => println!("{} {} -> {}", code, original, file.path),
            None => println!("{} {}", code, file.path),
        }
    }
}

fn print_diffs(diffs: &[FileDiff]) {
    for diff in diffs {
        match &diff.old_path {
            Some(old) => println!(
                "{} -> {} (+{} -{})",
                old,
                diff.path,
                diff.additions(),
                diff.deletions()
            ),
            None => println!("{} (+{} -{})", diff.path, diff.additions(), diff.deletions()),
        }

        if diff.is_binary {
            println!("  binary file");
            continue;
        }

        for hunk in &diff.hunks {
            for line in &hunk.lines {
                let old = line.old_line_number.map(|n| n.to_string()).unwrap_or_default();
                let new = line.new_line_number.map(|n| n.to_string()).unwrap_or_default();
                match line.kind {
                    DiffLineKind::HunkHeader | DiffLineKind::Header => println!("{}", line),
                    _ => println!("{:>5} {:>5} {}", old, new, line),
                }
            }
        }
    }
}

fn print_stats(stats: &DiffStats) {
    println!(
        "{} files changed, {} insertions(+), {} deletions(-)",
        stats.files_changed, stats.insertions, stats.deletions
    );
}
