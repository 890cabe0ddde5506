use crate::git::types::{
    AheadBehind, DiffHunk, DiffLine, DiffStats, FileDiff, FileStatus, FileStatusKind,
    RepositoryStatus,
};

/// Parse `git status --porcelain=v2 --branch` output
///
/// Unrecognized lines are skipped; this never fails.
pub fn parse_status_porcelain_v2(output: &str) -> RepositoryStatus {
    let mut status = RepositoryStatus::default();

    for line in output.lines() {
        if let Some(head) = line.strip_prefix("# branch.head ") {
            status.branch = Some(head.to_string());
        } else if let Some(upstream) = line.strip_prefix("# branch.upstream ") {
            status.upstream = Some(upstream.to_string());
        } else if let Some(counts) = line.strip_prefix("# branch.ab ") {
            let mut tokens = counts.split_whitespace();
            if let Some(ahead) = tokens.next().and_then(|t| t.strip_prefix('+')) {
                status.ahead = ahead.parse().unwrap_or(0);
            }
            if let Some(behind) = tokens.next().and_then(|t| t.strip_prefix('-')) {
                status.behind = behind.parse().unwrap_or(0);
            }
        } else if line.starts_with("1 ") || line.starts_with("2 ") {
            if let Some(entry) = parse_changed_entry(line) {
                status.files.push(entry);
            }
        } else if let Some(path) = line.strip_prefix("? ") {
            status.files.push(FileStatus {
                path: path.to_string(),
                original_path: None,
                staged_status: Some(FileStatusKind::Untracked),
                unstaged_status: Some(FileStatusKind::Untracked),
            });
        } else if line.starts_with("u ") {
            if let Some(entry) = parse_unmerged_entry(line) {
                status.files.push(entry);
            }
        }
    }

    status
}

/// Ordinary (`1`) and rename/copy (`2`) entries:
///
/// `1 <XY> <sub> <mH> <mI> <mW> <hH> <hI> <path>`
/// `2 <XY> <sub> <mH> <mI> <mW> <hH> <hI> <X><score> <path><TAB><origPath>`
///
/// Everything from the ninth field on is taken as the path, so for `2`
/// entries the `<X><score>` token stays attached to the front of `path`.
fn parse_changed_entry(line: &str) -> Option<FileStatus> {
    let parts: Vec<&str> = line.splitn(9, ' ').collect();
    if parts.len() < 9 {
        return None;
    }

    let (staged_status, unstaged_status) = parse_xy(parts[1])?;
    let path_field = parts[8];

    let (path, original_path) = if parts[0] == "2" {
        match path_field.split_once('\t') {
            Some((path, original)) => (path.to_string(), Some(original.to_string())),
            None => (path_field.to_string(), None),
        }
    } else {
        (path_field.to_string(), None)
    };

    Some(FileStatus {
        path,
        original_path,
        staged_status,
        unstaged_status,
    })
}

/// `u <XY> <sub> <m1> <m2> <m3> <mW> <h1> <h2> <h3> <path>`
fn parse_unmerged_entry(line: &str) -> Option<FileStatus> {
    let parts: Vec<&str> = line.splitn(11, ' ').collect();
    let path = match parts.len() {
        11 => parts[10],
        _ => line.split_whitespace().last()?,
    };

    Some(FileStatus {
        path: path.to_string(),
        original_path: None,
        staged_status: Some(FileStatusKind::Unmerged),
        unstaged_status: Some(FileStatusKind::Unmerged),
    })
}

fn parse_xy(xy: &str) -> Option<(Option<FileStatusKind>, Option<FileStatusKind>)> {
    let mut chars = xy.chars();
    let x = chars.next()?;
    let y = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    Some((FileStatusKind::from_code(x), FileStatusKind::from_code(y)))
}

/// Line ranges declared by a hunk header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HunkRange {
    pub old_start: u32,
    pub old_count: u32,
    pub new_start: u32,
    pub new_count: u32,
}

/// Scan `@@ -oldStart[,oldCount] +newStart[,newCount] @@[ section]`
///
/// Omitted counts default to 1.
pub fn parse_hunk_header(line: &str) -> Option<HunkRange> {
    let rest = line.strip_prefix("@@ -")?;
    let (old, rest) = rest.split_once(" +")?;
    let (new, rest) = rest.split_once(' ')?;
    if !rest.starts_with("@@") {
        return None;
    }

    let (old_start, old_count) = parse_range(old)?;
    let (new_start, new_count) = parse_range(new)?;

    Some(HunkRange {
        old_start,
        old_count,
        new_start,
        new_count,
    })
}

fn parse_range(range: &str) -> Option<(u32, u32)> {
    match range.split_once(',') {
        Some((start, count)) => Some((start.parse().ok()?, count.parse().ok()?)),
        None => Some((range.parse().ok()?, 1)),
    }
}

/// Parse `git diff` output into one entry per file, in output order
pub fn parse_diff(output: &str) -> Vec<FileDiff> {
    let mut parser = DiffParser::default();
    for line in output.lines() {
        parser.feed(line);
    }
    parser.finish()
}

#[derive(Default)]
struct DiffParser {
    files: Vec<FileDiff>,
    file: Option<FileDiff>,
    hunk: Option<HunkState>,
}

struct HunkState {
    hunk: DiffHunk,
    old_line: u32,
    new_line: u32,
}

impl DiffParser {
    fn feed(&mut self, line: &str) {
        if let Some(header) = line.strip_prefix("diff --git ") {
            self.finish_file();
            self.file = Some(FileDiff {
                path: path_from_git_header(header),
                old_path: None,
                is_binary: false,
                hunks: Vec::new(),
            });
            return;
        }

        // Anything before the first file header is noise
        let Some(file) = self.file.as_mut() else {
            return;
        };

        // Extended header lines only appear before the first hunk of a file
        if self.hunk.is_none() {
            if let Some(old) = line.strip_prefix("--- a/") {
                file.old_path = Some(old.to_string());
                return;
            }
            if let Some(new) = line.strip_prefix("+++ b/") {
                file.path = new.to_string();
                return;
            }
            if let Some(old) = line.strip_prefix("rename from ") {
                file.old_path = Some(old.to_string());
                return;
            }
            if let Some(new) = line.strip_prefix("rename to ") {
                file.path = new.to_string();
                return;
            }
            if line.starts_with("--- ") || line.starts_with("+++ ") {
                return;
            }
        }

        if line.starts_with("Binary files") {
            file.is_binary = true;
            return;
        }

        if line.starts_with("@@") {
            if file.is_binary {
                return;
            }
            self.finish_hunk();
            if let Some(range) = parse_hunk_header(line) {
                self.hunk = Some(HunkState {
                    hunk: DiffHunk {
                        header: line.to_string(),
                        old_start: range.old_start,
                        old_count: range.old_count,
                        new_start: range.new_start,
                        new_count: range.new_count,
                        lines: vec![DiffLine::hunk_header(line)],
                    },
                    old_line: range.old_start,
                    new_line: range.new_start,
                });
            }
            return;
        }

        let Some(state) = self.hunk.as_mut() else {
            return;
        };

        if let Some(content) = line.strip_prefix('+') {
            state.hunk.lines.push(DiffLine::addition(content, state.new_line));
            state.new_line = state.new_line.saturating_add(1);
        } else if let Some(content) = line.strip_prefix('-') {
            state.hunk.lines.push(DiffLine::deletion(content, state.old_line));
            state.old_line = state.old_line.saturating_add(1);
        } else if line.is_empty() || line.starts_with(' ') {
            let content = line.strip_prefix(' ').unwrap_or("");
            state
                .hunk
                .lines
                .push(DiffLine::context(content, state.old_line, state.new_line));
            state.old_line = state.old_line.saturating_add(1);
            state.new_line = state.new_line.saturating_add(1);
        }
        // `\ No newline at end of file` and similar markers are dropped
    }

    fn finish_hunk(&mut self) {
        if let Some(state) = self.hunk.take() {
            if let Some(file) = self.file.as_mut() {
                file.hunks.push(state.hunk);
            }
        }
    }

    fn finish_file(&mut self) {
        self.finish_hunk();
        if let Some(mut file) = self.file.take() {
            if file.old_path.as_deref() == Some(file.path.as_str()) {
                file.old_path = None;
            }
            if file.is_binary {
                file.hunks.clear();
            }
            self.files.push(file);
        }
    }

    fn finish(mut self) -> Vec<FileDiff> {
        self.finish_file();
        self.files
    }
}

/// Take the path after the last ` b/` of `a/<old> b/<new>`
fn path_from_git_header(header: &str) -> String {
    match header.rfind(" b/") {
        Some(idx) => header[idx + 3..].to_string(),
        None => header
            .split_whitespace()
            .last()
            .unwrap_or_default()
            .to_string(),
    }
}

/// Parse `git diff --numstat` output
///
/// Lines whose counts are not numeric (binary files report `-`) are skipped
/// and do not count towards `files_changed`.
pub fn parse_numstat(output: &str) -> DiffStats {
    let mut stats = DiffStats::default();

    for line in output.lines() {
        let mut fields = line.splitn(3, '\t');
        let (Some(insertions), Some(deletions), Some(_path)) =
            (fields.next(), fields.next(), fields.next())
        else {
            continue;
        };

        if let (Ok(insertions), Ok(deletions)) =
            (insertions.parse::<u64>(), deletions.parse::<u64>())
        {
            stats.insertions = stats.insertions.saturating_add(insertions);
            stats.deletions = stats.deletions.saturating_add(deletions);
            stats.files_changed += 1;
        }
    }

    stats
}

/// Parse `git rev-list --left-right --count @{u}...HEAD`
///
/// The left count is commits only on the upstream (behind), the right count
/// is commits only on HEAD (ahead). Anything else yields zeros.
pub fn parse_ahead_behind(output: &str) -> AheadBehind {
    let parts: Vec<&str> = output.trim().split('\t').collect();
    if parts.len() != 2 {
        return AheadBehind::default();
    }

    match (parts[0].trim().parse(), parts[1].trim().parse()) {
        (Ok(behind), Ok(ahead)) => AheadBehind { ahead, behind },
        _ => AheadBehind::default(),
    }
}
