/// Status of one side (index or working tree) of a file entry
///
/// Mapped from the single-character codes of `git status --porcelain=v2`.
/// A `.` code means "no change" and is represented as `None` by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileStatusKind {
    Untracked,
    Modified,
    Added,
    Deleted,
    Renamed,
    Copied,
    Unmerged,
    Ignored,
    /// A code outside the known table, kept so it is not silently dropped
    Unknown(char),
}

impl FileStatusKind {
    /// Map a porcelain status character. `.` yields `None`.
    pub fn from_code(code: char) -> Option<Self> {
        let kind = match code {
            '.' => return None,
            '?' => FileStatusKind::Untracked,
            'M' | 'T' => FileStatusKind::Modified,
            'A' => FileStatusKind::Added,
            'D' => FileStatusKind::Deleted,
            'R' => FileStatusKind::Renamed,
            'C' => FileStatusKind::Copied,
            'U' => FileStatusKind::Unmerged,
            '!' => FileStatusKind::Ignored,
            other => FileStatusKind::Unknown(other),
        };
        Some(kind)
    }

    /// Wire character for this kind (`M` for both modified and type-changed)
    pub fn code(&self) -> char {
        match self {
            FileStatusKind::Untracked => '?',
            FileStatusKind::Modified => 'M',
            FileStatusKind::Added => 'A',
            FileStatusKind::Deleted => 'D',
            FileStatusKind::Renamed => 'R',
            FileStatusKind::Copied => 'C',
            FileStatusKind::Unmerged => 'U',
            FileStatusKind::Ignored => '!',
            FileStatusKind::Unknown(c) => *c,
        }
    }
}

/// One entry of a status snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStatus {
    pub path: String,
    /// Source path, only set for renames and copies
    pub original_path: Option<String>,
    pub staged_status: Option<FileStatusKind>,
    pub unstaged_status: Option<FileStatusKind>,
}

impl FileStatus {
    pub fn is_staged(&self) -> bool {
        self.staged_status
            .is_some_and(|kind| kind != FileStatusKind::Untracked)
    }

    pub fn has_unstaged_changes(&self) -> bool {
        self.unstaged_status
            .is_some_and(|kind| kind != FileStatusKind::Untracked)
    }

    pub fn is_untracked(&self) -> bool {
        self.staged_status == Some(FileStatusKind::Untracked)
            || self.unstaged_status == Some(FileStatusKind::Untracked)
    }

    pub fn has_conflicts(&self) -> bool {
        self.staged_status == Some(FileStatusKind::Unmerged)
            || self.unstaged_status == Some(FileStatusKind::Unmerged)
    }
}

/// Snapshot of the working tree as reported by `git status --porcelain=v2 --branch`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryStatus {
    pub branch: Option<String>,
    pub upstream: Option<String>,
    pub ahead: u32,
    pub behind: u32,
    pub files: Vec<FileStatus>,
}

impl RepositoryStatus {
    pub fn staged_files(&self) -> Vec<&FileStatus> {
        self.files.iter().filter(|f| f.is_staged()).collect()
    }

    /// Files with working tree changes, excluding untracked ones
    pub fn modified_files(&self) -> Vec<&FileStatus> {
        self.files
            .iter()
            .filter(|f| f.has_unstaged_changes() && !f.is_untracked())
            .collect()
    }

    pub fn untracked_files(&self) -> Vec<&FileStatus> {
        self.files.iter().filter(|f| f.is_untracked()).collect()
    }

    pub fn conflicted_files(&self) -> Vec<&FileStatus> {
        self.files.iter().filter(|f| f.has_conflicts()).collect()
    }

    pub fn is_clean(&self) -> bool {
        self.files.is_empty()
    }

    pub fn has_staged(&self) -> bool {
        self.files.iter().any(FileStatus::is_staged)
    }

    pub fn has_unpushed(&self) -> bool {
        self.ahead > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffLineKind {
    Context,
    Addition,
    Deletion,
    Header,
    HunkHeader,
}

impl DiffLineKind {
    /// Marker shown in front of the line content when rendering
    pub fn prefix(&self) -> &'static str {
        match self {
            DiffLineKind::Context => " ",
            DiffLineKind::Addition => "+",
            DiffLineKind::Deletion => "-",
            DiffLineKind::Header | DiffLineKind::HunkHeader => "",
        }
    }
}

/// A single line of a unified diff with its position in the old and new file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub kind: DiffLineKind,
    /// Line text without the leading marker
    pub content: String,
    pub old_line_number: Option<u32>,
    pub new_line_number: Option<u32>,
}

impl DiffLine {
    pub fn context(content: impl Into<String>, old: u32, new: u32) -> Self {
        Self {
            kind: DiffLineKind::Context,
            content: content.into(),
            old_line_number: Some(old),
            new_line_number: Some(new),
        }
    }

    pub fn addition(content: impl Into<String>, new: u32) -> Self {
        Self {
            kind: DiffLineKind::Addition,
            content: content.into(),
            old_line_number: None,
            new_line_number: Some(new),
        }
    }

    pub fn deletion(content: impl Into<String>, old: u32) -> Self {
        Self {
            kind: DiffLineKind::Deletion,
            content: content.into(),
            old_line_number: Some(old),
            new_line_number: None,
        }
    }

    pub fn hunk_header(content: impl Into<String>) -> Self {
        Self {
            kind: DiffLineKind::HunkHeader,
            content: content.into(),
            old_line_number: None,
            new_line_number: None,
        }
    }
}

impl std::fmt::Display for DiffLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.kind.prefix(), self.content)
    }
}

/// A contiguous block of changes introduced by an `@@` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffHunk {
    pub header: String,
    pub old_start: u32,
    pub old_count: u32,
    pub new_start: u32,
    pub new_count: u32,
    pub lines: Vec<DiffLine>,
}

impl DiffHunk {
    fn count(&self, kind: DiffLineKind) -> usize {
        self.lines.iter().filter(|line| line.kind == kind).count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub path: String,
    /// Previous path, only set when the file was renamed
    pub old_path: Option<String>,
    pub is_binary: bool,
    pub hunks: Vec<DiffHunk>,
}

impl FileDiff {
    pub fn additions(&self) -> usize {
        self.hunks.iter().map(|h| h.count(DiffLineKind::Addition)).sum()
    }

    pub fn deletions(&self) -> usize {
        self.hunks.iter().map(|h| h.count(DiffLineKind::Deletion)).sum()
    }

    pub fn is_renamed(&self) -> bool {
        self.old_path.is_some()
    }
}

/// Totals reported by `git diff --numstat`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffStats {
    pub insertions: u64,
    pub deletions: u64,
    pub files_changed: u64,
}

impl std::ops::AddAssign for DiffStats {
    fn add_assign(&mut self, other: Self) {
        self.insertions = self.insertions.saturating_add(other.insertions);
        self.deletions = self.deletions.saturating_add(other.deletions);
        self.files_changed = self.files_changed.saturating_add(other.files_changed);
    }
}

/// Commit counts relative to the upstream branch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AheadBehind {
    pub ahead: u32,
    pub behind: u32,
}
