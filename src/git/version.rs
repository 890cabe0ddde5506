use crate::error::{GitError, GitResult};
use crate::git::executor::CommandRunner;
use std::path::Path;

/// Minimum required git version (`git restore` first shipped in 2.23)
const MIN_GIT_VERSION: (u32, u32) = (2, 23);

/// Represents a git version
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct GitVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl GitVersion {
    /// Detect the version of the git binary behind `runner`
    pub fn detect(runner: &dyn CommandRunner) -> GitResult<Self> {
        let cwd = std::env::temp_dir();
        Self::detect_in(runner, &cwd)
    }

    /// Detect the version, running git from `working_dir`
    pub fn detect_in(runner: &dyn CommandRunner, working_dir: &Path) -> GitResult<Self> {
        let output = runner
            .run(&["version"], working_dir)
            .map_err(|e| GitError::GitVersionDetectionFailed(e.to_string()))?;

        Self::parse(&output)
    }

    /// Parse git version from string like "git version 2.39.2"
    pub fn parse(version_str: &str) -> GitResult<Self> {
        // Expected format: "git version X.Y.Z" or "git version X.Y.Z.windows.1" etc.
        let parts: Vec<&str> = version_str.split_whitespace().collect();

        if parts.len() < 3 || parts[0] != "git" || parts[1] != "version" {
            return Err(GitError::ParseError(format!(
                "Unexpected git version format: {}",
                version_str
            )));
        }

        let version_nums = parts[2];
        let nums: Vec<&str> = version_nums.split('.').collect();

        if nums.len() < 2 {
            return Err(GitError::ParseError(format!(
                "Invalid version number format: {}",
                version_nums
            )));
        }

        let major = nums[0]
            .parse::<u32>()
            .map_err(|_| GitError::ParseError(format!("Invalid major version: {}", nums[0])))?;

        let minor = nums[1]
            .parse::<u32>()
            .map_err(|_| GitError::ParseError(format!("Invalid minor version: {}", nums[1])))?;

        // Patch may carry suffixes such as "2-rc1"
        let patch = nums
            .get(2)
            .and_then(|p| {
                let digits: String = p.chars().take_while(char::is_ascii_digit).collect();
                digits.parse::<u32>().ok()
            })
            .unwrap_or(0);

        Ok(GitVersion {
            major,
            minor,
            patch,
        })
    }

    /// Check if this version meets minimum requirements
    pub fn is_supported(&self) -> bool {
        (self.major, self.minor) >= MIN_GIT_VERSION
    }

    /// Detect the version and fail if it is older than the minimum
    pub fn validate(runner: &dyn CommandRunner) -> GitResult<Self> {
        let version = Self::detect(runner)?;

        if !version.is_supported() {
            return Err(GitError::GitVersionTooOld(format!(
                "{}\n\nPlease upgrade git to version {}.{} or higher.\n\
                 Visit: https://git-scm.com/downloads",
                version, MIN_GIT_VERSION.0, MIN_GIT_VERSION.1
            )));
        }

        Ok(version)
    }
}

impl std::fmt::Display for GitVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
