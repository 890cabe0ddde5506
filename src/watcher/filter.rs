use std::path::{Component, Path, PathBuf};

/// Name of the repository metadata directory
const GIT_DIR: &str = ".git";
const IGNORE_FILE: &str = ".gitignore";

/// Decide whether a changed path can affect `git status`
///
/// Inside `.git` only the index, HEAD and anything under `refs` matter.
/// Elsewhere, dot-prefixed names are editor and tool noise, except the
/// ignore file.
pub fn is_relevant(root: &Path, path: &Path) -> bool {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let names: Vec<String> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    let Some((first, rest)) = names.split_first() else {
        return false;
    };

    if first == GIT_DIR {
        return match rest {
            [name] => name == "index" || name == "HEAD",
            [refs, ..] => refs == "refs",
            [] => false,
        };
    }

    match names.last() {
        Some(name) if name.starts_with('.') => name == IGNORE_FILE,
        _ => true,
    }
}

/// Like [`is_relevant`], against whichever of `roots` contains `path`
///
/// The watcher keeps both the root as given and its canonical form, since
/// some platforms report events under the resolved path.
pub fn is_relevant_to_any(roots: &[PathBuf], path: &Path) -> bool {
    let root = roots
        .iter()
        .find(|root| path.starts_with(root))
        .map(PathBuf::as_path)
        .unwrap_or(Path::new(""));

    is_relevant(root, path)
}
