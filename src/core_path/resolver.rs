use super::PathError;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::task;

/// Resolves a client-supplied path to a canonical path inside `root`.
///
/// * no argument: the current directory is used as is
/// * `/x`: rooted at the server root, never at the real filesystem root
/// * `x`: joined onto `cwd`
///
/// The candidate is canonicalized (`.`, `..` and symlinks resolved). When the
/// final component does not exist yet, the parent is canonicalized instead and
/// the leaf name is appended verbatim, so STOR and MKD targets resolve while
/// every existing prefix is still checked. The containment test runs on the
/// canonical path, so a symlink planted inside the tree cannot lead out of it.
pub fn resolve_path(cwd: &Path, root: &Path, arg: Option<&str>) -> Result<PathBuf, PathError> {
    let candidate = match arg.filter(|arg| !arg.is_empty()) {
        None => cwd.to_path_buf(),
        Some(arg) if arg.starts_with('/') => {
            let mut rooted = root.as_os_str().to_owned();
            rooted.push(arg);
            PathBuf::from(rooted)
        }
        Some(arg) => cwd.join(arg),
    };

    let resolved = match fs::canonicalize(&candidate) {
        Ok(path) => path,
        Err(_) => resolve_missing_leaf(&candidate)?,
    };

    if !is_within_root(&resolved, root) {
        return Err(PathError::OutsideRoot(resolved));
    }

    Ok(resolved)
}

/// Runs `resolve_path` on the blocking thread pool, for use from handlers.
pub async fn resolve_client_path(
    cwd: &Path,
    root: &Path,
    arg: Option<&str>,
) -> Result<PathBuf, PathError> {
    let cwd = cwd.to_path_buf();
    let root = root.to_path_buf();
    let arg = arg.map(str::to_owned);
    task::spawn_blocking(move || resolve_path(&cwd, &root, arg.as_deref())).await?
}

fn resolve_missing_leaf(candidate: &Path) -> Result<PathBuf, PathError> {
    let unresolvable = || PathError::Unresolvable(candidate.to_path_buf());

    // Only a leaf with no directory entry at all qualifies. A dangling
    // symlink exists as an entry and must not be written through.
    match fs::symlink_metadata(candidate) {
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        _ => return Err(unresolvable()),
    }

    let leaf = candidate.file_name().ok_or_else(unresolvable)?;
    let parent = candidate.parent().ok_or_else(unresolvable)?;
    let parent = fs::canonicalize(parent).map_err(|_| unresolvable())?;

    Ok(parent.join(leaf))
}

/// True when `path` is `root` itself or lies below it.
///
/// Comparison is per path component, so `/srv/ftpx` is not inside `/srv/ftp`.
pub fn is_within_root(path: &Path, root: &Path) -> bool {
    path.starts_with(root)
}

/// Maps a canonical path to the form shown to clients; the root is `/`.
pub fn to_display_path(path: &Path, root: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    if relative.as_os_str().is_empty() {
        Some(String::from("/"))
    } else {
        Some(format!("/{}", relative.to_string_lossy()))
    }
}
