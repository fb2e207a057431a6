//! Filesystem utilities for cdnbuild.

use std::path::{Path, PathBuf};

use crate::error::UtilError;

/// Create a directory and all parent directories if they do not exist.
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> Result<(), UtilError> {
    std::fs::create_dir_all(path).map_err(|source| UtilError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Copy `src` to `dest` byte-for-byte, replacing any existing file at `dest`.
///
/// # Errors
/// Returns an error if `src` cannot be read or `dest` cannot be written.
pub fn copy_file(src: &Path, dest: &Path) -> Result<u64, UtilError> {
    std::fs::copy(src, dest).map_err(|source| UtilError::Io {
        path: format!("{} -> {}", src.display(), dest.display()),
        source,
    })
}

/// What `link_or_replace` found at the link location before acting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkAction {
    /// Nothing was there; a new link was created.
    Created,
    /// An existing symlink was removed and recreated.
    Replaced,
}

/// Point a symlink at `link` to `target`, replacing an existing symlink.
///
/// `target` is stored verbatim, so relative targets resolve against the
/// directory containing `link`.
///
/// # Errors
/// Returns an `AlreadyExists` I/O error if `link` exists and is not a symlink,
/// or any error from removing or creating the link.
pub fn link_or_replace(target: &Path, link: &Path) -> Result<LinkAction, UtilError> {
    let io_err = |source| UtilError::Io {
        path: link.display().to_string(),
        source,
    };

    let action = match std::fs::symlink_metadata(link) {
        Ok(meta) if meta.file_type().is_symlink() => {
            std::fs::remove_file(link).map_err(io_err)?;
            LinkAction::Replaced
        }
        Ok(_) => {
            return Err(io_err(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "a file that is not a symlink already occupies the link path",
            )));
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => LinkAction::Created,
        Err(source) => return Err(io_err(source)),
    };

    symlink(target, link).map_err(io_err)?;
    Ok(action)
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}

/// Expand a glob `pattern` relative to `base` into matching files, sorted by path.
///
/// # Errors
/// Returns an error if the pattern is malformed or a match cannot be read.
pub fn glob_files(base: &Path, pattern: &str) -> Result<Vec<PathBuf>, UtilError> {
    let full = base.join(pattern);
    let full = full.to_string_lossy();
    let paths = glob::glob(&full).map_err(|e| UtilError::GlobPattern {
        pattern: pattern.to_owned(),
        message: e.to_string(),
    })?;

    let mut files = Vec::new();
    for entry in paths {
        let path = entry.map_err(|e| UtilError::Io {
            path: e.path().display().to_string(),
            source: std::io::Error::new(e.error().kind(), e.error().to_string()),
        })?;
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Whether `pattern` contains glob metacharacters.
pub fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// Check that `path` resolves to a location inside `root`, following symlinks.
///
/// # Errors
/// Returns an error if either path cannot be canonicalized (e.g. it does not exist).
pub fn is_within(root: &Path, path: &Path) -> Result<bool, UtilError> {
    let canonical = |p: &Path| {
        std::fs::canonicalize(p).map_err(|source| UtilError::Io {
            path: p.display().to_string(),
            source,
        })
    };
    Ok(canonical(path)?.starts_with(canonical(root)?))
}
