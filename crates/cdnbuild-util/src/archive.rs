//! Gzipped tarball extraction.

use std::path::{Component, Path, PathBuf};

use crate::error::UtilError;

/// Extract a `.tar.gz` archive into `dest`, dropping the first
/// `strip_components` path components of every entry.
///
/// Entries that become empty after stripping are skipped. Each entry's path is
/// validated so that it stays within `dest`, symlinks must point inside `dest`,
/// and nothing is written through a symlink that leads out of it.
///
/// # Errors
/// Returns an error if the archive cannot be read, an entry or symlink escapes
/// `dest`, the archive contains hard links, or an entry cannot be written.
pub fn extract_tar_gz(
    archive: &Path,
    dest: &Path,
    strip_components: usize,
) -> Result<usize, UtilError> {
    let extract_err = |message: String| UtilError::Extract {
        archive: archive.display().to_string(),
        message,
    };

    crate::fs::ensure_dir(dest)?;
    let canonical_dest = std::fs::canonicalize(dest).map_err(|source| UtilError::Io {
        path: dest.display().to_string(),
        source,
    })?;

    let file = std::fs::File::open(archive).map_err(|source| UtilError::Io {
        path: archive.display().to_string(),
        source,
    })?;
    let decoder = flate2::read::GzDecoder::new(file);
    let mut tarball = tar::Archive::new(decoder);

    let entries = tarball.entries().map_err(|e| extract_err(e.to_string()))?;

    let mut unpacked = 0usize;
    for entry in entries {
        let mut entry = entry.map_err(|e| extract_err(e.to_string()))?;
        let entry_path = entry
            .path()
            .map_err(|e| extract_err(e.to_string()))?
            .into_owned();

        if entry_path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)))
        {
            return Err(UtilError::PathTraversal {
                entry_path: entry_path.display().to_string(),
                dest: canonical_dest.display().to_string(),
            });
        }

        let relative: PathBuf = entry_path.components().skip(strip_components).collect();
        if relative.as_os_str().is_empty() {
            continue;
        }

        let traversal = || UtilError::PathTraversal {
            entry_path: entry_path.display().to_string(),
            dest: canonical_dest.display().to_string(),
        };

        let kind = entry.header().entry_type();
        if kind.is_hard_link() {
            return Err(extract_err(format!(
                "{}: hard links are not supported",
                relative.display()
            )));
        }
        if kind.is_symlink() {
            let link = entry
                .link_name()
                .map_err(|e| extract_err(e.to_string()))?
                .ok_or_else(|| extract_err(format!("{}: symlink without target", relative.display())))?;
            if !link_stays_inside(&relative, &link) {
                return Err(traversal());
            }
        }

        let target = canonical_dest.join(&relative);
        // Earlier entries may have planted symlinks along the way.
        if !parent_resolves_inside(&canonical_dest, &target) {
            return Err(traversal());
        }
        if let Some(parent) = target.parent() {
            crate::fs::ensure_dir(parent)?;
        }
        if std::fs::symlink_metadata(&target).is_ok_and(|m| m.file_type().is_symlink()) {
            std::fs::remove_file(&target).map_err(|source| UtilError::Io {
                path: target.display().to_string(),
                source,
            })?;
        }

        entry
            .unpack(&target)
            .map_err(|e| extract_err(format!("{}: {e}", relative.display())))?;
        unpacked = unpacked.saturating_add(1);
    }

    tracing::debug!(
        archive = %archive.display(),
        dest = %canonical_dest.display(),
        entries = unpacked,
        "extracted archive"
    );
    Ok(unpacked)
}

/// Whether a symlink at `entry` (relative to the extraction root) pointing at
/// `link` resolves to a location inside the root, judged lexically.
fn link_stays_inside(entry: &Path, link: &Path) -> bool {
    let mut depth = entry
        .parent()
        .map_or(0, |parent| parent.components().count());
    for component in link.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => match depth.checked_sub(1) {
                Some(up) => depth = up,
                None => return false,
            },
            Component::RootDir | Component::Prefix(_) => return false,
        }
    }
    true
}

/// Whether the deepest existing ancestor of `target`'s parent, with symlinks
/// resolved, is still under `root`.
fn parent_resolves_inside(root: &Path, target: &Path) -> bool {
    let mut ancestor = target.parent();
    while let Some(dir) = ancestor {
        if std::fs::symlink_metadata(dir).is_ok() {
            return std::fs::canonicalize(dir).is_ok_and(|real| real.starts_with(root));
        }
        ancestor = dir.parent();
    }
    false
}
