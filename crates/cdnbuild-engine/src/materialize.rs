//! Copy identified files into the versioned output tree.
//!
//! Layout under the output root:
//!
//! ```text
//! <library>/<subpackage?>/<version>/<dest_subfolder?>/<file>
//! <library>/<file> -> <subpackage?>/<version>/<dest_subfolder?>/<file>   (root link)
//! ```
//!
//! Existing versioned files are never overwritten without `force`, so a
//! published version stays immutable. Nothing here is transactional: a
//! failure part-way leaves the files already written.

use std::path::Path;

use cdnbuild_util::error::UtilError;
use cdnbuild_util::fs::LinkAction;

use crate::error::EngineError;
use crate::output::FileOutput;

/// What one `materialize` call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaterializeReport {
    pub copied: usize,
    /// Files left alone because they already existed.
    pub skipped: usize,
    pub linked: usize,
}

/// Write `outputs` below `output_root/library_name`.
///
/// # Errors
/// Returns an I/O error if a folder cannot be created or a file cannot be
/// copied, and `LinkConflict` if a root link location holds a regular file.
pub fn materialize(
    library_name: &str,
    outputs: &[FileOutput],
    output_root: &Path,
    force: bool,
) -> Result<MaterializeReport, EngineError> {
    let library_dir = output_root.join(library_name);
    let mut report = MaterializeReport::default();

    for output in outputs {
        let file_name = output.file_name().ok_or_else(|| EngineError::Io {
            path: output.source_path.display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "source has no file name"),
        })?;
        let relative = output.relative_package_folder();
        let package_dir = library_dir.join(&relative);
        cdnbuild_util::fs::ensure_dir(&package_dir)?;

        let dest = package_dir.join(file_name);
        if dest.exists() && !force {
            tracing::warn!(
                path = %dest.display(),
                "file already exists, skipping (use --force to overwrite)"
            );
            report.skipped += 1;
            continue;
        }

        let bytes = cdnbuild_util::fs::copy_file(&output.source_path, &dest)?;
        tracing::debug!(src = %output.source_path.display(), dest = %dest.display(), bytes, "copied");
        report.copied += 1;

        if output.link_to_root {
            let link = library_dir.join(file_name);
            let target = relative.join(file_name);
            match cdnbuild_util::fs::link_or_replace(&target, &link) {
                Ok(action) => {
                    if action == LinkAction::Replaced {
                        tracing::debug!(link = %link.display(), "replaced root link");
                    }
                    report.linked += 1;
                }
                Err(UtilError::Io { source, .. })
                    if source.kind() == std::io::ErrorKind::AlreadyExists =>
                {
                    return Err(EngineError::LinkConflict {
                        path: link.display().to_string(),
                    });
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    tracing::info!(
        library = library_name,
        copied = report.copied,
        skipped = report.skipped,
        linked = report.linked,
        "materialized"
    );
    Ok(report)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use super::*;

    fn built_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn copies_into_versioned_folder_and_links_root() {
        let work = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        let src = built_file(work.path(), "scatterjs-core.min.js", "core v2");
        let outputs = vec![FileOutput::new(&src, "2.1.0")
            .with_subpackage(Some("core".to_owned()))
            .with_link_to_root(true)];

        let report = materialize("scatter-js", &outputs, root.path(), false).unwrap();

        assert_eq!(
            report,
            MaterializeReport {
                copied: 1,
                skipped: 0,
                linked: 1
            }
        );
        let dest = root.path().join("scatter-js/core/2.1.0/scatterjs-core.min.js");
        assert_eq!(fs::read_to_string(&dest).unwrap(), "core v2");

        let link = root.path().join("scatter-js/scatterjs-core.min.js");
        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(
            fs::read_link(&link).unwrap(),
            PathBuf::from("core/2.1.0/scatterjs-core.min.js")
        );
        assert_eq!(fs::read_to_string(&link).unwrap(), "core v2");
    }

    #[test]
    fn second_run_skips_existing_files() {
        let work = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        let src = built_file(work.path(), "eosjs-api.js", "first");
        let outputs = vec![FileOutput::new(&src, "20.0.0").with_link_to_root(true)];

        materialize("eosjs", &outputs, root.path(), false).unwrap();
        fs::write(&src, "second").unwrap();
        let report = materialize("eosjs", &outputs, root.path(), false).unwrap();

        assert_eq!(report.copied, 0);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.linked, 0);
        assert_eq!(
            fs::read_to_string(root.path().join("eosjs/20.0.0/eosjs-api.js")).unwrap(),
            "first"
        );
    }

    #[test]
    fn force_overwrites_and_relinks() {
        let work = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        let src = built_file(work.path(), "eosjs-api.js", "first");
        let outputs = vec![FileOutput::new(&src, "20.0.0").with_link_to_root(true)];

        materialize("eosjs", &outputs, root.path(), true).unwrap();
        fs::write(&src, "second").unwrap();
        let report = materialize("eosjs", &outputs, root.path(), true).unwrap();

        assert_eq!(report.copied, 1);
        assert_eq!(report.linked, 1);
        assert_eq!(
            fs::read_to_string(root.path().join("eosjs/eosjs-api.js")).unwrap(),
            "second"
        );
    }

    #[test]
    fn new_version_moves_root_link() {
        let work = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        let src = built_file(work.path(), "lib.js", "v1");

        materialize("lib", &[FileOutput::new(&src, "1.0.0").with_link_to_root(true)], root.path(), false)
            .unwrap();
        fs::write(&src, "v2").unwrap();
        materialize("lib", &[FileOutput::new(&src, "2.0.0").with_link_to_root(true)], root.path(), false)
            .unwrap();

        let link = root.path().join("lib/lib.js");
        assert_eq!(fs::read_link(&link).unwrap(), PathBuf::from("2.0.0/lib.js"));
        assert_eq!(fs::read_to_string(root.path().join("lib/1.0.0/lib.js")).unwrap(), "v1");
        assert_eq!(fs::read_to_string(&link).unwrap(), "v2");
    }

    #[test]
    fn regular_file_at_link_path_is_conflict() {
        let work = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        let src = built_file(work.path(), "lib.js", "v1");
        fs::create_dir_all(root.path().join("lib")).unwrap();
        fs::write(root.path().join("lib/lib.js"), "hand-placed").unwrap();

        let err = materialize(
            "lib",
            &[FileOutput::new(&src, "1.0.0").with_link_to_root(true)],
            root.path(),
            false,
        )
        .unwrap_err();

        assert!(matches!(err, EngineError::LinkConflict { .. }), "got: {err:?}");
        assert_eq!(
            fs::read_to_string(root.path().join("lib/lib.js")).unwrap(),
            "hand-placed"
        );
    }

    #[test]
    fn dest_subfolder_and_no_link() {
        let work = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        let src = built_file(work.path(), "theme.css", "body{}");
        let outputs = vec![FileOutput::new(&src, "1.0.0").with_dest_subfolder(Some("css".to_owned()))];

        let report = materialize("ui", &outputs, root.path(), false).unwrap();

        assert_eq!(report.linked, 0);
        assert!(root.path().join("ui/1.0.0/css/theme.css").is_file());
        assert!(!root.path().join("ui/theme.css").exists());
    }

    #[test]
    fn missing_source_is_io_error() {
        let root = tempfile::tempdir().unwrap();
        let outputs = vec![FileOutput::new("/nonexistent/dir/lib.js", "1.0.0")];

        let err = materialize("lib", &outputs, root.path(), false).unwrap_err();
        assert!(matches!(err, EngineError::Util(UtilError::Io { .. })), "got: {err:?}");
    }

    #[test]
    fn source_without_file_name_is_rejected() {
        let root = tempfile::tempdir().unwrap();
        let err = materialize("lib", &[FileOutput::new("/", "1.0.0")], root.path(), false).unwrap_err();
        assert!(matches!(err, EngineError::Io { .. }));
    }
}
