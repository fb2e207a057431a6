//! Download, build, and identify one library inside a fresh working directory.

use std::path::{Path, PathBuf};

use cdnbuild_util::process::CommandRunner;
use tempfile::TempDir;

use crate::download::Checkout;
use crate::error::EngineError;
use crate::library::{check_folder_name, LibraryDescriptor};
use crate::output::{FileOutput, LibraryIdentity};
use crate::strategy::Strategies;

/// Runs library builds with a fixed set of strategies and a command runner.
pub struct Pipeline<'a> {
    strategies: &'a Strategies,
    runner: &'a dyn CommandRunner,
    scratch_root: PathBuf,
    keep_workdirs: bool,
}

/// A build's working directory: removed on drop unless kept.
#[derive(Debug)]
enum WorkDir {
    Temp(TempDir),
    Kept(PathBuf),
}

impl WorkDir {
    fn path(&self) -> &Path {
        match self {
            Self::Temp(dir) => dir.path(),
            Self::Kept(path) => path,
        }
    }
}

/// The result of a successful library build.
///
/// Output source paths point into the working directory, so this value must
/// outlive materialization.
#[derive(Debug)]
pub struct LibraryBuild {
    workdir: WorkDir,
    outputs: Vec<FileOutput>,
}

impl LibraryBuild {
    pub fn workdir(&self) -> &Path {
        self.workdir.path()
    }

    /// Main package first, then subpackages in declared order, then file order.
    pub fn outputs(&self) -> &[FileOutput] {
        &self.outputs
    }
}

impl<'a> Pipeline<'a> {
    pub fn new(strategies: &'a Strategies, runner: &'a dyn CommandRunner, scratch_root: &Path) -> Self {
        Self {
            strategies,
            runner,
            scratch_root: scratch_root.to_path_buf(),
            keep_workdirs: false,
        }
    }

    /// Leave working directories on disk, including after failed builds.
    pub fn keep_workdirs(mut self, keep: bool) -> Self {
        self.keep_workdirs = keep;
        self
    }

    pub fn scratch_root(&self) -> &Path {
        &self.scratch_root
    }

    /// Download, build, and identify `desc`.
    ///
    /// # Errors
    /// Any failure aborts the library; no partial outputs are returned.
    pub fn build_library(&self, desc: &LibraryDescriptor) -> Result<LibraryBuild, EngineError> {
        desc.validate(self.strategies)?;
        let workdir = self.create_workdir(&desc.name)?;
        tracing::debug!(workdir = %workdir.path().display(), "created working directory");

        let downloader = self.strategies.downloader(&desc.downloader)?;
        let mut checkout = Checkout::new(&desc.name, &desc.url, downloader, &self.scratch_root);
        let source_dir = checkout.download(Some(workdir.path()), self.runner)?;

        let builder = self.strategies.builder(&desc.builder, &desc.commands)?;
        let out_dir = builder
            .build(&source_dir, self.runner)
            .map_err(|source| EngineError::Build {
                library: desc.name.clone(),
                source,
            })?;

        let mut outputs = Vec::new();
        for target in desc.targets() {
            let identity = desc.identifier.identify(&out_dir, target)?;
            check_identity(&identity, target, workdir.path())?;
            tracing::info!(
                subpackage = target.unwrap_or("<main>"),
                version = %identity.version,
                files = identity.artifacts.len(),
                "identified package"
            );
            outputs.extend(to_outputs(identity, desc.link_root));
        }

        Ok(LibraryBuild { workdir, outputs })
    }

    fn create_workdir(&self, prefix: &str) -> Result<WorkDir, EngineError> {
        cdnbuild_util::fs::ensure_dir(&self.scratch_root)?;
        let dir = tempfile::Builder::new()
            .prefix(prefix)
            .tempdir_in(&self.scratch_root)
            .map_err(|source| EngineError::Io {
                path: self.scratch_root.display().to_string(),
                source,
            })?;
        if self.keep_workdirs {
            Ok(WorkDir::Kept(dir.keep()))
        } else {
            Ok(WorkDir::Temp(dir))
        }
    }
}

impl std::fmt::Debug for Pipeline<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("strategies", self.strategies)
            .field("scratch_root", &self.scratch_root)
            .field("keep_workdirs", &self.keep_workdirs)
            .finish_non_exhaustive()
    }
}

/// Reject identities that cannot be materialized.
fn check_identity(
    identity: &LibraryIdentity,
    target: Option<&str>,
    workdir: &Path,
) -> Result<(), EngineError> {
    let invalid = |message: String| EngineError::InvalidIdentity {
        subpackage: target.map(str::to_owned),
        message,
    };

    // Both become folder names in the output tree.
    check_folder_name(&identity.version).map_err(|m| invalid(format!("version {m}")))?;
    if let Some(sub) = &identity.subpackage {
        check_folder_name(sub).map_err(|m| invalid(format!("sub-package {m}")))?;
    }
    if identity.artifacts.is_empty() {
        return Err(invalid("no artifacts".to_owned()));
    }
    for artifact in &identity.artifacts {
        if !artifact.is_file() {
            return Err(invalid(format!("{} is not a built file", artifact.display())));
        }
        if !cdnbuild_util::fs::is_within(workdir, artifact)? {
            return Err(invalid(format!(
                "{} is outside the working directory",
                artifact.display()
            )));
        }
    }
    Ok(())
}

fn to_outputs(identity: LibraryIdentity, link_to_root: bool) -> impl Iterator<Item = FileOutput> {
    let LibraryIdentity {
        subpackage,
        version,
        artifacts,
    } = identity;
    artifacts.into_iter().map(move |path| {
        FileOutput::new(path, version.clone())
            .with_subpackage(subpackage.clone())
            .with_link_to_root(link_to_root)
    })
}
