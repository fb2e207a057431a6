//! Source download strategies and the per-build checkout state.

use std::path::{Path, PathBuf};

use cdnbuild_util::error::UtilError;
use cdnbuild_util::process::{run_checked, CommandRunner};

use crate::error::EngineError;

/// Fetches a library's source tree into a directory.
pub trait Downloader {
    /// Populate `dest` (an existing, empty directory) from `url`.
    ///
    /// # Errors
    /// Returns an error if the fetch fails. A partially written `dest` is left in place.
    fn fetch(&self, url: &str, dest: &Path, runner: &dyn CommandRunner) -> Result<(), UtilError>;
}

/// Clones a repository with `git clone -q <url> <dest>`.
#[derive(Debug, Clone)]
pub struct GitDownloader {
    program: String,
}

impl GitDownloader {
    pub fn new() -> Self {
        Self {
            program: "git".to_owned(),
        }
    }

    /// Use a different source-control client binary.
    pub fn program(mut self, program: &str) -> Self {
        program.clone_into(&mut self.program);
        self
    }
}

impl Default for GitDownloader {
    fn default() -> Self {
        Self::new()
    }
}

impl Downloader for GitDownloader {
    fn fetch(&self, url: &str, dest: &Path, runner: &dyn CommandRunner) -> Result<(), UtilError> {
        let args = vec![
            "clone".to_owned(),
            "-q".to_owned(),
            url.to_owned(),
            dest.display().to_string(),
        ];
        let cwd = dest.parent().unwrap_or(dest);
        run_checked(runner, &self.program, &args, cwd)?;
        Ok(())
    }
}

/// Downloads a `.tar.gz` archive over HTTP and unpacks it.
///
/// GitHub-style archives wrap everything in one top-level folder, which is
/// stripped by default.
#[derive(Debug, Clone)]
pub struct TarballDownloader {
    strip_components: usize,
}

impl TarballDownloader {
    pub fn new() -> Self {
        Self { strip_components: 1 }
    }

    pub fn strip_components(mut self, count: usize) -> Self {
        self.strip_components = count;
        self
    }
}

impl Default for TarballDownloader {
    fn default() -> Self {
        Self::new()
    }
}

impl Downloader for TarballDownloader {
    fn fetch(&self, url: &str, dest: &Path, _runner: &dyn CommandRunner) -> Result<(), UtilError> {
        let archive = tempfile::Builder::new()
            .prefix(".cdnbuild-")
            .suffix(".tar.gz")
            .tempfile()
            .map_err(|source| UtilError::Io {
                path: std::env::temp_dir().display().to_string(),
                source,
            })?;

        cdnbuild_util::download::download_to_file(url, archive.path())?;
        cdnbuild_util::archive::extract_tar_gz(archive.path(), dest, self.strip_components)?;
        Ok(())
    }
}

/// Where a checkout is in its one-way lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutState {
    NotDownloaded,
    Downloaded(PathBuf),
}

/// One library's source download, fetched at most once.
pub struct Checkout {
    library: String,
    url: String,
    strategy: Box<dyn Downloader>,
    scratch_root: PathBuf,
    state: CheckoutState,
}

impl Checkout {
    /// `library` prefixes directories created under `scratch_root`.
    pub fn new(
        library: &str,
        url: &str,
        strategy: Box<dyn Downloader>,
        scratch_root: &Path,
    ) -> Self {
        Self {
            library: library.to_owned(),
            url: url.to_owned(),
            strategy,
            scratch_root: scratch_root.to_path_buf(),
            state: CheckoutState::NotDownloaded,
        }
    }

    pub fn state(&self) -> &CheckoutState {
        &self.state
    }

    /// Fetch the source into `target`, or into a fresh `<library>`-prefixed
    /// directory under the scratch root when no target is given.
    ///
    /// Once downloaded, later calls return the same path without fetching again.
    ///
    /// # Errors
    /// Returns `EngineError::Download` if the fetch fails, or an I/O error if
    /// the directory cannot be created.
    pub fn download(
        &mut self,
        target: Option<&Path>,
        runner: &dyn CommandRunner,
    ) -> Result<PathBuf, EngineError> {
        if let CheckoutState::Downloaded(path) = &self.state {
            tracing::debug!(library = %self.library, path = %path.display(), "already downloaded");
            return Ok(path.clone());
        }

        let dest = match target {
            Some(dir) => dir.to_path_buf(),
            None => self.fresh_dir()?,
        };

        tracing::info!(
            library = %self.library,
            url = %self.url,
            dest = %dest.display(),
            "downloading library source"
        );
        self.strategy
            .fetch(&self.url, &dest, runner)
            .map_err(|source| EngineError::Download {
                library: self.library.clone(),
                source,
            })?;

        self.state = CheckoutState::Downloaded(dest.clone());
        Ok(dest)
    }

    fn fresh_dir(&self) -> Result<PathBuf, EngineError> {
        cdnbuild_util::fs::ensure_dir(&self.scratch_root)?;
        let dir = tempfile::Builder::new()
            .prefix(&self.library)
            .tempdir_in(&self.scratch_root)
            .map_err(|source| EngineError::Io {
                path: self.scratch_root.display().to_string(),
                source,
            })?;
        Ok(dir.keep())
    }
}

impl std::fmt::Debug for Checkout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Checkout")
            .field("library", &self.library)
            .field("url", &self.url)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
