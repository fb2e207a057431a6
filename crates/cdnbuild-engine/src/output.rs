//! Identified packages and the artifacts headed for the output tree.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// What `identify` reports for the main package or one subpackage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryIdentity {
    /// Subpackage name, used as a folder name. `None` for the main package.
    pub subpackage: Option<String>,
    pub version: String,
    /// Absolute paths of the built files to publish, inside the working directory.
    pub artifacts: Vec<PathBuf>,
}

impl LibraryIdentity {
    pub fn new(subpackage: Option<String>, version: impl Into<String>, artifacts: Vec<PathBuf>) -> Self {
        Self {
            subpackage,
            version: version.into(),
            artifacts,
        }
    }
}

/// One built file plus where it goes in the output tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutput {
    /// Absolute path of the built file. Only ever read.
    pub source_path: PathBuf,
    pub version: String,
    pub subpackage: Option<String>,
    /// Extra nesting level below the version folder.
    pub dest_subfolder: Option<String>,
    /// Also expose the file at the library's root folder through a symlink.
    pub link_to_root: bool,
}

impl FileOutput {
    pub fn new(source_path: impl Into<PathBuf>, version: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            version: version.into(),
            subpackage: None,
            dest_subfolder: None,
            link_to_root: false,
        }
    }

    pub fn with_subpackage(mut self, subpackage: Option<String>) -> Self {
        self.subpackage = subpackage;
        self
    }

    pub fn with_dest_subfolder(mut self, dest_subfolder: Option<String>) -> Self {
        self.dest_subfolder = dest_subfolder;
        self
    }

    pub fn with_link_to_root(mut self, link_to_root: bool) -> Self {
        self.link_to_root = link_to_root;
        self
    }

    /// Folder segments below the library folder: `[subpackage,] version [, dest_subfolder]`.
    ///
    /// Absent or empty segments are omitted.
    pub fn package_segments(&self) -> Vec<&str> {
        [
            self.subpackage.as_deref(),
            Some(self.version.as_str()),
            self.dest_subfolder.as_deref(),
        ]
        .into_iter()
        .flatten()
        .filter(|segment| !segment.is_empty())
        .collect()
    }

    /// The package folder relative to the library folder, e.g. `core/2.1.0`.
    pub fn relative_package_folder(&self) -> PathBuf {
        self.package_segments().into_iter().collect()
    }

    /// Base name of the source file.
    pub fn file_name(&self) -> Option<&OsStr> {
        self.source_path.file_name()
    }

    /// Where this file lands below `library_dir`.
    pub fn destination(&self, library_dir: &Path) -> Option<PathBuf> {
        let name = self.file_name()?;
        Some(library_dir.join(self.relative_package_folder()).join(name))
    }
}
