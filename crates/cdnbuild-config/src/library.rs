//! Library definitions declared under `[libraries.<id>]` in `cdnbuild.toml`.

use serde::{Deserialize, Serialize};

/// A library to fetch, build, and identify, described entirely in config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryDef {
    /// Output folder name. Defaults to the table key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Where to fetch the source from (a git URL for `git`, an archive URL for `tarball`).
    pub url: String,
    #[serde(default = "default_downloader")]
    pub downloader: String,
    #[serde(default = "default_builder")]
    pub builder: String,
    /// Build tool invocations run after `install`, in order.
    #[serde(default)]
    pub commands: Vec<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subpackages: Vec<String>,
    #[serde(default = "default_true")]
    pub include_main: bool,
    #[serde(default = "default_true")]
    pub include_subpackages: bool,
    #[serde(default = "default_true")]
    pub link_root: bool,
    pub identify: IdentifyDef,
}

/// How to find the version and artifacts of a built library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum IdentifyDef {
    /// Read the version from a field of a JSON manifest.
    Manifest {
        #[serde(default = "default_manifest")]
        manifest: String,
        /// Dotted path to the version field, e.g. `version` or `meta.version`.
        #[serde(default = "default_field")]
        field: String,
        #[serde(default = "default_output_folder")]
        output_folder: String,
        /// File names or glob patterns relative to `output_folder`.
        files: Vec<String>,
    },
    /// Scan a built file for a version banner.
    Banner {
        #[serde(default = "default_output_folder")]
        output_folder: String,
        /// File to scan; `{package}` is replaced with the subpackage name.
        file: String,
        /// Regex with two capture groups: package name, then version.
        pattern: String,
    },
}

impl LibraryDef {
    /// The output folder name for a library declared under `id`.
    pub fn output_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.name.as_deref().unwrap_or(id)
    }
}

fn default_downloader() -> String {
    "git".to_owned()
}

fn default_builder() -> String {
    "yarn".to_owned()
}

fn default_true() -> bool {
    true
}

fn default_manifest() -> String {
    "package.json".to_owned()
}

fn default_field() -> String {
    "version".to_owned()
}

fn default_output_folder() -> String {
    "dist".to_owned()
}
