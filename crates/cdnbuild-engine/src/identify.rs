//! Version and artifact discovery in built output.
//!
//! Upstream projects stamp their versions in very different ways, so this is
//! an open extension point: anything implementing [`Identify`] can be attached
//! to a library descriptor. Two stock strategies cover the common cases:
//!
//! - [`ManifestIdentifier`] reads a field from a JSON manifest such as `package.json`.
//! - [`BannerIdentifier`] scans a built file for a comment banner like
//!   `ScatterJS - core v1.5.28`.

use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::EngineError;
use crate::output::LibraryIdentity;

/// Placeholder replaced with the subpackage name in file templates.
pub const PACKAGE_PLACEHOLDER: &str = "{package}";

/// Extracts a version and the files to publish from a built working directory.
pub trait Identify {
    /// Identify the main package (`subpackage = None`) or one subpackage.
    ///
    /// # Errors
    /// Returns `VersionNotFound` when no version can be extracted. A version
    /// is never defaulted.
    fn identify(
        &self,
        built_dir: &Path,
        subpackage: Option<&str>,
    ) -> Result<LibraryIdentity, EngineError>;

    /// Short strategy name for listings.
    fn strategy(&self) -> &'static str;
}

/// Substitute `{package}` in `template`.
///
/// # Errors
/// Returns `InvalidIdentity` if the template needs a subpackage name and none was given.
pub fn expand_template(template: &str, subpackage: Option<&str>) -> Result<String, EngineError> {
    if !template.contains(PACKAGE_PLACEHOLDER) {
        return Ok(template.to_owned());
    }
    match subpackage {
        Some(name) => Ok(template.replace(PACKAGE_PLACEHOLDER, name)),
        None => Err(EngineError::InvalidIdentity {
            subpackage: None,
            message: format!("`{template}` needs a sub-package name but the main package was requested"),
        }),
    }
}

/// Reads the version from a field of a JSON manifest; artifacts are a fixed
/// list of files (or glob patterns) under an output folder.
#[derive(Debug, Clone)]
pub struct ManifestIdentifier {
    manifest: String,
    field: String,
    output_folder: String,
    files: Vec<String>,
}

impl ManifestIdentifier {
    /// Read `version` from `package.json`, publishing `files` from `output_folder`.
    pub fn new(output_folder: &str, files: &[&str]) -> Self {
        Self {
            manifest: "package.json".to_owned(),
            field: "version".to_owned(),
            output_folder: output_folder.to_owned(),
            files: files.iter().map(|f| (*f).to_owned()).collect(),
        }
    }

    /// Manifest path relative to the built directory. May contain `{package}`.
    pub fn manifest(mut self, path: &str) -> Self {
        path.clone_into(&mut self.manifest);
        self
    }

    /// Dotted path to the version field, e.g. `version` or `meta.release.version`.
    pub fn field(mut self, field: &str) -> Self {
        field.clone_into(&mut self.field);
        self
    }

    pub fn files(mut self, files: Vec<String>) -> Self {
        self.files = files;
        self
    }

    fn read_version(&self, built_dir: &Path, subpackage: Option<&str>) -> Result<String, EngineError> {
        let path = built_dir.join(expand_template(&self.manifest, subpackage)?);
        let content = std::fs::read_to_string(&path).map_err(|source| EngineError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let json: serde_json::Value =
            serde_json::from_str(&content).map_err(|source| EngineError::Manifest {
                path: path.display().to_string(),
                source,
            })?;

        let value = self
            .field
            .split('.')
            .try_fold(&json, |node, key| node.get(key));

        match value.and_then(serde_json::Value::as_str) {
            Some(version) if !version.trim().is_empty() => Ok(version.trim().to_owned()),
            _ => Err(EngineError::VersionNotFound {
                subpackage: subpackage.map(str::to_owned),
                detail: format!("no string field `{}` in {}", self.field, path.display()),
            }),
        }
    }

    fn collect_files(&self, built_dir: &Path, subpackage: Option<&str>) -> Result<Vec<PathBuf>, EngineError> {
        let base = built_dir.join(&self.output_folder);
        let mut artifacts = Vec::new();
        for entry in &self.files {
            let entry = expand_template(entry, subpackage)?;
            if cdnbuild_util::fs::is_glob(&entry) {
                let matches = cdnbuild_util::fs::glob_files(&base, &entry)?;
                if matches.is_empty() {
                    return Err(EngineError::InvalidIdentity {
                        subpackage: subpackage.map(str::to_owned),
                        message: format!("pattern `{entry}` matched nothing in {}", base.display()),
                    });
                }
                artifacts.extend(matches);
            } else {
                artifacts.push(base.join(entry));
            }
        }
        Ok(artifacts)
    }
}

impl Identify for ManifestIdentifier {
    fn identify(
        &self,
        built_dir: &Path,
        subpackage: Option<&str>,
    ) -> Result<LibraryIdentity, EngineError> {
        let version = self.read_version(built_dir, subpackage)?;
        let artifacts = self.collect_files(built_dir, subpackage)?;
        Ok(LibraryIdentity::new(
            subpackage.map(str::to_owned),
            version,
            artifacts,
        ))
    }

    fn strategy(&self) -> &'static str {
        "manifest"
    }
}

/// Finds `(name, version)` in a built file by regex; the scanned file is the artifact.
#[derive(Debug, Clone)]
pub struct BannerIdentifier {
    output_folder: String,
    file_template: String,
    pattern: Regex,
}

impl BannerIdentifier {
    /// `pattern` needs two capture groups: package name, then version.
    ///
    /// # Errors
    /// Returns `InvalidPattern` if the regex does not compile or has fewer
    /// than two capture groups.
    pub fn new(output_folder: &str, file_template: &str, pattern: &str) -> Result<Self, EngineError> {
        let regex = Regex::new(pattern).map_err(|e| EngineError::InvalidPattern {
            pattern: pattern.to_owned(),
            message: e.to_string(),
        })?;
        // captures_len counts the implicit whole-match group.
        if regex.captures_len() < 3 {
            return Err(EngineError::InvalidPattern {
                pattern: pattern.to_owned(),
                message: "expected two capture groups (name, version)".to_owned(),
            });
        }
        Ok(Self {
            output_folder: output_folder.to_owned(),
            file_template: file_template.to_owned(),
            pattern: regex,
        })
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }
}

impl Identify for BannerIdentifier {
    fn identify(
        &self,
        built_dir: &Path,
        subpackage: Option<&str>,
    ) -> Result<LibraryIdentity, EngineError> {
        let file_name = expand_template(&self.file_template, subpackage)?;
        let path = built_dir.join(&self.output_folder).join(file_name);
        let contents = std::fs::read_to_string(&path).map_err(|source| EngineError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let (name, version) =
            extract_banner_version(&self.pattern, &contents, subpackage).map_err(|e| match e {
                EngineError::ConflictingVersions {
                    package,
                    first,
                    other,
                    ..
                } => EngineError::ConflictingVersions {
                    package,
                    path: path.display().to_string(),
                    first,
                    other,
                },
                other => other,
            })?;

        // The main package keeps the root version folder whatever name the banner carries.
        let package = subpackage.map(|_| name);
        Ok(LibraryIdentity::new(package, version, vec![path]))
    }

    fn strategy(&self) -> &'static str {
        "banner"
    }
}

/// Extract `(name, version)` from the first banner match in `contents`.
///
/// The first match is authoritative. Later matches for other names (bundled
/// dependencies) are ignored; a later match for the same name with a
/// different version is an error.
///
/// # Errors
/// Returns `VersionNotFound` when nothing matches (or the version capture is
/// empty) and `ConflictingVersions` when the same name carries two versions.
pub fn extract_banner_version(
    pattern: &Regex,
    contents: &str,
    subpackage: Option<&str>,
) -> Result<(String, String), EngineError> {
    let not_found = |detail: &str| EngineError::VersionNotFound {
        subpackage: subpackage.map(str::to_owned),
        detail: detail.to_owned(),
    };

    let mut matches = pattern.captures_iter(contents).filter_map(|caps| {
        let name = caps.get(1)?.as_str();
        let version = caps.get(2)?.as_str();
        Some((name, version))
    });

    let Some((name, version)) = matches.next() else {
        return Err(not_found(&format!("no match for `{}`", pattern.as_str())));
    };
    if version.is_empty() {
        return Err(not_found(&format!("empty version captured for `{name}`")));
    }

    if let Some((_, other)) = matches.find(|(n, v)| *n == name && *v != version) {
        return Err(EngineError::ConflictingVersions {
            package: name.to_owned(),
            path: String::from("<contents>"),
            first: version.to_owned(),
            other: other.to_owned(),
        });
    }

    Ok((name.to_owned(), version.to_owned()))
}
