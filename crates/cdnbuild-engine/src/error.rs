//! Error types for cdnbuild-engine.

use cdnbuild_util::error::UtilError;

/// Errors produced while building or materializing a library.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A filesystem operation failed.
    #[error("cannot access {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// A utility operation failed.
    #[error("{0}")]
    Util(#[from] UtilError),

    /// A settings operation failed.
    #[error("{0}")]
    Config(#[from] cdnbuild_config::ConfigError),

    /// Fetching the library source failed.
    #[error("cannot download {library}: {source}")]
    Download { library: String, source: UtilError },

    /// A build tool invocation failed.
    #[error("cannot build {library}: {source}")]
    Build { library: String, source: UtilError },

    /// No version could be extracted from the build output.
    #[error("could not find version{}: {detail}", for_subpackage(.subpackage))]
    VersionNotFound {
        subpackage: Option<String>,
        detail: String,
    },

    /// The same package was stamped with two different versions in one file.
    #[error("conflicting versions for {package} in {path}: {first} and {other}")]
    ConflictingVersions {
        package: String,
        path: String,
        first: String,
        other: String,
    },

    /// An identify step returned something that cannot be materialized.
    #[error("invalid identity{}: {message}", for_subpackage(.subpackage))]
    InvalidIdentity {
        subpackage: Option<String>,
        message: String,
    },

    /// A version banner pattern is not a usable regex.
    #[error("invalid version pattern `{pattern}`: {message}")]
    InvalidPattern { pattern: String, message: String },

    /// A JSON manifest could not be parsed.
    #[error("invalid manifest {path}: {source}")]
    Manifest {
        path: String,
        source: serde_json::Error,
    },

    /// The requested library is not in the catalog.
    #[error("unknown library \"{name}\" (known: {known})")]
    UnknownLibrary { name: String, known: String },

    /// No downloader strategy is registered under this name.
    #[error("unknown downloader strategy \"{name}\"")]
    UnknownDownloader { name: String },

    /// No builder strategy is registered under this name.
    #[error("unknown builder strategy \"{name}\"")]
    UnknownBuilder { name: String },

    /// A library descriptor is missing or has an unusable attribute.
    #[error("invalid library descriptor {library}: {message}")]
    InvalidDescriptor { library: String, message: String },

    /// The root link location is occupied by something that is not a symlink.
    #[error("cannot link {path}: a file that is not a symlink is in the way")]
    LinkConflict { path: String },
}

fn for_subpackage(subpackage: &Option<String>) -> String {
    match subpackage {
        Some(name) => format!(" for sub-package \"{name}\""),
        None => String::new(),
    }
}
