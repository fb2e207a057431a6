use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::library::LibraryDef;

/// Name of the settings file looked up in the working directory.
pub const SETTINGS_FILE: &str = "cdnbuild.toml";

/// Runtime settings: where to build, where to write output, what to build.
///
/// Loaded once at startup from `cdnbuild.toml` (if any) and then overridden by
/// the `OUT_FOLDER`, `BUILD_FOLDER`, `BUILD_LIBS`, `KEEP_WORKDIRS` and
/// `LOG_LEVEL` environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub build: BuildSection,
    #[serde(default)]
    pub log: LogSection,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub libraries: BTreeMap<String, LibraryDef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paths {
    /// Root of the versioned output tree.
    #[serde(default = "default_output")]
    pub output: PathBuf,
    /// Scratch root under which per-build working directories are created.
    #[serde(default = "default_build")]
    pub build: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            output: default_output(),
            build: default_build(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSection {
    /// Library ids built when `cdnbuild build` is run without an argument.
    #[serde(default = "default_libraries")]
    pub libraries: Vec<String>,
    /// Leave working directories on disk after a build for inspection.
    #[serde(default)]
    pub keep_workdirs: bool,
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            libraries: default_libraries(),
            keep_workdirs: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LogSection {
    #[serde(default)]
    pub level: LogLevel,
}

/// Log verbosity, from most to least verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" | "fatal" | "critical" => Ok(Self::Error),
            _ => Err(ConfigError::InvalidValue {
                key: "log.level".to_owned(),
                value: s.to_owned(),
                reason: "expected one of trace, debug, info, warn, error".to_owned(),
            }),
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, ConfigError> {
        value.parse()
    }
}

impl From<LogLevel> for String {
    fn from(level: LogLevel) -> Self {
        level.to_string()
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

fn default_output() -> PathBuf {
    PathBuf::from("output")
}

fn default_build() -> PathBuf {
    std::env::temp_dir()
}

fn default_libraries() -> Vec<String> {
    vec!["eosjs".to_owned(), "scatterjs".to_owned()]
}

impl Settings {
    /// Read and parse settings from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or contains invalid TOML.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Resolve settings for a run.
    ///
    /// Uses `explicit` if given, otherwise `cdnbuild.toml` inside `dir` when it
    /// exists, otherwise the defaults. Process environment overrides are
    /// applied last.
    ///
    /// # Errors
    /// Returns an error if a settings file cannot be read or parsed, or an
    /// environment override holds an invalid value.
    pub fn load(explicit: Option<&Path>, dir: &Path) -> Result<Self, ConfigError> {
        let mut settings = match explicit {
            Some(path) => Self::from_path(path)?,
            None => {
                let candidate = dir.join(SETTINGS_FILE);
                if candidate.is_file() {
                    Self::from_path(&candidate)?
                } else {
                    Self::default()
                }
            }
        };
        settings.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    /// Apply environment-style overrides looked up through `lookup`.
    ///
    /// Empty values are ignored. `BUILD_LIBS` is a comma separated list.
    ///
    /// # Errors
    /// Returns an error if `LOG_LEVEL` or `KEEP_WORKDIRS` holds an invalid value.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(out) = get("OUT_FOLDER") {
            self.paths.output = PathBuf::from(out);
        }
        if let Some(build) = get("BUILD_FOLDER") {
            self.paths.build = PathBuf::from(build);
        }
        if let Some(libs) = get("BUILD_LIBS") {
            self.build.libraries = split_csv(&libs);
        }
        if let Some(keep) = get("KEEP_WORKDIRS") {
            self.build.keep_workdirs = parse_bool("KEEP_WORKDIRS", &keep)?;
        }
        if let Some(level) = get("LOG_LEVEL") {
            self.log.level = level.parse()?;
        }
        Ok(())
    }
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_owned(),
            value: value.to_owned(),
            reason: "expected true or false".to_owned(),
        }),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid cdnbuild.toml at {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("invalid value `{value}` for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}
