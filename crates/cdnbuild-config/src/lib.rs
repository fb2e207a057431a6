//! Parse and validate `cdnbuild.toml` and its environment overrides.

pub mod library;
pub mod settings;

pub use library::{IdentifyDef, LibraryDef};
pub use settings::{ConfigError, LogLevel, Settings};
