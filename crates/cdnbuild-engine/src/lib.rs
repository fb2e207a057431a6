//! Download, build, identify, and materialize versioned asset libraries.

pub mod batch;
pub mod builder;
pub mod catalog;
pub mod download;
pub mod error;
pub mod identify;
pub mod library;
pub mod materialize;
pub mod output;
pub mod pipeline;
pub mod strategy;

pub use batch::{build_all, build_one, BatchReport, BuildContext};
pub use catalog::Catalog;
pub use error::EngineError;
pub use library::LibraryDescriptor;
pub use materialize::{materialize, MaterializeReport};
pub use output::{FileOutput, LibraryIdentity};
pub use pipeline::{LibraryBuild, Pipeline};
pub use strategy::Strategies;
