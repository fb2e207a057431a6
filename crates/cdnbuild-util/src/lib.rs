#![forbid(unsafe_code)]
//! Process, filesystem, download, and archive helpers for cdnbuild.

pub mod archive;
pub mod download;
pub mod error;
pub mod fs;
pub mod process;
