//! Name-keyed registry of downloader and builder strategies.

use std::collections::BTreeMap;

use crate::builder::{Builder, Invocation, PackageScriptBuilder};
use crate::download::{Downloader, GitDownloader, TarballDownloader};
use crate::error::EngineError;

type DownloaderFactory = Box<dyn Fn() -> Box<dyn Downloader>>;
type BuilderFactory = Box<dyn Fn(&[Invocation]) -> Box<dyn Builder>>;

/// Downloader and builder constructors, looked up by the names used in
/// library descriptors.
pub struct Strategies {
    downloaders: BTreeMap<String, DownloaderFactory>,
    builders: BTreeMap<String, BuilderFactory>,
}

impl Strategies {
    /// A registry with nothing in it.
    pub fn empty() -> Self {
        Self {
            downloaders: BTreeMap::new(),
            builders: BTreeMap::new(),
        }
    }

    /// The stock strategies: `git` and `tarball` downloaders, `yarn` and `npm` builders.
    pub fn builtin() -> Self {
        let mut strategies = Self::empty();
        strategies.register_downloader("git", || Box::new(GitDownloader::new()));
        strategies.register_downloader("tarball", || Box::new(TarballDownloader::new()));
        strategies.register_builder("yarn", |invocations| {
            Box::new(PackageScriptBuilder::yarn(invocations))
        });
        strategies.register_builder("npm", |invocations| {
            Box::new(PackageScriptBuilder::npm(invocations))
        });
        strategies
    }

    /// Register (or replace) a downloader under `name`.
    pub fn register_downloader<F>(&mut self, name: &str, factory: F)
    where
        F: Fn() -> Box<dyn Downloader> + 'static,
    {
        self.downloaders.insert(name.to_owned(), Box::new(factory));
    }

    /// Register (or replace) a builder under `name`.
    pub fn register_builder<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&[Invocation]) -> Box<dyn Builder> + 'static,
    {
        self.builders.insert(name.to_owned(), Box::new(factory));
    }

    pub fn has_downloader(&self, name: &str) -> bool {
        self.downloaders.contains_key(name)
    }

    pub fn has_builder(&self, name: &str) -> bool {
        self.builders.contains_key(name)
    }

    /// # Errors
    /// Returns `UnknownDownloader` if nothing is registered under `name`.
    pub fn downloader(&self, name: &str) -> Result<Box<dyn Downloader>, EngineError> {
        let factory = self
            .downloaders
            .get(name)
            .ok_or_else(|| EngineError::UnknownDownloader {
                name: name.to_owned(),
            })?;
        Ok(factory())
    }

    /// # Errors
    /// Returns `UnknownBuilder` if nothing is registered under `name`.
    pub fn builder(
        &self,
        name: &str,
        invocations: &[Invocation],
    ) -> Result<Box<dyn Builder>, EngineError> {
        let factory = self
            .builders
            .get(name)
            .ok_or_else(|| EngineError::UnknownBuilder {
                name: name.to_owned(),
            })?;
        Ok(factory(invocations))
    }
}

impl Default for Strategies {
    fn default() -> Self {
        Self::builtin()
    }
}

impl std::fmt::Debug for Strategies {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Strategies")
            .field("downloaders", &self.downloaders.keys().collect::<Vec<_>>())
            .field("builders", &self.builders.keys().collect::<Vec<_>>())
            .finish()
    }
}
