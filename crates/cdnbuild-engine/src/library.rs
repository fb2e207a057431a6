//! Library descriptors: everything needed to produce one library's outputs.

use cdnbuild_config::{IdentifyDef, LibraryDef};

use crate::builder::Invocation;
use crate::error::EngineError;
use crate::identify::{BannerIdentifier, Identify, ManifestIdentifier};
use crate::strategy::Strategies;

/// A buildable library: where its source lives, how to build it, and how to
/// find its version and files afterwards.
pub struct LibraryDescriptor {
    /// Catalog key, as typed on the command line.
    pub id: String,
    /// Output folder name.
    pub name: String,
    pub url: String,
    pub downloader: String,
    pub builder: String,
    pub commands: Vec<Invocation>,
    /// Identified in this order, after the main package.
    pub subpackages: Vec<String>,
    pub include_main: bool,
    pub include_subpackages: bool,
    /// Link each output file into the library root folder.
    pub link_root: bool,
    pub identifier: Box<dyn Identify>,
}

impl LibraryDescriptor {
    /// A git + yarn library named `id` with no build steps beyond install.
    pub fn new(id: &str, url: &str, identifier: Box<dyn Identify>) -> Self {
        Self {
            id: id.to_owned(),
            name: id.to_owned(),
            url: url.to_owned(),
            downloader: "git".to_owned(),
            builder: "yarn".to_owned(),
            commands: Vec::new(),
            subpackages: Vec::new(),
            include_main: true,
            include_subpackages: true,
            link_root: true,
            identifier,
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        name.clone_into(&mut self.name);
        self
    }

    pub fn downloader(mut self, downloader: &str) -> Self {
        downloader.clone_into(&mut self.downloader);
        self
    }

    pub fn builder(mut self, builder: &str) -> Self {
        builder.clone_into(&mut self.builder);
        self
    }

    /// Append one build invocation, e.g. `&["run", "pack"]`.
    pub fn command(mut self, args: &[&str]) -> Self {
        self.commands
            .push(args.iter().map(|a| (*a).to_owned()).collect());
        self
    }

    pub fn subpackages(mut self, names: &[&str]) -> Self {
        self.subpackages = names.iter().map(|n| (*n).to_owned()).collect();
        self
    }

    pub fn include_main(mut self, include: bool) -> Self {
        self.include_main = include;
        self
    }

    pub fn include_subpackages(mut self, include: bool) -> Self {
        self.include_subpackages = include;
        self
    }

    pub fn link_root(mut self, link: bool) -> Self {
        self.link_root = link;
        self
    }

    /// Convert a `[libraries.<id>]` settings entry.
    ///
    /// # Errors
    /// Returns `InvalidPattern` if a banner pattern does not compile.
    pub fn from_def(id: &str, def: &LibraryDef) -> Result<Self, EngineError> {
        let identifier: Box<dyn Identify> = match &def.identify {
            IdentifyDef::Manifest {
                manifest,
                field,
                output_folder,
                files,
            } => Box::new(
                ManifestIdentifier::new(output_folder, &[])
                    .manifest(manifest)
                    .field(field)
                    .files(files.clone()),
            ),
            IdentifyDef::Banner {
                output_folder,
                file,
                pattern,
            } => Box::new(BannerIdentifier::new(output_folder, file, pattern)?),
        };

        Ok(Self {
            id: id.to_owned(),
            name: def.output_name(id).to_owned(),
            url: def.url.clone(),
            downloader: def.downloader.clone(),
            builder: def.builder.clone(),
            commands: def.commands.clone(),
            subpackages: def.subpackages.clone(),
            include_main: def.include_main,
            include_subpackages: def.include_subpackages,
            link_root: def.link_root,
            identifier,
        })
    }

    /// The identify targets in build order: main package first (if included),
    /// then each subpackage (if included).
    pub fn targets(&self) -> Vec<Option<&str>> {
        let main = self.include_main.then_some(None);
        let subs = self
            .subpackages
            .iter()
            .filter(|_| self.include_subpackages)
            .map(|s| Some(s.as_str()));
        main.into_iter().chain(subs).collect()
    }

    /// Check the descriptor before any work is done.
    ///
    /// # Errors
    /// Returns `InvalidDescriptor` for empty or non folder-safe names, an
    /// empty URL, or a descriptor that would produce nothing. Returns
    /// `UnknownDownloader`/`UnknownBuilder` for unregistered strategies.
    pub fn validate(&self, strategies: &Strategies) -> Result<(), EngineError> {
        let invalid = |message: String| EngineError::InvalidDescriptor {
            library: self.id.clone(),
            message,
        };

        check_folder_name(&self.name).map_err(|m| invalid(format!("name {m}")))?;
        if self.url.trim().is_empty() {
            return Err(invalid("url is empty".to_owned()));
        }
        for sub in &self.subpackages {
            check_folder_name(sub).map_err(|m| invalid(format!("sub-package {m}")))?;
        }
        if let Some(dup) = self
            .subpackages
            .iter()
            .enumerate()
            .find_map(|(i, s)| self.subpackages.iter().skip(i + 1).find(|o| *o == s))
        {
            return Err(invalid(format!("sub-package \"{dup}\" is listed twice")));
        }
        if self.targets().is_empty() {
            return Err(invalid(
                "nothing to publish: main package excluded and no sub-packages".to_owned(),
            ));
        }

        if !strategies.has_downloader(&self.downloader) {
            return Err(EngineError::UnknownDownloader {
                name: self.downloader.clone(),
            });
        }
        if !strategies.has_builder(&self.builder) {
            return Err(EngineError::UnknownBuilder {
                name: self.builder.clone(),
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for LibraryDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibraryDescriptor")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("url", &self.url)
            .field("downloader", &self.downloader)
            .field("builder", &self.builder)
            .field("commands", &self.commands)
            .field("subpackages", &self.subpackages)
            .field("identify", &self.identifier.strategy())
            .finish_non_exhaustive()
    }
}

/// A name usable as a single path segment.
pub(crate) fn check_folder_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("is empty".to_owned());
    }
    if name == "." || name == ".." {
        return Err(format!("\"{name}\" is not a folder name"));
    }
    if name.contains(['/', '\\', '\0']) {
        return Err(format!("\"{name}\" contains a path separator"));
    }
    Ok(())
}
