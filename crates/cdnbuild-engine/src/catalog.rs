//! The libraries `cdnbuild` knows how to build, keyed by id.

use std::collections::BTreeMap;

use cdnbuild_config::Settings;

use crate::error::EngineError;
use crate::identify::{BannerIdentifier, ManifestIdentifier};
use crate::library::LibraryDescriptor;

const EOSJS_URL: &str = "https://github.com/EOSIO/eosjs.git";
const SCATTERJS_URL: &str = "https://github.com/GetScatter/scatter-js.git";
const SCATTERJS_BANNER: &str = r"ScatterJS - ([a-zA-Z0-9-]+) v([0-9.-]+)";

/// Library descriptors by id.
#[derive(Debug, Default)]
pub struct Catalog {
    libraries: BTreeMap<String, LibraryDescriptor>,
}

impl Catalog {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in libraries: `eosjs` and `scatterjs`.
    ///
    /// # Errors
    /// Only if a built-in banner pattern fails to compile.
    pub fn builtin() -> Result<Self, EngineError> {
        let mut catalog = Self::empty();
        catalog.insert(eosjs());
        catalog.insert(scatterjs()?);
        Ok(catalog)
    }

    /// The built-ins plus every `[libraries.<id>]` entry in `settings`.
    /// Config entries replace built-ins with the same id.
    ///
    /// # Errors
    /// Returns an error if a configured library cannot be converted.
    pub fn from_settings(settings: &Settings) -> Result<Self, EngineError> {
        let mut catalog = Self::builtin()?;
        for (id, def) in &settings.libraries {
            let desc = LibraryDescriptor::from_def(id, def)?;
            if catalog.libraries.contains_key(id) {
                tracing::debug!(library = %id, "configured library replaces built-in");
            }
            catalog.insert(desc);
        }
        Ok(catalog)
    }

    /// Add a descriptor under its id, returning the one it replaced.
    pub fn insert(&mut self, desc: LibraryDescriptor) -> Option<LibraryDescriptor> {
        self.libraries.insert(desc.id.clone(), desc)
    }

    /// # Errors
    /// Returns `UnknownLibrary`, listing the known ids, if `id` is not in the catalog.
    pub fn get(&self, id: &str) -> Result<&LibraryDescriptor, EngineError> {
        self.libraries
            .get(id)
            .ok_or_else(|| EngineError::UnknownLibrary {
                name: id.to_owned(),
                known: self.ids().collect::<Vec<_>>().join(", "),
            })
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.libraries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LibraryDescriptor> {
        self.libraries.values()
    }

    pub fn len(&self) -> usize {
        self.libraries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
    }
}

fn eosjs() -> LibraryDescriptor {
    let identifier = ManifestIdentifier::new(
        "dist-web",
        &[
            "eosjs-api.js",
            "eosjs-jsonrpc.js",
            "eosjs-jssig.js",
            "eosjs-numeric.js",
        ],
    );
    LibraryDescriptor::new("eosjs", EOSJS_URL, Box::new(identifier)).command(&["run", "build-web"])
}

fn scatterjs() -> Result<LibraryDescriptor, EngineError> {
    let identifier =
        BannerIdentifier::new("bundles", "scatterjs-{package}.min.js", SCATTERJS_BANNER)?;
    Ok(
        LibraryDescriptor::new("scatterjs", SCATTERJS_URL, Box::new(identifier))
            .name("scatter-js")
            .command(&["run", "pack"])
            .subpackages(&[
                "core",
                "plugin-eosjs",
                "plugin-eosjs2",
                "plugin-lynx",
                "plugin-tron",
                "plugin-web3",
            ])
            .include_main(false),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::strategy::Strategies;

    use super::*;

    #[test]
    fn builtin_catalog_has_both_libraries() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.ids().collect::<Vec<_>>(), vec!["eosjs", "scatterjs"]);
        assert_eq!(catalog.len(), 2);

        let strategies = Strategies::builtin();
        for desc in catalog.iter() {
            desc.validate(&strategies).unwrap();
        }
    }

    #[test]
    fn eosjs_descriptor() {
        let catalog = Catalog::builtin().unwrap();
        let eosjs = catalog.get("eosjs").unwrap();
        assert_eq!(eosjs.name, "eosjs");
        assert_eq!(eosjs.url, EOSJS_URL);
        assert_eq!(eosjs.builder, "yarn");
        assert_eq!(
            eosjs.commands,
            vec![vec!["run".to_owned(), "build-web".to_owned()]]
        );
        assert_eq!(eosjs.targets(), vec![None]);
        assert_eq!(eosjs.identifier.strategy(), "manifest");
    }

    #[test]
    fn scatterjs_descriptor() {
        let catalog = Catalog::builtin().unwrap();
        let scatter = catalog.get("scatterjs").unwrap();
        assert_eq!(scatter.name, "scatter-js");
        assert!(!scatter.include_main);
        assert_eq!(scatter.subpackages.len(), 6);
        assert_eq!(scatter.targets().first(), Some(&Some("core")));
        assert_eq!(scatter.identifier.strategy(), "banner");
    }

    #[test]
    fn unknown_library_lists_known_ids() {
        let catalog = Catalog::builtin().unwrap();
        let err = catalog.get("jquery").unwrap_err();
        assert_eq!(
            err.to_string(),
            "unknown library \"jquery\" (known: eosjs, scatterjs)"
        );
    }

    #[test]
    fn settings_add_and_override_libraries() {
        let settings: Settings = toml::from_str(
            r#"
[libraries.jquery]
url = "https://github.com/jquery/jquery.git"
commands = [["run", "build"]]
identify = { strategy = "manifest", files = ["jquery.js"] }

[libraries.eosjs]
name = "eosjs-fork"
url = "https://example.com/eosjs-fork.git"
builder = "npm"
identify = { strategy = "manifest", output_folder = "dist-web", files = ["*.js"] }
"#,
        )
        .unwrap();

        let catalog = Catalog::from_settings(&settings).unwrap();
        assert_eq!(
            catalog.ids().collect::<Vec<_>>(),
            vec!["eosjs", "jquery", "scatterjs"]
        );
        let eosjs = catalog.get("eosjs").unwrap();
        assert_eq!(eosjs.name, "eosjs-fork");
        assert_eq!(eosjs.builder, "npm");
        assert!(catalog.get("jquery").is_ok());
    }

    #[test]
    fn empty_catalog() {
        let catalog = Catalog::empty();
        assert!(catalog.is_empty());
        assert!(matches!(
            catalog.get("eosjs"),
            Err(EngineError::UnknownLibrary { .. })
        ));
    }
}
