//! Build one library, or a list of them with per-library error isolation.

use std::path::PathBuf;

use crate::catalog::Catalog;
use crate::error::EngineError;
use crate::materialize::{materialize, MaterializeReport};
use crate::pipeline::Pipeline;

/// Everything a build run needs.
#[derive(Debug)]
pub struct BuildContext<'a> {
    pub catalog: &'a Catalog,
    pub pipeline: Pipeline<'a>,
    pub output_root: PathBuf,
    /// Overwrite existing versioned files.
    pub force: bool,
}

/// Outcome of `build_all`.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub succeeded: Vec<(String, MaterializeReport)>,
    pub failed: Vec<(String, EngineError)>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Build and materialize the library registered as `id`.
///
/// # Errors
/// Returns the first error from lookup, build, or materialization.
pub fn build_one(ctx: &BuildContext<'_>, id: &str) -> Result<MaterializeReport, EngineError> {
    let span = tracing::info_span!("library", id);
    let _guard = span.enter();

    let desc = ctx.catalog.get(id)?;
    tracing::info!(name = %desc.name, url = %desc.url, "building");
    let build = ctx.pipeline.build_library(desc)?;
    // `build` owns the working directory the sources live in; keep it alive until copied.
    materialize(&desc.name, build.outputs(), &ctx.output_root, ctx.force)
}

/// Build every library in `ids` in order. A failure is logged and recorded,
/// and the batch moves on to the next library.
pub fn build_all(ctx: &BuildContext<'_>, ids: &[String]) -> BatchReport {
    let mut report = BatchReport::default();
    for id in ids {
        match build_one(ctx, id) {
            Ok(done) => report.succeeded.push((id.clone(), done)),
            Err(e) => {
                let span = tracing::info_span!("library", id = %id);
                span.in_scope(|| tracing::error!(error = %e, "library build failed"));
                report.failed.push((id.clone(), e));
            }
        }
    }
    report
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::RefCell;
    use std::fs;
    use std::path::Path;

    use cdnbuild_util::error::UtilError;
    use cdnbuild_util::process::{CommandOutput, CommandRunner};

    use super::*;
    use crate::identify::ManifestIdentifier;
    use crate::library::LibraryDescriptor;
    use crate::strategy::Strategies;

    /// Clones write a manifest; builds write `dist/<repo>.js`. Cloning a URL
    /// containing `broken` fails.
    #[derive(Default)]
    struct FakeTools {
        cloned: RefCell<Vec<String>>,
    }

    impl CommandRunner for FakeTools {
        fn run(&self, program: &str, args: &[String], cwd: &Path) -> Result<CommandOutput, UtilError> {
            let ok = CommandOutput {
                success: true,
                exit_code: Some(0),
                ..CommandOutput::default()
            };
            if program == "git" {
                let url = args.get(2).unwrap();
                self.cloned.borrow_mut().push(url.clone());
                if url.contains("broken") {
                    return Ok(CommandOutput {
                        stderr: "fatal: not found".to_owned(),
                        exit_code: Some(128),
                        ..CommandOutput::default()
                    });
                }
                let dest = Path::new(args.get(3).unwrap());
                let repo = url.rsplit('/').next().unwrap().trim_end_matches(".git");
                fs::write(dest.join("package.json"), r#"{"version":"1.0.0"}"#).unwrap();
                fs::write(dest.join("repo"), repo).unwrap();
            } else if args.first().is_some_and(|a| a == "run") {
                let repo = fs::read_to_string(cwd.join("repo")).unwrap();
                fs::create_dir_all(cwd.join("dist")).unwrap();
                fs::write(cwd.join("dist").join(format!("{repo}.js")), &repo).unwrap();
            }
            Ok(ok)
        }
    }

    fn library(id: &str, url: &str) -> LibraryDescriptor {
        let repo = url.rsplit('/').next().unwrap().trim_end_matches(".git");
        let file = format!("{repo}.js");
        LibraryDescriptor::new(id, url, Box::new(ManifestIdentifier::new("dist", &[file.as_str()])))
            .command(&["run", "build"])
    }

    fn catalog() -> Catalog {
        let mut catalog = Catalog::empty();
        catalog.insert(library("alpha", "https://example.com/alpha.git"));
        catalog.insert(library("beta", "https://example.com/broken.git"));
        catalog.insert(library("gamma", "https://example.com/gamma.git"));
        catalog
    }

    #[test]
    fn batch_continues_past_failures() {
        let scratch = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let strategies = Strategies::builtin();
        let tools = FakeTools::default();
        let catalog = catalog();
        let ctx = BuildContext {
            catalog: &catalog,
            pipeline: Pipeline::new(&strategies, &tools, scratch.path()),
            output_root: out.path().to_path_buf(),
            force: false,
        };
        let ids = vec!["alpha".to_owned(), "beta".to_owned(), "gamma".to_owned()];

        let report = build_all(&ctx, &ids);

        assert!(!report.is_success());
        let ok: Vec<_> = report.succeeded.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ok, vec!["alpha", "gamma"]);
        assert_eq!(report.failed.len(), 1);
        let (failed_id, err) = report.failed.first().unwrap();
        assert_eq!(failed_id, "beta");
        assert!(matches!(err, EngineError::Download { .. }), "got: {err:?}");

        assert!(out.path().join("alpha/1.0.0/alpha.js").is_file());
        assert!(out.path().join("gamma/1.0.0/gamma.js").is_file());
        assert!(out.path().join("gamma/gamma.js").exists());
        assert!(!out.path().join("beta").exists());
        assert_eq!(tools.cloned.borrow().len(), 3);
    }

    #[test]
    fn build_one_propagates_unknown_library() {
        let scratch = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let strategies = Strategies::builtin();
        let tools = FakeTools::default();
        let catalog = catalog();
        let ctx = BuildContext {
            catalog: &catalog,
            pipeline: Pipeline::new(&strategies, &tools, scratch.path()),
            output_root: out.path().to_path_buf(),
            force: false,
        };

        let err = build_one(&ctx, "delta").unwrap_err();
        assert!(matches!(err, EngineError::UnknownLibrary { .. }));
        assert!(tools.cloned.borrow().is_empty());
    }

    #[test]
    fn rebuild_skips_then_force_copies() {
        let scratch = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let strategies = Strategies::builtin();
        let tools = FakeTools::default();
        let catalog = catalog();
        let mut ctx = BuildContext {
            catalog: &catalog,
            pipeline: Pipeline::new(&strategies, &tools, scratch.path()),
            output_root: out.path().to_path_buf(),
            force: false,
        };

        assert_eq!(build_one(&ctx, "alpha").unwrap().copied, 1);
        assert_eq!(build_one(&ctx, "alpha").unwrap().skipped, 1);
        ctx.force = true;
        let forced = build_one(&ctx, "alpha").unwrap();
        assert_eq!((forced.copied, forced.linked), (1, 1));
    }
}
