#![forbid(unsafe_code)]

use std::error::Error;
use std::path::PathBuf;
use std::process;

use cdnbuild_config::{LogLevel, Settings};
use cdnbuild_engine::{build_all, build_one, BuildContext, Catalog, Pipeline, Strategies};
use cdnbuild_util::process::SystemRunner;
use clap::{Parser, Subcommand};

type CliResult = Result<(), Box<dyn Error>>;

#[derive(Debug, Parser)]
#[command(name = "cdnbuild", about = "Build JavaScript libraries into a versioned CDN tree")]
#[command(version)]
struct Cli {
    /// Settings file (defaults to ./cdnbuild.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log at debug level regardless of settings
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build one library, or every configured library when none is given
    Build {
        /// Library id (see `cdnbuild list`)
        library: Option<String>,
        /// Overwrite files already present in the output tree
        #[arg(long)]
        force: bool,
        /// Leave working directories on disk for inspection
        #[arg(long)]
        keep_workdirs: bool,
    },
    /// List known libraries
    List,
}

fn main() {
    let cli = Cli::parse();

    if let Err(msg) = run(cli) {
        eprintln!("error: {msg}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> CliResult {
    let env_file = load_dotenv()?;
    let cwd = std::env::current_dir()?;
    let settings = Settings::load(cli.config.as_deref(), &cwd)?;

    let level = if cli.verbose {
        LogLevel::Debug
    } else {
        settings.log.level
    };
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing_level(level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        if let Some(path) = &env_file {
            tracing::debug!(path = %path.display(), "loaded environment file");
        }
        match cli.command {
            Command::Build {
                library,
                force,
                keep_workdirs,
            } => cmd_build(&settings, library.as_deref(), force, keep_workdirs),
            Command::List => cmd_list(&settings),
        }
    })
}

/// Load `.env` from the working directory. A missing file is fine.
fn load_dotenv() -> Result<Option<PathBuf>, Box<dyn Error>> {
    match dotenvy::dotenv() {
        Ok(path) => Ok(Some(path)),
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(format!("cannot load .env: {e}").into()),
    }
}

fn tracing_level(level: LogLevel) -> tracing::Level {
    match level {
        LogLevel::Trace => tracing::Level::TRACE,
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Error => tracing::Level::ERROR,
    }
}

fn cmd_build(settings: &Settings, library: Option<&str>, force: bool, keep_workdirs: bool) -> CliResult {
    let catalog = Catalog::from_settings(settings)?;
    let strategies = Strategies::builtin();
    let runner = SystemRunner;
    let ctx = BuildContext {
        catalog: &catalog,
        pipeline: Pipeline::new(&strategies, &runner, &settings.paths.build)
            .keep_workdirs(keep_workdirs || settings.build.keep_workdirs),
        output_root: settings.paths.output.clone(),
        force,
    };

    if let Some(id) = library {
        let report = build_one(&ctx, id)?;
        eprintln!(
            "    Built {id}: {} copied, {} skipped, {} linked",
            report.copied, report.skipped, report.linked
        );
        return Ok(());
    }

    if settings.build.libraries.is_empty() {
        eprintln!("nothing to build: no libraries configured");
        return Ok(());
    }

    // Batch mode reports failures but still exits successfully.
    let report = build_all(&ctx, &settings.build.libraries);
    for (id, done) in &report.succeeded {
        eprintln!(
            "    Built {id}: {} copied, {} skipped, {} linked",
            done.copied, done.skipped, done.linked
        );
    }
    for (id, err) in &report.failed {
        eprintln!("   Failed {id}: {err}");
    }
    eprintln!(
        "{} built, {} failed, output in {}",
        report.succeeded.len(),
        report.failed.len(),
        settings.paths.output.display()
    );
    Ok(())
}

fn cmd_list(settings: &Settings) -> CliResult {
    let catalog = Catalog::from_settings(settings)?;
    for desc in catalog.iter() {
        println!(
            "{:<12} {:<12} {} ({} + {}, identify: {})",
            desc.id,
            desc.name,
            desc.url,
            desc.downloader,
            desc.builder,
            desc.identifier.strategy()
        );
        if !desc.subpackages.is_empty() {
            println!("{:<12} sub-packages: {}", "", desc.subpackages.join(", "));
        }
    }
    Ok(())
}
