//! Loader harness entrypoint.
//!
//! Builds a naming scheme and strategy chain from the command line or a TOML
//! file, loads the library through a `NativeInitializer`, and prints the
//! origin of the loaded library. Exits with status 2 when loading fails and 1
//! for any other error.

mod cli;

use clap::Parser;
use cli::Cli;
use native_init::linker::LoadedLibrary;
use native_init::naming::{LibraryName, LibraryVersion};
use native_init::resources::{DirectoryResources, EmbeddedResources, ResourceStore};
use native_init::{
    ConfigError, InitError, LoaderConfig, LoaderFactory, LoaderStrategy, NamingError,
    NamingScheme, NativeInitializer, NativeLoader,
};
use std::convert::Infallible;
use std::io::{self, Write};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
enum HarnessError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Naming(#[from] NamingError),

    #[error("load failed at the {} stage: {}", stage_of(.0), .0)]
    Init(#[from] InitError),

    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

fn stage_of(err: &InitError) -> String {
    match err {
        InitError::Load(load) => load.stage().to_string(),
        InitError::Factory { .. } => "value construction".to_owned(),
        InitError::AlreadyInitialized => "initialisation".to_owned(),
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let mut stdout = io::stdout();
    let mut stderr = io::stderr();
    let exit_code = exit_code_for_run_result(run(&cli, &mut stdout), &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run(cli: &Cli, out: &mut dyn Write) -> Result<(), HarnessError> {
    let (scheme, strategy) = plan(cli)?;

    if cli.print_name {
        writeln!(out, "resource: {}", scheme.resolve(true, false)?)?;
        writeln!(out, "file: {}", scheme.resolve(false, true)?)?;
        return Ok(());
    }

    log::info!("Loading '{}' with {strategy}", scheme.library_name());
    let loader = NativeLoader::system(resource_store(cli));
    let initializer = NativeInitializer::with_library(loader, strategy, describe);
    let origin = initializer.get()?;
    writeln!(out, "loaded {origin}")?;

    let report = initializer.loader().shutdown();
    log::debug!(
        "Removed {} extraction artefacts ({} failed)",
        report.removed,
        report.failed
    );
    Ok(())
}

fn describe(library: &LoadedLibrary) -> Result<String, Infallible> {
    Ok(library.origin().to_string())
}

fn resource_store(cli: &Cli) -> Arc<dyn ResourceStore> {
    match &cli.resource_dir {
        Some(dir) => Arc::new(DirectoryResources::new(dir.as_std_path())),
        None => Arc::new(EmbeddedResources::new()),
    }
}

fn plan(cli: &Cli) -> Result<(NamingScheme, LoaderStrategy), HarnessError> {
    if let Some(path) = &cli.config {
        let config = LoaderConfig::load(path)?;
        return Ok((config.naming_scheme()?, config.strategy()?));
    }

    let name = cli.library.as_deref().unwrap_or_default();
    let mut scheme = NamingScheme::new(LibraryName::try_from(name)?);
    if let Some(version) = cli.version.as_deref() {
        scheme = scheme.with_version(LibraryVersion::try_from(version)?);
    }
    if let Some(prefix) = cli.relative_path.as_deref() {
        scheme = scheme.with_relative_path(prefix);
    }

    let factory = LoaderFactory::new(scheme);
    let mut strategies = Vec::new();
    if cli.system {
        strategies.push(factory.system_loader());
    }
    if let Some(file) = &cli.file {
        strategies.push(factory.file_loader(file.as_std_path()));
    }
    strategies.push(match &cli.fixed_dir {
        Some(dir) => factory.resource_loader_fixed_directory(dir.as_std_path()),
        None => factory.resource_loader_temp_directory(),
    });
    let strategy = LoaderStrategy::chain(strategies).ok_or(ConfigError::EmptyChain)?;
    Ok((factory.naming_scheme().clone(), strategy))
}

fn exit_code_for_run_result(result: Result<(), HarnessError>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, &err);
            match err {
                HarnessError::Init(_) => 2,
                _ => 1,
            }
        }
    }
}

fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Nothing sensible to do if stderr is gone.
    }
}
