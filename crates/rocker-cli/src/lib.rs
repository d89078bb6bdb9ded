//! rocker CLI library.
//!
//! Argument parsing, logging and signal setup for the `rocker` binary, plus
//! the commands it dispatches to. The binary itself only maps the result to
//! an exit code.
//!
//! Startup order matters: front-end flags that affect discovery are scanned
//! first, then extensions are discovered, then the full command line is
//! parsed with every extension's flags registered.

pub mod cli_args;
pub mod commands;
pub mod logging;
pub mod signals;

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use log::{debug, info, warn};
use rocker_core::error::EXIT_CONFIGURATION;
use rocker_core::{ConfigurationError, ExtensionRegistry, Interrupt, RockerError};
use rocker_docker::DockerCli;

use cli_args::{parse_args, to_options, Bootstrap};

/// Builds the registry: built-ins first, then manifests from every search path.
pub fn load_registry(extra_paths: &[PathBuf]) -> Result<ExtensionRegistry, ConfigurationError> {
    let mut registry = ExtensionRegistry::with_default_paths();
    for path in extra_paths {
        registry.add_search_path(path.clone());
    }
    registry.register_all(rocker_extensions::builtin_descriptors())?;

    let skipped = registry.discover()?;
    if !skipped.is_empty() {
        debug!("{} extension manifest(s) skipped", skipped.len());
    }
    info!("extensions found: {}", registry.names().join(", "));
    Ok(registry)
}

/// Runs rocker with the given arguments (including the program name).
pub fn run<I, T>(args: I) -> Result<ExitCode>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
    let bootstrap = Bootstrap::scan(args.iter().cloned());
    let _logger = logging::init(bootstrap.verbose, bootstrap.quiet)?;

    let interrupt = Interrupt::new();
    if let Err(err) = signals::install(&interrupt) {
        warn!("{:#}", err);
    }

    let registry = load_registry(&bootstrap.extension_paths)?;
    let (cli, matches) = match parse_args(&registry, args) {
        Ok(parsed) => parsed,
        Err(err) => {
            // Help and version land here too, with exit code 0
            err.print()?;
            return Ok(ExitCode::from(u8::try_from(err.exit_code()).unwrap_or(EXIT_CONFIGURATION)));
        }
    };

    if cli.list_extensions {
        return commands::list::run(&registry);
    }

    let options = to_options(&registry, &cli, &matches)?;
    let engine = DockerCli::new().with_interrupt(interrupt);
    commands::run::run(&registry, &options, &engine, cli.quiet)
}

/// Maps an error returned by [`run`] to the process exit code.
pub fn exit_code_for(err: &anyhow::Error) -> u8 {
    if let Some(err) = err.downcast_ref::<RockerError>() {
        return err.exit_code();
    }
    if err.downcast_ref::<ConfigurationError>().is_some() {
        return EXIT_CONFIGURATION;
    }
    1
}
