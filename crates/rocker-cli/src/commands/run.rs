//! Main command: build the extended image and run it

use anyhow::Result;
use colored::Colorize;
use rocker_core::{
    ContainerEngine, ExtensionRegistry, Options, Outcome, Pipeline, RockerError, RunSpec,
};
use rocker_docker::{run_command_line, DockerCli};
use std::process::ExitCode;

/// Converts a container exit status into the process exit code.
pub fn exit_status(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

/// Runs the pipeline, echoing build output unless `quiet`.
///
/// When the build fails in quiet mode the captured tail is printed so the
/// failure is not reported without context.
pub fn execute(
    registry: &ExtensionRegistry,
    options: &Options,
    engine: &dyn ContainerEngine,
    quiet: bool,
) -> Result<Outcome, RockerError> {
    let mut progress = |line: &str| {
        if !quiet {
            eprintln!("{}", line);
        }
    };

    let result = Pipeline::new(registry, engine).execute(options, &mut progress);
    if let Err(RockerError::Build { output, .. }) = &result {
        if quiet {
            for line in output {
                eprintln!("{}", line.dimmed());
            }
        }
    }
    result
}

/// Prints what a build-only invocation produced and returns the exit code.
pub fn report(outcome: &Outcome, command_line: impl FnOnce(&RunSpec) -> String) -> ExitCode {
    if outcome.executed {
        return exit_status(outcome.exit_code);
    }

    println!("{} {}", "Built".green().bold(), outcome.image.reference());
    if let Some(tag) = &outcome.image.tag {
        println!("  {} {}", "tag".dimmed(), tag);
    }
    if let Some(run) = &outcome.run {
        println!();
        println!("{}", "Run this command:".bold());
        println!("{}", command_line(run));
    }
    ExitCode::SUCCESS
}

/// Run the main command against docker
pub fn run(registry: &ExtensionRegistry, options: &Options, engine: &DockerCli, quiet: bool) -> Result<ExitCode> {
    let outcome = execute(registry, options, engine, quiet)?;
    Ok(report(&outcome, |spec| {
        run_command_line(spec, engine.interactive(), engine.config().remove)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rocker_core::engine::mock::MockEngine;

    #[test]
    fn test_exit_status_keeps_container_code() {
        assert_eq!(exit_status(0), ExitCode::SUCCESS);
        assert_eq!(exit_status(42), ExitCode::from(42));
        assert_eq!(exit_status(-1), ExitCode::from(1));
        assert_eq!(exit_status(300), ExitCode::from(1));
    }

    #[test]
    fn test_noexecute_prints_command_and_succeeds() {
        let registry = ExtensionRegistry::new();
        let engine = MockEngine::new().run_exit(7);
        let options = Options::new("ubuntu:20.04").noexecute(true);

        let outcome = execute(&registry, &options, &engine, true).unwrap();
        let mut rendered = None;
        let code = report(&outcome, |spec| {
            rendered = Some(spec.image.clone());
            spec.image.clone()
        });
        assert_eq!(code, ExitCode::SUCCESS);
        assert_eq!(rendered.as_deref(), Some(outcome.image.id.as_str()));
        assert_eq!(engine.run_count(), 0);
    }

    #[test]
    fn test_noexecute_without_run_skips_command_line() {
        let engine = MockEngine::new();
        let options = Options::new("ubuntu:20.04").noexecute(true);
        let mut outcome = execute(&ExtensionRegistry::new(), &options, &engine, true).unwrap();
        outcome.run = None;

        let mut rendered = false;
        let code = report(&outcome, |_| {
            rendered = true;
            String::new()
        });
        assert_eq!(code, ExitCode::SUCCESS);
        assert!(!rendered);
    }

    #[test]
    fn test_container_exit_code_is_forwarded() {
        let registry = ExtensionRegistry::new();
        let engine = MockEngine::new().run_exit(7);
        let outcome = execute(&registry, &Options::new("ubuntu:20.04"), &engine, true).unwrap();
        assert_eq!(report(&outcome, |_| unreachable!()), ExitCode::from(7));
    }

    #[test]
    fn test_build_failure_is_returned() {
        let registry = ExtensionRegistry::new();
        let engine = MockEngine::new().fail_build(2, &["boom"]);
        let err = execute(&registry, &Options::new("ubuntu:20.04"), &engine, true).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
