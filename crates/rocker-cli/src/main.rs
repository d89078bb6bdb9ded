//! rocker - run a base image extended for the invoking host
//!
//! Thin binary wrapper; everything lives in the `rocker_cli` library.

use colored::Colorize;
use std::process::ExitCode;

fn main() -> ExitCode {
    match rocker_cli::run(std::env::args_os()) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", "error".red(), e);
            ExitCode::from(rocker_cli::exit_code_for(&e))
        }
    }
}
