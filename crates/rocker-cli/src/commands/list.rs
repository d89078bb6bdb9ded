//! `--list-extensions` implementation

use anyhow::Result;
use colored::Colorize;
use rocker_core::{CliOption, ExtensionDescriptor, ExtensionRegistry, OptionKind};
use std::process::ExitCode;

/// Renders an option the way it is typed on the command line.
pub fn usage(option: &CliOption) -> String {
    match option.kind {
        OptionKind::Flag => format!("--{}", option.long),
        OptionKind::Values => format!("--{} <VALUE>", option.long),
    }
}

/// Where an extension comes from: `builtin` or its manifest path.
pub fn source_label(descriptor: &ExtensionDescriptor) -> String {
    match descriptor.manifest_path() {
        Some(path) => path.display().to_string(),
        None => "builtin".to_string(),
    }
}

/// Run the list command
pub fn run(registry: &ExtensionRegistry) -> Result<ExitCode> {
    println!("{}", "Extensions:".bold());
    if registry.is_empty() {
        println!("  {}", "(none)".dimmed());
        return Ok(ExitCode::SUCCESS);
    }

    let width = registry.names().iter().map(|n| n.len()).max().unwrap_or(0);
    for descriptor in registry.list() {
        println!(
            "  {:<width$}  {}",
            descriptor.name().green().bold(),
            descriptor.description(),
            width = width
        );
        println!(
            "  {:<width$}  {} {}",
            "",
            descriptor.category().as_str().cyan(),
            source_label(descriptor).dimmed(),
            width = width
        );
        for option in descriptor.register_options() {
            println!("  {:<width$}    {}", "", usage(option), width = width);
        }
    }

    let search_paths = registry.search_paths();
    if !search_paths.is_empty() {
        println!();
        println!("{}", "Manifest search paths:".bold());
        for path in search_paths {
            let marker = if path.is_dir() { "ok".green() } else { "--".dimmed() };
            println!("  {} {}", marker, path.display());
        }
    }

    Ok(ExitCode::SUCCESS)
}
