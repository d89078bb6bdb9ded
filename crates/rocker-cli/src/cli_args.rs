//! CLI argument definitions for the rocker command-line interface.
//!
//! The fixed front-end flags are a `#[derive(Parser)]` struct. Extension
//! flags are only known after discovery, so they are appended to the derived
//! [`Command`] as builder [`Arg`]s before the real parse.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{Arg, ArgAction, ArgMatches, Command, CommandFactory, FromArgMatches, Parser};
use rocker_core::{CliOption, ConfigurationError, ExtensionRegistry, OptionKind, OptionValue, Options};

/// Help heading under which extension flags are listed.
pub const EXTENSION_HEADING: &str = "Extensions";

/// Extend a base image for the invoking host and run it
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "rocker")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Base image, followed by the command to run in the container
    #[arg(
        value_name = "IMAGE",
        trailing_var_arg = true,
        required_unless_present = "list_extensions"
    )]
    pub image: Vec<String>,

    /// Build the extended image but do not run it
    #[arg(long)]
    pub noexecute: bool,

    /// Build without the layer cache
    #[arg(long)]
    pub nocache: bool,

    /// Pull the base image before building
    #[arg(long)]
    pub pull: bool,

    /// Network mode for build and run
    #[arg(long, value_parser = ["bridge", "host", "overlay", "none"])]
    pub network: Option<String>,

    /// Host device to pass into the container (repeatable)
    #[arg(long, value_name = "DEVICE")]
    pub devices: Vec<String>,

    /// Extra directory to search for extension manifests (repeatable)
    #[arg(long, value_name = "DIR")]
    pub extension_path: Vec<PathBuf>,

    /// List available extensions and exit
    #[arg(long)]
    pub list_extensions: bool,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long)]
    pub quiet: bool,
}

/// Front-end flags needed before extensions are discovered.
///
/// The scan stops at `--` or at the first bare word, which is the image
/// (or the value of an extension option it does not know about).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bootstrap {
    pub extension_paths: Vec<PathBuf>,
    pub verbose: u8,
    pub quiet: bool,
}

impl Bootstrap {
    /// Scans raw arguments, including the program name.
    pub fn scan<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let mut scan = Self::default();
        let mut args = args.into_iter().map(Into::into).skip(1);

        while let Some(arg) = args.next() {
            let Some(text) = arg.to_str() else { break };
            if text == "--" || text == "-" || !text.starts_with('-') {
                break;
            }
            if let Some(path) = text.strip_prefix("--extension-path=") {
                scan.extension_paths.push(PathBuf::from(path));
                continue;
            }
            match text {
                "--extension-path" => {
                    if let Some(path) = args.next() {
                        scan.extension_paths.push(PathBuf::from(path));
                    }
                }
                "--network" | "--devices" => {
                    args.next();
                }
                "--verbose" => scan.verbose = scan.verbose.saturating_add(1),
                "--quiet" => scan.quiet = true,
                short if !short.starts_with("--") => {
                    let flags = &short[1..];
                    if flags.chars().all(|c| c == 'v' || c == 'q') {
                        let count = flags.chars().filter(|&c| c == 'v').count();
                        scan.verbose = scan.verbose.saturating_add(count as u8);
                        scan.quiet |= flags.contains('q');
                    }
                }
                _ => {}
            }
        }

        scan
    }
}

fn arg_id(option: &CliOption) -> String {
    format!("ext.{}", option.long)
}

/// Builds the clap argument for an extension option.
///
/// Values options take exactly one value per occurrence so they never
/// swallow the image positional.
pub fn extension_arg(option: &CliOption) -> Arg {
    let arg = Arg::new(arg_id(option))
        .long(option.long.clone())
        .help(option.help.clone())
        .help_heading(EXTENSION_HEADING);
    match option.kind {
        OptionKind::Flag => arg.action(ArgAction::SetTrue),
        OptionKind::Values => arg
            .action(ArgAction::Append)
            .num_args(1)
            .value_name("VALUE"),
    }
}

/// Builds the full command: fixed flags plus every registered extension option.
pub fn build_command(registry: &ExtensionRegistry) -> Command {
    registry
        .list()
        .flat_map(|descriptor| descriptor.register_options())
        .fold(Cli::command(), |cmd, option| cmd.arg(extension_arg(option)))
}

/// Parses `args` against the registry's command.
pub fn parse_args<I, T>(
    registry: &ExtensionRegistry,
    args: I,
) -> Result<(Cli, ArgMatches), clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = build_command(registry).try_get_matches_from(args)?;
    let cli = Cli::from_arg_matches(&matches)?;
    Ok((cli, matches))
}

/// Converts parsed arguments into pipeline options.
pub fn to_options(
    registry: &ExtensionRegistry,
    cli: &Cli,
    matches: &ArgMatches,
) -> Result<Options, ConfigurationError> {
    let mut options = Options::from_image_args(cli.image.iter().cloned())?
        .noexecute(cli.noexecute)
        .nocache(cli.nocache)
        .pull(cli.pull);

    if let Some(network) = cli.network.as_deref() {
        options = options.network(network.parse()?);
    }
    for device in &cli.devices {
        options = options.device(device.clone());
    }

    for option in registry.list().flat_map(|d| d.register_options()) {
        let id = arg_id(option);
        let value = match option.kind {
            OptionKind::Flag => OptionValue::Flag(matches.get_flag(&id)),
            OptionKind::Values => OptionValue::Values(
                matches
                    .get_many::<String>(&id)
                    .map(|values| values.cloned().collect())
                    .unwrap_or_default(),
            ),
        };
        if value.is_truthy() {
            options.set_extension(option.long.clone(), value);
        }
    }

    Ok(options)
}
