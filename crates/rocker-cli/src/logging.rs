//! Logger setup for the rocker binary.
//!
//! Libraries log through the `log` facade; the binary installs
//! `flexi_logger` writing colored records to stderr. `RUST_LOG` takes
//! precedence over the level derived from `-v`/`-q`.

use anyhow::{Context, Result};
use flexi_logger::{Logger, LoggerHandle};

/// Maps the verbosity flags to a log specification.
pub fn level_for(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "warn";
    }
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Starts the logger; keep the returned handle alive for the whole run.
pub fn init(verbose: u8, quiet: bool) -> Result<LoggerHandle> {
    let level = level_for(verbose, quiet);
    Logger::try_with_env_or_str(level)
        .with_context(|| format!("invalid log specification (default `{level}`)"))?
        .log_to_stderr()
        .format_for_stderr(flexi_logger::colored_default_format)
        .start()
        .context("failed to start logger")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_for() {
        assert_eq!(level_for(0, false), "info");
        assert_eq!(level_for(1, false), "debug");
        assert_eq!(level_for(5, false), "trace");
        assert_eq!(level_for(2, true), "warn");
    }
}
