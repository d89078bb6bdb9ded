//! Ctrl-C handling.

use anyhow::{Context, Result};
use log::warn;
use rocker_core::error::EXIT_INTERRUPTED;
use rocker_core::Interrupt;

/// Routes SIGINT/SIGTERM to `interrupt`.
///
/// The first signal asks the engine to stop what it is doing; a second one
/// exits immediately.
pub fn install(interrupt: &Interrupt) -> Result<()> {
    let interrupt = interrupt.clone();
    ctrlc::set_handler(move || {
        if interrupt.is_triggered() {
            std::process::exit(i32::from(EXIT_INTERRUPTED));
        }
        warn!("interrupted; stopping (press Ctrl-C again to exit now)");
        interrupt.trigger();
    })
    .context("failed to install the Ctrl-C handler")
}
