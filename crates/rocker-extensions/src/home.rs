//! `--home`: mount the invoking user's home directory at the same path.

use rocker_core::extension::ExtensionContext;
use rocker_core::{Extension, ExtensionDescriptor, ExtensionError, Mount, Options, RunArgs};

pub const NAME: &str = "home";

#[derive(Debug, Default)]
pub struct Home;

impl Extension for Home {
    fn name(&self) -> &str {
        NAME
    }

    fn run_contribution(&self, ctx: &ExtensionContext<'_>) -> Result<RunArgs, ExtensionError> {
        let home = ctx.host.home_str();
        if home.is_empty() {
            return Err(ExtensionError::Unsupported(
                "the invoking user has no home directory".to_string(),
            ));
        }
        Ok(RunArgs::new().volume(Mount::same_path(home)))
    }
}

pub fn descriptor() -> ExtensionDescriptor {
    ExtensionDescriptor::builtin(
        NAME,
        "Mount the user's home directory at the same path",
        |_: &Options| Ok(Box::new(Home) as Box<dyn Extension>),
    )
}
