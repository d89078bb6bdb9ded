//! `--ssh`: forward the host's ssh agent into the container.

use rocker_core::extension::ExtensionContext;
use rocker_core::{Extension, ExtensionDescriptor, ExtensionError, Mount, Options, RunArgs};

pub const NAME: &str = "ssh";

/// Host variable naming the agent socket.
const AUTH_SOCK: &str = "SSH_AUTH_SOCK";

/// Where the socket appears inside the container.
const CONTAINER_SOCK: &str = "/tmp/ssh-agent.sock";

#[derive(Debug, Default)]
pub struct Ssh;

impl Extension for Ssh {
    fn name(&self) -> &str {
        NAME
    }

    fn run_contribution(&self, ctx: &ExtensionContext<'_>) -> Result<RunArgs, ExtensionError> {
        let socket = ctx
            .host
            .env(AUTH_SOCK)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ExtensionError::MissingEnv(AUTH_SOCK.to_string()))?;
        Ok(RunArgs::new()
            .volume(Mount::new(socket, CONTAINER_SOCK))
            .env(AUTH_SOCK, CONTAINER_SOCK))
    }
}

pub fn descriptor() -> ExtensionDescriptor {
    ExtensionDescriptor::builtin(NAME, "Forward the ssh agent", |_: &Options| {
        Ok(Box::new(Ssh) as Box<dyn Extension>)
    })
}
