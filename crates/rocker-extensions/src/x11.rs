//! `--x11`: let GUI applications in the container use the host X server.

use rocker_core::extension::ExtensionContext;
use rocker_core::{Extension, ExtensionDescriptor, ExtensionError, Mount, Options, RunArgs};

pub const NAME: &str = "x11";

const X11_SOCKET_DIR: &str = "/tmp/.X11-unix";

#[derive(Debug, Default)]
pub struct X11;

impl Extension for X11 {
    fn name(&self) -> &str {
        NAME
    }

    fn run_contribution(&self, ctx: &ExtensionContext<'_>) -> Result<RunArgs, ExtensionError> {
        let display = ctx
            .host
            .env("DISPLAY")
            .filter(|d| !d.is_empty())
            .ok_or_else(|| ExtensionError::MissingEnv("DISPLAY".to_string()))?;
        let mut args = RunArgs::new()
            .env("DISPLAY", display)
            // Shared memory does not cross the container boundary.
            .env("QT_X11_NO_MITSHM", "1")
            .volume(Mount::same_path(X11_SOCKET_DIR));
        if let Some(xauthority) = ctx.host.env("XAUTHORITY").filter(|x| !x.is_empty()) {
            args = args
                .volume(Mount::same_path(xauthority).read_only())
                .env("XAUTHORITY", xauthority);
        }
        Ok(args)
    }
}

pub fn descriptor() -> ExtensionDescriptor {
    ExtensionDescriptor::builtin(NAME, "Forward the X11 display", |_: &Options| {
        Ok(Box::new(X11) as Box<dyn Extension>)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rocker_core::HostInfo;

    fn contribution(host: &HostInfo) -> Result<RunArgs, ExtensionError> {
        let options = Options::new("ubuntu").enable(NAME);
        X11.run_contribution(&ExtensionContext::new(&options, host))
    }

    #[test]
    fn test_display_forwarding() {
        let host = HostInfo::fixed("alice", 1000, 1000, "/home/alice").with_env("DISPLAY", ":1");
        assert_eq!(
            contribution(&host).unwrap(),
            RunArgs::new()
                .env("DISPLAY", ":1")
                .env("QT_X11_NO_MITSHM", "1")
                .volume(Mount::same_path(X11_SOCKET_DIR))
        );
    }

    #[test]
    fn test_xauthority_is_mounted_read_only() {
        let host = HostInfo::fixed("alice", 1000, 1000, "/home/alice")
            .with_env("DISPLAY", ":0")
            .with_env("XAUTHORITY", "/home/alice/.Xauthority");
        let args = contribution(&host).unwrap();
        assert_eq!(
            args.volumes[1],
            Mount::same_path("/home/alice/.Xauthority").read_only()
        );
        assert_eq!(
            args.env.get("XAUTHORITY").map(String::as_str),
            Some("/home/alice/.Xauthority")
        );
    }

    #[test]
    fn test_requires_display() {
        let host = HostInfo::fixed("alice", 1000, 1000, "/home/alice");
        assert!(matches!(
            contribution(&host),
            Err(ExtensionError::MissingEnv(var)) if var == "DISPLAY"
        ));
    }
}
