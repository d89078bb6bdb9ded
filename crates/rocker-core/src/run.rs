//! Run composition.
//!
//! Folds the active extensions' run-time contributions into a single
//! [`RunSpec`]. Unlike build fragments, run fragments are keyed values:
//!
//! | field | merge rule |
//! |-------|------------|
//! | `volumes` | keyed by container path; later wins, first position kept |
//! | `env` | keyed by variable name; later wins |
//! | `devices` | appended, duplicates dropped |
//! | `network`, `user`, `workdir` | replaced when set |
//! | `extra_args` | appended |
//!
//! `AppliedLast` extensions are folded after every other extension, so their
//! values are the ones that reach the engine.

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::engine::ImageHandle;
use crate::error::{ExtensionError, RockerError, RockerResult, Stage};
use crate::extension::{Category, ExtensionContext};
use crate::options::NetworkMode;
use crate::resolve::ActiveExtension;

/// A bind mount, written `source:target[:ro]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Mount {
    /// Host path.
    pub source: String,
    /// Container path.
    pub target: String,
    /// Mount read-only.
    pub read_only: bool,
}

impl Mount {
    /// Creates a read-write mount.
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            read_only: false,
        }
    }

    /// Mounts a host path at the same location in the container.
    pub fn same_path(path: impl Into<String>) -> Self {
        let path = path.into();
        Self::new(path.clone(), path)
    }

    /// Marks the mount read-only.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }
}

impl fmt::Display for Mount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.target)?;
        if self.read_only {
            f.write_str(":ro")?;
        }
        Ok(())
    }
}

impl FromStr for Mount {
    type Err = ExtensionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        let invalid = |reason: &str| ExtensionError::invalid_value("volume", s, reason);
        let (source, target, read_only) = match parts.as_slice() {
            [source, target] => (*source, *target, false),
            [source, target, "ro"] => (*source, *target, true),
            [_, _, "rw"] => (parts[0], parts[1], false),
            [_, _, mode] => return Err(invalid(&format!("unknown mount mode '{}'", mode))),
            _ => return Err(invalid("expected source:target[:ro]")),
        };
        if source.is_empty() || target.is_empty() {
            return Err(invalid("source and target must not be empty"));
        }
        Ok(Self {
            source: source.to_string(),
            target: target.to_string(),
            read_only,
        })
    }
}

impl TryFrom<String> for Mount {
    type Error = ExtensionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Mount> for String {
    fn from(mount: Mount) -> Self {
        mount.to_string()
    }
}

/// Run-time arguments, both as one extension's contribution and as the merged result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunArgs {
    /// Bind mounts.
    pub volumes: Vec<Mount>,
    /// Host devices.
    pub devices: Vec<String>,
    /// Environment variables.
    pub env: BTreeMap<String, String>,
    /// Network mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkMode>,
    /// Effective user (`name`, `uid` or `uid:gid`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Working directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workdir: Option<String>,
    /// Engine flags passed through verbatim.
    pub extra_args: Vec<String>,
}

impl RunArgs {
    /// Creates empty run arguments.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a mount.
    pub fn volume(mut self, mount: Mount) -> Self {
        self.volumes.push(mount);
        self
    }

    /// Adds a device.
    pub fn device(mut self, device: impl Into<String>) -> Self {
        self.devices.push(device.into());
        self
    }

    /// Sets an environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Sets the network mode.
    pub fn network(mut self, network: NetworkMode) -> Self {
        self.network = Some(network);
        self
    }

    /// Sets the effective user.
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Sets the working directory.
    pub fn workdir(mut self, workdir: impl Into<String>) -> Self {
        self.workdir = Some(workdir.into());
        self
    }

    /// Appends a verbatim engine flag.
    pub fn extra_arg(mut self, arg: impl Into<String>) -> Self {
        self.extra_args.push(arg.into());
        self
    }

    /// Returns true if these arguments change nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Folds a later contribution into these arguments.
    pub fn merge(&mut self, later: RunArgs) {
        for mount in later.volumes {
            match self.volumes.iter_mut().find(|m| m.target == mount.target) {
                Some(existing) => *existing = mount,
                None => self.volumes.push(mount),
            }
        }
        for device in later.devices {
            if !self.devices.contains(&device) {
                self.devices.push(device);
            }
        }
        self.env.extend(later.env);
        if later.network.is_some() {
            self.network = later.network;
        }
        if later.user.is_some() {
            self.user = later.user;
        }
        if later.workdir.is_some() {
            self.workdir = later.workdir;
        }
        self.extra_args.extend(later.extra_args);
    }

    /// Renders these arguments as `docker run` flags.
    pub fn to_docker_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        for mount in &self.volumes {
            args.push("-v".to_string());
            args.push(mount.to_string());
        }
        for device in &self.devices {
            args.push("--device".to_string());
            args.push(device.clone());
        }
        for (key, value) in &self.env {
            args.push("-e".to_string());
            args.push(format!("{}={}", key, value));
        }
        if let Some(network) = self.network {
            args.push("--network".to_string());
            args.push(network.to_string());
        }
        if let Some(user) = &self.user {
            args.push("--user".to_string());
            args.push(user.clone());
        }
        if let Some(workdir) = &self.workdir {
            args.push("-w".to_string());
            args.push(workdir.clone());
        }
        args.extend(self.extra_args.iter().cloned());
        args
    }
}

/// The fully composed container invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSpec {
    /// Image to run (the built image's id).
    pub image: String,
    /// Merged arguments.
    pub args: RunArgs,
    /// Command to run; empty runs the image's default command.
    pub command: Vec<String>,
}

impl RunSpec {
    /// Returns the command as a single space-joined string.
    pub fn command_line(&self) -> String {
        self.command.join(" ")
    }

    /// Renders the flags, image and command following `docker run`.
    pub fn docker_args(&self) -> Vec<String> {
        let mut args = self.args.to_docker_args();
        args.push(self.image.clone());
        args.extend(self.command.iter().cloned());
        args
    }
}

/// Composes the run invocation for a built image.
///
/// Starts from the front end's fixed `--devices`/`--network` options, then
/// folds each extension's contribution. `AppliedLast` extensions are folded
/// after all others even if `extensions` is not sorted.
pub fn compose_run(
    image: &ImageHandle,
    extensions: &[ActiveExtension],
    ctx: &ExtensionContext<'_>,
) -> RockerResult<RunSpec> {
    let mut args = RunArgs::new();
    for device in &ctx.options.devices {
        args.merge(RunArgs::new().device(device.clone()));
    }
    args.network = ctx.options.network;

    let ordered = extensions
        .iter()
        .filter(|e| e.category() != Category::AppliedLast)
        .chain(
            extensions
                .iter()
                .filter(|e| e.category() == Category::AppliedLast),
        );

    for extension in ordered {
        let contribution = extension
            .instance()
            .run_contribution(ctx)
            .map_err(|source| RockerError::extension(extension.name(), Stage::ComposeRun, source))?;
        if contribution.is_empty() {
            continue;
        }
        debug!("run contribution from '{}': {:?}", extension.name(), contribution);
        args.merge(contribution);
    }

    Ok(RunSpec {
        image: image.reference().to_string(),
        args,
        command: ctx.options.command.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_mount_parse() {
        assert_eq!("/a:/b".parse::<Mount>().unwrap(), Mount::new("/a", "/b"));
        assert_eq!(
            "/a:/b:ro".parse::<Mount>().unwrap(),
            Mount::new("/a", "/b").read_only()
        );
        assert!("/a".parse::<Mount>().is_err());
        assert!("/a:/b:zz".parse::<Mount>().is_err());
        assert!(":/b".parse::<Mount>().is_err());
    }

    #[test]
    fn test_mount_serde_as_string() {
        let mount: Mount = serde_json::from_str("\"/tmp/.X11-unix:/tmp/.X11-unix:ro\"").unwrap();
        assert!(mount.read_only);
        assert_eq!(
            serde_json::to_string(&mount).unwrap(),
            "\"/tmp/.X11-unix:/tmp/.X11-unix:ro\""
        );
    }

    #[test]
    fn test_merge_overrides_and_appends() {
        let mut base = RunArgs::new()
            .volume(Mount::new("/host/a", "/data"))
            .volume(Mount::same_path("/cache"))
            .device("/dev/dri")
            .env("A", "1")
            .extra_arg("--init");

        base.merge(
            RunArgs::new()
                .volume(Mount::new("/host/b", "/data"))
                .device("/dev/dri")
                .device("/dev/snd")
                .env("A", "2")
                .env("B", "3")
                .network(NetworkMode::Host)
                .extra_arg("--privileged"),
        );

        assert_eq!(
            base.volumes,
            vec![Mount::new("/host/b", "/data"), Mount::same_path("/cache")]
        );
        assert_eq!(base.devices, vec!["/dev/dri", "/dev/snd"]);
        assert_eq!(base.env.get("A").map(String::as_str), Some("2"));
        assert_eq!(base.env.get("B").map(String::as_str), Some("3"));
        assert_eq!(base.network, Some(NetworkMode::Host));
        assert_eq!(base.extra_args, vec!["--init", "--privileged"]);
    }

    #[test]
    fn test_merge_keeps_unset_scalars() {
        let mut base = RunArgs::new().user("1000:1000").workdir("/work");
        base.merge(RunArgs::new().env("X", "1"));
        assert_eq!(base.user.as_deref(), Some("1000:1000"));
        assert_eq!(base.workdir.as_deref(), Some("/work"));
    }

    #[test]
    fn test_to_docker_args_order() {
        let args = RunArgs::new()
            .volume(Mount::same_path("/home/alice"))
            .device("/dev/dri")
            .env("B", "2")
            .env("A", "1")
            .network(NetworkMode::None)
            .user("1000:1000")
            .workdir("/home/alice")
            .extra_arg("--init");

        assert_eq!(
            args.to_docker_args(),
            vec![
                "-v",
                "/home/alice:/home/alice",
                "--device",
                "/dev/dri",
                "-e",
                "A=1",
                "-e",
                "B=2",
                "--network",
                "none",
                "--user",
                "1000:1000",
                "-w",
                "/home/alice",
                "--init",
            ]
        );
    }

    #[test]
    fn test_run_spec_command_line() {
        let spec = RunSpec {
            image: "sha256:abc".to_string(),
            args: RunArgs::new(),
            command: vec!["bash".to_string(), "-c".to_string(), "ls".to_string()],
        };
        assert_eq!(spec.command_line(), "bash -c ls");
        assert_eq!(spec.docker_args(), vec!["sha256:abc", "bash", "-c", "ls"]);
    }

    #[test]
    fn test_run_args_from_manifest_json() {
        let args: RunArgs = serde_json::from_str(
            r#"{"volumes": ["/a:/b"], "env": {"K": "V"}, "network": "host"}"#,
        )
        .unwrap();
        assert_eq!(args.volumes, vec![Mount::new("/a", "/b")]);
        assert_eq!(args.network, Some(NetworkMode::Host));
        assert!(args.devices.is_empty());
    }
}
