//! [`ContainerEngine`] implementation over the docker CLI.

use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use log::{debug, info, warn};
use rocker_core::{
    BuildOptions, BuildSpec, ContainerEngine, EngineError, ImageHandle, Interrupt, Progress,
    RunOutcome, RunSpec,
};

use crate::config::{DockerConfig, DOCKER_ENV};
use crate::context::write_context;
use crate::process::{run_attached, run_streaming};

/// Exit status `docker run` reports when the daemon could not start the container.
pub const EXIT_NOT_STARTED: i32 = 125;

/// `State.StartedAt` prefix of a container that was created but never started.
const NEVER_STARTED_AT: &str = "0001-01-01";

/// Finds the docker executable.
///
/// Order: the configured path, `$ROCKER_DOCKER`, `docker` on `PATH`, then
/// common installation paths.
pub fn find_docker(config: &DockerConfig) -> Result<PathBuf, EngineError> {
    // Check config override first
    if let Some(ref path) = config.executable {
        if path.exists() {
            return Ok(path.clone());
        }
        warn!("configured docker executable {} does not exist", path.display());
    }

    // Check environment variable
    if let Some(path) = std::env::var_os(DOCKER_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Ok(path);
        }
        warn!("{} points at missing file {}", DOCKER_ENV, path.display());
    }

    // Try to find docker in PATH
    if let Ok(path) = which::which("docker") {
        return Ok(path);
    }

    // Try common installation paths
    let common_paths: &[&str] = if cfg!(windows) {
        &["C:\\Program Files\\Docker\\Docker\\resources\\bin\\docker.exe"]
    } else if cfg!(target_os = "macos") {
        &[
            "/usr/local/bin/docker",
            "/opt/homebrew/bin/docker",
            "/Applications/Docker.app/Contents/Resources/bin/docker",
        ]
    } else {
        &["/usr/bin/docker", "/usr/local/bin/docker", "/snap/bin/docker"]
    };

    common_paths
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
        .ok_or_else(|| {
            EngineError::NotFound(format!(
                "docker (searched {}, PATH and common locations)",
                DOCKER_ENV
            ))
        })
}

/// Arguments for `docker build`.
pub fn build_args(options: &BuildOptions, iidfile: &Path, context: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["build".into(), "--iidfile".into(), iidfile.into()];
    if let Some(tag) = &options.tag {
        args.push("-t".into());
        args.push(tag.into());
    }
    if options.no_cache {
        args.push("--no-cache".into());
    }
    if let Some(network) = options.network {
        args.push("--network".into());
        args.push(network.as_str().into());
    }
    args.push(context.into());
    args
}

/// Arguments for `docker run`.
pub fn run_args(spec: &RunSpec, interactive: bool, remove: bool, cidfile: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["run".into()];
    args.push(if interactive { "-it" } else { "-i" }.into());
    if remove {
        args.push("--rm".into());
    }
    args.push("--cidfile".into());
    args.push(cidfile.into());
    args.extend(spec.docker_args().into_iter().map(OsString::from));
    args
}

/// Renders the `docker run` command a user could paste into a shell.
pub fn run_command_line(spec: &RunSpec, interactive: bool, remove: bool) -> String {
    let mut words = vec!["docker".to_string(), "run".to_string()];
    words.push(if interactive { "-it" } else { "-i" }.to_string());
    if remove {
        words.push("--rm".to_string());
    }
    words.extend(spec.docker_args());
    words
        .iter()
        .map(|w| shell_quote(w))
        .collect::<Vec<_>>()
        .join(" ")
}

fn shell_quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@%+,".contains(c));
    if plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

fn read_trimmed(path: &Path) -> Option<String> {
    std::fs::read_to_string(path)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Drives the docker CLI.
#[derive(Debug, Clone, Default)]
pub struct DockerCli {
    config: DockerConfig,
    interrupt: Interrupt,
}

impl DockerCli {
    /// Creates an engine with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an engine with the given configuration.
    pub fn with_config(config: DockerConfig) -> Self {
        Self {
            config,
            interrupt: Interrupt::new(),
        }
    }

    /// Uses `interrupt` to abort in-flight operations.
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &DockerConfig {
        &self.config
    }

    fn command(&self) -> Result<Command, EngineError> {
        let docker = find_docker(&self.config)?;
        Ok(Command::new(docker))
    }

    /// Returns true if containers get a TTY.
    pub fn interactive(&self) -> bool {
        self.config
            .interactive
            .unwrap_or_else(|| std::io::stdin().is_terminal() && std::io::stdout().is_terminal())
    }

    /// Returns true if docker reports that container `cid` was started.
    ///
    /// A created-but-never-started container reports the zero time; a
    /// container that is already gone counts as never started.
    fn container_started(&self, cid: &str) -> bool {
        let output = self.command().and_then(|mut cmd| {
            cmd.args(["inspect", "-f", "{{.State.StartedAt}}", cid])
                .stdin(Stdio::null())
                .stderr(Stdio::null())
                .output()
                .map_err(EngineError::Spawn)
        });
        match output {
            Ok(output) if output.status.success() => {
                let started_at = String::from_utf8_lossy(&output.stdout);
                let started_at = started_at.trim();
                !started_at.is_empty() && !started_at.starts_with(NEVER_STARTED_AT)
            }
            Ok(_) => {
                debug!("container {} no longer exists", cid);
                false
            }
            Err(err) => {
                warn!("failed to inspect container {}: {}", cid, err);
                false
            }
        }
    }

    fn remove_container(&self, cid: &str) {
        let status = self.command().and_then(|mut cmd| {
            cmd.args(["rm", "-f", cid])
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .map_err(EngineError::Spawn)
        });
        if let Err(err) = status {
            warn!("failed to remove container {}: {}", cid, err);
        }
    }

    fn kill_container(&self, cidfile: &Path) {
        let Some(cid) = read_trimmed(cidfile) else {
            debug!("no container id recorded; nothing to kill");
            return;
        };
        info!("stopping container {}", cid);
        let status = self.command().and_then(|mut cmd| {
            cmd.arg("kill")
                .arg(&cid)
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .map_err(EngineError::Spawn)
        });
        match status {
            Ok(status) if status.success() => {}
            Ok(status) => warn!("docker kill {} exited with {}", cid, status),
            Err(err) => warn!("failed to stop container {}: {}", cid, err),
        }
    }
}

impl ContainerEngine for DockerCli {
    fn pull(&self, image: &str, progress: Progress<'_>) -> Result<(), EngineError> {
        let mut cmd = self.command()?;
        cmd.arg("pull").arg(image);
        let finished = run_streaming(
            cmd,
            &self.interrupt,
            self.config.poll_interval,
            self.config.tail_lines,
            progress,
        )?;
        if finished.success() {
            Ok(())
        } else {
            Err(finished.into_error())
        }
    }

    fn build(
        &self,
        spec: &BuildSpec,
        options: &BuildOptions,
        progress: Progress<'_>,
    ) -> Result<ImageHandle, EngineError> {
        let workdir = tempfile::Builder::new().prefix("rocker-build-").tempdir()?;
        let context = workdir.path().join("context");
        let iidfile = workdir.path().join("image.id");
        write_context(&context, spec)?;
        debug!("build context written to {}", context.display());

        let mut cmd = self.command()?;
        cmd.args(build_args(options, &iidfile, &context));
        let finished = run_streaming(
            cmd,
            &self.interrupt,
            self.config.poll_interval,
            self.config.tail_lines,
            progress,
        )?;
        if !finished.success() {
            return Err(finished.into_error());
        }

        let id = read_trimmed(&iidfile).ok_or(EngineError::MissingImageId)?;
        let image = ImageHandle::new(id);
        Ok(match &options.tag {
            Some(tag) => image.with_tag(tag.clone()),
            None => image,
        })
    }

    fn run(&self, spec: &RunSpec) -> Result<RunOutcome, EngineError> {
        let workdir = tempfile::Builder::new().prefix("rocker-run-").tempdir()?;
        let cidfile = workdir.path().join("container.id");

        let mut cmd = self.command()?;
        let args = run_args(spec, self.interactive(), self.config.remove, &cidfile);
        debug!("docker {:?}", args);
        cmd.args(args);

        let exit_code = run_attached(cmd, &self.interrupt, self.config.poll_interval, || {
            self.kill_container(&cidfile)
        })?;

        if exit_code == EXIT_NOT_STARTED {
            // docker writes the cidfile on create, before the start can fail
            let started = match read_trimmed(&cidfile) {
                Some(cid) if self.container_started(&cid) => true,
                Some(cid) => {
                    if self.config.remove {
                        self.remove_container(&cid);
                    }
                    false
                }
                None => false,
            };
            if !started {
                return Err(EngineError::failed(exit_code, Vec::new()));
            }
        }
        Ok(RunOutcome { exit_code })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rocker_core::{Mount, NetworkMode, RunArgs};

    fn strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_build_args() {
        let options = BuildOptions {
            no_cache: true,
            network: Some(NetworkMode::Host),
            tag: Some("rocker:0123456789abcdef".to_string()),
        };
        assert_eq!(
            strings(build_args(&options, Path::new("/tmp/x/image.id"), Path::new("/tmp/x/context"))),
            vec![
                "build",
                "--iidfile",
                "/tmp/x/image.id",
                "-t",
                "rocker:0123456789abcdef",
                "--no-cache",
                "--network",
                "host",
                "/tmp/x/context",
            ]
        );
    }

    #[test]
    fn test_build_args_minimal() {
        assert_eq!(
            strings(build_args(&BuildOptions::default(), Path::new("iid"), Path::new("ctx"))),
            vec!["build", "--iidfile", "iid", "ctx"]
        );
    }

    #[test]
    fn test_run_args() {
        let spec = RunSpec {
            image: "sha256:abc".to_string(),
            args: RunArgs::new()
                .volume(Mount::same_path("/home/alice"))
                .user("1000:1000"),
            command: vec!["bash".to_string()],
        };
        assert_eq!(
            strings(run_args(&spec, true, true, Path::new("/tmp/cid"))),
            vec![
                "run",
                "-it",
                "--rm",
                "--cidfile",
                "/tmp/cid",
                "-v",
                "/home/alice:/home/alice",
                "--user",
                "1000:1000",
                "sha256:abc",
                "bash",
            ]
        );
        assert_eq!(
            strings(run_args(&spec, false, false, Path::new("/tmp/cid")))[..3].to_vec(),
            vec!["run", "-i", "--cidfile"]
        );
    }

    #[test]
    fn test_run_command_line_quotes_words() {
        let spec = RunSpec {
            image: "sha256:abc".to_string(),
            args: RunArgs::new().env("GREETING", "hello world"),
            command: vec!["sh".to_string(), "-c".to_string(), "echo 'hi'".to_string()],
        };
        assert_eq!(
            run_command_line(&spec, true, true),
            r#"docker run -it --rm -e 'GREETING=hello world' sha256:abc sh -c 'echo '\''hi'\'''"#
        );
    }

    #[test]
    fn test_find_docker_prefers_existing_config_path() {
        let dir = tempfile::tempdir().unwrap();
        let fake = dir.path().join("docker");
        std::fs::write(&fake, "").unwrap();
        let config = DockerConfig::new().executable(&fake);
        assert_eq!(find_docker(&config).unwrap(), fake);
    }

    #[cfg(unix)]
    fn fake_docker(dir: &Path, inspect: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let script = format!(
            r#"#!/bin/sh
case "$1" in
run)
    while [ $# -gt 0 ]; do
        if [ "$1" = "--cidfile" ]; then
            printf 'c0ffee\n' > "$2"
        fi
        shift
    done
    echo "docker: Error response from daemon: failed to set up container networking" >&2
    exit 125
    ;;
inspect)
    {inspect}
    ;;
esac
exit 0
"#
        );
        let path = dir.join("docker");
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    fn run_with(inspect: &str) -> Result<RunOutcome, EngineError> {
        let dir = tempfile::tempdir().unwrap();
        let docker = fake_docker(dir.path(), inspect);
        let engine = DockerCli::with_config(DockerConfig::new().executable(docker).interactive(false));
        let spec = RunSpec {
            image: "sha256:abc".to_string(),
            args: RunArgs::new(),
            command: vec!["true".to_string()],
        };
        engine.run(&spec)
    }

    #[cfg(unix)]
    #[test]
    fn test_created_but_not_started_container_is_a_start_failure() {
        let result = run_with("echo 0001-01-01T00:00:00Z");
        assert!(matches!(result, Err(EngineError::Failed { exit_code: 125, .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_removed_container_after_125_is_a_start_failure() {
        let result = run_with("exit 1");
        assert!(matches!(result, Err(EngineError::Failed { exit_code: 125, .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_started_container_exiting_125_is_its_own_exit() {
        let result = run_with("echo 2026-10-14T09:30:00.123456789Z");
        assert_eq!(result.unwrap(), RunOutcome { exit_code: 125 });
    }

    #[test]
    fn test_read_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.id");
        assert_eq!(read_trimmed(&path), None);
        std::fs::write(&path, "sha256:abc\n").unwrap();
        assert_eq!(read_trimmed(&path).as_deref(), Some("sha256:abc"));
        std::fs::write(&path, "  \n").unwrap();
        assert_eq!(read_trimmed(&path), None);
    }
}
