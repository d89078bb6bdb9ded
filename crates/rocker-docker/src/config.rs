//! Docker engine configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Environment variable overriding the docker executable.
pub const DOCKER_ENV: &str = "ROCKER_DOCKER";

/// Default interval between child status checks.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Default number of output lines kept for error reports.
pub const DEFAULT_TAIL_LINES: usize = 20;

/// Configuration for [`DockerCli`](crate::DockerCli).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerConfig {
    /// Path to the docker executable.
    pub executable: Option<PathBuf>,
    /// Attach a TTY (`-it`); `None` detects whether stdin and stdout are terminals.
    pub interactive: Option<bool>,
    /// Remove the container when it exits (`--rm`).
    pub remove: bool,
    /// Interval between child status and interrupt checks.
    pub poll_interval: Duration,
    /// Number of output lines kept for error reports.
    pub tail_lines: usize,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            executable: None,
            interactive: None,
            remove: true,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            tail_lines: DEFAULT_TAIL_LINES,
        }
    }
}

impl DockerConfig {
    /// Creates a default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the docker executable path.
    pub fn executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = Some(path.into());
        self
    }

    /// Forces TTY attachment on or off.
    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = Some(interactive);
        self
    }

    /// Keeps containers after they exit.
    pub fn keep_containers(mut self) -> Self {
        self.remove = false;
        self
    }

    /// Sets the poll interval.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the number of output lines kept for error reports.
    pub fn tail_lines(mut self, lines: usize) -> Self {
        self.tail_lines = lines;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DockerConfig::default();
        assert!(config.executable.is_none());
        assert!(config.interactive.is_none());
        assert!(config.remove);
        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert_eq!(config.tail_lines, 20);
    }

    #[test]
    fn test_builder() {
        let config = DockerConfig::new()
            .executable("/opt/docker/bin/docker")
            .interactive(false)
            .keep_containers()
            .tail_lines(5);
        assert_eq!(config.executable, Some(PathBuf::from("/opt/docker/bin/docker")));
        assert_eq!(config.interactive, Some(false));
        assert!(!config.remove);
        assert_eq!(config.tail_lines, 5);
    }
}
