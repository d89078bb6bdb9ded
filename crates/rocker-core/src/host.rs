//! Snapshot of the invoking host that extensions may consult.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Identity and environment of the invoking user.
///
/// Captured once per invocation so every extension sees the same values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInfo {
    /// Login name.
    pub user: String,
    /// Numeric user id.
    pub uid: u32,
    /// Numeric primary group id.
    pub gid: u32,
    /// Home directory.
    pub home: PathBuf,
    /// Working directory of the invocation.
    pub cwd: PathBuf,
    env: BTreeMap<String, String>,
}

impl HostInfo {
    /// Captures the current process's host information.
    pub fn detect() -> Self {
        let env: BTreeMap<String, String> = std::env::vars().collect();
        let user = env
            .get("USER")
            .or_else(|| env.get("USERNAME"))
            .cloned()
            .unwrap_or_else(|| "rocker".to_string());
        let (uid, gid) = current_ids();
        Self {
            user,
            uid,
            gid,
            home: dirs::home_dir().unwrap_or_default(),
            cwd: std::env::current_dir().unwrap_or_default(),
            env,
        }
    }

    /// Creates a fixed host description with an empty environment.
    pub fn fixed(user: impl Into<String>, uid: u32, gid: u32, home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        Self {
            user: user.into(),
            uid,
            gid,
            cwd: home.clone(),
            home,
            env: BTreeMap::new(),
        }
    }

    /// Sets a host environment variable.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Sets the working directory.
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = cwd.into();
        self
    }

    /// Looks up a host environment variable.
    pub fn env(&self, key: &str) -> Option<&str> {
        self.env.get(key).map(String::as_str)
    }

    /// Returns the home directory as a string.
    pub fn home_str(&self) -> String {
        path_string(&self.home)
    }

    /// Substitutes `{home}`, `{user}`, `{cwd}`, `{uid}` and `{gid}` placeholders.
    pub fn expand(&self, template: &str) -> String {
        template
            .replace("{home}", &self.home_str())
            .replace("{user}", &self.user)
            .replace("{cwd}", &path_string(&self.cwd))
            .replace("{uid}", &self.uid.to_string())
            .replace("{gid}", &self.gid.to_string())
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(unix)]
fn current_ids() -> (u32, u32) {
    use nix::unistd::{getgid, getuid};
    (getuid().as_raw(), getgid().as_raw())
}

#[cfg(not(unix))]
fn current_ids() -> (u32, u32) {
    (1000, 1000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_placeholders() {
        let host = HostInfo::fixed("alice", 1000, 1001, "/home/alice").with_cwd("/work");
        assert_eq!(
            host.expand("{home}/.cache:{home}/.cache"),
            "/home/alice/.cache:/home/alice/.cache"
        );
        assert_eq!(host.expand("{user}@{uid}:{gid} in {cwd}"), "alice@1000:1001 in /work");
        assert_eq!(host.expand("no placeholders"), "no placeholders");
    }

    #[test]
    fn test_env_lookup() {
        let host = HostInfo::fixed("alice", 1000, 1000, "/home/alice").with_env("DISPLAY", ":0");
        assert_eq!(host.env("DISPLAY"), Some(":0"));
        assert_eq!(host.env("SSH_AUTH_SOCK"), None);
    }

    #[test]
    fn test_detect_does_not_panic() {
        let host = HostInfo::detect();
        assert!(!host.user.is_empty());
    }
}
