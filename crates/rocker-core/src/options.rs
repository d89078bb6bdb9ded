//! Resolved invocation options.
//!
//! The front end parses the command line once and hands the result to the
//! pipeline as an [`Options`] value. Nothing downstream touches the parser.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigurationError;

/// Option names owned by the front end; extensions may not use them.
pub const RESERVED_OPTION_NAMES: &[&str] = &[
    "image",
    "noexecute",
    "nocache",
    "pull",
    "network",
    "devices",
    "extension-path",
    "list-extensions",
    "verbose",
    "quiet",
    "help",
    "version",
];

/// Returns true if `name` is owned by the front end.
pub fn is_reserved_option(name: &str) -> bool {
    RESERVED_OPTION_NAMES.contains(&name)
}

/// Container network mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkMode {
    Bridge,
    Host,
    Overlay,
    None,
}

impl NetworkMode {
    /// All supported modes, in the order they are offered on the command line.
    pub const ALL: [NetworkMode; 4] = [
        NetworkMode::Bridge,
        NetworkMode::Host,
        NetworkMode::Overlay,
        NetworkMode::None,
    ];

    /// Returns the engine-facing name of this mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkMode::Bridge => "bridge",
            NetworkMode::Host => "host",
            NetworkMode::Overlay => "overlay",
            NetworkMode::None => "none",
        }
    }
}

impl fmt::Display for NetworkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetworkMode {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NetworkMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| ConfigurationError::UnknownNetworkMode(s.to_string()))
    }
}

/// Value of an extension-contributed option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    /// A boolean switch.
    Flag(bool),
    /// One or more values.
    Values(Vec<String>),
}

impl OptionValue {
    /// Returns true if the option should activate its extension.
    pub fn is_truthy(&self) -> bool {
        match self {
            OptionValue::Flag(set) => *set,
            OptionValue::Values(values) => !values.is_empty(),
        }
    }

    /// Returns the values carried by this option (empty for flags).
    pub fn values(&self) -> &[String] {
        match self {
            OptionValue::Flag(_) => &[],
            OptionValue::Values(values) => values,
        }
    }
}

/// Everything the pipeline needs to know about one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    /// Base image reference.
    pub image: String,
    /// Command to run in the container (may be empty).
    pub command: Vec<String>,
    /// Build only; skip the run stage.
    pub noexecute: bool,
    /// Build without the engine's layer cache.
    pub nocache: bool,
    /// Pull the base image before building.
    pub pull: bool,
    /// Network mode for build and run.
    pub network: Option<NetworkMode>,
    /// Host devices to pass into the container.
    pub devices: Vec<String>,
    extensions: BTreeMap<String, OptionValue>,
}

impl Options {
    /// Creates options for the given base image.
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            ..Default::default()
        }
    }

    /// Splits a positional `image [command...]` list.
    pub fn from_image_args<I, S>(args: I) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut args = args.into_iter().map(Into::into);
        let image = args
            .next()
            .filter(|image| !image.is_empty())
            .ok_or(ConfigurationError::MissingImage)?;
        Ok(Self {
            image,
            command: args.collect(),
            ..Default::default()
        })
    }

    /// Sets the container command.
    pub fn command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = command.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the build-only switch.
    pub fn noexecute(mut self, noexecute: bool) -> Self {
        self.noexecute = noexecute;
        self
    }

    /// Sets the no-cache switch.
    pub fn nocache(mut self, nocache: bool) -> Self {
        self.nocache = nocache;
        self
    }

    /// Sets the pull-first switch.
    pub fn pull(mut self, pull: bool) -> Self {
        self.pull = pull;
        self
    }

    /// Sets the network mode.
    pub fn network(mut self, network: NetworkMode) -> Self {
        self.network = Some(network);
        self
    }

    /// Adds a host device.
    pub fn device(mut self, device: impl Into<String>) -> Self {
        self.devices.push(device.into());
        self
    }

    /// Turns on an extension flag.
    pub fn enable(self, name: impl Into<String>) -> Self {
        self.with_extension(name, OptionValue::Flag(true))
    }

    /// Sets an extension option, returning the updated options.
    pub fn with_extension(mut self, name: impl Into<String>, value: OptionValue) -> Self {
        self.set_extension(name, value);
        self
    }

    /// Sets an extension option.
    pub fn set_extension(&mut self, name: impl Into<String>, value: OptionValue) {
        self.extensions.insert(name.into(), value);
    }

    /// Looks up an extension option by its long name.
    pub fn extension(&self, name: &str) -> Option<&OptionValue> {
        self.extensions.get(name)
    }

    /// Returns true if the option named `name` is truthy.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.extension(name).is_some_and(OptionValue::is_truthy)
    }

    /// Returns the values of the option named `name` (empty when unset).
    pub fn extension_values(&self, name: &str) -> &[String] {
        self.extension(name).map(OptionValue::values).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_mode_round_trip_names() {
        for mode in NetworkMode::ALL {
            assert_eq!(mode.as_str().parse::<NetworkMode>().unwrap(), mode);
        }
        assert_eq!(
            "mesh".parse::<NetworkMode>(),
            Err(ConfigurationError::UnknownNetworkMode("mesh".to_string()))
        );
    }

    #[test]
    fn test_from_image_args() {
        let options = Options::from_image_args(["ubuntu:20.04", "bash", "-c", "ls"]).unwrap();
        assert_eq!(options.image, "ubuntu:20.04");
        assert_eq!(options.command, vec!["bash", "-c", "ls"]);

        let err = Options::from_image_args(Vec::<String>::new()).unwrap_err();
        assert_eq!(err, ConfigurationError::MissingImage);
    }

    #[test]
    fn test_truthiness() {
        assert!(OptionValue::Flag(true).is_truthy());
        assert!(!OptionValue::Flag(false).is_truthy());
        assert!(!OptionValue::Values(vec![]).is_truthy());
        assert!(OptionValue::Values(vec!["A=1".to_string()]).is_truthy());
    }

    #[test]
    fn test_extension_lookup() {
        let options = Options::new("ubuntu")
            .enable("x11")
            .with_extension("env", OptionValue::Values(vec!["A=1".to_string()]))
            .with_extension("home", OptionValue::Flag(false));

        assert!(options.is_enabled("x11"));
        assert!(options.is_enabled("env"));
        assert!(!options.is_enabled("home"));
        assert!(!options.is_enabled("ssh"));
        assert_eq!(options.extension_values("env"), ["A=1".to_string()]);
        assert!(options.extension_values("x11").is_empty());
    }

    #[test]
    fn test_reserved_names() {
        assert!(is_reserved_option("network"));
        assert!(is_reserved_option("extension-path"));
        assert!(!is_reserved_option("x11"));
    }
}
