//! The capability contract every extension implements.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::ExtensionError;
use crate::host::HostInfo;
use crate::options::Options;
use crate::run::RunArgs;

/// Ordering category of an extension.
///
/// Extensions are applied in discovery order within a category; every
/// `AppliedLast` extension comes after every `Normal` one.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Ordinary extension.
    #[default]
    Normal,
    /// Identity setup (e.g. switching the effective user); must apply after all others.
    AppliedLast,
}

impl Category {
    /// Returns the stable identifier for this category.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Normal => "normal",
            Category::AppliedLast => "applied_last",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape of a command-line option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionKind {
    /// Boolean switch (`--x11`).
    Flag,
    /// One or more values (`--env A=1 B=2`).
    Values,
}

/// A command-line option contributed by an extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliOption {
    /// Long name without the leading dashes.
    pub long: String,
    /// Help text.
    pub help: String,
    /// Option shape.
    pub kind: OptionKind,
}

impl CliOption {
    /// Creates a boolean switch.
    pub fn flag(long: impl Into<String>, help: impl Into<String>) -> Self {
        Self {
            long: long.into(),
            help: help.into(),
            kind: OptionKind::Flag,
        }
    }

    /// Creates a multi-value option.
    pub fn values(long: impl Into<String>, help: impl Into<String>) -> Self {
        Self {
            long: long.into(),
            help: help.into(),
            kind: OptionKind::Values,
        }
    }
}

/// What an extension can see while contributing.
#[derive(Debug, Clone, Copy)]
pub struct ExtensionContext<'a> {
    /// Base image the build starts from.
    pub base_image: &'a str,
    /// Resolved options of this invocation.
    pub options: &'a Options,
    /// Invoking host.
    pub host: &'a HostInfo,
}

impl<'a> ExtensionContext<'a> {
    /// Creates a context for the options' own base image.
    pub fn new(options: &'a Options, host: &'a HostInfo) -> Self {
        Self {
            base_image: &options.image,
            options,
            host,
        }
    }
}

/// Build-time contribution: Dockerfile instructions plus build-context files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildContribution {
    /// Dockerfile lines, in order.
    pub instructions: Vec<String>,
    /// Files placed in the build context, keyed by relative path.
    pub files: BTreeMap<String, Vec<u8>>,
}

impl BuildContribution {
    /// Creates an empty contribution.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a Dockerfile instruction.
    pub fn instruction(mut self, line: impl Into<String>) -> Self {
        self.instructions.push(line.into());
        self
    }

    /// Adds a build-context file.
    pub fn file(mut self, path: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        self.files.insert(path.into(), contents.into());
        self
    }

    /// Returns true if this contribution adds nothing.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty() && self.files.is_empty()
    }
}

/// An activated extension.
///
/// Each method is called at most once per invocation, in activation order,
/// never concurrently with another extension.
pub trait Extension {
    /// Stable identifier; matches the descriptor name.
    fn name(&self) -> &str;

    /// Dockerfile fragment for the extended image.
    fn build_contribution(
        &self,
        _ctx: &ExtensionContext<'_>,
    ) -> Result<BuildContribution, ExtensionError> {
        Ok(BuildContribution::default())
    }

    /// Arguments for the container invocation.
    fn run_contribution(&self, _ctx: &ExtensionContext<'_>) -> Result<RunArgs, ExtensionError> {
        Ok(RunArgs::default())
    }
}
