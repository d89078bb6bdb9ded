//! Extension manifests: extensions declared in JSON instead of code.
//!
//! A manifest lives at `<search path>/<dir>/manifest.json`:
//!
//! ```json
//! {
//!   "name": "cuda-cache",
//!   "version": "1.0.0",
//!   "description": "Share the host CUDA cache",
//!   "build": { "instructions": ["ENV CUDA_CACHE_PATH=/cache/cuda"] },
//!   "run": { "volumes": ["{home}/.nv:/cache/cuda"] }
//! }
//! ```
//!
//! Every string in `build` and `run` may use the `{home}`, `{user}`, `{cwd}`,
//! `{uid}` and `{gid}` placeholders.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Component, Path};

use crate::error::ExtensionError;
use crate::extension::contract::{BuildContribution, Category, Extension, ExtensionContext};
use crate::host::HostInfo;
use crate::options::is_reserved_option;
use crate::run::{Mount, RunArgs};

/// Build section of a manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestBuild {
    /// Dockerfile lines.
    pub instructions: Vec<String>,
    /// Build-context files (relative path to text contents).
    pub files: BTreeMap<String, String>,
}

/// Manifest describing a configuration-defined extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionManifest {
    /// Unique name of the extension; also the name of its flag.
    pub name: String,
    /// Semantic version of the extension.
    pub version: String,
    /// Help text for the extension's flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Ordering category.
    #[serde(default)]
    pub category: Category,
    /// Build-time contribution.
    #[serde(default)]
    pub build: ManifestBuild,
    /// Run-time contribution.
    #[serde(default)]
    pub run: RunArgs,
    /// Author of the extension.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

impl ExtensionManifest {
    /// Creates an empty manifest.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: None,
            category: Category::Normal,
            build: ManifestBuild::default(),
            run: RunArgs::default(),
            author: None,
        }
    }

    /// Parses a manifest from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Returns true if the manifest contributes nothing at build or run time.
    pub fn is_empty(&self) -> bool {
        self.build.instructions.is_empty() && self.build.files.is_empty() && self.run.is_empty()
    }

    /// Returns the help text for the extension's flag.
    pub fn help(&self) -> String {
        self.description
            .clone()
            .unwrap_or_else(|| format!("Enable the {} extension", self.name))
    }
}

/// Validation errors for extension manifests.
#[derive(Debug, Clone, PartialEq)]
pub enum ManifestValidationError {
    /// Extension name is invalid.
    InvalidName(String),
    /// Extension name is one of the front end's own options.
    ReservedName(String),
    /// Version string is invalid.
    InvalidVersion(String),
    /// The manifest contributes nothing.
    NoContribution,
    /// Build-context file path is absolute or escapes the context.
    InvalidFilePath(String),
}

impl std::fmt::Display for ManifestValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName(name) => write!(f, "Invalid extension name: {}", name),
            Self::ReservedName(name) => write!(f, "Extension name is reserved: {}", name),
            Self::InvalidVersion(version) => write!(f, "Invalid version string: {}", version),
            Self::NoContribution => write!(f, "Manifest contributes no build or run arguments"),
            Self::InvalidFilePath(path) => write!(f, "Invalid build context path: {}", path),
        }
    }
}

impl std::error::Error for ManifestValidationError {}

/// Validates an extension manifest.
pub fn validate_extension_manifest(
    manifest: &ExtensionManifest,
) -> Result<(), Vec<ManifestValidationError>> {
    let mut errors = Vec::new();

    if !is_valid_extension_name(&manifest.name) {
        errors.push(ManifestValidationError::InvalidName(manifest.name.clone()));
    } else if is_reserved_option(&manifest.name) {
        errors.push(ManifestValidationError::ReservedName(manifest.name.clone()));
    }

    if !is_valid_version(&manifest.version) {
        errors.push(ManifestValidationError::InvalidVersion(
            manifest.version.clone(),
        ));
    }

    if manifest.is_empty() {
        errors.push(ManifestValidationError::NoContribution);
    }

    for path in manifest.build.files.keys() {
        if !is_valid_context_path(path) {
            errors.push(ManifestValidationError::InvalidFilePath(path.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validates an extension name.
/// Names must be lowercase alphanumeric with `-` or `_`, 2-64 characters.
pub fn is_valid_extension_name(name: &str) -> bool {
    if name.len() < 2 || name.len() > 64 {
        return false;
    }
    if !name.starts_with(|c: char| c.is_ascii_lowercase()) {
        return false;
    }
    name.chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
        && !name.ends_with('-')
        && !name.ends_with('_')
}

/// Validates a build-context path: relative, normal components only, not the
/// Dockerfile or anything below it.
pub fn is_valid_context_path(path: &str) -> bool {
    let path = Path::new(path);
    if path.as_os_str().is_empty() || path.starts_with("Dockerfile") {
        return false;
    }
    path.components().all(|c| matches!(c, Component::Normal(_)))
}

/// Validates a version string.
/// Must be semver-like: at least `major.minor`, both numeric.
fn is_valid_version(version: &str) -> bool {
    let parts: Vec<&str> = version.split('.').collect();
    if parts.len() < 2 {
        return false;
    }
    parts
        .iter()
        .take(2)
        .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
}

/// An extension instantiated from a manifest.
#[derive(Debug, Clone)]
pub struct ManifestExtension {
    manifest: ExtensionManifest,
}

impl ManifestExtension {
    /// Wraps a validated manifest.
    pub fn new(manifest: ExtensionManifest) -> Self {
        Self { manifest }
    }

    /// Returns the underlying manifest.
    pub fn manifest(&self) -> &ExtensionManifest {
        &self.manifest
    }
}

impl Extension for ManifestExtension {
    fn name(&self) -> &str {
        &self.manifest.name
    }

    fn build_contribution(
        &self,
        ctx: &ExtensionContext<'_>,
    ) -> Result<BuildContribution, ExtensionError> {
        let host = ctx.host;
        let mut contribution = BuildContribution::new();
        for line in &self.manifest.build.instructions {
            contribution = contribution.instruction(host.expand(line));
        }
        for (path, contents) in &self.manifest.build.files {
            contribution = contribution.file(path.clone(), host.expand(contents).into_bytes());
        }
        Ok(contribution)
    }

    fn run_contribution(&self, ctx: &ExtensionContext<'_>) -> Result<RunArgs, ExtensionError> {
        Ok(expand_run_args(&self.manifest.run, ctx.host))
    }
}

fn expand_run_args(args: &RunArgs, host: &HostInfo) -> RunArgs {
    RunArgs {
        volumes: args
            .volumes
            .iter()
            .map(|m| Mount {
                source: host.expand(&m.source),
                target: host.expand(&m.target),
                read_only: m.read_only,
            })
            .collect(),
        devices: args.devices.iter().map(|d| host.expand(d)).collect(),
        env: args
            .env
            .iter()
            .map(|(k, v)| (k.clone(), host.expand(v)))
            .collect(),
        network: args.network,
        user: args.user.as_deref().map(|u| host.expand(u)),
        workdir: args.workdir.as_deref().map(|w| host.expand(w)),
        extra_args: args.extra_args.iter().map(|a| host.expand(a)).collect(),
    }
}
