//! Extension descriptors: what is known about an extension before it is activated.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::ExtensionError;
use crate::extension::contract::{Category, CliOption, Extension};
use crate::extension::manifest::{ExtensionManifest, ManifestExtension};
use crate::options::Options;

/// Creates a full extension from the resolved options.
pub type ExtensionFactory =
    Arc<dyn Fn(&Options) -> Result<Box<dyn Extension>, ExtensionError> + Send + Sync>;

/// Where an extension's behavior comes from.
#[derive(Clone)]
pub enum ExtensionSource {
    /// Compiled into the binary.
    Builtin(ExtensionFactory),
    /// Declared by a manifest file.
    Manifest {
        manifest: ExtensionManifest,
        path: Option<PathBuf>,
    },
}

impl fmt::Debug for ExtensionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtensionSource::Builtin(_) => f.write_str("Builtin"),
            ExtensionSource::Manifest { path, .. } => {
                f.debug_struct("Manifest").field("path", path).finish()
            }
        }
    }
}

/// Lightweight, introspectable description of an extension.
///
/// Descriptors are cheap: nothing of the extension runs until
/// [`instantiate`](Self::instantiate) is called for an activated one.
#[derive(Debug, Clone)]
pub struct ExtensionDescriptor {
    name: String,
    description: String,
    category: Category,
    options: Vec<CliOption>,
    source: ExtensionSource,
}

impl ExtensionDescriptor {
    /// Describes a compiled-in extension activated by `--<name>`.
    pub fn builtin<F>(name: impl Into<String>, description: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&Options) -> Result<Box<dyn Extension>, ExtensionError> + Send + Sync + 'static,
    {
        let name = name.into();
        let description = description.into();
        Self {
            options: vec![CliOption::flag(name.clone(), description.clone())],
            name,
            description,
            category: Category::Normal,
            source: ExtensionSource::Builtin(Arc::new(factory)),
        }
    }

    /// Describes a manifest-defined extension.
    pub fn from_manifest(manifest: ExtensionManifest, path: Option<PathBuf>) -> Self {
        Self {
            name: manifest.name.clone(),
            description: manifest.help(),
            category: manifest.category,
            options: vec![CliOption::flag(manifest.name.clone(), manifest.help())],
            source: ExtensionSource::Manifest { manifest, path },
        }
    }

    /// Sets the ordering category.
    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    /// Replaces the declared options.
    ///
    /// One of them must be named after the extension; it is the activation option.
    pub fn with_options(mut self, options: Vec<CliOption>) -> Self {
        self.options = options;
        self
    }

    /// Returns the extension name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the one-line description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the ordering category.
    pub fn category(&self) -> Category {
        self.category
    }

    /// Returns the command-line options this extension registers.
    pub fn register_options(&self) -> &[CliOption] {
        &self.options
    }

    /// Returns the activation option (the one named after the extension).
    pub fn activation_option(&self) -> Option<&CliOption> {
        self.options.iter().find(|o| o.long == self.name)
    }

    /// Returns where the extension comes from.
    pub fn source(&self) -> &ExtensionSource {
        &self.source
    }

    /// Returns the manifest path for manifest-defined extensions.
    pub fn manifest_path(&self) -> Option<&Path> {
        match &self.source {
            ExtensionSource::Manifest { path, .. } => path.as_deref(),
            ExtensionSource::Builtin(_) => None,
        }
    }

    /// Creates the full extension.
    pub fn instantiate(&self, options: &Options) -> Result<Box<dyn Extension>, ExtensionError> {
        match &self.source {
            ExtensionSource::Builtin(factory) => factory(options),
            ExtensionSource::Manifest { manifest, .. } => {
                Ok(Box::new(ManifestExtension::new(manifest.clone())))
            }
        }
    }
}
