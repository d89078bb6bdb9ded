//! Extension registry: the name-keyed set of installed extensions.
//!
//! Built-in extensions are registered explicitly by the binary; manifest
//! extensions are discovered from search paths. Iteration order is
//! registration order, which makes activation order reproducible.

use log::{debug, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{ConfigurationError, DiscoveryError, ExtensionError};
use crate::extension::{
    validate_extension_manifest, Extension, ExtensionDescriptor, ExtensionManifest,
};
use crate::options::{is_reserved_option, Options};

/// Environment variable holding extra manifest search paths.
pub const EXTENSION_PATH_ENV: &str = "ROCKER_EXTENSION_PATH";

/// File name of an extension manifest inside its directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Registry of extension descriptors, indexed by name.
#[derive(Debug, Default)]
pub struct ExtensionRegistry {
    /// Descriptors in registration order.
    descriptors: Vec<ExtensionDescriptor>,
    /// Name to position in `descriptors`.
    index: HashMap<String, usize>,
    /// Search paths for extension manifests.
    search_paths: Vec<PathBuf>,
}

impl ExtensionRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with default search paths.
    pub fn with_default_paths() -> Self {
        let mut registry = Self::new();

        // 1. Paths from the environment
        if let Some(paths) = std::env::var_os(EXTENSION_PATH_ENV) {
            for path in std::env::split_paths(&paths) {
                registry.search_paths.push(path);
            }
        }

        // 2. Project-local extensions
        if let Ok(cwd) = std::env::current_dir() {
            registry
                .search_paths
                .push(cwd.join(".rocker").join("extensions"));
        }

        // 3. User config directory
        if let Some(config_dir) = dirs::config_dir() {
            registry
                .search_paths
                .push(config_dir.join("rocker").join("extensions"));
        }

        // 4. System-wide (Unix-like)
        #[cfg(unix)]
        {
            registry
                .search_paths
                .push(PathBuf::from("/usr/share/rocker/extensions"));
        }

        registry
    }

    /// Adds a search path for extension manifests.
    pub fn add_search_path(&mut self, path: impl Into<PathBuf>) {
        self.search_paths.push(path.into());
    }

    /// Returns the configured search paths.
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Registers an extension descriptor.
    pub fn register(&mut self, descriptor: ExtensionDescriptor) -> Result<(), ConfigurationError> {
        let name = descriptor.name().to_string();

        if self.index.contains_key(&name) {
            return Err(ConfigurationError::DuplicateExtension(name));
        }
        if is_reserved_option(&name) {
            return Err(ConfigurationError::ReservedName(name));
        }
        if descriptor.activation_option().is_none() {
            return Err(ConfigurationError::MissingActivationOption(name));
        }
        if let Some(option) = descriptor
            .register_options()
            .iter()
            .find(|o| is_reserved_option(&o.long) || self.option_owner(&o.long).is_some())
        {
            return Err(ConfigurationError::ReservedName(option.long.clone()));
        }

        debug!("registered extension '{}'", name);
        self.index.insert(name, self.descriptors.len());
        self.descriptors.push(descriptor);
        Ok(())
    }

    /// Registers a compiled-in extension activated by `--<name>`.
    pub fn register_builtin<F>(
        &mut self,
        name: &str,
        description: &str,
        factory: F,
    ) -> Result<(), ConfigurationError>
    where
        F: Fn(&Options) -> Result<Box<dyn Extension>, ExtensionError> + Send + Sync + 'static,
    {
        self.register(ExtensionDescriptor::builtin(name, description, factory))
    }

    /// Registers several descriptors in order.
    pub fn register_all(
        &mut self,
        descriptors: impl IntoIterator<Item = ExtensionDescriptor>,
    ) -> Result<(), ConfigurationError> {
        descriptors.into_iter().try_for_each(|d| self.register(d))
    }

    /// Reads and validates a manifest file.
    pub fn load_manifest(path: &Path) -> Result<ExtensionManifest, DiscoveryError> {
        let content = std::fs::read_to_string(path).map_err(|source| DiscoveryError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let manifest =
            ExtensionManifest::from_json(&content).map_err(|source| DiscoveryError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        validate_extension_manifest(&manifest).map_err(|errors| DiscoveryError::Invalid {
            path: path.to_path_buf(),
            message: errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; "),
        })?;

        Ok(manifest)
    }

    /// Discovers and registers manifest extensions from all search paths.
    ///
    /// Broken manifests are logged, skipped and returned; they never stop the
    /// other extensions from loading. A name already taken by another
    /// extension is a configuration error and aborts discovery.
    pub fn discover(&mut self) -> Result<Vec<DiscoveryError>, ConfigurationError> {
        let mut errors = Vec::new();

        for search_path in self.search_paths.clone() {
            if !search_path.is_dir() {
                continue;
            }

            let entries = match std::fs::read_dir(&search_path) {
                Ok(entries) => entries,
                Err(source) => {
                    let err = DiscoveryError::Read {
                        path: search_path.clone(),
                        source,
                    };
                    warn!("{}", err);
                    errors.push(err);
                    continue;
                }
            };

            // Sorted so discovery order does not depend on the filesystem.
            let mut dirs: Vec<PathBuf> = entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.join(MANIFEST_FILE).is_file())
                .collect();
            dirs.sort();

            for dir in dirs {
                let manifest_path = dir.join(MANIFEST_FILE);
                match Self::load_manifest(&manifest_path) {
                    Ok(manifest) => {
                        let descriptor =
                            ExtensionDescriptor::from_manifest(manifest, Some(manifest_path));
                        self.register(descriptor)?;
                    }
                    Err(err) => {
                        warn!("skipping extension: {}", err);
                        errors.push(err);
                    }
                }
            }
        }

        Ok(errors)
    }

    /// Gets an extension by name.
    pub fn get(&self, name: &str) -> Option<&ExtensionDescriptor> {
        self.index.get(name).map(|&i| &self.descriptors[i])
    }

    /// Lists all registered extensions in registration order.
    pub fn list(&self) -> impl Iterator<Item = &ExtensionDescriptor> {
        self.descriptors.iter()
    }

    /// Lists extension names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.descriptors.iter().map(|d| d.name()).collect()
    }

    /// Returns the extension that declares the option `long`.
    pub fn option_owner(&self, long: &str) -> Option<&ExtensionDescriptor> {
        self.descriptors
            .iter()
            .find(|d| d.register_options().iter().any(|o| o.long == long))
    }

    /// Returns the number of registered extensions.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Returns true if no extensions are registered.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
