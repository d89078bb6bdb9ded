//! Extension contract types.
//!
//! An extension contributes to two things:
//!
//! 1. **Build**: Dockerfile instructions (and build-context files) appended after
//!    the base image's `FROM` line
//! 2. **Run**: mounts, devices, environment and flags for the container invocation
//!
//! Extensions are described by an [`ExtensionDescriptor`] that is cheap to
//! create and inspect. Only descriptors whose flag is set are instantiated into
//! an [`Extension`].
//!
//! # Ordering
//!
//! Each descriptor carries an explicit [`Category`]. `AppliedLast` extensions
//! (identity setup, such as switching the container user) always apply after
//! every `Normal` extension, so nothing the others do runs under the final,
//! restricted identity.
//!
//! # Example
//!
//! ```
//! use rocker_core::extension::{ExtensionManifest, validate_extension_manifest};
//!
//! let manifest = ExtensionManifest::from_json(r#"{
//!     "name": "git-config",
//!     "version": "1.0.0",
//!     "run": { "volumes": ["{home}/.gitconfig:{home}/.gitconfig:ro"] }
//! }"#).unwrap();
//!
//! assert!(validate_extension_manifest(&manifest).is_ok());
//! ```

mod contract;
mod descriptor;
mod manifest;

pub use contract::{
    BuildContribution, Category, CliOption, Extension, ExtensionContext, OptionKind,
};
pub use descriptor::{ExtensionDescriptor, ExtensionFactory, ExtensionSource};
pub use manifest::{
    is_valid_context_path, is_valid_extension_name, validate_extension_manifest,
    ExtensionManifest, ManifestBuild, ManifestExtension, ManifestValidationError,
};

#[cfg(test)]
mod tests;
