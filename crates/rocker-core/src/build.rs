//! Build composition.
//!
//! The extended image is described by a Dockerfile:
//!
//! ```text
//! FROM <base image>
//! # rocker extension: <first>
//! <first extension's instructions>
//! # rocker extension: <second>
//! <second extension's instructions>
//! ```
//!
//! plus the build-context files the extensions ship. Fragment order is exactly
//! activation order, so an extension may rely on what earlier ones installed.
//! Extensions that contribute nothing leave no trace in the Dockerfile.

use log::debug;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{ConfigurationError, RockerError, RockerResult, Stage};
use crate::extension::{is_valid_context_path, ExtensionContext};
use crate::resolve::ActiveExtension;

/// Repository name used for tags of extended images.
pub const IMAGE_REPOSITORY: &str = "rocker";

/// Hex digits of the spec digest used in the image tag.
const TAG_DIGEST_LEN: usize = 16;

/// One extension's instructions inside a build spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildFragment {
    /// Contributing extension.
    pub extension: String,
    /// Dockerfile lines.
    pub instructions: Vec<String>,
}

/// Synthesized build specification: Dockerfile plus build context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSpec {
    base_image: String,
    fragments: Vec<BuildFragment>,
    context: BTreeMap<String, Vec<u8>>,
}

impl BuildSpec {
    /// Creates a spec that only declares the base image.
    pub fn new(base_image: impl Into<String>) -> Self {
        Self {
            base_image: base_image.into(),
            fragments: Vec::new(),
            context: BTreeMap::new(),
        }
    }

    /// Returns the base image reference.
    pub fn base_image(&self) -> &str {
        &self.base_image
    }

    /// Returns the extension fragments in application order.
    pub fn fragments(&self) -> &[BuildFragment] {
        &self.fragments
    }

    /// Returns the build-context files.
    pub fn context(&self) -> &BTreeMap<String, Vec<u8>> {
        &self.context
    }

    /// Returns the `FROM` line.
    pub fn base_line(&self) -> String {
        format!("FROM {}", self.base_image)
    }

    /// Returns every instruction, starting with the `FROM` line.
    pub fn instructions(&self) -> Vec<String> {
        std::iter::once(self.base_line())
            .chain(
                self.fragments
                    .iter()
                    .flat_map(|f| f.instructions.iter().cloned()),
            )
            .collect()
    }

    /// Renders the Dockerfile text.
    pub fn dockerfile(&self) -> String {
        let mut out = self.base_line();
        out.push('\n');
        for fragment in &self.fragments {
            out.push_str("# rocker extension: ");
            out.push_str(&fragment.extension);
            out.push('\n');
            for line in &fragment.instructions {
                out.push_str(line);
                out.push('\n');
            }
        }
        out
    }

    /// Computes the BLAKE3 digest of the Dockerfile and context.
    ///
    /// Returns a 64-character lowercase hexadecimal string.
    pub fn digest(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.dockerfile().as_bytes());
        for (path, contents) in &self.context {
            hasher.update(&[0]);
            hasher.update(path.as_bytes());
            hasher.update(&[0]);
            hasher.update(&(contents.len() as u64).to_le_bytes());
            hasher.update(contents);
        }
        hasher.finalize().to_hex().to_string()
    }

    /// Returns the tag for the extended image; identical specs share a tag.
    pub fn tag(&self) -> String {
        format!("{}:{}", IMAGE_REPOSITORY, &self.digest()[..TAG_DIGEST_LEN])
    }

    /// Appends one extension's fragment.
    fn push(
        &mut self,
        extension: &str,
        instructions: Vec<String>,
        files: BTreeMap<String, Vec<u8>>,
        owners: &mut BTreeMap<String, String>,
    ) -> Result<(), ConfigurationError> {
        for (path, contents) in files {
            if !is_valid_context_path(&path) {
                return Err(ConfigurationError::InvalidContextPath {
                    extension: extension.to_string(),
                    path,
                });
            }
            // A file cannot also be a directory of another shipped file
            let clash = owners.iter().find(|(owned, _)| {
                let (new, owned) = (Path::new(&path), Path::new(owned.as_str()));
                new.starts_with(owned) || owned.starts_with(new)
            });
            if let Some((_, first)) = clash {
                return Err(ConfigurationError::ContextFileConflict {
                    path,
                    first: first.clone(),
                    second: extension.to_string(),
                });
            }
            owners.insert(path.clone(), extension.to_string());
            self.context.insert(path, contents);
        }
        if !instructions.is_empty() {
            self.fragments.push(BuildFragment {
                extension: extension.to_string(),
                instructions,
            });
        }
        Ok(())
    }
}

/// Composes the build specification from the active extensions.
///
/// Every extension's build contribution is requested in order. If any
/// extension fails, composition stops and the error names that extension;
/// no partial spec is returned.
pub fn compose_build(
    ctx: &ExtensionContext<'_>,
    extensions: &[ActiveExtension],
) -> RockerResult<BuildSpec> {
    if ctx.base_image.is_empty() {
        return Err(ConfigurationError::MissingImage.into());
    }

    let mut spec = BuildSpec::new(ctx.base_image);
    let mut owners = BTreeMap::new();

    for extension in extensions {
        let contribution = extension
            .instance()
            .build_contribution(ctx)
            .map_err(|source| RockerError::extension(extension.name(), Stage::ComposeBuild, source))?;
        if contribution.is_empty() {
            debug!("extension '{}' contributes no build fragment", extension.name());
            continue;
        }
        debug!(
            "extension '{}' contributes {} instruction(s), {} file(s)",
            extension.name(),
            contribution.instructions.len(),
            contribution.files.len()
        );
        spec.push(
            extension.name(),
            contribution.instructions,
            contribution.files,
            &mut owners,
        )?;
    }

    Ok(spec)
}
