//! Container engine interface.
//!
//! The pipeline talks to the engine through [`ContainerEngine`]: pull, build
//! and run. All three block the calling thread; pull and build stream
//! line-oriented progress through a callback.
//!
//! Engines must honor an [`Interrupt`]: when it fires they ask the engine to
//! abort the in-flight operation and return [`EngineError::Interrupted`]
//! instead of detaching.

pub mod mock;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

use crate::build::BuildSpec;
use crate::options::NetworkMode;
use crate::run::RunSpec;

/// Receives one line of engine output.
pub type Progress<'a> = &'a mut dyn FnMut(&str);

/// Errors reported by a container engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine executable could not be located.
    #[error("container engine not found: {0}")]
    NotFound(String),

    /// The engine process could not be started.
    #[error("failed to spawn container engine: {0}")]
    Spawn(#[source] std::io::Error),

    /// IO error while talking to the engine.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The engine finished with a non-zero status.
    #[error("container engine exited with status {exit_code}")]
    Failed {
        exit_code: i32,
        /// Last lines of output seen before the failure.
        output: Vec<String>,
    },

    /// The operation was aborted by a termination request.
    #[error("operation interrupted")]
    Interrupted,

    /// The build succeeded but reported no image id.
    #[error("build finished without reporting an image id")]
    MissingImageId,
}

impl EngineError {
    /// Creates a failed-status error.
    pub fn failed(exit_code: i32, output: Vec<String>) -> Self {
        Self::Failed { exit_code, output }
    }

    /// Returns the last output lines for failed-status errors.
    pub fn output(&self) -> &[String] {
        match self {
            EngineError::Failed { output, .. } => output,
            _ => &[],
        }
    }
}

/// Options for the engine's build step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Ignore the layer cache.
    pub no_cache: bool,
    /// Network mode for `RUN` instructions.
    pub network: Option<NetworkMode>,
    /// Tag applied to the built image.
    pub tag: Option<String>,
}

/// A built image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageHandle {
    /// Engine image id (e.g. `sha256:...`).
    pub id: String,
    /// Tag applied at build time, if any.
    pub tag: Option<String>,
}

impl ImageHandle {
    /// Creates a handle for an untagged image.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tag: None,
        }
    }

    /// Sets the tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Returns the reference used to run the image.
    pub fn reference(&self) -> &str {
        &self.id
    }
}

/// Outcome of a container that started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    /// Exit status of the container's main process.
    pub exit_code: i32,
}

/// A container engine.
pub trait ContainerEngine {
    /// Fetches `image` from its registry.
    fn pull(&self, image: &str, progress: Progress<'_>) -> Result<(), EngineError>;

    /// Builds `spec` and returns the resulting image.
    fn build(
        &self,
        spec: &BuildSpec,
        options: &BuildOptions,
        progress: Progress<'_>,
    ) -> Result<ImageHandle, EngineError>;

    /// Runs a container attached to the invoking process's standard streams.
    ///
    /// An `Err` means the container never started; a container that started
    /// and exited non-zero is an `Ok` outcome.
    fn run(&self, spec: &RunSpec) -> Result<RunOutcome, EngineError>;
}

/// Cancellation flag shared between a signal handler and the engine.
#[derive(Debug, Clone, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    /// Creates an untriggered flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns true once cancellation was requested.
    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupt_is_shared() {
        let interrupt = Interrupt::new();
        let handler_side = interrupt.clone();
        assert!(!interrupt.is_triggered());
        handler_side.trigger();
        assert!(interrupt.is_triggered());
    }

    #[test]
    fn test_image_handle_reference() {
        let image = ImageHandle::new("sha256:abc").with_tag("rocker:0123");
        assert_eq!(image.reference(), "sha256:abc");
        assert_eq!(image.tag.as_deref(), Some("rocker:0123"));
    }

    #[test]
    fn test_failed_output() {
        let err = EngineError::failed(1, vec!["step 3 failed".to_string()]);
        assert_eq!(err.output(), ["step 3 failed".to_string()]);
        assert!(EngineError::Interrupted.output().is_empty());
    }
}
