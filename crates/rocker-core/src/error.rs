//! Error types for the extension composition pipeline.
//!
//! Discovery problems are recovered locally (the broken extension is skipped),
//! so [`DiscoveryError`] never becomes a [`RockerError`]. Everything else that
//! can abort an invocation is a [`RockerError`], which knows which stage failed
//! and what exit code the process should report.

use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::engine::EngineError;

/// Result type for pipeline operations.
pub type RockerResult<T> = Result<T, RockerError>;

/// Exit code reported for configuration errors.
pub const EXIT_CONFIGURATION: u8 = 2;
/// Exit code reported when an extension's own logic fails.
pub const EXIT_EXTENSION: u8 = 3;
/// Exit code reported when the container never started.
///
/// Matches the code the docker CLI itself uses for daemon-side failures.
pub const EXIT_RUN_START: u8 = 125;
/// Exit code reported after a termination signal.
pub const EXIT_INTERRUPTED: u8 = 130;

/// Pipeline stage, used to attribute failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Discovery,
    Configuration,
    Activation,
    ComposeBuild,
    Pull,
    Build,
    ComposeRun,
    Run,
}

impl Stage {
    /// Returns the stable identifier for this stage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Discovery => "discovery",
            Stage::Configuration => "configuration",
            Stage::Activation => "activation",
            Stage::ComposeBuild => "build composition",
            Stage::Pull => "pull",
            Stage::Build => "build",
            Stage::ComposeRun => "run composition",
            Stage::Run => "run",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single extension that could not be loaded.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Manifest file could not be read.
    #[error("failed to read extension manifest {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Manifest file is not valid JSON for the manifest schema.
    #[error("failed to parse extension manifest {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Manifest parsed but failed validation.
    #[error("invalid extension manifest {path}: {message}")]
    Invalid { path: PathBuf, message: String },
}

impl DiscoveryError {
    /// Returns the manifest path this error refers to.
    pub fn path(&self) -> &Path {
        match self {
            DiscoveryError::Read { path, .. }
            | DiscoveryError::Parse { path, .. }
            | DiscoveryError::Invalid { path, .. } => path,
        }
    }
}

/// Fatal configuration problems, detected before any engine call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// Two extensions share a name.
    #[error("extension '{0}' is registered more than once")]
    DuplicateExtension(String),

    /// Extension name collides with a fixed command-line flag.
    #[error("extension name '{0}' collides with a built-in option")]
    ReservedName(String),

    /// Extension does not declare the option named after itself.
    #[error("extension '{0}' does not declare its activation option --{0}")]
    MissingActivationOption(String),

    /// Network mode is not one of the supported values.
    #[error("unknown network mode '{0}' (expected one of: bridge, host, overlay, none)")]
    UnknownNetworkMode(String),

    /// No base image was given.
    #[error("no base image given")]
    MissingImage,

    /// Two build-context files share a path, or one would sit inside the other.
    #[error("build context file '{path}' from '{second}' clashes with a file from '{first}'")]
    ContextFileConflict {
        path: String,
        first: String,
        second: String,
    },

    /// Build-context path is absolute, escapes the context, or is reserved.
    #[error("extension '{extension}' ships an invalid build context path '{path}'")]
    InvalidContextPath { extension: String, path: String },
}

/// Failure inside an extension's own logic.
#[derive(Debug, Error)]
pub enum ExtensionError {
    /// A host environment variable the extension needs is not set.
    #[error("host environment variable {0} is not set")]
    MissingEnv(String),

    /// An option value could not be interpreted.
    #[error("invalid value '{value}' for --{option}: {reason}")]
    InvalidValue {
        option: String,
        value: String,
        reason: String,
    },

    /// The extension cannot work on this host.
    #[error("not supported on this host: {0}")]
    Unsupported(String),

    /// Free-form failure.
    #[error("{0}")]
    Message(String),

    /// IO error while gathering host state.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExtensionError {
    /// Creates a free-form extension error.
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    /// Creates an invalid option value error.
    pub fn invalid_value(
        option: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            option: option.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}

/// Errors that abort an invocation.
#[derive(Debug, Error)]
pub enum RockerError {
    /// Invalid configuration; no engine call was made.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// An extension failed while being instantiated or asked for a contribution.
    #[error("extension '{extension}' failed during {stage}: {source}")]
    ExtensionFailed {
        extension: String,
        stage: Stage,
        #[source]
        source: ExtensionError,
    },

    /// The engine reported a failed build.
    #[error("image build failed (exit code {exit_code}): {message}")]
    Build {
        exit_code: i32,
        message: String,
        /// Last lines of build output observed before the failure.
        output: Vec<String>,
    },

    /// The container never started.
    #[error("container failed to start: {source}")]
    Run {
        #[source]
        source: EngineError,
    },

    /// A termination signal aborted the engine operation.
    #[error("interrupted during {stage}")]
    Interrupted { stage: Stage },
}

impl RockerError {
    /// Wraps an extension failure with its attribution.
    pub fn extension(extension: impl Into<String>, stage: Stage, source: ExtensionError) -> Self {
        Self::ExtensionFailed {
            extension: extension.into(),
            stage,
            source,
        }
    }

    /// Returns the stage that failed.
    pub fn stage(&self) -> Stage {
        match self {
            RockerError::Configuration(_) => Stage::Configuration,
            RockerError::ExtensionFailed { stage, .. } => *stage,
            RockerError::Build { .. } => Stage::Build,
            RockerError::Run { .. } => Stage::Run,
            RockerError::Interrupted { stage } => *stage,
        }
    }

    /// Returns the offending extension, for extension-attributable errors.
    pub fn extension_name(&self) -> Option<&str> {
        match self {
            RockerError::ExtensionFailed { extension, .. } => Some(extension),
            RockerError::Configuration(ConfigurationError::InvalidContextPath {
                extension, ..
            }) => Some(extension),
            RockerError::Configuration(ConfigurationError::ContextFileConflict {
                second, ..
            }) => Some(second),
            _ => None,
        }
    }

    /// Returns the process exit code this error maps to.
    ///
    /// Build failures forward the engine's own non-zero code.
    pub fn exit_code(&self) -> u8 {
        match self {
            RockerError::Configuration(_) => EXIT_CONFIGURATION,
            RockerError::ExtensionFailed { .. } => EXIT_EXTENSION,
            RockerError::Build { exit_code, .. } => match u8::try_from(*exit_code) {
                Ok(0) | Err(_) => 1,
                Ok(code) => code,
            },
            RockerError::Run { .. } => EXIT_RUN_START,
            RockerError::Interrupted { .. } => EXIT_INTERRUPTED,
        }
    }

    /// Returns a stable error code for reporting.
    pub fn code(&self) -> &'static str {
        match self {
            RockerError::Configuration(_) => "ROCKER_001",
            RockerError::ExtensionFailed { .. } => "ROCKER_002",
            RockerError::Build { .. } => "ROCKER_003",
            RockerError::Run { .. } => "ROCKER_004",
            RockerError::Interrupted { .. } => "ROCKER_005",
        }
    }
}
