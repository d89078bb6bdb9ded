//! rocker extension composition pipeline
//!
//! This crate turns a base image plus a set of independently written
//! extensions into an extended image and a container invocation.
//!
//! # Overview
//!
//! An invocation flows through these stages:
//!
//! - **Registry**: built-in and manifest-defined extensions, keyed by name
//! - **Resolve**: pick the extensions whose flag is set and order them
//! - **Build composition**: `FROM <base>` plus every extension's Dockerfile fragment
//! - **Image builder**: optional best-effort pull, then build
//! - **Run composition**: merge every extension's run arguments
//! - **Run executor**: start the container and report its exit status
//!
//! Only the builder and the executor talk to the [`ContainerEngine`].
//!
//! # Example
//!
//! ```
//! use rocker_core::engine::mock::MockEngine;
//! use rocker_core::extension::{BuildContribution, Extension, ExtensionContext};
//! use rocker_core::{ExtensionRegistry, HostInfo, Options, Pipeline};
//!
//! struct Curl;
//!
//! impl Extension for Curl {
//!     fn name(&self) -> &str {
//!         "curl"
//!     }
//!
//!     fn build_contribution(
//!         &self,
//!         _ctx: &ExtensionContext<'_>,
//!     ) -> Result<BuildContribution, rocker_core::ExtensionError> {
//!         Ok(BuildContribution::new().instruction("RUN apt-get update && apt-get install -y curl"))
//!     }
//! }
//!
//! let mut registry = ExtensionRegistry::new();
//! registry
//!     .register_builtin("curl", "Install curl", |_: &Options| Ok(Box::new(Curl) as Box<dyn Extension>))
//!     .unwrap();
//!
//! let engine = MockEngine::new();
//! let host = HostInfo::fixed("alice", 1000, 1000, "/home/alice");
//! let options = Options::new("ubuntu:20.04").enable("curl").noexecute(true);
//!
//! let outcome = Pipeline::new(&registry, &engine)
//!     .with_host(host)
//!     .execute(&options, &mut |line| println!("{}", line))
//!     .unwrap();
//!
//! assert_eq!(outcome.active, vec!["curl"]);
//! assert!(!outcome.executed);
//! ```
//!
//! # Modules
//!
//! - [`error`]: Error types and exit-code mapping
//! - [`options`]: Resolved invocation options
//! - [`host`]: Invoking host snapshot
//! - [`extension`]: Extension contract, descriptors and manifests
//! - [`registry`]: Extension registry and manifest discovery
//! - [`resolve`]: Activation and ordering
//! - [`build`]: Build composition
//! - [`run`]: Run composition
//! - [`engine`]: Container engine interface
//! - [`builder`]: Image builder
//! - [`executor`]: Run executor
//! - [`pipeline`]: The full invocation

pub mod build;
pub mod builder;
pub mod engine;
pub mod error;
pub mod executor;
pub mod extension;
pub mod host;
pub mod options;
pub mod pipeline;
pub mod registry;
pub mod resolve;
pub mod run;

// Re-export commonly used types at the crate root
pub use build::{compose_build, BuildFragment, BuildSpec};
pub use builder::{build_image, BuildRequest};
pub use engine::{
    BuildOptions, ContainerEngine, EngineError, ImageHandle, Interrupt, Progress, RunOutcome,
};
pub use error::{
    ConfigurationError, DiscoveryError, ExtensionError, RockerError, RockerResult, Stage,
};
pub use executor::execute_run;
pub use extension::{Category, CliOption, Extension, ExtensionDescriptor, OptionKind};
pub use host::HostInfo;
pub use options::{NetworkMode, OptionValue, Options};
pub use pipeline::{Outcome, Pipeline};
pub use registry::ExtensionRegistry;
pub use resolve::{resolve, ActiveExtension};
pub use run::{compose_run, Mount, RunArgs, RunSpec};
