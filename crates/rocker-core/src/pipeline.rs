//! The full invocation: resolve, compose, build, compose, run.

use log::{info, warn};

use crate::build::{compose_build, BuildSpec};
use crate::builder::{build_image, BuildRequest};
use crate::engine::{ContainerEngine, ImageHandle, Progress};
use crate::error::RockerResult;
use crate::executor::execute_run;
use crate::extension::ExtensionContext;
use crate::host::HostInfo;
use crate::options::Options;
use crate::registry::ExtensionRegistry;
use crate::resolve::{active_names, resolve};
use crate::run::{compose_run, RunSpec};

/// Result of a completed invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Active extensions in application order.
    pub active: Vec<String>,
    /// The built image.
    pub image: ImageHandle,
    /// The build specification that was submitted.
    pub build: BuildSpec,
    /// The composed run invocation; `None` when a build-only invocation
    /// could not compose it.
    pub run: Option<RunSpec>,
    /// True if the run invocation was submitted to the engine.
    pub executed: bool,
    /// Exit code to report: the container's, or 0 for build-only invocations.
    pub exit_code: i32,
}

/// Drives one invocation against a registry and an engine.
pub struct Pipeline<'a> {
    registry: &'a ExtensionRegistry,
    engine: &'a dyn ContainerEngine,
    host: HostInfo,
}

impl<'a> Pipeline<'a> {
    /// Creates a pipeline for the current host.
    pub fn new(registry: &'a ExtensionRegistry, engine: &'a dyn ContainerEngine) -> Self {
        Self {
            registry,
            engine,
            host: HostInfo::detect(),
        }
    }

    /// Uses a fixed host description instead of the detected one.
    pub fn with_host(mut self, host: HostInfo) -> Self {
        self.host = host;
        self
    }

    /// Returns the host extensions see.
    pub fn host(&self) -> &HostInfo {
        &self.host
    }

    /// Resolves and composes the build without touching the engine.
    pub fn plan(&self, options: &Options) -> RockerResult<(Vec<String>, BuildSpec)> {
        let active = resolve(self.registry, options)?;
        let ctx = ExtensionContext::new(options, &self.host);
        let spec = compose_build(&ctx, &active)?;
        Ok((
            active_names(&active).into_iter().map(String::from).collect(),
            spec,
        ))
    }

    /// Runs the invocation.
    ///
    /// Build progress goes to `progress`. With `noexecute` set the run
    /// invocation is composed but never submitted, and the exit code is 0;
    /// a failure to compose it is logged and leaves `run` empty.
    pub fn execute(&self, options: &Options, progress: Progress<'_>) -> RockerResult<Outcome> {
        let active = resolve(self.registry, options)?;
        let names: Vec<String> = active_names(&active).into_iter().map(String::from).collect();
        if names.is_empty() {
            info!("no extensions active");
        } else {
            info!("active extensions: {}", names.join(", "));
        }

        let ctx = ExtensionContext::new(options, &self.host);
        let build = compose_build(&ctx, &active)?;
        let image = build_image(self.engine, &build, &BuildRequest::from(options), progress)?;

        if options.noexecute {
            info!("--noexecute given; not running {}", image.id);
            let run = match compose_run(&image, &active, &ctx) {
                Ok(run) => Some(run),
                Err(err) => {
                    warn!("cannot compose the run invocation: {}", err);
                    None
                }
            };
            return Ok(Outcome {
                active: names,
                image,
                build,
                run,
                executed: false,
                exit_code: 0,
            });
        }

        let run = compose_run(&image, &active, &ctx)?;
        let exit_code = execute_run(self.engine, &run)?;
        Ok(Outcome {
            active: names,
            image,
            build,
            run: Some(run),
            executed: true,
            exit_code,
        })
    }
}
