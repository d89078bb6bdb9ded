//! Image builder: optional best-effort pull, then build.

use log::{debug, info, warn};

use crate::build::BuildSpec;
use crate::engine::{BuildOptions, ContainerEngine, EngineError, ImageHandle, Progress};
use crate::error::{RockerError, RockerResult, Stage};
use crate::options::{NetworkMode, Options};

/// Number of output lines kept in a build failure.
pub const BUILD_OUTPUT_TAIL: usize = 20;

/// How the image should be built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildRequest {
    /// Ignore the layer cache.
    pub no_cache: bool,
    /// Pull the base image first.
    pub pull: bool,
    /// Network mode for `RUN` instructions.
    pub network: Option<NetworkMode>,
}

impl From<&Options> for BuildRequest {
    fn from(options: &Options) -> Self {
        Self {
            no_cache: options.nocache,
            pull: options.pull,
            network: options.network,
        }
    }
}

/// Builds `spec`, pulling its base image first when requested.
///
/// A failed pull is logged and otherwise ignored: the build then uses
/// whatever copy of the base image the engine has cached. Build output is
/// forwarded to `progress`; on failure the last [`BUILD_OUTPUT_TAIL`] lines
/// are kept in the returned error.
pub fn build_image(
    engine: &dyn ContainerEngine,
    spec: &BuildSpec,
    request: &BuildRequest,
    progress: Progress<'_>,
) -> RockerResult<ImageHandle> {
    if request.pull {
        info!("pulling base image {}", spec.base_image());
        match engine.pull(spec.base_image(), &mut *progress) {
            Ok(()) => debug!("pulled {}", spec.base_image()),
            Err(EngineError::Interrupted) => {
                return Err(RockerError::Interrupted { stage: Stage::Pull })
            }
            Err(err) => warn!(
                "failed to pull {} ({}); building from the cached image",
                spec.base_image(),
                err
            ),
        }
    }

    let options = BuildOptions {
        no_cache: request.no_cache,
        network: request.network,
        tag: Some(spec.tag()),
    };
    info!(
        "building {} on top of {} ({} extension fragment(s))",
        spec.tag(),
        spec.base_image(),
        spec.fragments().len()
    );

    let mut tail = Vec::new();
    let result = engine.build(spec, &options, &mut |line: &str| {
        if tail.len() == BUILD_OUTPUT_TAIL {
            tail.remove(0);
        }
        tail.push(line.to_string());
        progress(line);
    });

    match result {
        Ok(image) => {
            info!("built image {}", image.id);
            Ok(image)
        }
        Err(EngineError::Interrupted) => Err(RockerError::Interrupted {
            stage: Stage::Build,
        }),
        Err(EngineError::Failed { exit_code, output }) => {
            let output = if output.is_empty() { tail } else { output };
            Err(RockerError::Build {
                exit_code,
                message: output
                    .last()
                    .cloned()
                    .unwrap_or_else(|| "no output".to_string()),
                output: last_lines(output, BUILD_OUTPUT_TAIL),
            })
        }
        Err(err) => Err(RockerError::Build {
            exit_code: 1,
            message: err.to_string(),
            output: tail,
        }),
    }
}

fn last_lines(mut lines: Vec<String>, n: usize) -> Vec<String> {
    if lines.len() > n {
        lines.drain(..lines.len() - n);
    }
    lines
}
