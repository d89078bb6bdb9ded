//! Run executor.

use log::info;

use crate::engine::{ContainerEngine, EngineError};
use crate::error::{RockerError, RockerResult, Stage};
use crate::run::RunSpec;

/// Runs the container and returns its exit status unmodified.
///
/// `Ok(n)` means the container ran and exited with `n`, including non-zero
/// values. A container that never started is [`RockerError::Run`].
pub fn execute_run(engine: &dyn ContainerEngine, spec: &RunSpec) -> RockerResult<i32> {
    info!("running {} {}", spec.image, spec.command_line());
    match engine.run(spec) {
        Ok(outcome) => {
            info!("container exited with status {}", outcome.exit_code);
            Ok(outcome.exit_code)
        }
        Err(EngineError::Interrupted) => Err(RockerError::Interrupted { stage: Stage::Run }),
        Err(source) => Err(RockerError::Run { source }),
    }
}
