//! Scriptable in-memory engine.
//!
//! Records every call and answers with configured outcomes, so the pipeline
//! can be exercised without a container daemon.

use std::sync::{Mutex, MutexGuard};

use super::{BuildOptions, ContainerEngine, EngineError, ImageHandle, Progress, RunOutcome};
use crate::build::BuildSpec;
use crate::run::RunSpec;

/// One recorded engine call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Pull(String),
    Build {
        spec: BuildSpec,
        options: BuildOptions,
    },
    Run(RunSpec),
}

#[derive(Debug, Clone, Default)]
struct Script {
    fail_pull: bool,
    fail_build: Option<(i32, Vec<String>)>,
    interrupt_build: bool,
    require_pulled_base: bool,
    fail_run_start: bool,
    interrupt_run: bool,
    run_exit: i32,
}

#[derive(Debug, Default)]
struct State {
    calls: Vec<MockCall>,
    pulled: Vec<String>,
}

/// A [`ContainerEngine`] that never touches a daemon.
#[derive(Debug, Default)]
pub struct MockEngine {
    script: Script,
    state: Mutex<State>,
}

impl MockEngine {
    /// Creates an engine where every operation succeeds and containers exit 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every pull fail.
    pub fn fail_pull(mut self) -> Self {
        self.script.fail_pull = true;
        self
    }

    /// Makes every build fail with `exit_code` after printing `output`.
    pub fn fail_build(mut self, exit_code: i32, output: &[&str]) -> Self {
        let lines = output.iter().map(|l| l.to_string()).collect();
        self.script.fail_build = Some((exit_code, lines));
        self
    }

    /// Makes builds report an interruption.
    pub fn interrupt_build(mut self) -> Self {
        self.script.interrupt_build = true;
        self
    }

    /// Makes builds fail unless the base image was pulled first.
    ///
    /// Models a host without a cached copy of the base image.
    pub fn require_pulled_base(mut self) -> Self {
        self.script.require_pulled_base = true;
        self
    }

    /// Makes containers exit with `exit_code`.
    pub fn run_exit(mut self, exit_code: i32) -> Self {
        self.script.run_exit = exit_code;
        self
    }

    /// Makes containers fail before starting.
    pub fn fail_run_start(mut self) -> Self {
        self.script.fail_run_start = true;
        self
    }

    /// Makes runs report an interruption.
    pub fn interrupt_run(mut self) -> Self {
        self.script.interrupt_run = true;
        self
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns every call made so far, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.state().calls.clone()
    }

    /// Returns the number of pull calls.
    pub fn pull_count(&self) -> usize {
        self.count(|c| matches!(c, MockCall::Pull(_)))
    }

    /// Returns the number of build calls.
    pub fn build_count(&self) -> usize {
        self.count(|c| matches!(c, MockCall::Build { .. }))
    }

    /// Returns the number of run calls.
    pub fn run_count(&self) -> usize {
        self.count(|c| matches!(c, MockCall::Run(_)))
    }

    /// Returns the most recent build request.
    pub fn last_build(&self) -> Option<(BuildSpec, BuildOptions)> {
        self.state().calls.iter().rev().find_map(|c| match c {
            MockCall::Build { spec, options } => Some((spec.clone(), options.clone())),
            _ => None,
        })
    }

    /// Returns the most recent run request.
    pub fn last_run(&self) -> Option<RunSpec> {
        self.state().calls.iter().rev().find_map(|c| match c {
            MockCall::Run(spec) => Some(spec.clone()),
            _ => None,
        })
    }

    fn count(&self, pred: impl Fn(&MockCall) -> bool) -> usize {
        self.state().calls.iter().filter(|c| pred(c)).count()
    }
}

impl ContainerEngine for MockEngine {
    fn pull(&self, image: &str, progress: Progress<'_>) -> Result<(), EngineError> {
        let mut state = self.state();
        state.calls.push(MockCall::Pull(image.to_string()));
        if self.script.fail_pull {
            let line = format!("Error response from daemon: pull access denied for {}", image);
            progress(&line);
            return Err(EngineError::failed(1, vec![line]));
        }
        progress(&format!("Status: Image is up to date for {}", image));
        state.pulled.push(image.to_string());
        Ok(())
    }

    fn build(
        &self,
        spec: &BuildSpec,
        options: &BuildOptions,
        progress: Progress<'_>,
    ) -> Result<ImageHandle, EngineError> {
        let mut state = self.state();
        state.calls.push(MockCall::Build {
            spec: spec.clone(),
            options: options.clone(),
        });

        if self.script.interrupt_build {
            return Err(EngineError::Interrupted);
        }
        if self.script.require_pulled_base && !state.pulled.iter().any(|i| i == spec.base_image()) {
            let line = format!("pull access denied for {}, repository does not exist", spec.base_image());
            progress(&line);
            return Err(EngineError::failed(1, vec![line]));
        }

        let instructions = spec.instructions();
        for (i, line) in instructions.iter().enumerate() {
            progress(&format!("Step {}/{} : {}", i + 1, instructions.len(), line));
        }
        if let Some((exit_code, output)) = &self.script.fail_build {
            for line in output {
                progress(line);
            }
            return Err(EngineError::failed(*exit_code, output.clone()));
        }

        let image = ImageHandle::new(format!("sha256:{}", spec.digest()));
        Ok(match &options.tag {
            Some(tag) => image.with_tag(tag.clone()),
            None => image,
        })
    }

    fn run(&self, spec: &RunSpec) -> Result<RunOutcome, EngineError> {
        self.state().calls.push(MockCall::Run(spec.clone()));
        if self.script.interrupt_run {
            return Err(EngineError::Interrupted);
        }
        if self.script.fail_run_start {
            return Err(EngineError::failed(
                125,
                vec!["docker: Error response from daemon: OCI runtime create failed".to_string()],
            ));
        }
        Ok(RunOutcome {
            exit_code: self.script.run_exit,
        })
    }
}
