//! rocker docker engine
//!
//! Implements [`rocker_core::ContainerEngine`] by running the `docker` CLI
//! as a subprocess:
//!
//! - `pull` runs `docker pull <image>`
//! - `build` writes the Dockerfile and build context into a temporary
//!   directory and runs `docker build --iidfile ...`
//! - `run` runs `docker run --rm --cidfile ...` attached to the invoking
//!   terminal
//!
//! Output of `pull` and `build` is streamed line by line. All three honor
//! the engine's [`Interrupt`](rocker_core::Interrupt): the build client is
//! killed, and a started container is stopped with `docker kill`.

pub mod config;
pub mod context;
pub mod engine;
mod process;

pub use config::{DockerConfig, DOCKER_ENV};
pub use engine::{find_docker, run_command_line, DockerCli};
