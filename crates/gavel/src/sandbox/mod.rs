//! Container sandbox for untrusted code
//!
//! Builds and executes the isolated invocation for one test case: a locked
//! down `docker run` whose in-container pipeline compiles the staged source,
//! runs it against the case input under a wall-clock timeout, and compares
//! the produced output against the expected output. The captured text is
//! parsed one layer up into an [`ExecutionOutcome`]; exit codes carry no
//! classification of their own.

use thiserror::Error;

pub use crate::sandbox::command::{
    CODE_MOUNT, IO_MOUNT, SCRATCH_MOUNT, SandboxCommand,
};
pub use crate::sandbox::outcome::{ExecutionOutcome, parse};
pub use crate::sandbox::process::{RawRun, run_sandbox};

mod command;
mod outcome;
mod process;

/// Errors that occur during sandbox operations
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("sandbox invocation is empty")]
    EmptyCommand,
}
