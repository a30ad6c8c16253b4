//! Subprocess execution for the sandbox invocation
//!
//! Runs the built argument vector and captures its combined output. The
//! child is killed when the future is dropped, so an orchestration deadline
//! aborting the task never leaks a sandbox process.

use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, instrument};

use crate::sandbox::SandboxError;

/// Captured result of one sandbox subprocess.
///
/// A failed spawn or a non-zero exit is data here, not an error: the parser
/// records it as a subprocess failure and the orchestrator classifies it,
/// without aborting sibling cases.
#[derive(Debug, Clone)]
pub struct RawRun {
    /// Combined stdout and stderr text
    pub output: String,

    /// Description of the subprocess-level failure, if any
    pub process_error: Option<String>,
}

/// Execute a sandbox invocation and capture its combined output
#[instrument(skip(args))]
pub async fn run_sandbox(args: Vec<String>) -> Result<RawRun, SandboxError> {
    let program = args.first().ok_or(SandboxError::EmptyCommand)?;

    debug!(?args, "running sandbox command");

    let child = Command::new(program)
        .args(&args[1..])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn();

    let child = match child {
        Ok(child) => child,
        Err(e) => {
            return Ok(RawRun {
                output: String::new(),
                process_error: Some(format!("failed to spawn sandbox: {e}")),
            });
        }
    };

    let output = match child.wait_with_output().await {
        Ok(output) => output,
        Err(e) => {
            return Ok(RawRun {
                output: String::new(),
                process_error: Some(format!("failed to wait for sandbox: {e}")),
            });
        }
    };

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));

    let process_error = if output.status.success() {
        None
    } else {
        Some(describe_failure(output.status))
    };

    debug!(
        success = output.status.success(),
        output_len = combined.len(),
        "sandbox command finished"
    );

    Ok(RawRun {
        output: combined,
        process_error,
    })
}

fn describe_failure(status: std::process::ExitStatus) -> String {
    if let Some(code) = status.code() {
        return format!("exit status {code}");
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return format!("terminated by signal {signal}");
        }
    }

    "terminated abnormally".to_string()
}
