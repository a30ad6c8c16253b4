//! Execution output parsing
//!
//! Extracts the timing marker and the output-comparison signal from the text
//! a sandbox run captured. Classification into a verdict happens in the
//! orchestrator; this layer only reports what the text says.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

static EXECUTION_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Execution time: (\d+) nanoseconds").expect("execution time pattern is valid")
});

static OUTPUT_DIFFERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Files /workspace/tmp/.+ and /workspace/io/out/.+ differ")
        .expect("diff pattern is valid")
});

/// What one sandbox run reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    /// Elapsed run time from the timing marker; zero when the marker is
    /// absent
    pub elapsed: Duration,

    /// Whether the comparison step reported a content mismatch
    pub outputs_differ: bool,

    /// Subprocess-level failure, recorded independently of the diff signal
    pub failure: Option<String>,
}

/// Parse captured sandbox output into an execution outcome
pub fn parse(output: &str, process_error: Option<&str>) -> ExecutionOutcome {
    let elapsed = EXECUTION_TIME
        .captures(output)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<u64>().ok())
        .map(Duration::from_nanos)
        .unwrap_or(Duration::ZERO);

    ExecutionOutcome {
        elapsed,
        outputs_differ: OUTPUT_DIFFERS.is_match(output),
        failure: process_error.map(str::to_owned),
    }
}
