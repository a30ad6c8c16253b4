use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Resource ceilings applied to every sandbox run.
///
/// These are uniform policy values from configuration; languages cannot
/// override them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxLimits {
    /// Memory ceiling in megabytes
    #[serde(default = "default_memory_mb")]
    pub memory_mb: u64,

    /// CPU-share ceiling (fractional CPUs)
    #[serde(default = "default_cpus")]
    pub cpus: f64,

    /// Size of the writable scratch tmpfs in megabytes
    #[serde(default = "default_scratch_size_mb")]
    pub scratch_size_mb: u64,

    /// Wall-clock timeout in seconds wrapping the run step of each case
    #[serde(default = "default_case_timeout")]
    pub case_timeout: f64,
}

impl Default for SandboxLimits {
    fn default() -> Self {
        Self {
            memory_mb: default_memory_mb(),
            cpus: default_cpus(),
            scratch_size_mb: default_scratch_size_mb(),
            case_timeout: default_case_timeout(),
        }
    }
}

fn default_memory_mb() -> u64 {
    512
}

fn default_cpus() -> f64 {
    1.0
}

fn default_scratch_size_mb() -> u64 {
    512
}

fn default_case_timeout() -> f64 {
    10.0
}

/// A submitted solution, as delivered by the external web tier.
///
/// Read-only input to the judge; the submission id is assigned by the
/// external persistence layer, never by this core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    /// Identifier assigned by the persistence layer
    #[serde(default)]
    pub solution_id: u64,

    /// Submitting user
    pub user_id: u64,

    /// Problem the solution targets
    pub problem_id: u64,

    /// Language profile identifier
    pub language_id: u32,

    /// Source text; may carry literal `\n` escape sequences
    pub code: String,

    /// Submission timestamp
    pub submitted_at: DateTime<Utc>,
}

/// Classification of one test case's execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaseOutcome {
    #[serde(rename = "PASSED")]
    Passed,

    #[serde(rename = "FAILED")]
    Failed,

    // Wire string kept exactly as the consumers expect it, typo included.
    #[serde(rename = "TIME LIMITED EXCEEDED")]
    TimeLimitExceeded,

    #[serde(rename = "INTERNAL ERROR")]
    InternalError,
}

impl std::fmt::Display for CaseOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CaseOutcome::Passed => "PASSED",
            CaseOutcome::Failed => "FAILED",
            CaseOutcome::TimeLimitExceeded => "TIME LIMITED EXCEEDED",
            CaseOutcome::InternalError => "INTERNAL ERROR",
        };
        write!(f, "{s}")
    }
}

/// Verdict for one test case.
///
/// Created by the orchestrator from a parsed execution outcome, immutable
/// thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseVerdict {
    /// Test case name (input file base name)
    pub case_name: String,

    /// Outcome classification
    #[serde(rename = "result")]
    pub outcome: CaseOutcome,

    /// Measured execution time; integer nanoseconds on the wire
    #[serde(with = "duration_nanos")]
    pub execution_time: Duration,
}

impl CaseVerdict {
    /// Verdict for a case that could not be executed at all
    pub fn internal_error(case_name: impl Into<String>) -> Self {
        Self {
            case_name: case_name.into(),
            outcome: CaseOutcome::InternalError,
            execution_time: Duration::ZERO,
        }
    }
}

/// Aggregated result of judging one submission.
///
/// Created empty when orchestration starts and populated as case verdicts
/// arrive; this is the unit returned to the external caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultSummary {
    pub total_cases: usize,
    pub correct_cases: usize,
    pub incorrect_cases: usize,
    pub time_limit_exceeded: usize,
    pub case_results: Vec<CaseVerdict>,

    /// Submission-level error message, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResultSummary {
    /// Create an empty summary for the given number of cases
    pub fn new(total_cases: usize) -> Self {
        Self {
            total_cases,
            case_results: Vec::with_capacity(total_cases),
            ..Default::default()
        }
    }

    /// Record one case verdict, incrementing exactly one counter.
    ///
    /// `FAILED` and `INTERNAL ERROR` both count as incorrect.
    pub fn record(&mut self, verdict: CaseVerdict) {
        match verdict.outcome {
            CaseOutcome::Passed => self.correct_cases += 1,
            CaseOutcome::Failed | CaseOutcome::InternalError => self.incorrect_cases += 1,
            CaseOutcome::TimeLimitExceeded => self.time_limit_exceeded += 1,
        }
        self.case_results.push(verdict);
    }
}

/// Serialize a `Duration` as integer nanoseconds.
mod duration_nanos {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(value.as_nanos().min(u128::from(u64::MAX)) as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let nanos = u64::deserialize(deserializer)?;
        Ok(Duration::from_nanos(nanos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(name: &str, outcome: CaseOutcome) -> CaseVerdict {
        CaseVerdict {
            case_name: name.to_owned(),
            outcome,
            execution_time: Duration::from_millis(5),
        }
    }

    #[test]
    fn sandbox_limits_defaults() {
        let limits = SandboxLimits::default();
        assert_eq!(limits.memory_mb, 512);
        assert_eq!(limits.cpus, 1.0);
        assert_eq!(limits.scratch_size_mb, 512);
        assert_eq!(limits.case_timeout, 10.0);
    }

    #[test]
    fn record_passed_increments_correct() {
        let mut summary = ResultSummary::new(1);
        summary.record(verdict("case1.txt", CaseOutcome::Passed));
        assert_eq!(summary.correct_cases, 1);
        assert_eq!(summary.incorrect_cases, 0);
        assert_eq!(summary.time_limit_exceeded, 0);
        assert_eq!(summary.case_results.len(), 1);
    }

    #[test]
    fn record_failed_increments_incorrect() {
        let mut summary = ResultSummary::new(1);
        summary.record(verdict("case1.txt", CaseOutcome::Failed));
        assert_eq!(summary.incorrect_cases, 1);
        assert_eq!(summary.correct_cases, 0);
    }

    #[test]
    fn record_internal_error_counts_as_incorrect() {
        let mut summary = ResultSummary::new(1);
        summary.record(CaseVerdict::internal_error("case1.txt"));
        assert_eq!(summary.incorrect_cases, 1);
        assert_eq!(summary.time_limit_exceeded, 0);
    }

    #[test]
    fn record_time_limit_increments_tle() {
        let mut summary = ResultSummary::new(1);
        summary.record(verdict("case1.txt", CaseOutcome::TimeLimitExceeded));
        assert_eq!(summary.time_limit_exceeded, 1);
        assert_eq!(summary.correct_cases, 0);
        assert_eq!(summary.incorrect_cases, 0);
    }

    #[test]
    fn record_exactly_one_counter_per_verdict() {
        let mut summary = ResultSummary::new(4);
        summary.record(verdict("a", CaseOutcome::Passed));
        summary.record(verdict("b", CaseOutcome::Failed));
        summary.record(verdict("c", CaseOutcome::TimeLimitExceeded));
        summary.record(CaseVerdict::internal_error("d"));
        assert_eq!(
            summary.correct_cases + summary.incorrect_cases + summary.time_limit_exceeded,
            4
        );
    }

    #[test]
    fn internal_error_verdict_has_zero_time() {
        let v = CaseVerdict::internal_error("x.txt");
        assert_eq!(v.outcome, CaseOutcome::InternalError);
        assert_eq!(v.execution_time, Duration::ZERO);
    }

    #[test]
    fn case_outcome_wire_strings() {
        assert_eq!(
            serde_json::to_string(&CaseOutcome::Passed).unwrap(),
            "\"PASSED\""
        );
        assert_eq!(
            serde_json::to_string(&CaseOutcome::Failed).unwrap(),
            "\"FAILED\""
        );
        assert_eq!(
            serde_json::to_string(&CaseOutcome::TimeLimitExceeded).unwrap(),
            "\"TIME LIMITED EXCEEDED\""
        );
        assert_eq!(
            serde_json::to_string(&CaseOutcome::InternalError).unwrap(),
            "\"INTERNAL ERROR\""
        );
    }

    #[test]
    fn case_outcome_display_matches_wire() {
        for outcome in [
            CaseOutcome::Passed,
            CaseOutcome::Failed,
            CaseOutcome::TimeLimitExceeded,
            CaseOutcome::InternalError,
        ] {
            let wire = serde_json::to_string(&outcome).unwrap();
            assert_eq!(wire, format!("\"{outcome}\""));
        }
    }

    #[test]
    fn verdict_serializes_execution_time_as_nanos() {
        let v = CaseVerdict {
            case_name: "case1.txt".to_owned(),
            outcome: CaseOutcome::Passed,
            execution_time: Duration::from_nanos(1_500_000),
        };
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["case_name"], "case1.txt");
        assert_eq!(json["result"], "PASSED");
        assert_eq!(json["execution_time"], 1_500_000);
    }

    #[test]
    fn summary_wire_field_names() {
        let mut summary = ResultSummary::new(1);
        summary.record(verdict("case1.txt", CaseOutcome::Passed));
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["total_cases"], 1);
        assert_eq!(json["correct_cases"], 1);
        assert_eq!(json["incorrect_cases"], 0);
        assert_eq!(json["time_limit_exceeded"], 0);
        assert!(json["case_results"].is_array());
        assert!(json.get("error").is_none());
    }

    #[test]
    fn summary_error_serialized_when_present() {
        let summary = ResultSummary {
            error: Some("boom".to_owned()),
            ..ResultSummary::new(0)
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["error"], "boom");
    }

    #[test]
    fn submission_deserializes_wire_object() {
        let json = r#"{
            "user_id": 7,
            "problem_id": 42,
            "language_id": 2,
            "code": "int main() {}",
            "submitted_at": "2024-03-01T12:00:00Z"
        }"#;
        let submission: Submission = serde_json::from_str(json).unwrap();
        assert_eq!(submission.solution_id, 0);
        assert_eq!(submission.user_id, 7);
        assert_eq!(submission.problem_id, 42);
        assert_eq!(submission.language_id, 2);
        assert_eq!(submission.code, "int main() {}");
    }
}
