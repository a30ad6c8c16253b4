//! Verdict aggregation and orchestration
//!
//! The top-level coordinator for one submission: validates the language,
//! stages the code, resolves test assets, fans out one sandboxed run per
//! test case under a bounded concurrency ceiling, and folds the per-case
//! verdicts into a [`ResultSummary`].
//!
//! Case-level failures are recovered locally into an `INTERNAL ERROR`
//! verdict and never abort sibling cases; submission-level failures abort
//! the whole run as a single [`JudgeError`].

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use crate::assets::{self, AssetError, TestCase};
use crate::config::{Config, Language, LanguageId};
use crate::sandbox::{self, CODE_MOUNT, ExecutionOutcome, SandboxCommand};
use crate::types::{CaseOutcome, CaseVerdict, ResultSummary, Submission};
use crate::workspace::{Workspace, WorkspaceError};

/// Execution time above which a case is classified as time-limited.
///
/// The per-case wall-clock timeout from configuration must exceed this, so
/// that a killed run is still measured past the threshold.
pub const TIME_LIMIT: Duration = Duration::from_millis(2000);

/// Submission-level errors.
///
/// Per-case execution failures never appear here; they are recorded as
/// `INTERNAL ERROR` verdicts in the summary instead.
#[derive(Debug, Error)]
pub enum JudgeError {
    #[error("unsupported language id: {0}")]
    UnknownLanguage(LanguageId),

    #[error("test asset error: {0}")]
    Asset(#[from] AssetError),

    #[error("workspace error: {0}")]
    Workspace(#[from] WorkspaceError),

    #[error("submission deadline exceeded")]
    DeadlineExceeded,
}

/// Orchestrator for judging submissions.
///
/// Holds its collaborators explicitly; construct one at process start and
/// share it (`Judge` is cheap to clone).
#[derive(Debug, Clone)]
pub struct Judge {
    config: Arc<Config>,
    workspace: Workspace,
    semaphore: Arc<Semaphore>,
}

impl Judge {
    /// Create a new judge from configuration
    pub fn new(config: Config) -> Self {
        let workspace = Workspace::new(config.workspace.root.clone());
        let semaphore = Arc::new(Semaphore::new(config.max_concurrency));
        Self {
            config: Arc::new(config),
            workspace,
            semaphore,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Judge a submission under the configured submission deadline
    pub async fn judge(&self, submission: &Submission) -> Result<ResultSummary, JudgeError> {
        self.judge_with_deadline(submission, self.config.deadline())
            .await
    }

    /// Judge a submission under a caller-supplied deadline.
    ///
    /// When the deadline elapses, in-flight case results are discarded, all
    /// running case tasks are aborted and their sandbox processes killed,
    /// and [`JudgeError::DeadlineExceeded`] is returned.
    #[instrument(
        skip(self, submission),
        fields(
            solution_id = submission.solution_id,
            problem_id = submission.problem_id,
            language_id = submission.language_id,
        )
    )]
    pub async fn judge_with_deadline(
        &self,
        submission: &Submission,
        deadline: Option<Duration>,
    ) -> Result<ResultSummary, JudgeError> {
        match deadline {
            Some(deadline) => {
                match tokio::time::timeout(deadline, self.judge_inner(submission)).await {
                    Ok(result) => result,
                    Err(_) => {
                        warn!(?deadline, "submission deadline elapsed, discarding run");
                        Err(JudgeError::DeadlineExceeded)
                    }
                }
            }
            None => self.judge_inner(submission).await,
        }
    }

    async fn judge_inner(&self, submission: &Submission) -> Result<ResultSummary, JudgeError> {
        // Validation comes first: an unknown language must fail before any
        // resource is allocated.
        let language_id = LanguageId::from(submission.language_id);
        let language = match self.config.get_language(language_id) {
            Ok(language) => Arc::new(language.clone()),
            Err(_) => return Err(JudgeError::UnknownLanguage(language_id)),
        };

        // Staging
        self.workspace.ensure_root().await?;
        let staged = self
            .workspace
            .stage_source(&language, &submission.code)
            .await?;

        let result = self
            .run_cases(staged.dir(), staged.file_name(), &language, submission)
            .await;

        if let Err(e) = staged.release().await {
            warn!(error = %e, "failed to release staged source");
        }

        result
    }

    async fn run_cases(
        &self,
        code_dir: &Path,
        source_name: &str,
        language: &Arc<Language>,
        submission: &Submission,
    ) -> Result<ResultSummary, JudgeError> {
        let cases =
            assets::resolve_cases(&self.config.asset_root, submission.problem_id).await?;

        info!(total = cases.len(), "dispatching test cases");

        let io_dir = assets::problem_dir(&self.config.asset_root, submission.problem_id);
        let code_path = format!("{CODE_MOUNT}/{source_name}");

        let mut summary = ResultSummary::new(cases.len());
        let mut tasks: JoinSet<CaseVerdict> = JoinSet::new();

        for case in cases {
            let semaphore = self.semaphore.clone();
            let config = self.config.clone();
            let workspace = self.workspace.clone();
            let language = language.clone();
            let code_dir = code_dir.to_path_buf();
            let code_path = code_path.clone();
            let io_dir = io_dir.clone();

            tasks.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    // Only possible if the semaphore were closed
                    Err(_) => return CaseVerdict::internal_error(case.name),
                };
                run_case(&config, &workspace, &language, &code_dir, &code_path, &io_dir, &case)
                    .await
            });
        }

        // Verdicts are collected here in completion order; this loop is the
        // single writer into the summary.
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(verdict) => {
                    debug!(
                        case = %verdict.case_name,
                        outcome = %verdict.outcome,
                        elapsed = ?verdict.execution_time,
                        "collected case verdict"
                    );
                    summary.record(verdict);
                }
                Err(e) => warn!(error = %e, "case task did not complete"),
            }
        }

        summary
            .case_results
            .sort_by(|a, b| a.case_name.cmp(&b.case_name));

        Ok(summary)
    }
}

/// Execute one test case and classify the result.
///
/// Infallible by contract: anything that goes wrong here becomes an
/// `INTERNAL ERROR` verdict for this case alone.
async fn run_case(
    config: &Config,
    workspace: &Workspace,
    language: &Language,
    code_dir: &Path,
    code_path: &str,
    io_dir: &Path,
    case: &TestCase,
) -> CaseVerdict {
    let scratch = match workspace.create_scratch().await {
        Ok(scratch) => scratch,
        Err(e) => {
            warn!(case = %case.name, error = %e, "failed to create scratch file");
            return CaseVerdict::internal_error(&case.name);
        }
    };

    let compile = language
        .compile
        .as_ref()
        .map(|command| Language::expand_command(command, code_path));
    let run = Language::expand_command(&language.run, code_path);

    let invocation = SandboxCommand::new(config.docker_binary(), &language.image)
        .limits(config.limits.clone())
        .code_dir(code_dir)
        .io_dir(io_dir)
        .scratch_dir(scratch.dir())
        .envs(language.env.iter().map(|(k, v)| (k.clone(), v.clone())))
        .compile(compile)
        .run(run)
        .case(&case.name)
        .build();

    let verdict = match sandbox::run_sandbox(invocation).await {
        Ok(raw) => {
            let outcome = sandbox::parse(&raw.output, raw.process_error.as_deref());
            CaseVerdict {
                case_name: case.name.clone(),
                outcome: classify(&outcome),
                execution_time: outcome.elapsed,
            }
        }
        Err(e) => {
            warn!(case = %case.name, error = %e, "sandbox invocation failed");
            CaseVerdict::internal_error(&case.name)
        }
    };

    if let Err(e) = scratch.release().await {
        warn!(case = %case.name, error = %e, "failed to release scratch file");
    }

    verdict
}

/// Classify one parsed execution outcome.
///
/// Priority: subprocess failure, then content mismatch, then the time-limit
/// threshold.
pub fn classify(outcome: &ExecutionOutcome) -> CaseOutcome {
    if outcome.failure.is_some() {
        CaseOutcome::InternalError
    } else if outcome.outputs_differ {
        CaseOutcome::Failed
    } else if outcome.elapsed > TIME_LIMIT {
        CaseOutcome::TimeLimitExceeded
    } else {
        CaseOutcome::Passed
    }
}
