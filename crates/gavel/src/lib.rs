//! A library for judging code submissions in sandboxed containers.
//!
//! Gavel is the execution core of an online-judge platform: it takes a
//! user-submitted program and a problem's (input, expected-output) test
//! assets, compiles and runs the program once per test case inside a locked
//! down Docker container, and aggregates the per-case verdicts into a
//! structured summary.
//!
//! # Features
//!
//! - **Sandboxed execution** — No network, read-only root filesystem, dropped
//!   capabilities, and uniform memory/CPU ceilings for every run.
//! - **Multi-language** — Data-driven language profiles for compiled and
//!   interpreted languages, keyed by integer id.
//! - **TOML configuration** — Resource ceilings, deadlines, and the language
//!   table all load from one file.
//! - **Bounded fan-out** — One concurrent sandbox per test case, gated by a
//!   configurable concurrency ceiling.
//! - **Prompt cancellation** — A submission deadline aborts in-flight case
//!   tasks and kills their sandbox processes instead of leaking them.

pub use assets::{AssetError, TestCase, problem_dir, resolve_cases};
pub use config::{Config, ConfigError, EXAMPLE_CONFIG, Language, LanguageId};
pub use judge::{Judge, JudgeError, TIME_LIMIT, classify};
pub use sandbox::{ExecutionOutcome, RawRun, SandboxCommand, SandboxError};
pub use types::{CaseOutcome, CaseVerdict, ResultSummary, SandboxLimits, Submission};
pub use workspace::{ScratchFile, StagedSource, Sweeper, Workspace, WorkspaceError};

pub mod assets;
pub mod config;
pub mod judge;
pub mod sandbox;
pub mod types;
pub mod workspace;
