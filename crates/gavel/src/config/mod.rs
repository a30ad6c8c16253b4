use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

pub use crate::config::language::{CODE_PLACEHOLDER, FileExtension, Language, LanguageId};
use crate::types::SandboxLimits;

pub mod language;
mod loader;

/// Example configuration embedded at compile time.
///
/// Library users can access this to generate a starter config file; it also
/// backs [`Config::default`].
pub const EXAMPLE_CONFIG: &str = include_str!("../../gavel.example.toml");

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid characters in file extension")]
    InvalidFileExtChars,

    #[error("failed to read config file at {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] config::ConfigError),

    #[error("language id {0} not found in configuration")]
    LanguageNotFound(LanguageId),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Config for the judge core.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Path to the docker binary (uses PATH if not specified).
    #[serde(default)]
    pub docker_path: Option<PathBuf>,

    /// Root of the locally synchronized test-asset trees
    /// (`<asset_root>/problem_<id>/{in,out}`).
    #[serde(default = "default_asset_root")]
    pub asset_root: PathBuf,

    /// Uniform resource ceilings for every sandbox run.
    #[serde(default)]
    pub limits: SandboxLimits,

    /// Maximum number of sandbox processes running concurrently.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Overall deadline for judging one submission, in seconds.
    /// No deadline is applied when unset.
    #[serde(default = "default_submission_deadline")]
    pub submission_deadline: Option<f64>,

    /// Workspace staging and cleanup settings.
    #[serde(default)]
    pub workspace: WorkspaceConfig,

    /// Language profiles keyed by integer id.
    #[serde(default)]
    pub languages: HashMap<LanguageId, Language>,
}

/// Settings for the ephemeral workspace area.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkspaceConfig {
    /// Directory under which staged sources and scratch files live.
    #[serde(default = "default_workspace_root")]
    pub root: PathBuf,

    /// Age in seconds after which a leaked workspace entry is reclaimed.
    #[serde(default = "default_retention_age")]
    pub retention_age: f64,

    /// Interval in seconds between background sweep runs.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval: f64,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: default_workspace_root(),
            retention_age: default_retention_age(),
            sweep_interval: default_sweep_interval(),
        }
    }
}

impl WorkspaceConfig {
    pub fn retention_age(&self) -> Duration {
        Duration::from_secs_f64(self.retention_age)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs_f64(self.sweep_interval)
    }
}

impl Config {
    /// Create a new config with the embedded default language table
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty config with no languages
    pub fn empty() -> Self {
        Self {
            docker_path: None,
            asset_root: default_asset_root(),
            limits: SandboxLimits::default(),
            max_concurrency: default_max_concurrency(),
            submission_deadline: default_submission_deadline(),
            workspace: WorkspaceConfig::default(),
            languages: HashMap::new(),
        }
    }

    /// Look up a language profile by id.
    ///
    /// Unknown ids are reported to the caller, never defaulted.
    pub fn get_language(&self, id: LanguageId) -> Result<&Language, ConfigError> {
        self.languages
            .get(&id)
            .ok_or(ConfigError::LanguageNotFound(id))
    }

    /// Get the path to the docker binary
    pub fn docker_binary(&self) -> PathBuf {
        self.docker_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("docker"))
    }

    /// Overall submission deadline, if configured
    pub fn deadline(&self) -> Option<Duration> {
        self.submission_deadline.map(Duration::from_secs_f64)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::parse_toml(EXAMPLE_CONFIG).expect("embedded default config should be valid")
    }
}

fn default_asset_root() -> PathBuf {
    PathBuf::from("/tmp")
}

fn default_max_concurrency() -> usize {
    8
}

fn default_submission_deadline() -> Option<f64> {
    Some(60.0)
}

fn default_workspace_root() -> PathBuf {
    std::env::temp_dir().join("gavel")
}

fn default_retention_age() -> f64 {
    // two hours, as the cleanup scheduler has always used
    7200.0
}

fn default_sweep_interval() -> f64 {
    1800.0
}
