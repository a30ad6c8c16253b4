//! Configuration file loading
//!
//! Handles loading and parsing configuration files using the config crate.

use std::path::Path;

use config::{Config as ConfigBuilder, File, FileFormat};

use crate::config::{Config, ConfigError};
use crate::judge::TIME_LIMIT;

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config = ConfigBuilder::builder()
            .add_source(File::from(path))
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string
    pub fn parse_toml(content: &str) -> Result<Self, ConfigError> {
        let config = ConfigBuilder::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "max_concurrency must be at least 1".to_owned(),
            ));
        }

        // A case timeout at or below the verdict threshold would kill runs
        // before they can ever be classified as TIME LIMITED EXCEEDED.
        if self.limits.case_timeout <= TIME_LIMIT.as_secs_f64() {
            return Err(ConfigError::Invalid(format!(
                "case_timeout ({}s) must exceed the {}s time-limit threshold",
                self.limits.case_timeout,
                TIME_LIMIT.as_secs_f64()
            )));
        }

        for (id, lang) in &self.languages {
            if lang.name.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "language {id} has empty name"
                )));
            }
            if lang.extension.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "language {id} has empty extension"
                )));
            }
            if lang.image.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "language {id} has empty image"
                )));
            }
            if lang.run.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "language {id} has empty run command"
                )));
            }
            if let Some(ref compile) = lang.compile
                && compile.is_empty()
            {
                return Err(ConfigError::Invalid(format!(
                    "language {id} has empty compile command"
                )));
            }

            // Command templates end up nested inside a single-quoted shell
            // fragment; a quote in an argument would break out of it.
            let all_args = lang.run.iter().chain(lang.compile.iter().flatten());
            for arg in all_args {
                if arg.contains('\'') {
                    return Err(ConfigError::Invalid(format!(
                        "language {id} has a command argument containing a single quote: {arg:?}"
                    )));
                }
            }
        }

        Ok(())
    }
}
