//! Test-asset resolution
//!
//! Pairs the input and expected-output files of a problem. The asset trees
//! are synchronized to the local filesystem by the external storage
//! collaborator under a fixed convention: `<asset_root>/problem_<id>/in/*`
//! and `<asset_root>/problem_<id>/out/*`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, instrument};

/// Subdirectory holding the input files of a problem
pub const INPUT_DIR: &str = "in";

/// Subdirectory holding the expected-output files of a problem
pub const OUTPUT_DIR: &str = "out";

/// One (input, expected-output) pair of a problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    /// Case name: the input file's base name
    pub name: String,

    /// Host path of the input file
    pub input_path: PathBuf,

    /// Host path of the expected-output file
    pub output_path: PathBuf,
}

/// Errors raised while resolving test assets
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to read asset directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("output file does not exist for input file {0}")]
    UnpairedInput(String),

    #[error("invalid test case file name: {0:?}")]
    InvalidName(String),
}

/// Local directory holding one problem's synchronized assets
pub fn problem_dir(asset_root: &Path, problem_id: u64) -> PathBuf {
    asset_root.join(format!("problem_{problem_id}"))
}

/// Resolve the full test-case set of a problem.
///
/// Every input file must have a same-named output file; any missing pairing
/// fails the whole resolution before a single sandbox run starts. Results
/// come back sorted by case name.
#[instrument(skip(asset_root))]
pub async fn resolve_cases(
    asset_root: &Path,
    problem_id: u64,
) -> Result<Vec<TestCase>, AssetError> {
    let problem = problem_dir(asset_root, problem_id);
    let in_dir = problem.join(INPUT_DIR);
    let out_dir = problem.join(OUTPUT_DIR);

    // Both trees must be present, even when the input set turns out empty
    let mut inputs = tokio::fs::read_dir(&in_dir)
        .await
        .map_err(|source| AssetError::ReadDir {
            path: in_dir.clone(),
            source,
        })?;
    tokio::fs::read_dir(&out_dir)
        .await
        .map_err(|source| AssetError::ReadDir {
            path: out_dir.clone(),
            source,
        })?;

    let mut cases = BTreeMap::new();

    while let Some(entry) = inputs.next_entry().await.map_err(|source| AssetError::ReadDir {
        path: in_dir.clone(),
        source,
    })? {
        if entry.file_type().await.map(|t| t.is_dir()).unwrap_or(true) {
            continue;
        }

        let name = entry
            .file_name()
            .into_string()
            .map_err(|n| AssetError::InvalidName(n.to_string_lossy().into_owned()))?;
        validate_case_name(&name)?;

        let output_path = out_dir.join(&name);
        if tokio::fs::metadata(&output_path).await.is_err() {
            return Err(AssetError::UnpairedInput(name));
        }

        cases.insert(
            name.clone(),
            TestCase {
                name,
                input_path: entry.path(),
                output_path,
            },
        );
    }

    debug!(problem_id, count = cases.len(), "resolved test cases");

    Ok(cases.into_values().collect())
}

/// Reject case names that could not be interpolated safely into the
/// in-sandbox pipeline.
fn validate_case_name(name: &str) -> Result<(), AssetError> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if valid {
        Ok(())
    } else {
        Err(AssetError::InvalidName(name.to_owned()))
    }
}
