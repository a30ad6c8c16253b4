//! Ephemeral filesystem layout for one submission
//!
//! Stages submitted source code and per-case scratch files in private
//! directories, each owned by exactly one judging run and removed through an
//! explicit release on every exit path. A background sweep (see [`sweep`])
//! reclaims anything a crashed process left behind.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tracing::{debug, instrument, warn};

pub use crate::workspace::sweep::{Sweeper, sweep_once};

use crate::config::Language;

mod sweep;

/// Scratch output file name inside a scratch directory
pub const SCRATCH_FILE_NAME: &str = "output.txt";

static NEXT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Errors that occur while managing workspace directories
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("failed to create workspace directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write file {path}: {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to remove workspace directory {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Manager for the per-submission workspace area.
///
/// Cheap to clone; all state is the root path.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Make sure the workspace root exists
    pub async fn ensure_root(&self) -> Result<(), WorkspaceError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|source| WorkspaceError::CreateDir {
                path: self.root.clone(),
                source,
            })
    }

    /// Stage submitted source code in a fresh private directory.
    ///
    /// The source is written as `solution.<ext>` after restoring literal
    /// `\n` escape sequences to real newlines (submitted code may arrive
    /// with them encoded).
    #[instrument(skip(self, code))]
    pub async fn stage_source(
        &self,
        language: &Language,
        code: &str,
    ) -> Result<StagedSource, WorkspaceError> {
        let dir = self.root.join(unique_name("code"));
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| WorkspaceError::CreateDir {
                path: dir.clone(),
                source,
            })?;

        let source_path = dir.join(language.source_name());
        let normalized = normalize_newlines(code);
        if let Err(source) = tokio::fs::write(&source_path, normalized.as_bytes()).await {
            let err = WorkspaceError::WriteFile {
                path: source_path.clone(),
                source,
            };
            // Don't leave the half-created directory behind
            if let Err(e) = tokio::fs::remove_dir_all(&dir).await {
                warn!(path = %dir.display(), error = %e, "failed to remove staging dir after write failure");
            }
            return Err(err);
        }

        debug!(path = %source_path.display(), len = code.len(), "staged source");

        Ok(StagedSource {
            dir,
            source_path,
            released: false,
        })
    }

    /// Create one empty scratch output file in a fresh private directory
    #[instrument(skip(self))]
    pub async fn create_scratch(&self) -> Result<ScratchFile, WorkspaceError> {
        let dir = self.root.join(unique_name("scratch"));
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| WorkspaceError::CreateDir {
                path: dir.clone(),
                source,
            })?;

        let file_path = dir.join(SCRATCH_FILE_NAME);
        if let Err(source) = tokio::fs::write(&file_path, b"").await {
            let err = WorkspaceError::WriteFile {
                path: file_path.clone(),
                source,
            };
            if let Err(e) = tokio::fs::remove_dir_all(&dir).await {
                warn!(path = %dir.display(), error = %e, "failed to remove scratch dir after write failure");
            }
            return Err(err);
        }

        debug!(path = %file_path.display(), "created scratch file");

        Ok(ScratchFile {
            dir,
            file_path,
            released: false,
        })
    }
}

/// A staged source directory owned by one judging run.
///
/// # Cleanup
///
/// Always call [`release()`](Self::release) explicitly. The `Drop`
/// implementation attempts best-effort removal on a spawned thread, but that
/// is a backstop for abnormal exits (cancellation mid-flight), not the
/// primary cleanup path; the background sweep covers anything that escapes
/// both.
#[derive(Debug)]
pub struct StagedSource {
    dir: PathBuf,
    source_path: PathBuf,
    released: bool,
}

impl StagedSource {
    /// Host directory holding the staged source
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Host path of the staged source file
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Staged source file name (e.g., "solution.py")
    pub fn file_name(&self) -> &str {
        self.source_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }

    /// Recursively delete the staging directory
    #[must_use = "release errors should be handled"]
    pub async fn release(mut self) -> Result<(), WorkspaceError> {
        self.released = true;
        remove_tree(&self.dir).await
    }
}

impl Drop for StagedSource {
    fn drop(&mut self) {
        if !self.released {
            best_effort_remove("staged source", &self.dir);
        }
    }
}

/// A per-case scratch directory owned by one sandbox run.
///
/// Same cleanup contract as [`StagedSource`].
#[derive(Debug)]
pub struct ScratchFile {
    dir: PathBuf,
    file_path: PathBuf,
    released: bool,
}

impl ScratchFile {
    /// Host directory mounted into the sandbox as the writable scratch area
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Host path of the scratch output file
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Recursively delete the scratch directory
    #[must_use = "release errors should be handled"]
    pub async fn release(mut self) -> Result<(), WorkspaceError> {
        self.released = true;
        remove_tree(&self.dir).await
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if !self.released {
            best_effort_remove("scratch file", &self.dir);
        }
    }
}

/// Restore literal `\n` escape sequences to real newlines
pub fn normalize_newlines(code: &str) -> String {
    code.replace("\\n", "\n")
}

async fn remove_tree(dir: &Path) -> Result<(), WorkspaceError> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => {
            debug!(path = %dir.display(), "released workspace directory");
            Ok(())
        }
        // The sweep may have gotten there first
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(WorkspaceError::Remove {
            path: dir.to_path_buf(),
            source,
        }),
    }
}

fn best_effort_remove(what: &'static str, dir: &Path) {
    warn!(
        path = %dir.display(),
        "{what} dropped without explicit release, attempting best-effort cleanup"
    );
    let dir = dir.to_path_buf();
    std::thread::spawn(move || {
        if let Err(e) = std::fs::remove_dir_all(&dir)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!(path = %dir.display(), error = %e, "best-effort cleanup failed");
        }
    });
}

fn unique_name(prefix: &str) -> String {
    let seq = NEXT_SEQ.fetch_add(1, Ordering::Relaxed);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    format!("{prefix}-{}-{seq}-{nanos}", std::process::id())
}
