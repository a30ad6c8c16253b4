//! Background reclamation of leaked workspace entries
//!
//! The primary cleanup path is always the scoped release on [`StagedSource`]
//! and [`ScratchFile`]; the sweep exists for entries orphaned by a process
//! crash or a missed cleanup. It races with active releases on the same
//! directory, so a file that is already gone counts as swept.
//!
//! [`StagedSource`]: crate::workspace::StagedSource
//! [`ScratchFile`]: crate::workspace::ScratchFile

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

/// Periodic sweeper over the workspace root.
#[derive(Debug)]
pub struct Sweeper {
    root: PathBuf,
    max_age: Duration,
    interval: Duration,
}

impl Sweeper {
    pub fn new(root: impl Into<PathBuf>, max_age: Duration, interval: Duration) -> Self {
        Self {
            root: root.into(),
            max_age,
            interval,
        }
    }

    /// Spawn the sweep loop on the runtime.
    ///
    /// The loop runs until the returned handle is aborted or the runtime
    /// shuts down.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately; wait a full interval
            // before the first sweep.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match sweep_once(&self.root, self.max_age).await {
                    Ok(0) => {}
                    Ok(removed) => debug!(removed, root = %self.root.display(), "sweep reclaimed entries"),
                    Err(e) => warn!(root = %self.root.display(), error = %e, "sweep failed"),
                }
            }
        })
    }
}

/// Delete every entry under `root` whose last modification is older than
/// `max_age`. Returns the number of entries removed.
#[instrument]
pub async fn sweep_once(root: &Path, max_age: Duration) -> std::io::Result<usize> {
    let mut entries = match tokio::fs::read_dir(root).await {
        Ok(entries) => entries,
        // Nothing staged yet
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let now = SystemTime::now();
    let mut removed = 0;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();

        let modified = match entry.metadata().await.and_then(|m| m.modified()) {
            Ok(modified) => modified,
            // Entry vanished or is unreadable; an active run may have
            // released it concurrently.
            Err(_) => continue,
        };

        let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
        if age <= max_age {
            continue;
        }

        let result = if entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false) {
            tokio::fs::remove_dir_all(&path).await
        } else {
            tokio::fs::remove_file(&path).await
        };

        match result {
            Ok(()) => {
                debug!(path = %path.display(), "swept stale workspace entry");
                removed += 1;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "failed to sweep entry"),
        }
    }

    Ok(removed)
}
