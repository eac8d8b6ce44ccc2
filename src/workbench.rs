//! Scratch directories for media processing.
//!
//! # Responsibilities
//! - Own a base directory for transient files (transcoding intermediates)
//! - Hand out one uniquely named workbench per processing job
//! - Remove a workbench and its contents once the job is done
//!
//! # Design Decisions
//! - Dropping a `Workbench` removes its directory (RAII, like a guard)
//! - Files from non-local stores are copied in; local stores are used in place

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::storage::{StorageBackend, StorageError, StoragePath};

/// Allocates workbenches below a base directory.
#[derive(Debug, Clone)]
pub struct WorkbenchManager {
    base_dir: PathBuf,
}

impl WorkbenchManager {
    /// Create the manager, creating the base directory if needed.
    pub fn new(base_dir: impl Into<PathBuf>) -> io::Result<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir)?;
        tracing::debug!(base_dir = %base_dir.display(), "Workbench manager ready");
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Allocate a fresh, empty workbench.
    pub fn create(&self) -> io::Result<Workbench> {
        let dir = self.base_dir.join(Uuid::new_v4().simple().to_string());
        fs::create_dir(&dir)?;
        tracing::trace!(dir = %dir.display(), "Workbench created");
        Ok(Workbench {
            dir,
            destroyed: false,
        })
    }
}

/// A scratch directory owned by one processing job.
#[derive(Debug)]
pub struct Workbench {
    dir: PathBuf,
    destroyed: bool,
}

impl Workbench {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path to a file inside the workbench.
    pub fn joinpath<I, S>(&self, parts: I) -> PathBuf
    where
        I: IntoIterator<Item = S>,
        S: AsRef<Path>,
    {
        parts
            .into_iter()
            .fold(self.dir.clone(), |acc, part| acc.join(part))
    }

    /// Make a stored file available on the local filesystem.
    ///
    /// Stores that keep files locally return their own path; anything else is
    /// copied into the workbench under the file's name.
    pub fn localized_file(
        &self,
        store: &dyn StorageBackend,
        path: &StoragePath,
    ) -> Result<PathBuf, StorageError> {
        if let Some(local) = store.local_path(path) {
            if local.is_file() {
                return Ok(local);
            }
        }

        let dest = self.dir.join(path.file_name());
        fs::write(&dest, store.get(path)?)?;
        Ok(dest)
    }

    /// Remove the workbench and everything in it.
    pub fn destroy(mut self) -> io::Result<()> {
        self.destroyed = true;
        fs::remove_dir_all(&self.dir)
    }
}

impl Drop for Workbench {
    fn drop(&mut self) {
        if self.destroyed {
            return;
        }
        if let Err(e) = fs::remove_dir_all(&self.dir) {
            tracing::warn!(dir = %self.dir.display(), error = %e, "Failed to clean up workbench");
        }
    }
}
