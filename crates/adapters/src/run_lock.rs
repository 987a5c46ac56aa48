//! Run-level mutual exclusion via an advisory lock file

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum RunLockError {
    #[error("Another run holds the lock at {0}")]
    Held(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Exclusive lock held for the lifetime of a run; released on drop
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
    // Held to keep the advisory lock
    _file: File,
}

impl RunLock {
    /// Take the lock without waiting
    pub fn acquire(path: impl AsRef<Path>) -> Result<Self, RunLockError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(path)?;

        file.try_lock_exclusive()
            .map_err(|_| RunLockError::Held(path.to_path_buf()))?;

        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;

        tracing::debug!(path = %path.display(), "Acquired run lock");
        Ok(Self {
            path: path.to_path_buf(),
            _file: file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
