//! Cross-process advisory lock for grove I2C traffic.
//!
//! The lock file lives at a well-known path and stays there; holding the
//! lock means holding an exclusive `flock` on it. This is the scheme the
//! other GoPiGo3 tools use on `/run/lock/DexterLockI2C`, so they exclude
//! each other.
//!
//! Every acquisition opens its own handle, so threads of one process
//! exclude each other as well. The guard unlocks on drop, including on
//! error paths, and the kernel drops the lock if the holder dies.

use std::fs::{File, OpenOptions, TryLockError};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::config::DEFAULT_LOCK_PATH;
use crate::error::LockError;

/// Sleep between attempts while another owner holds the lock.
pub const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// A named lock file. Cheap to construct; holds nothing until acquired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusLock {
    path: PathBuf,
}

impl BusLock {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The lock shared with the other GoPiGo3 tools on this host.
    pub fn system() -> Self {
        Self::new(DEFAULT_LOCK_PATH)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// One attempt. `Ok(None)` if someone else holds it.
    pub fn try_acquire(&self) -> Result<Option<BusLockGuard>, LockError> {
        let file = self.open()?;
        match file.try_lock() {
            Ok(()) => Ok(Some(BusLockGuard {
                path: self.path.clone(),
                file,
                released: false,
            })),
            Err(TryLockError::WouldBlock) => Ok(None),
            Err(TryLockError::Error(source)) => Err(self.io_error(source)),
        }
    }

    /// Block until the lock is held.
    pub fn acquire(&self) -> Result<BusLockGuard, LockError> {
        self.acquire_until(None)
    }

    /// Block until the lock is held or `timeout` has passed.
    pub fn acquire_timeout(&self, timeout: Duration) -> Result<BusLockGuard, LockError> {
        self.acquire_until(Some(timeout))
    }

    fn acquire_until(&self, timeout: Option<Duration>) -> Result<BusLockGuard, LockError> {
        let start = Instant::now();
        let mut contended = false;
        loop {
            if let Some(guard) = self.try_acquire()? {
                if contended {
                    debug!(
                        path = %self.path.display(),
                        waited = ?start.elapsed(),
                        "bus lock acquired after contention"
                    );
                }
                return Ok(guard);
            }
            contended = true;
            if let Some(timeout) = timeout
                && start.elapsed() >= timeout
            {
                return Err(LockError::Timeout {
                    path: self.path.clone(),
                    timeout,
                });
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Open the lock file, creating it if this is the first user on the
    /// host. A file created by another user may only be readable, which is
    /// enough to lock it.
    fn open(&self) -> Result<File, LockError> {
        match OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
        {
            Ok(file) => Ok(file),
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                File::open(&self.path).map_err(|source| self.io_error(source))
            }
            Err(source) => Err(self.io_error(source)),
        }
    }

    fn io_error(&self, source: io::Error) -> LockError {
        LockError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

/// Proof of holding a [`BusLock`]. Releases on drop.
#[derive(Debug)]
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct BusLockGuard {
    path: PathBuf,
    file: File,
    released: bool,
}

impl BusLockGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release now and report failure, instead of logging it on drop.
    pub fn release(mut self) -> Result<(), LockError> {
        self.released = true;
        self.file.unlock().map_err(|source| LockError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl Drop for BusLockGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        // Closing the handle would drop the lock too; unlock first to log.
        if let Err(e) = self.file.unlock() {
            warn!(path = %self.path.display(), error = %e, "failed to release bus lock");
        }
    }
}
