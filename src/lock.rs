//! Advisory file lock
//!
//! Each store file is owned by exactly one open engine. The lock lives in a
//! sibling `<file>.lock` so compaction can replace the store file freely.
//!
//! ## Responsibilities
//! - Exclusive `flock` held for the lifetime of the engine
//! - Retry until a timeout, then fail with [`LarigotError::Locked`]
//! - Release on drop (and by the kernel if the process dies)

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{LarigotError, Result};

/// Interval between acquisition attempts
const RETRY_INTERVAL: Duration = Duration::from_millis(20);

/// Exclusive lock on one store file
#[derive(Debug)]
pub struct FileLock {
    /// Open handle; the lock is tied to it
    file: File,
    path: PathBuf,
}

impl FileLock {
    /// Lock the store at `store_path`, waiting up to `timeout`
    pub fn acquire(store_path: &Path, timeout: Duration) -> Result<Self> {
        let path = Self::lock_path(store_path);
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)?;

        let deadline = Instant::now() + timeout;
        loop {
            if try_lock(&file)? {
                tracing::debug!("Locked {}", path.display());
                return Ok(Self { file, path });
            }
            if Instant::now() >= deadline {
                tracing::warn!("{} is held by another handle", path.display());
                return Err(LarigotError::Locked(store_path.to_path_buf()));
            }
            thread::sleep(RETRY_INTERVAL);
        }
    }

    /// Path of the lock file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(store_path: &Path) -> PathBuf {
        let mut name = store_path.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        unlock(&self.file);
    }
}

/// Returns false if another handle holds the lock
#[cfg(unix)]
fn try_lock(file: &File) -> Result<bool> {
    use std::os::unix::io::AsRawFd;

    let result = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if result == 0 {
        return Ok(true);
    }
    let err = std::io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::EWOULDBLOCK) {
        Ok(false)
    } else {
        Err(err.into())
    }
}

#[cfg(unix)]
fn unlock(file: &File) {
    use std::os::unix::io::AsRawFd;

    unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_UN) };
}

// No advisory locking on other platforms.
#[cfg(not(unix))]
fn try_lock(_file: &File) -> Result<bool> {
    Ok(true)
}

#[cfg(not(unix))]
fn unlock(_file: &File) {}
