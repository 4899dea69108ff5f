use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::debug;

/// Name of the lock file, relative to the workspace root
pub const LOCK_FILE: &str = ".drafts.lock";

/// How long a draft write waits for another `sm` process by default
pub const DEFAULT_WAIT: Duration = Duration::from_secs(5);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Exclusive hold on a workspace's drafts.
///
/// Every draft write happens while one of these is alive: re-read the
/// latest file, apply the change to a copy, write the copy back. Two `sm`
/// processes editing different fields of one draft therefore never lose an
/// update.
///
/// The lock file stays on disk; only the flock is released on drop.
#[derive(Debug)]
pub struct DraftLock {
    _file: File,
}

/// Error type for taking the draft lock
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("could not open draft lock {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("drafts in {} are busy: another sm process held the lock for over {}ms", .root.display(), .waited.as_millis())]
    Busy { root: PathBuf, waited: Duration },
    #[error("could not lock {path}: {source}")]
    Flock {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl DraftLock {
    /// Lock the drafts under `root`, waiting up to `wait` for a holder to
    /// finish.
    pub fn acquire(root: &Path, wait: Duration) -> Result<Self, LockError> {
        let path = root.join(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| LockError::Open {
                path: path.clone(),
                source: e,
            })?;

        let start = Instant::now();
        loop {
            match try_lock(&file) {
                Ok(true) => return Ok(DraftLock { _file: file }),
                Ok(false) if start.elapsed() < wait => std::thread::sleep(POLL_INTERVAL),
                Ok(false) => {
                    debug!(path = %path.display(), "gave up waiting for draft lock");
                    return Err(LockError::Busy {
                        root: root.to_path_buf(),
                        waited: wait,
                    });
                }
                Err(e) => return Err(LockError::Flock { path, source: e }),
            }
        }
    }
}

/// `Ok(false)` when another process holds the lock.
#[cfg(unix)]
fn try_lock(file: &File) -> Result<bool, std::io::Error> {
    use std::os::unix::io::AsRawFd;
    let result = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if result == 0 {
        return Ok(true);
    }
    let err = std::io::Error::last_os_error();
    match err.raw_os_error() {
        Some(code) if code == libc::EWOULDBLOCK || code == libc::EINTR => Ok(false),
        _ => Err(err),
    }
}

#[cfg(not(unix))]
fn try_lock(_file: &File) -> Result<bool, std::io::Error> {
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_release_on_drop_keeps_lock_file() {
        let tmp = TempDir::new().unwrap();
        let lock = DraftLock::acquire(tmp.path(), DEFAULT_WAIT).unwrap();
        drop(lock);
        assert!(tmp.path().join(LOCK_FILE).exists());
        assert!(DraftLock::acquire(tmp.path(), DEFAULT_WAIT).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_second_writer_reports_busy() {
        let tmp = TempDir::new().unwrap();
        let _held = DraftLock::acquire(tmp.path(), DEFAULT_WAIT).unwrap();
        let err = DraftLock::acquire(tmp.path(), Duration::from_millis(50)).unwrap_err();
        assert!(matches!(err, LockError::Busy { .. }));
        assert!(err.to_string().contains("held the lock for over 50ms"));
    }

    #[test]
    fn test_missing_root_fails_to_open() {
        let tmp = TempDir::new().unwrap();
        let err = DraftLock::acquire(&tmp.path().join("gone"), DEFAULT_WAIT).unwrap_err();
        assert!(matches!(err, LockError::Open { .. }));
    }
}
