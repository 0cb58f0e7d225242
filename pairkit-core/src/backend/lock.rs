//! Cross-process lock serializing writes to a store file.
//!
//! A sidecar file is locked with `flock` on Unix and `LockFileEx` on Windows.
//! The data file itself cannot carry the lock because every write replaces it
//! by rename.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::{PairingStoreError, StoreResult};

/// Guard that holds an exclusive lock for its lifetime.
#[derive(Debug)]
pub(super) struct FileLockGuard {
    file: File,
    path: PathBuf,
}

impl FileLockGuard {
    /// Opens or creates the lock file at `path` and blocks until the exclusive
    /// lock is held.
    pub(super) fn acquire(path: &Path) -> StoreResult<Self> {
        let file = open_lock_file(path)?;
        lock_exclusive(&file).map_err(|err| lock_err(path, err))?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Like [`acquire`](Self::acquire) but returns `None` instead of waiting
    /// when another holder has the lock.
    #[cfg(test)]
    pub(super) fn try_acquire(path: &Path) -> StoreResult<Option<Self>> {
        let file = open_lock_file(path)?;
        if try_lock_exclusive(&file).map_err(|err| lock_err(path, err))? {
            Ok(Some(Self {
                file,
                path: path.to_path_buf(),
            }))
        } else {
            Ok(None)
        }
    }
}

impl Drop for FileLockGuard {
    fn drop(&mut self) {
        if let Err(err) = unlock(&self.file) {
            log::warn!("failed to unlock {}: {err}", self.path.display());
        }
    }
}

fn open_lock_file(path: &Path) -> StoreResult<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| {
            PairingStoreError::io(format!("creating {}", parent.display()), err)
        })?;
    }
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(|err| lock_err(path, err))
}

fn lock_err(path: &Path, err: std::io::Error) -> PairingStoreError {
    PairingStoreError::io(format!("locking {}", path.display()), err)
}

// ── Unix flock ──────────────────────────────────────────────────────

#[cfg(unix)]
fn lock_exclusive(file: &File) -> std::io::Result<()> {
    let fd = std::os::unix::io::AsRawFd::as_raw_fd(file);
    let result = unsafe { flock(fd, LOCK_EX) };
    if result == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(all(unix, test))]
fn try_lock_exclusive(file: &File) -> std::io::Result<bool> {
    let fd = std::os::unix::io::AsRawFd::as_raw_fd(file);
    let result = unsafe { flock(fd, LOCK_EX | LOCK_NB) };
    if result == 0 {
        Ok(true)
    } else {
        let err = std::io::Error::last_os_error();
        if err.kind() == std::io::ErrorKind::WouldBlock {
            Ok(false)
        } else {
            Err(err)
        }
    }
}

#[cfg(unix)]
fn unlock(file: &File) -> std::io::Result<()> {
    let fd = std::os::unix::io::AsRawFd::as_raw_fd(file);
    let result = unsafe { flock(fd, LOCK_UN) };
    if result == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(unix)]
use std::os::raw::c_int;

#[cfg(unix)]
const LOCK_EX: c_int = 2;
#[cfg(all(unix, test))]
const LOCK_NB: c_int = 4;
#[cfg(unix)]
const LOCK_UN: c_int = 8;

#[cfg(unix)]
extern "C" {
    fn flock(fd: c_int, operation: c_int) -> c_int;
}

// ── Windows LockFileEx ──────────────────────────────────────────────

#[cfg(windows)]
fn lock_exclusive(file: &File) -> std::io::Result<()> {
    lock_file(file, 0)
}

#[cfg(all(windows, test))]
fn try_lock_exclusive(file: &File) -> std::io::Result<bool> {
    match lock_file(file, LOCKFILE_FAIL_IMMEDIATELY) {
        Ok(()) => Ok(true),
        Err(err) if err.raw_os_error() == Some(ERROR_LOCK_VIOLATION) => Ok(false),
        Err(err) => Err(err),
    }
}

#[cfg(windows)]
fn unlock(file: &File) -> std::io::Result<()> {
    let handle = std::os::windows::io::AsRawHandle::as_raw_handle(file);
    let mut overlapped: Overlapped = unsafe { std::mem::zeroed() };
    let result = unsafe { UnlockFileEx(handle, 0, 1, 0, &mut overlapped) };
    if result != 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(windows)]
fn lock_file(file: &File, flags: u32) -> std::io::Result<()> {
    let handle = std::os::windows::io::AsRawHandle::as_raw_handle(file);
    let mut overlapped: Overlapped = unsafe { std::mem::zeroed() };
    let result = unsafe {
        LockFileEx(
            handle,
            LOCKFILE_EXCLUSIVE_LOCK | flags,
            0,
            1,
            0,
            &mut overlapped,
        )
    };
    if result != 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(windows)]
type Handle = *mut std::ffi::c_void;

#[cfg(windows)]
#[repr(C)]
#[allow(dead_code)]
struct Overlapped {
    internal: usize,
    internal_high: usize,
    offset: u32,
    offset_high: u32,
    h_event: Handle,
}

#[cfg(windows)]
const LOCKFILE_EXCLUSIVE_LOCK: u32 = 0x2;
#[cfg(all(windows, test))]
const LOCKFILE_FAIL_IMMEDIATELY: u32 = 0x1;
#[cfg(all(windows, test))]
const ERROR_LOCK_VIOLATION: i32 = 33;

#[cfg(windows)]
extern "system" {
    fn LockFileEx(
        h_file: Handle,
        flags: u32,
        reserved: u32,
        bytes_to_lock_low: u32,
        bytes_to_lock_high: u32,
        overlapped: *mut Overlapped,
    ) -> i32;
    fn UnlockFileEx(
        h_file: Handle,
        reserved: u32,
        bytes_to_unlock_low: u32,
        bytes_to_unlock_high: u32,
        overlapped: *mut Overlapped,
    ) -> i32;
}
