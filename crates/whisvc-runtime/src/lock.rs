//! Cross-process install lock.
//!
//! Format: one line holding the owner's pid.
//!
//! The lock file sits beside the install directory
//! (`<installPath>.whisvc.lock`) so it survives the directory being deleted
//! and recreated. A lock whose pid is no longer alive is reclaimed.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};
use whisvc_core::{InstallLayout, ProcessTable};

use crate::system::SysinfoProcessTable;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("Another install or uninstall (pid {pid}) holds {path}")]
    Held { path: PathBuf, pid: u32 },

    #[error("Failed to create lock file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Exclusive lock over one install path, released on drop.
#[derive(Debug)]
pub struct InstallLock {
    path: PathBuf,
}

impl InstallLock {
    pub fn acquire(layout: &InstallLayout) -> Result<Self, LockError> {
        Self::acquire_with(layout, &SysinfoProcessTable)
    }

    pub fn acquire_with(layout: &InstallLayout, processes: &dyn ProcessTable) -> Result<Self, LockError> {
        let path = layout.lock_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| LockError::Io {
                path: path.clone(),
                source,
            })?;
        }

        // One reclaim attempt: a second collision means a live competitor won.
        for _ in 0..2 {
            match create_exclusive(&path) {
                Ok(()) => {
                    debug!(lock = %path.display(), "Install lock acquired");
                    return Ok(Self { path });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    match read_owner(&path) {
                        Some(pid) if processes.is_alive(pid) => {
                            return Err(LockError::Held { path, pid });
                        }
                        owner => {
                            warn!(lock = %path.display(), ?owner, "Reclaiming stale install lock");
                            remove_if_present(&path).map_err(|source| LockError::Io {
                                path: path.clone(),
                                source,
                            })?;
                        }
                    }
                }
                Err(source) => return Err(LockError::Io { path, source }),
            }
        }

        let pid = read_owner(&path).unwrap_or_default();
        Err(LockError::Held { path, pid })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstallLock {
    fn drop(&mut self) {
        if let Err(e) = remove_if_present(&self.path) {
            warn!(lock = %self.path.display(), error = %e, "Failed to release install lock");
        }
    }
}

fn create_exclusive(path: &Path) -> io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    writeln!(file, "{}", std::process::id())
}

fn read_owner(path: &Path) -> Option<u32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
