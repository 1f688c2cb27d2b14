//! Install directory layout.
//!
//! Everything the installer generates lives at a fixed place relative to the
//! install path. Uninstall only ever deletes paths named here; files shipped
//! by the package itself (service scripts, server code) are left alone.

use std::env;
use std::path::{Path, PathBuf};

use super::PathError;

/// Environment variable overriding the default install path.
pub const INSTALL_DIR_ENV: &str = "WHISVC_INSTALL_DIR";

/// Default install path, honouring `WHISVC_INSTALL_DIR`.
pub fn default_install_path() -> PathBuf {
    match env::var_os(INSTALL_DIR_ENV) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => platform_install_path(),
    }
}

/// Fixed per-platform install path.
pub fn platform_install_path() -> PathBuf {
    #[cfg(windows)]
    {
        let program_files =
            env::var_os("ProgramFiles").map_or_else(|| PathBuf::from(r"C:\Program Files"), PathBuf::from);
        program_files.join("Whisper API")
    }

    #[cfg(not(windows))]
    {
        PathBuf::from("/opt/whisper-api")
    }
}

/// Paths derived from an install root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    root: PathBuf,
}

impl InstallLayout {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, PathError> {
        let root = root.into();
        if root.as_os_str().is_empty() {
            return Err(PathError::EmptyPath);
        }
        if !root.is_absolute() {
            return Err(PathError::NotAbsolute(root));
        }
        if root.exists() && !root.is_dir() {
            return Err(PathError::NotADirectory(root));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The isolated interpreter.
    pub fn runtime_dir(&self) -> PathBuf {
        self.root.join("python")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Generated caches removed on uninstall.
    pub fn cache_dirs(&self) -> Vec<PathBuf> {
        vec![self.root.join("__pycache__"), self.root.join("cache")]
    }

    /// Service host script shipped by the package (Windows service wrapper).
    pub fn service_script(&self) -> PathBuf {
        self.root.join("whisper_service.py")
    }

    /// Server entry point shipped by the package.
    pub fn server_script(&self) -> PathBuf {
        self.root.join("server.py")
    }

    pub fn stdout_log(&self) -> PathBuf {
        self.logs_dir().join("stdout.log")
    }

    pub fn stderr_log(&self) -> PathBuf {
        self.logs_dir().join("stderr.log")
    }

    /// Lock file beside (not inside) the install root, so removing the root
    /// never deletes a held lock.
    pub fn lock_path(&self) -> PathBuf {
        let mut name = self
            .root
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".whisvc.lock");
        self.root.with_file_name(name)
    }

    /// Interpreter entry point inside `runtime_dir`.
    pub fn python_executable(runtime_dir: &Path) -> PathBuf {
        if cfg!(windows) {
            runtime_dir.join("python.exe")
        } else {
            runtime_dir.join("bin").join("python3")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_are_rejected() {
        assert!(matches!(
            InstallLayout::new("whisper"),
            Err(PathError::NotAbsolute(_))
        ));
        assert!(matches!(InstallLayout::new(""), Err(PathError::EmptyPath)));
    }

    #[test]
    fn generated_paths_live_under_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("whisper-api");
        let layout = InstallLayout::new(&root).unwrap();

        assert!(layout.runtime_dir().starts_with(&root));
        assert!(layout.stdout_log().starts_with(layout.logs_dir()));
        for cache in layout.cache_dirs() {
            assert!(cache.starts_with(&root));
        }
    }

    #[test]
    fn lock_file_is_a_sibling() {
        let dir = tempfile::tempdir().unwrap();
        let layout = InstallLayout::new(dir.path().join("whisper-api")).unwrap();
        assert_eq!(
            layout.lock_path(),
            dir.path().join("whisper-api.whisvc.lock")
        );
    }

    #[test]
    fn existing_file_is_not_a_valid_root() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(matches!(
            InstallLayout::new(file.path()),
            Err(PathError::NotADirectory(_))
        ));
    }
}
