//! Root directory of the file-backed configuration store.

use std::env;
use std::path::PathBuf;

use super::PathError;

/// Environment variable overriding the configuration root.
pub const CONFIG_DIR_ENV: &str = "WHISVC_CONFIG_DIR";

/// Resolve the configuration root from the process environment.
///
/// Resolution order:
/// 1. `WHISVC_CONFIG_DIR`
/// 2. `/etc/whisvc` when running elevated
/// 3. The user configuration directory (e.g. `~/.config/whisvc`)
pub fn config_root(elevated: bool) -> Result<PathBuf, PathError> {
    resolve_config_root(
        env::var_os(CONFIG_DIR_ENV).map(PathBuf::from),
        elevated,
        dirs::config_dir(),
    )
}

/// Pure form of [`config_root`].
pub fn resolve_config_root(
    override_dir: Option<PathBuf>,
    elevated: bool,
    user_config_dir: Option<PathBuf>,
) -> Result<PathBuf, PathError> {
    if let Some(dir) = override_dir.filter(|d| !d.as_os_str().is_empty()) {
        return Ok(dir);
    }
    if elevated {
        return Ok(PathBuf::from("/etc/whisvc"));
    }
    user_config_dir
        .map(|dir| dir.join("whisvc"))
        .ok_or(PathError::NoConfigDir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_wins() {
        let root = resolve_config_root(Some(PathBuf::from("/tmp/cfg")), true, None).unwrap();
        assert_eq!(root, PathBuf::from("/tmp/cfg"));
    }

    #[test]
    fn elevated_uses_system_dir() {
        let root = resolve_config_root(None, true, Some(PathBuf::from("/home/u/.config"))).unwrap();
        assert_eq!(root, PathBuf::from("/etc/whisvc"));
    }

    #[test]
    fn standard_user_uses_config_dir() {
        let root =
            resolve_config_root(Some(PathBuf::new()), false, Some(PathBuf::from("/home/u/.config")))
                .unwrap();
        assert_eq!(root, PathBuf::from("/home/u/.config/whisvc"));
        assert!(matches!(
            resolve_config_root(None, false, None),
            Err(PathError::NoConfigDir)
        ));
    }
}
