//! Where the interpreter comes from on each platform.

use super::archive::ArchiveKind;

pub const PYTHON_VERSION: &str = "3.11.9";

/// Bootstrap script for the package manager.
pub const GET_PIP_URL: &str = "https://bootstrap.pypa.io/get-pip.py";

const STANDALONE_RELEASE: &str = "20240415";

/// A downloadable interpreter archive and how to unpack it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeSource {
    pub url: String,
    pub kind: ArchiveKind,
    /// Leading directory inside the archive to drop while extracting.
    pub strip_prefix: Option<String>,
    /// `._pth` file that must be patched to enable `site` (embeddable builds).
    pub path_config: Option<String>,
}

impl RuntimeSource {
    /// Archive for the host platform, or `None` on unsupported targets.
    pub fn for_host() -> Option<Self> {
        if cfg!(windows) {
            return cfg!(target_arch = "x86_64").then(|| Self {
                url: format!(
                    "https://www.python.org/ftp/python/{PYTHON_VERSION}/python-{PYTHON_VERSION}-embed-amd64.zip"
                ),
                kind: ArchiveKind::Zip,
                strip_prefix: None,
                path_config: Some("python311._pth".to_string()),
            });
        }

        let triple = match (std::env::consts::OS, std::env::consts::ARCH) {
            ("linux", "x86_64") => "x86_64-unknown-linux-gnu",
            ("linux", "aarch64") => "aarch64-unknown-linux-gnu",
            ("macos", "x86_64") => "x86_64-apple-darwin",
            ("macos", "aarch64") => "aarch64-apple-darwin",
            _ => return None,
        };
        Some(Self::standalone(triple))
    }

    fn standalone(triple: &str) -> Self {
        Self {
            url: format!(
                "https://github.com/indygreg/python-build-standalone/releases/download/{STANDALONE_RELEASE}/cpython-{PYTHON_VERSION}%2B{STANDALONE_RELEASE}-{triple}-install_only.tar.gz"
            ),
            kind: ArchiveKind::TarGz,
            strip_prefix: Some("python".to_string()),
            path_config: None,
        }
    }

    /// File name to save the download under.
    pub fn file_name(&self) -> &str {
        self.url.rsplit('/').next().unwrap_or("runtime-archive")
    }
}
