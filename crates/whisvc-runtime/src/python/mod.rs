//! Isolated interpreter provisioning and package installation.

mod archive;
mod deps;
mod fetch;
mod provision;
mod source;

pub use archive::{ArchiveError, ArchiveKind, extract_archive, patch_path_config};
pub use deps::{
    CUDA_INDEX_URL, DependencyError, DependencyInstaller, DependencyReport, TorchVariant,
    support_packages,
};
pub use fetch::HttpArchiveFetcher;
pub use provision::{RuntimeError, RuntimeHandle, RuntimeProvisioner};
pub use source::{GET_PIP_URL, RuntimeSource};
