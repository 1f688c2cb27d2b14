//! Host facts that gate the install: privilege, network, optional tools.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::domain::Privilege;

#[async_trait]
pub trait HostProbe: Send + Sync {
    /// Whether the current process runs elevated.
    async fn privilege(&self) -> Privilege;

    /// Whether the package index and runtime download host are reachable.
    async fn has_connectivity(&self) -> bool;

    /// Location of the audio decoding tool the service depends on, if installed.
    async fn media_tool(&self) -> Option<PathBuf>;
}
