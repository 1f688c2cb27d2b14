use std::path::PathBuf;

use async_trait::async_trait;

use crate::domain::Privilege;
use crate::ports::HostProbe;

/// Host facts fixed at construction.
#[derive(Debug, Clone)]
pub struct StaticHostProbe {
    pub privilege: Privilege,
    pub connectivity: bool,
    pub media_tool: Option<PathBuf>,
}

impl StaticHostProbe {
    pub fn elevated() -> Self {
        Self {
            privilege: Privilege::Elevated,
            connectivity: true,
            media_tool: Some(PathBuf::from("/usr/bin/ffmpeg")),
        }
    }

    pub fn standard() -> Self {
        Self {
            privilege: Privilege::Standard,
            ..Self::elevated()
        }
    }
}

#[async_trait]
impl HostProbe for StaticHostProbe {
    async fn privilege(&self) -> Privilege {
        self.privilege
    }

    async fn has_connectivity(&self) -> bool {
        self.connectivity
    }

    async fn media_tool(&self) -> Option<PathBuf> {
        self.media_tool.clone()
    }
}
