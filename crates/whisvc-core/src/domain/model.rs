//! Speech model tiers offered to the operator.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The six model sizes the service can load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelTier {
    Tiny,
    Base,
    #[default]
    Small,
    Medium,
    LargeV2,
    LargeV3,
}

impl ModelTier {
    /// Every tier, smallest first. Prompt menus number them in this order.
    pub const ALL: [Self; 6] = [
        Self::Tiny,
        Self::Base,
        Self::Small,
        Self::Medium,
        Self::LargeV2,
        Self::LargeV3,
    ];

    /// Identifier understood by the service (`WHISPER_MODEL`).
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tiny => "tiny",
            Self::Base => "base",
            Self::Small => "small",
            Self::Medium => "medium",
            Self::LargeV2 => "large-v2",
            Self::LargeV3 => "large-v3",
        }
    }

    /// Size/speed/accuracy trade-off shown next to the menu entry.
    pub const fn summary(self) -> &'static str {
        match self {
            Self::Tiny => "~75 MB, fastest, lowest accuracy",
            Self::Base => "~145 MB, very fast, basic accuracy",
            Self::Small => "~480 MB, balanced speed and accuracy (recommended)",
            Self::Medium => "~1.5 GB, slower, high accuracy",
            Self::LargeV2 => "~3 GB, slow on CPU, very high accuracy",
            Self::LargeV3 => "~3 GB, slow on CPU, best accuracy",
        }
    }
}

impl fmt::Display for ModelTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown model '{0}' (expected one of: tiny, base, small, medium, large-v2, large-v3)")]
pub struct ModelTierParseError(pub String);

impl FromStr for ModelTier {
    type Err = ModelTierParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|tier| tier.as_str() == needle)
            .ok_or_else(|| ModelTierParseError(s.trim().to_string()))
    }
}
