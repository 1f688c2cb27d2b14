//! Accelerator capability classification.
//!
//! The query tool reports a compute capability such as `8.6`. Parsing is
//! explicit about failure: a string that does not look like `major.minor`
//! becomes [`ParsedCapability::Unparseable`] instead of silently counting as
//! "no device".

use std::fmt;

use serde::{Deserialize, Serialize};

/// A `major.minor` compute capability.
///
/// Ordering is lexicographic on `(major, minor)` (field order matters for the
/// derive), which matches the vendor's numbering: `7.5` < `8.0` < `8.6` < `9.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CapabilityVersion {
    pub major: u32,
    pub minor: u32,
}

impl CapabilityVersion {
    /// Lowest capability the provisioned numerical runtime ships kernels for.
    pub const MINIMUM_SUPPORTED: Self = Self::new(7, 5);

    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Parse the raw capability string printed by the query tool.
    pub fn parse(raw: &str) -> ParsedCapability {
        let trimmed = raw.trim();
        let Some((major, minor)) = trimmed.split_once('.') else {
            return ParsedCapability::Unparseable(trimmed.to_string());
        };

        match (major.trim().parse::<u32>(), minor.trim().parse::<u32>()) {
            (Ok(major), Ok(minor)) => ParsedCapability::Version(Self::new(major, minor)),
            _ => ParsedCapability::Unparseable(trimmed.to_string()),
        }
    }

    pub fn meets_minimum(self) -> bool {
        self >= Self::MINIMUM_SUPPORTED
    }

    pub fn family(self) -> ArchitectureFamily {
        ArchitectureFamily::from_capability(self)
    }

    /// Vendor shorthand, e.g. `sm_86`.
    pub fn sm_tag(self) -> String {
        format!("sm_{}{}", self.major, self.minor)
    }
}

impl fmt::Display for CapabilityVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Outcome of parsing a capability string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedCapability {
    Version(CapabilityVersion),
    Unparseable(String),
}

/// GPU architecture generation inferred from the capability number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArchitectureFamily {
    KeplerOrOlder,
    Maxwell,
    Pascal,
    Volta,
    Turing,
    Ampere,
    AdaLovelace,
    Hopper,
    Blackwell,
}

impl ArchitectureFamily {
    pub fn from_capability(version: CapabilityVersion) -> Self {
        match (version.major, version.minor) {
            (10.., _) => Self::Blackwell,
            (9, _) => Self::Hopper,
            (8, 9..) => Self::AdaLovelace,
            (8, _) => Self::Ampere,
            (7, 5..) => Self::Turing,
            (7, _) => Self::Volta,
            (6, _) => Self::Pascal,
            (5, _) => Self::Maxwell,
            _ => Self::KeplerOrOlder,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::KeplerOrOlder => "Kepler or older (2012-)",
            Self::Maxwell => "Maxwell (2014)",
            Self::Pascal => "Pascal (2016)",
            Self::Volta => "Volta (2017)",
            Self::Turing => "Turing (2018)",
            Self::Ampere => "Ampere (2020)",
            Self::AdaLovelace => "Ada Lovelace (2022)",
            Self::Hopper => "Hopper (2022+)",
            Self::Blackwell => "Blackwell (2024+)",
        }
    }
}

impl fmt::Display for ArchitectureFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What the installer should offer the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    /// Offer the accelerated build (operator still confirms).
    Accelerated,
    /// Install the CPU-only build without asking.
    CpuOnly,
}

/// Result of probing the host for an accelerator.
///
/// Constructed only through [`CapabilityReport::not_found`] and
/// [`CapabilityReport::classify`], so `compatible` always agrees with the
/// capability threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapabilityReport {
    device_found: bool,
    device_name: Option<String>,
    driver_version: Option<String>,
    capability: Option<CapabilityVersion>,
    compatible: bool,
    reason: String,
}

const CPU_FALLBACK_NOTE: &str =
    "the service will run in CPU mode (int8), which is fully functional, only slower";

impl CapabilityReport {
    /// No accelerator could be queried.
    pub fn not_found(reason: impl Into<String>) -> Self {
        Self {
            device_found: false,
            device_name: None,
            driver_version: None,
            capability: None,
            compatible: false,
            reason: format!("{}; {CPU_FALLBACK_NOTE}", reason.into()),
        }
    }

    /// Classify a device against the minimum supported capability.
    pub fn classify(
        device_name: impl Into<String>,
        driver_version: impl Into<String>,
        capability: ParsedCapability,
    ) -> Self {
        let device_name = device_name.into();
        let driver_version = driver_version.into();

        let (capability, compatible, reason) = match capability {
            ParsedCapability::Version(version) if version.meets_minimum() => (
                Some(version),
                true,
                format!(
                    "{device_name} has compute capability {version} ({}, {}), which meets the {} requirement",
                    version.sm_tag(),
                    version.family(),
                    CapabilityVersion::MINIMUM_SUPPORTED
                ),
            ),
            ParsedCapability::Version(version) => (
                Some(version),
                false,
                format!(
                    "{device_name} has compute capability {version} ({}) from the {} architecture; \
                     acceleration requires {}+ (Turing or newer); {CPU_FALLBACK_NOTE}",
                    version.sm_tag(),
                    version.family(),
                    CapabilityVersion::MINIMUM_SUPPORTED
                ),
            ),
            ParsedCapability::Unparseable(raw) => (
                None,
                false,
                format!(
                    "{device_name} reported an unrecognised compute capability '{raw}'; {CPU_FALLBACK_NOTE}"
                ),
            ),
        };

        Self {
            device_found: true,
            device_name: Some(device_name),
            driver_version: Some(driver_version),
            capability,
            compatible,
            reason,
        }
    }

    pub const fn device_found(&self) -> bool {
        self.device_found
    }

    pub fn device_name(&self) -> Option<&str> {
        self.device_name.as_deref()
    }

    pub fn driver_version(&self) -> Option<&str> {
        self.driver_version.as_deref()
    }

    pub const fn capability(&self) -> Option<CapabilityVersion> {
        self.capability
    }

    pub const fn compatible(&self) -> bool {
        self.compatible
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn architecture(&self) -> Option<ArchitectureFamily> {
        self.capability.map(CapabilityVersion::family)
    }

    pub const fn recommendation(&self) -> Recommendation {
        if self.compatible {
            Recommendation::Accelerated
        } else {
            Recommendation::CpuOnly
        }
    }
}
