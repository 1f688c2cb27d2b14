//! Port disposition: who, if anyone, is listening on the requested port.

use std::fmt;

use serde::Serialize;

/// Classification of a requested port, derived fresh on every run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PortDisposition {
    /// Nothing accepted a connection.
    Available,
    /// Something is listening and the previous install recorded this port
    /// (upgrade in place).
    OwnedBySelf,
    /// Something is listening and it is not attributable to a previous install.
    OwnedByOther,
}

impl PortDisposition {
    /// Decide the disposition from a live probe, the previously recorded port
    /// and whether the installed service is currently active.
    ///
    /// A listener only counts as ours when the service that would own it is
    /// running on the recorded port.
    pub fn classify(
        bound: bool,
        requested: u16,
        previous: Option<u16>,
        service_active: bool,
    ) -> Self {
        match (bound, previous) {
            (false, _) => Self::Available,
            (true, Some(previous)) if previous == requested && service_active => {
                Self::OwnedBySelf
            }
            (true, _) => Self::OwnedByOther,
        }
    }

    /// Advisory text for the operator; only a foreign listener warrants one.
    pub fn warning(self, requested: u16) -> Option<String> {
        match self {
            Self::OwnedByOther => Some(format!(
                "Port {requested} is already in use by another process. The service will be \
                 configured for it as requested, but it cannot start until that process \
                 releases the port."
            )),
            Self::Available | Self::OwnedBySelf => None,
        }
    }
}

impl fmt::Display for PortDisposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Available => "available",
            Self::OwnedBySelf => "owned by previous install",
            Self::OwnedByOther => "owned by another process",
        };
        f.write_str(text)
    }
}
