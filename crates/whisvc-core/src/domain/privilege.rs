//! Privilege as an explicit capability token.
//!
//! Components that mutate machine-wide state take an [`ElevatedToken`] in
//! their constructor. The only way to obtain one is to ask a [`Privilege`]
//! value for it, so tests can inject either context without depending on the
//! identity of the test process.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privilege {
    /// Administrator / root.
    Elevated,
    /// Regular user.
    Standard,
}

impl Privilege {
    /// Exchange an elevated context for a token; `None` for standard users.
    pub const fn require(self) -> Option<ElevatedToken> {
        match self {
            Self::Elevated => Some(ElevatedToken { _private: () }),
            Self::Standard => None,
        }
    }
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Elevated => f.write_str("elevated"),
            Self::Standard => f.write_str("standard user"),
        }
    }
}

/// Proof that the flow runs with administrative rights.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElevatedToken {
    _private: (),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_elevated_context_yields_token() {
        assert!(Privilege::Elevated.require().is_some());
        assert!(Privilege::Standard.require().is_none());
    }
}
