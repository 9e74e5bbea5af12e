//! Agent address type: `0x` followed by 40 lowercase hex digits.

use crate::error::TypeError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An agent's account address.
///
/// Addresses are compared byte-wise, so [`AgentAddress::parse`] lowercases its
/// input to keep `0xAB..` and `0xab..` the same account.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentAddress(String);

impl AgentAddress {
    /// The prefix every address carries.
    pub const PREFIX: &'static str = "0x";

    /// Number of hex digits after the prefix.
    pub const HEX_LEN: usize = 40;

    /// Create an address from a raw string.
    ///
    /// # Panics
    /// Panics if the string does not start with `0x`. Use [`AgentAddress::parse`]
    /// for untrusted input.
    pub fn new(raw: impl Into<String>) -> Self {
        let s = raw.into();
        assert!(s.starts_with(Self::PREFIX), "address must start with 0x");
        Self(s)
    }

    /// Parse and normalise an untrusted address string.
    pub fn parse(raw: &str) -> Result<Self, TypeError> {
        let trimmed = raw.trim();
        let Some(hex) = trimmed
            .strip_prefix(Self::PREFIX)
            .or_else(|| trimmed.strip_prefix("0X"))
        else {
            return Err(TypeError::InvalidAddress(raw.to_string()));
        };
        if hex.len() != Self::HEX_LEN || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidAddress(raw.to_string()));
        }
        Ok(Self(format!("{}{}", Self::PREFIX, hex.to_ascii_lowercase())))
    }

    /// The protocol-owned account that receives settlement rounding remainders.
    pub fn protocol_remainder() -> Self {
        Self(format!("{}{}", Self::PREFIX, "0".repeat(Self::HEX_LEN)))
    }

    /// Return the raw address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this address is well-formed.
    pub fn is_valid(&self) -> bool {
        self.0
            .strip_prefix(Self::PREFIX)
            .is_some_and(|hex| hex.len() == Self::HEX_LEN && hex.chars().all(|c| c.is_ascii_hexdigit()))
    }
}

impl fmt::Display for AgentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for AgentAddress {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
