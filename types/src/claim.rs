//! Claims: immutable assertions that open a verification round.

use crate::address::AgentAddress;
use crate::error::TypeError;
use crate::ids::ClaimId;
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque content-addressed reference (e.g. an IPFS hash). Never interpreted.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentRef(String);

impl ContentRef {
    pub fn new(raw: impl Into<String>) -> Result<Self, TypeError> {
        let s = raw.into();
        if s.trim().is_empty() {
            return Err(TypeError::EmptyContentRef);
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Feed a claim is published to. The numeric codes are part of the wire format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Timeline,
    News,
    Decision,
}

impl Category {
    pub fn code(&self) -> u8 {
        match self {
            Category::Timeline => 0,
            Category::News => 1,
            Category::Decision => 2,
        }
    }

    pub fn from_code(code: u8) -> Result<Self, TypeError> {
        match code {
            0 => Ok(Category::Timeline),
            1 => Ok(Category::News),
            2 => Ok(Category::Decision),
            other => Err(TypeError::InvalidCategory(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Timeline => "timeline",
            Category::News => "news",
            Category::Decision => "decision",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A published claim. Owned by the claim store and never mutated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub id: ClaimId,
    pub author: AgentAddress,
    pub content_ref: ContentRef,
    pub category: Category,
    pub created_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_codes_match_wire_format() {
        assert_eq!(Category::Timeline.code(), 0);
        assert_eq!(Category::News.code(), 1);
        assert_eq!(Category::Decision.code(), 2);
        assert_eq!(Category::from_code(1).unwrap(), Category::News);
        assert!(Category::from_code(3).is_err());
    }

    #[test]
    fn empty_content_ref_is_rejected() {
        assert_eq!(ContentRef::new("  "), Err(TypeError::EmptyContentRef));
        assert_eq!(ContentRef::new("QmHash").unwrap().as_str(), "QmHash");
    }
}
