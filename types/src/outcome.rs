//! Verification round outcomes.

use crate::amount::Wei;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of comparing the two stake totals of a round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Supporting stake strictly exceeds opposing stake.
    Valid,
    /// Opposing stake strictly exceeds supporting stake.
    Invalid,
    /// Equal stakes, including a round nobody voted on.
    Tie,
}

impl Outcome {
    pub fn from_totals(total_valid: Wei, total_invalid: Wei) -> Self {
        match total_valid.cmp(&total_invalid) {
            std::cmp::Ordering::Greater => Outcome::Valid,
            std::cmp::Ordering::Less => Outcome::Invalid,
            std::cmp::Ordering::Equal => Outcome::Tie,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Valid => "valid",
            Outcome::Invalid => "invalid",
            Outcome::Tie => "tie",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
