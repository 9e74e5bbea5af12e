//! Claim verification rounds.
//!
//! Every claim opens exactly one round. Registered agents other than the
//! author lock stake for or against the claim while the window is open; once
//! the deadline passes anyone may resolve the round:
//!
//! 1. **Outcome**: compare total stake on each side (`Valid`, `Invalid` or `Tie`).
//! 2. **Settlement**: a pure function turns the round into payouts, a rounding
//!    remainder and reputation deltas.
//! 3. **Release**: escrow is moved to withdrawable balances, checked against
//!    the conservation invariant, and reputation deltas are pushed to the
//!    identity directory (queued for retry if it is unavailable).

pub mod engine;
pub mod error;
pub mod escrow;
pub mod reputation;
pub mod round;
pub mod settlement;

pub use engine::{RoundEngine, RoundEngineSnapshot};
pub use error::StakingError;
pub use escrow::FundsLedger;
pub use reputation::{ReputationDelta, ReputationQueue};
pub use round::{RoundPhase, VerificationRound, Vote};
pub use settlement::{settle, Payout, PayoutKind, Settlement};
