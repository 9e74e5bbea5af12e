//! Decision requests.
//!
//! A lighter round type for open questions: a request is opened with a
//! question reference and a deadline, each registered agent may submit one
//! answer, and after the deadline a [`SelectionPolicy`] picks the accepted
//! answer. There is no staking or slashing; every participant receives a flat
//! reputation credit.

pub mod engine;
pub mod error;
pub mod policy;
pub mod request;

pub use engine::{DecisionEngine, DecisionEngineSnapshot};
pub use error::DecisionError;
pub use policy::{FirstAccepted, MajorityAnswer, PolicyKind, SelectionPolicy};
pub use request::{Answer, DecisionRequest, DecisionResolution};
