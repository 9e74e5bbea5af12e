//! Capability traits for everything the engine consumes but does not own.
//!
//! The claim table, the identity/reputation directory, the notification sink
//! and the clock are external collaborators. The engines depend only on these
//! traits; the node provides in-memory implementations and the nullables
//! crate provides controllable ones for tests.

pub mod claim;
pub mod collaborators;
pub mod error;
pub mod identity;
pub mod notify;

pub use claim::ClaimStore;
pub use collaborators::Collaborators;
pub use error::{ReputationError, StoreError};
pub use identity::{IdentityDirectory, ReputationAdjuster};
pub use notify::Notifier;
