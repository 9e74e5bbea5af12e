//! Nullable infrastructure for deterministic testing.
//!
//! Every collaborator the engines consume (clock, identity directory, claim
//! table, notification sink) is abstracted behind a trait in
//! `consensus-store`. This crate provides test-friendly implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically (advance time, take the directory offline)
//! - Record what was asked of them so tests can assert on it
//!
//! Usage: build a [`Nulls`] set, hand `nulls.collaborators()` to an engine,
//! and keep the typed handles for driving and inspecting.

pub mod clock;
pub mod directory;
pub mod notifier;
pub mod store;

pub use clock::NullClock;
pub use directory::NullDirectory;
pub use notifier::NullNotifier;
pub use store::NullClaimStore;

use consensus_store::Collaborators;
use std::sync::Arc;

/// A full set of nullable collaborators with typed handles kept for the test.
#[derive(Clone)]
pub struct Nulls {
    pub clock: Arc<NullClock>,
    pub directory: Arc<NullDirectory>,
    pub claims: Arc<NullClaimStore>,
    pub notifier: Arc<NullNotifier>,
}

impl Nulls {
    pub fn new(start_secs: u64) -> Self {
        Self {
            clock: Arc::new(NullClock::new(start_secs)),
            directory: Arc::new(NullDirectory::new()),
            claims: Arc::new(NullClaimStore::new()),
            notifier: Arc::new(NullNotifier::new()),
        }
    }

    /// Erase the typed handles into the bundle the engines take.
    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            directory: self.directory.clone(),
            reputation: self.directory.clone(),
            claims: self.claims.clone(),
            notifier: self.notifier.clone(),
            clock: self.clock.clone(),
        }
    }
}

impl Default for Nulls {
    fn default() -> Self {
        Self::new(1_700_000_000)
    }
}
