//! Bundle of injected collaborators shared by the round and decision engines.

use crate::{ClaimStore, IdentityDirectory, Notifier, ReputationAdjuster};
use consensus_types::Clock;
use std::sync::Arc;

#[derive(Clone)]
pub struct Collaborators {
    pub directory: Arc<dyn IdentityDirectory>,
    pub reputation: Arc<dyn ReputationAdjuster>,
    pub claims: Arc<dyn ClaimStore>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
}
