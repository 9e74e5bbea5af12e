//! Claim table trait.

use crate::StoreError;
use consensus_types::{AgentAddress, Category, Claim, ClaimId, ContentRef, Timestamp};

/// Append-only claim table. Assigns sequential ids; the round engine is its
/// only writer for new entries.
pub trait ClaimStore: Send + Sync {
    /// Append a new claim and return the stored record with its assigned id.
    fn create_claim(
        &self,
        author: &AgentAddress,
        content_ref: &ContentRef,
        category: Category,
        created_at: Timestamp,
    ) -> Result<Claim, StoreError>;

    /// Get a claim by id.
    fn get_claim(&self, id: ClaimId) -> Result<Claim, StoreError>;

    /// Number of claims ever created (also the next id to be assigned).
    fn claim_count(&self) -> Result<u64, StoreError>;

    /// Claims in id order starting at `offset`, at most `limit` of them.
    fn list_claims(&self, offset: u64, limit: usize) -> Result<Vec<Claim>, StoreError>;
}
