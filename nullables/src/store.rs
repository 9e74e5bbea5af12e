//! Nullable claim store: thread-safe in-memory claim table for testing.

use consensus_store::{ClaimStore, StoreError};
use consensus_types::{AgentAddress, Category, Claim, ClaimId, ContentRef, Timestamp};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// In-memory claim table. Ids are the index into the vector, starting at 0.
///
/// `fail_writes(true)` makes `create_claim` return a backend error so tests
/// can check that a failed store write leaves no round behind.
#[derive(Default)]
pub struct NullClaimStore {
    claims: Mutex<Vec<Claim>>,
    fail_writes: AtomicBool,
}

impl NullClaimStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl ClaimStore for NullClaimStore {
    fn create_claim(
        &self,
        author: &AgentAddress,
        content_ref: &ContentRef,
        category: Category,
        created_at: Timestamp,
    ) -> Result<Claim, StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("null claim store rejects writes".into()));
        }
        let mut claims = self.claims.lock().unwrap();
        let claim = Claim {
            id: ClaimId::new(claims.len() as u64),
            author: author.clone(),
            content_ref: content_ref.clone(),
            category,
            created_at,
        };
        claims.push(claim.clone());
        Ok(claim)
    }

    fn get_claim(&self, id: ClaimId) -> Result<Claim, StoreError> {
        self.claims
            .lock()
            .unwrap()
            .get(id.get() as usize)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn claim_count(&self) -> Result<u64, StoreError> {
        Ok(self.claims.lock().unwrap().len() as u64)
    }

    fn list_claims(&self, offset: u64, limit: usize) -> Result<Vec<Claim>, StoreError> {
        Ok(self
            .claims
            .lock()
            .unwrap()
            .iter()
            .skip(offset as usize)
            .take(limit)
            .cloned()
            .collect())
    }
}
