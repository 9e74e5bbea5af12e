//! In-memory claim ledger.

use consensus_store::{ClaimStore, StoreError};
use consensus_types::{AgentAddress, Category, Claim, ClaimId, ContentRef, Timestamp};
use std::sync::{PoisonError, RwLock};

/// Append-only claim table. A claim's id is its position, starting at 0.
#[derive(Default)]
pub struct ClaimLedger {
    claims: RwLock<Vec<Claim>>,
}

impl ClaimLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted claims, which must be in id order.
    pub fn restore(claims: Vec<Claim>) -> Result<Self, StoreError> {
        if let Some((pos, claim)) = claims
            .iter()
            .enumerate()
            .find(|(pos, claim)| claim.id.get() != *pos as u64)
        {
            return Err(StoreError::Serialization(format!(
                "claim at position {pos} has id {}",
                claim.id
            )));
        }
        Ok(Self {
            claims: RwLock::new(claims),
        })
    }

    pub fn snapshot(&self) -> Vec<Claim> {
        self.claims
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ClaimStore for ClaimLedger {
    fn create_claim(
        &self,
        author: &AgentAddress,
        content_ref: &ContentRef,
        category: Category,
        created_at: Timestamp,
    ) -> Result<Claim, StoreError> {
        let mut claims = self.claims.write().unwrap_or_else(PoisonError::into_inner);
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
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id.get() as usize)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn claim_count(&self) -> Result<u64, StoreError> {
        Ok(self.claims.read().unwrap_or_else(PoisonError::into_inner).len() as u64)
    }

    fn list_claims(&self, offset: u64, limit: usize) -> Result<Vec<Claim>, StoreError> {
        let claims = self.claims.read().unwrap_or_else(PoisonError::into_inner);
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(claims.len());
        Ok(claims[start..].iter().take(limit).cloned().collect())
    }
}
