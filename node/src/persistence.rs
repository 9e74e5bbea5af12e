//! Whole-node state snapshots.
//!
//! A snapshot is the bincode encoding of [`NodeSnapshot`]. Writes go to a
//! temporary sibling file first and are renamed into place, so a crash never
//! leaves a truncated snapshot behind.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use consensus_decisions::DecisionEngineSnapshot;
use consensus_staking::RoundEngineSnapshot;
use consensus_types::Claim;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::registry::RegistrySnapshot;
use crate::NodeError;

type Blake2b256 = Blake2b<U32>;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub rounds: RoundEngineSnapshot,
    pub decisions: DecisionEngineSnapshot,
    pub registry: RegistrySnapshot,
    pub claims: Vec<Claim>,
}

impl NodeSnapshot {
    pub fn to_bytes(&self) -> Result<Vec<u8>, NodeError> {
        bincode::serialize(self).map_err(|e| NodeError::Snapshot(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, NodeError> {
        bincode::deserialize(bytes).map_err(|e| NodeError::Snapshot(e.to_string()))
    }

    /// Hex-encoded Blake2b-256 of the encoded snapshot. Equal states give
    /// equal digests, which is how restarts are checked for fidelity.
    pub fn digest(&self) -> Result<String, NodeError> {
        Ok(state_digest(&self.to_bytes()?))
    }

    pub fn save(&self, path: &Path) -> Result<(), NodeError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let bytes = self.to_bytes()?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, &bytes)?;
        std::fs::rename(&tmp, path)?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "snapshot written");
        Ok(())
    }

    /// Load a snapshot, or `None` when no file exists yet.
    pub fn load(path: &Path) -> Result<Option<Self>, NodeError> {
        match std::fs::read(path) {
            Ok(bytes) => Self::from_bytes(&bytes).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

pub fn state_digest(bytes: &[u8]) -> String {
    let mut hasher = Blake2b256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
