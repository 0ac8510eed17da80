//! # Result Store (C9)
//!
//! Persists the final `ProofResult` under a fresh `proofId`, TTL'd, and
//! serves it back verbatim — including its attestation, which the store
//! never re-derives or re-verifies.

use proofport_kv::KvStore;
use proofport_types::ProofResult;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ResultError {
    #[error("kv store error: {0}")]
    Store(#[from] proofport_kv::StoreError),

    #[error("corrupt result entry: {0}")]
    Corrupt(#[from] serde_json::Error),
}

pub struct ResultStore {
    store: Arc<dyn KvStore>,
    ttl: Duration,
}

impl ResultStore {
    pub fn new(store: Arc<dyn KvStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    fn key(proof_id: &str) -> String {
        format!("proof:result:{proof_id}")
    }

    /// Assigns a fresh `proofId`, persists `result` under it with the
    /// configured TTL, and returns the id. `result.proof_id` is
    /// overwritten with the freshly assigned id before storage.
    pub async fn store(&self, mut result: ProofResult) -> Result<String, ResultError> {
        let proof_id = Uuid::new_v4().to_string();
        result.proof_id = proof_id.clone();
        let raw = serde_json::to_string(&result)?;
        self.store
            .set(&Self::key(&proof_id), &raw, Some(self.ttl))
            .await?;
        Ok(proof_id)
    }

    pub async fn get(&self, proof_id: &str) -> Result<Option<ProofResult>, ResultError> {
        let raw = self.store.get(&Self::key(proof_id)).await?;
        Ok(match raw {
            Some(raw) => Some(serde_json::from_str(&raw)?),
            None => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proofport_kv::InMemoryKvStore;

    fn sample_result() -> ProofResult {
        ProofResult {
            proof_id: "placeholder".to_string(),
            circuit_id: "coinbase_attestation".to_string(),
            fingerprint: "abcd1234abcd1234".to_string(),
            proof: "0xdead".to_string(),
            public_inputs: vec!["0xbeef".to_string()],
            nullifier: "0xnull".to_string(),
            signal_hash: "0xsig".to_string(),
            attestation: None,
            created_at: 0,
        }
    }

    #[tokio::test]
    async fn store_assigns_fresh_id_and_roundtrips() {
        let store = Arc::new(InMemoryKvStore::new());
        let results = ResultStore::new(store, Duration::from_secs(3600));

        let proof_id = results.store(sample_result()).await.unwrap();
        assert_ne!(proof_id, "placeholder");

        let fetched = results.get(&proof_id).await.unwrap().unwrap();
        assert_eq!(fetched.proof_id, proof_id);
        assert_eq!(fetched.circuit_id, "coinbase_attestation");
    }

    #[tokio::test]
    async fn unknown_id_returns_none() {
        let store = Arc::new(InMemoryKvStore::new());
        let results = ResultStore::new(store, Duration::from_secs(3600));
        assert!(results.get("nonexistent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn two_stores_assign_distinct_ids() {
        let store = Arc::new(InMemoryKvStore::new());
        let results = ResultStore::new(store, Duration::from_secs(3600));
        let a = results.store(sample_result()).await.unwrap();
        let b = results.store(sample_result()).await.unwrap();
        assert_ne!(a, b);
    }
}
