//! # Proof Cache
//!
//! Idempotent cache of `ProofResult`s keyed by `proof:<circuitId>:<fingerprint>`.

use proofport_kv::KvStore;
use proofport_types::ProofResult;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("kv store error: {0}")]
    Store(#[from] proofport_kv::StoreError),

    #[error("corrupt cache entry: {0}")]
    Corrupt(#[from] serde_json::Error),
}

pub struct ProofCache {
    store: Arc<dyn KvStore>,
    ttl: Duration,
}

impl ProofCache {
    pub fn new(store: Arc<dyn KvStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    fn key(circuit_id: &str, fingerprint: &str) -> String {
        format!("proof:{circuit_id}:{fingerprint}")
    }

    pub async fn get(
        &self,
        circuit_id: &str,
        fingerprint: &str,
    ) -> Result<Option<ProofResult>, CacheError> {
        let raw = self.store.get(&Self::key(circuit_id, fingerprint)).await?;
        Ok(match raw {
            Some(raw) => Some(serde_json::from_str(&raw)?),
            None => None,
        })
    }

    pub async fn set(
        &self,
        circuit_id: &str,
        fingerprint: &str,
        result: &ProofResult,
    ) -> Result<(), CacheError> {
        let raw = serde_json::to_string(result)?;
        self.store
            .set(&Self::key(circuit_id, fingerprint), &raw, Some(self.ttl))
            .await?;
        Ok(())
    }

    pub async fn invalidate(&self, circuit_id: &str, fingerprint: &str) -> Result<(), CacheError> {
        self.store.del(&Self::key(circuit_id, fingerprint)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proofport_kv::InMemoryKvStore;

    fn sample_result() -> ProofResult {
        ProofResult {
            proof_id: "p1".to_string(),
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
    async fn miss_then_hit() {
        let store = Arc::new(InMemoryKvStore::new());
        let cache = ProofCache::new(store, Duration::from_secs(3600));
        assert!(cache.get("c", "fp").await.unwrap().is_none());

        let result = sample_result();
        cache.set("c", "fp", &result).await.unwrap();
        let hit = cache.get("c", "fp").await.unwrap().unwrap();
        assert_eq!(hit.proof_id, result.proof_id);
    }

    #[tokio::test]
    async fn invalidate_clears_entry() {
        let store = Arc::new(InMemoryKvStore::new());
        let cache = ProofCache::new(store, Duration::from_secs(3600));
        cache.set("c", "fp", &sample_result()).await.unwrap();
        cache.invalidate("c", "fp").await.unwrap();
        assert!(cache.get("c", "fp").await.unwrap().is_none());
    }
}
