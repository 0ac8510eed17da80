//! # Per-fingerprint Prove Lock
//!
//! `set(lock:<fingerprint>, flowId, NX, ttl=proveTimeout)` — the single
//! most important correctness primitive in the coordinator. The holder's
//! `flowId` is the value, so a loser can read it back and know whose
//! completion to wait on.

use proofport_kv::KvStore;
use std::sync::Arc;
use std::time::Duration;

pub fn lock_key(fingerprint: &str) -> String {
    format!("lock:{fingerprint}")
}

pub struct ProveLock {
    store: Arc<dyn KvStore>,
}

pub enum LockOutcome {
    Acquired,
    HeldBy(String),
}

impl ProveLock {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    pub async fn try_acquire(
        &self,
        fingerprint: &str,
        flow_id: &str,
        ttl: Duration,
    ) -> Result<LockOutcome, proofport_kv::StoreError> {
        let key = lock_key(fingerprint);
        if self.store.set_nx(&key, flow_id, Some(ttl)).await? {
            return Ok(LockOutcome::Acquired);
        }
        match self.store.get(&key).await? {
            Some(holder) => Ok(LockOutcome::HeldBy(holder)),
            // The lock expired between the failed SETNX and this read; one
            // more attempt either wins it or reveals the new holder.
            None => {
                if self.store.set_nx(&key, flow_id, Some(ttl)).await? {
                    Ok(LockOutcome::Acquired)
                } else {
                    match self.store.get(&key).await? {
                        Some(holder) => Ok(LockOutcome::HeldBy(holder)),
                        None => Ok(LockOutcome::Acquired),
                    }
                }
            }
        }
    }

    /// Releases the lock. Called only after the result has already been
    /// written — writing the result then deleting the lock is the
    /// happens-before pair cancellation safety depends on.
    pub async fn release(&self, fingerprint: &str) -> Result<(), proofport_kv::StoreError> {
        self.store.del(&lock_key(fingerprint)).await
    }
}
