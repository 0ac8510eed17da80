//! # Rate Limiter (C3)
//!
//! Fixed-window admission control per wallet address. `incr` on
//! `ratelimit:<address>`; the first increment in a window sets its
//! expiry, every increment after that rides the existing TTL.

use proofport_kv::KvStore;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    /// Seconds remaining in the current window; only meaningful when
    /// `allowed` is `false`.
    pub retry_after_secs: u64,
}

/// Rounds a duration up to the next whole second so a client is never told
/// to wait less than the key's actual remaining TTL.
fn ceil_secs(d: Duration) -> u64 {
    let secs = d.as_secs();
    if d.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

pub struct RateLimiter {
    store: Arc<dyn KvStore>,
    window: Duration,
    limit: i64,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn KvStore>, window: Duration, limit: u32) -> Self {
        Self {
            store,
            window,
            limit: limit as i64,
        }
    }

    fn key(address: &str) -> String {
        format!("ratelimit:{}", address.to_lowercase())
    }

    pub async fn check(&self, address: &str) -> Result<RateDecision, proofport_kv::StoreError> {
        let key = Self::key(address);
        let count = self.store.incr(&key).await?;
        if count == 1 {
            self.store.expire(&key, self.window).await?;
        }
        if count > self.limit {
            let remaining = self.store.ttl(&key).await?.unwrap_or(self.window);
            return Ok(RateDecision {
                allowed: false,
                retry_after_secs: ceil_secs(remaining),
            });
        }
        Ok(RateDecision {
            allowed: true,
            retry_after_secs: 0,
        })
    }
}
