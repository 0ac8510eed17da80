//! # Janitor (C11)
//!
//! A background sweeper that reconciles the submitted-task queue and the
//! payment-status sets against their authoritative records. It never
//! writes to an authoritative record and never creates one; removing a
//! stale index entry is the only mutation it performs, and that's
//! idempotent so multiple instances can run safely.

use proofport_kv::KvStore;
use std::sync::Arc;
use std::time::Duration;

const TASK_QUEUE_KEY: &str = "a2a:queue:submitted";
const PAYMENT_STATUSES: [&str; 3] = ["pending", "settled", "refunded"];

pub struct Janitor {
    store: Arc<dyn KvStore>,
    poll_interval: Duration,
}

impl Janitor {
    pub fn new(store: Arc<dyn KvStore>, poll_interval: Duration) -> Self {
        Self {
            store,
            poll_interval,
        }
    }

    /// Runs the sweep loop forever. Intended to be spawned as a single
    /// long-running task; errors from an individual sweep are logged and
    /// the loop continues on the next tick.
    pub async fn run(self) -> ! {
        let mut ticker = tokio::time::interval(self.poll_interval);
        loop {
            ticker.tick().await;
            if let Err(err) = self.sweep_once().await {
                tracing::warn!(error = %err, "janitor sweep failed");
            }
        }
    }

    /// Performs a single sweep pass. Exposed separately from `run` so
    /// tests can drive it deterministically without waiting on a timer.
    pub async fn sweep_once(&self) -> Result<SweepReport, proofport_kv::StoreError> {
        let mut report = SweepReport::default();

        let task_ids = self.store.lrange(TASK_QUEUE_KEY, 0, -1).await?;
        for task_id in task_ids {
            let authoritative_key = format!("a2a:task:{task_id}");
            if !self.store.exists(&authoritative_key).await? {
                self.store.lrem(TASK_QUEUE_KEY, &task_id).await?;
                report.tasks_pruned += 1;
            }
        }

        for status in PAYMENT_STATUSES {
            let set_key = format!("payment:status:{status}");
            let payment_ids = self.store.smembers(&set_key).await?;
            for payment_id in payment_ids {
                let authoritative_key = format!("payment:{payment_id}");
                if !self.store.exists(&authoritative_key).await? {
                    self.store.srem(&set_key, &payment_id).await?;
                    report.payments_pruned += 1;
                }
            }
        }

        Ok(report)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub tasks_pruned: usize,
    pub payments_pruned: usize,
}
