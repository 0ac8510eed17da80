//! # Event Publisher

use crate::events::{flow_channel, FlowEvent};
use proofport_kv::KvStore;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("kv store error: {0}")]
    Store(#[from] proofport_kv::StoreError),
}

pub struct EventPublisher {
    store: Arc<dyn KvStore>,
}

impl EventPublisher {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    pub async fn publish(&self, event: &FlowEvent) -> Result<(), PublishError> {
        let payload = serde_json::to_string(event)?;
        self.store
            .publish(&flow_channel(&event.flow_id), &payload)
            .await?;
        Ok(())
    }
}
