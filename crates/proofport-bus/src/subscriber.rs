//! # Event Subscriber
//!
//! Thin deserializing wrapper over a `KvSubscription`, filtering out
//! messages that don't parse as `FlowEvent` (e.g. a channel reused by
//! another publisher) rather than surfacing an error per-message.

use crate::events::{flow_channel, FlowEvent};
use proofport_kv::KvStore;
use std::sync::Arc;

pub struct EventStream {
    inner: Box<dyn proofport_kv::KvSubscription>,
}

impl EventStream {
    pub async fn next(&mut self) -> Option<FlowEvent> {
        loop {
            let msg = self.inner.next().await?;
            if let Ok(event) = serde_json::from_str::<FlowEvent>(&msg.payload) {
                return Some(event);
            }
        }
    }
}

pub struct EventSubscriber {
    store: Arc<dyn KvStore>,
}

impl EventSubscriber {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    pub async fn subscribe(
        &self,
        flow_id: &str,
    ) -> Result<EventStream, proofport_kv::StoreError> {
        let inner = self.store.subscribe(&flow_channel(flow_id)).await?;
        Ok(EventStream { inner })
    }
}
