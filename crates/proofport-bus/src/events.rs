//! # Flow Events
//!
//! The payload published on a flow's event channel and consumed by the
//! HTTP surface's SSE stream. One event per `Flow` phase transition;
//! the flow coordinator is the only publisher.

use proofport_types::FlowPhase;
use serde::{Deserialize, Serialize};

/// Channel name a flow's events are published and subscribed on.
pub fn flow_channel(flow_id: &str) -> String {
    format!("flow:events:{flow_id}")
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FlowEvent {
    pub flow_id: String,
    pub phase: FlowPhase,
    /// Matches `Flow.updated_at` at publish time; subscribers drop an
    /// event whose `updated_at` is not newer than the last one they saw.
    pub updated_at: i64,
    pub detail: Option<String>,
}

impl FlowEvent {
    pub fn new(flow_id: impl Into<String>, phase: FlowPhase, updated_at: i64) -> Self {
        Self {
            flow_id: flow_id.into(),
            phase,
            updated_at,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_name_is_namespaced() {
        assert_eq!(flow_channel("abc"), "flow:events:abc");
    }
}
