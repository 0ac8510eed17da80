//! # Flow Event Bus
//!
//! Publishes and subscribes to per-flow event channels, backed by the
//! KV store's pub/sub (`flow:events:<flowId>`). The HTTP surface's SSE
//! endpoint is the only consumer; the flow coordinator is the only
//! publisher.

pub mod events;
pub mod publisher;
pub mod subscriber;

pub use events::{flow_channel, FlowEvent};
pub use publisher::{EventPublisher, PublishError};
pub use subscriber::{EventStream, EventSubscriber};
