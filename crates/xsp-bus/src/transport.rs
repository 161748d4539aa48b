//! ---
//! xsp_section: "03-bus-collaborators"
//! xsp_subsection: "module"
//! xsp_type: "source"
//! xsp_scope: "code"
//! xsp_description: "Bus transport abstraction and consumer gate."
//! xsp_version: "v0.1.0"
//! xsp_owner: "tbd"
//! ---
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::Result;

/// Raw structured value as carried by the broker.
///
/// Deliberately untyped: messages may originate from services in other
/// languages, and the gate validates them against the contract before any
/// typed view exists.
pub type RawMessage = serde_json::Value;

/// Transport abstraction over the pipeline's message broker.
pub trait Transport: Send + Sync {
    /// Publish a raw message into the transport.
    fn publish(&self, msg: RawMessage) -> Result<()>;
    /// Receive the next raw message from the transport, if available.
    fn recv(&self) -> Option<RawMessage>;
    /// Human-readable transport name for logging/metrics.
    fn name(&self) -> &'static str;
}

/// In-memory transport backed by a mutex protected queue.
///
/// Stands in for the real broker in tests and single-process integration;
/// retry and routing policy belong to the real transport, not here.
#[derive(Clone, Default)]
pub struct InMemoryTransport {
    queue: Arc<Mutex<VecDeque<RawMessage>>>,
}

impl InMemoryTransport {
    /// Create a new in-memory transport channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of messages currently queued.
    pub fn len(&self) -> usize {
        self.queue.lock().expect("queue poisoned").len()
    }

    /// True when no messages are queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Transport for InMemoryTransport {
    fn publish(&self, msg: RawMessage) -> Result<()> {
        let mut guard = self.queue.lock().expect("queue poisoned");
        guard.push_back(msg);
        Ok(())
    }

    fn recv(&self) -> Option<RawMessage> {
        let mut guard = self.queue.lock().expect("queue poisoned");
        guard.pop_front()
    }

    fn name(&self) -> &'static str {
        "in_memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn publish_and_recv_preserve_order() {
        let transport = InMemoryTransport::new();
        transport.publish(json!({ "seq": 1 })).expect("publish");
        transport.publish(json!({ "seq": 2 })).expect("publish");

        assert_eq!(transport.len(), 2);
        assert_eq!(transport.recv().expect("first")["seq"], 1);
        assert_eq!(transport.recv().expect("second")["seq"], 2);
        assert!(transport.recv().is_none());
        assert!(transport.is_empty());
    }
}
