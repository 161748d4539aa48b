//! ---
//! xsp_section: "03-bus-collaborators"
//! xsp_subsection: "module"
//! xsp_type: "source"
//! xsp_scope: "code"
//! xsp_description: "Bus transport abstraction and consumer gate."
//! xsp_version: "v0.1.0"
//! xsp_owner: "tbd"
//! ---
//! Transport abstraction and consumer-side gate for the pipeline.
//!
//! The envelope contract itself lives in `xsp-envelope`; this crate is the
//! layer one step above it: raw values move through a [`Transport`], and the
//! [`ConsumerGate`] validates, deduplicates, and quarantines them before a
//! handler ever sees a typed envelope.
#![warn(missing_docs)]

pub mod consumer;
pub mod dedup;
pub mod logging;
pub mod transport;

/// Shared result type for bus operations.
pub type Result<T> = std::result::Result<T, BusError>;

/// Errors raised by bus collaborators.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// Wrapper for IO errors encountered during transport operations.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Wrapper for JSON serialization or deserialization problems.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    /// Wrapper for envelope contract failures at the bus edge.
    #[error("envelope error: {0}")]
    Envelope(#[from] xsp_envelope::EnvelopeError),
}

pub use consumer::{ConsumerGate, GateMetrics, GateOutcome, CODE_VALIDATION, CODE_VERSION};
pub use dedup::{DedupStore, InMemoryDedupStore};
pub use logging::{log_envelope, EnvelopeDirection, PipelineMetricsExporter};
pub use transport::{InMemoryTransport, RawMessage, Transport};
