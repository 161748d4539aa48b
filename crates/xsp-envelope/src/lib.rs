//! ---
//! xsp_section: "02-envelope-contract"
//! xsp_subsection: "module"
//! xsp_type: "source"
//! xsp_scope: "code"
//! xsp_description: "Envelope schema, factory, and validation contract."
//! xsp_version: "v0.1.0"
//! xsp_owner: "tbd"
//! ---
//! Canonical message envelope contract for the x-ray signal pipeline.
//!
//! Every producer in the pipeline stamps its payloads into the envelope
//! defined here, and every consumer validates inbound values against the
//! same contract before acting on them. The contract — not any single
//! implementation — is the interoperability surface: services written in
//! other languages emit and consume the identical wire shape.
#![warn(missing_docs)]

pub mod correlate;
pub mod factory;
pub mod idempotency;
pub mod schema;
pub mod validate;

/// Shared result type for envelope operations.
pub type Result<T> = std::result::Result<T, EnvelopeError>;

/// Errors raised at the envelope crate edge.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    /// Wrapper for JSON serialization or deserialization problems.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub use correlate::{new_correlation_id, propagate};
pub use factory::{Clock, CorrelationSource, EnvelopeFactory, SystemClock, UuidCorrelationSource};
pub use idempotency::{derive_key, ContentMap, KEY_LENGTH};
pub use schema::{
    is_envelope_shaped, Anomaly, DeviceCapabilities, DeviceHealth, DeviceMetadata, DeviceState,
    DeviceStatusFrame, Envelope, ErrorDetail, ErrorFrame, MessageRef, MessageType, Payload,
    ProcessingInfo, Reading, ReadingStats, SchemaVersion, Severity, XRayProcessedFrame,
    XRayRawFrame, BASE_FIELDS,
};
pub use validate::{decode, validate, ValidationReport};
