//! ---
//! xsp_section: "02-envelope-contract"
//! xsp_subsection: "module"
//! xsp_type: "source"
//! xsp_scope: "code"
//! xsp_description: "Envelope schema, factory, and validation contract."
//! xsp_version: "v0.1.0"
//! xsp_owner: "tbd"
//! ---
use uuid::Uuid;

use crate::schema::Envelope;

/// Mint a fresh correlation identifier for a new causal chain.
pub fn new_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Forward `source`'s correlation identifier onto a copy of `target`.
///
/// Neither input is mutated; every other field of `target` is preserved by
/// value. Used when one message is produced in direct response to another,
/// so the whole causal chain shares one trace identifier.
pub fn propagate(source: &Envelope, target: &Envelope) -> Envelope {
    let mut forwarded = target.clone();
    forwarded.correlation_id = source.correlation_id.clone();
    forwarded
}
