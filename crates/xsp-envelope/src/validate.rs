//! ---
//! xsp_section: "02-envelope-contract"
//! xsp_subsection: "module"
//! xsp_type: "source"
//! xsp_scope: "code"
//! xsp_description: "Envelope schema, factory, and validation contract."
//! xsp_version: "v0.1.0"
//! xsp_owner: "tbd"
//! ---
use serde_json::Value as JsonValue;

use crate::schema::{Envelope, MessageType, SchemaVersion, BASE_FIELDS};

/// Outcome of validating an inbound value against the envelope contract.
///
/// The error strings are the observable contract: consumers branch on them
/// to distinguish structural damage from version skew. Never a panic, never
/// an `Err` — malformed input is an expected case, not a fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    /// True when no violation was found.
    pub valid: bool,
    /// Every violation found, in check order.
    pub errors: Vec<String>,
}

impl ValidationReport {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }

    /// True when the report names an unsupported schema version.
    ///
    /// A consumer may park such a message for reprocessing once it gains
    /// support for the version, instead of discarding it.
    pub fn is_version_skew(&self) -> bool {
        self.errors
            .iter()
            .any(|error| error.starts_with("unsupported schemaVersion"))
    }
}

/// Validate an arbitrary structured value against the base contract.
///
/// Violations are accumulated, not short-circuited, so one pass reports
/// everything wrong with a message. Checks, in order: the value is an
/// object; each base field is present and a string; `schemaVersion` is
/// supported; `messageType` is recognized.
pub fn validate(value: &JsonValue) -> ValidationReport {
    let Some(map) = value.as_object() else {
        return ValidationReport::from_errors(vec!["envelope must be a JSON object".to_owned()]);
    };

    let mut errors = Vec::new();
    for field in BASE_FIELDS {
        match map.get(field) {
            None => errors.push(format!("missing required field: {field}")),
            Some(present) if !present.is_string() => {
                errors.push(format!("field {field} must be a string"));
            }
            Some(_) => {}
        }
    }

    if let Some(version) = map.get("schemaVersion").and_then(JsonValue::as_str) {
        if SchemaVersion::parse(version).is_none() {
            errors.push(format!("unsupported schemaVersion: {version}"));
        }
    }
    if let Some(kind) = map.get("messageType").and_then(JsonValue::as_str) {
        if MessageType::parse(kind).is_none() {
            errors.push(format!("unrecognized messageType: {kind}"));
        }
    }

    ValidationReport::from_errors(errors)
}

/// Validate and decode an inbound value into a typed envelope.
///
/// Runs the base checks first, then the per-variant structural decode;
/// variant-level failures (missing variant fields, mistyped readings) are
/// folded into the returned report. A strict superset of [`validate`].
pub fn decode(value: &JsonValue) -> Result<Envelope, ValidationReport> {
    let report = validate(value);
    if !report.valid {
        return Err(report);
    }
    serde_json::from_value(value.clone()).map_err(|err| {
        ValidationReport::from_errors(vec![format!("envelope decode failed: {err}")])
    })
}
