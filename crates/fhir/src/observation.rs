//! Lenient view over a FHIR Observation resource.

use crate::text_at;
use serde_json::Value;

/// Coded numeric measurement extracted from an Observation resource.
#[derive(Clone, Debug, PartialEq)]
pub struct ObservationView {
    /// Primary terminology code: the first `code.coding[].code` (normally LOINC).
    pub code: Option<String>,
    /// `valueQuantity.value`, when numeric.
    pub value: Option<f64>,
    /// `effectiveDateTime`, else `issued` (ISO 8601, UTC).
    pub effective: Option<String>,
}

impl ObservationView {
    pub fn from_resource(resource: &Value) -> Self {
        Self {
            code: text_at(resource, "/code/coding/0/code"),
            value: resource
                .pointer("/valueQuantity/value")
                .and_then(Value::as_f64)
                .filter(|v| v.is_finite()),
            effective: text_at(resource, "/effectiveDateTime")
                .or_else(|| text_at(resource, "/issued")),
        }
    }

    /// Timestamp used to pick the latest reading; absent sorts before any date.
    pub fn effective_or_empty(&self) -> &str {
        self.effective.as_deref().unwrap_or("")
    }
}
