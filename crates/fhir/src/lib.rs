//! FHIR wire/boundary support for FHIRBrush.
//!
//! This crate provides the **wire models** for the synthetic patient dataset and
//! **lenient typed views** over the individual resources inside it:
//! - dataset / bundle / entry parsing (`bundle`)
//! - resource type tagging (`resource`)
//! - Patient, Observation and Condition views (`patient`, `observation`, `condition`)
//!
//! Resource bodies are kept verbatim as JSON. Views never fail: a sub-field that is
//! missing or has an unexpected shape is reported as absent, so downstream scoring can
//! skip it instead of rejecting the whole record. No FHIR validation is performed.

pub mod bundle;
pub mod condition;
pub mod observation;
pub mod patient;
pub mod resource;

// Re-export facades
pub use bundle::{BundleData, Dataset};
pub use condition::ConditionView;
pub use observation::ObservationView;
pub use patient::{initials, Gender, PatientView};
pub use resource::{ResourceEntry, ResourceType};

use serde_json::Value;

/// Errors returned by the `fhir` boundary crate.
#[derive(Debug, thiserror::Error)]
pub enum FhirError {
    #[error("translation error: {0}")]
    Translation(String),
}

/// Type alias for Results that can fail with a [`FhirError`].
pub type FhirResult<T> = Result<T, FhirError>;

/// Read a string at a JSON pointer, treating any other shape as absent.
pub(crate) fn str_at<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    value.pointer(pointer).and_then(Value::as_str)
}

/// Read a non-blank, trimmed string at a JSON pointer.
pub(crate) fn text_at(value: &Value, pointer: &str) -> Option<String> {
    str_at(value, pointer)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}
