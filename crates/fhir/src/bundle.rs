//! Dataset and bundle wire models.
//!
//! The dataset document is a JSON object `{"patients": [Bundle, ...]}` where each bundle
//! groups one patient's resources as `{"entry": [{"resource": {...}}, ...]}`.
//!
//! Responsibilities:
//! - Parse the document structure, reporting the JSON path of structural errors
//! - Wrap each resource body as a [`ResourceEntry`]
//! - Locate the Patient entry that owns a bundle
//!
//! Only the container structure is strict. Resource bodies are opaque JSON here.

use crate::patient::PatientView;
use crate::resource::{ResourceEntry, ResourceType};
use crate::{FhirError, FhirResult};
use serde::Deserialize;
use serde_json::Value;

// ============================================================================
// Public domain-level types
// ============================================================================

/// A parsed dataset document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    pub bundles: Vec<BundleData>,
}

/// One bundle: the resources that belong to a single patient.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BundleData {
    /// Bundle `id`, if present.
    pub id: Option<String>,
    /// Entries in document order.
    pub entries: Vec<ResourceEntry>,
}

impl BundleData {
    /// The id of the first Patient entry in the bundle.
    ///
    /// Returns `None` when the bundle has no Patient entry, or the Patient has no
    /// usable `id`.
    pub fn patient_id(&self) -> Option<String> {
        self.entries
            .iter()
            .find(|e| e.is(&ResourceType::Patient))
            .and_then(|e| PatientView::from_resource(e.resource()).id)
    }
}

impl Dataset {
    /// Parse a dataset document from JSON text.
    ///
    /// This uses `serde_path_to_error` to surface a best-effort path (e.g.
    /// `patients[3].entry`) to the failing field when the document does not match the
    /// container schema.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError::Translation`] if the container structure is wrong, for
    /// example `patients` is not an array or an `entry` is not a list.
    pub fn parse(json_text: &str) -> FhirResult<Self> {
        let mut deserializer = serde_json::Deserializer::from_str(json_text);
        let wire = serde_path_to_error::deserialize::<_, DatasetWire>(&mut deserializer)
            .map_err(schema_error)?;
        Ok(wire_to_domain(wire))
    }

    /// Build a dataset from an already-parsed JSON value.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Dataset::parse`].
    pub fn from_value(value: Value) -> FhirResult<Self> {
        let wire =
            serde_path_to_error::deserialize::<_, DatasetWire>(value).map_err(schema_error)?;
        Ok(wire_to_domain(wire))
    }
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Debug, Deserialize)]
struct DatasetWire {
    #[serde(default)]
    patients: Vec<BundleWire>,
}

#[derive(Debug, Deserialize)]
struct BundleWire {
    #[serde(default)]
    id: Option<String>,

    #[serde(default)]
    entry: Vec<EntryWire>,
}

#[derive(Debug, Deserialize)]
struct EntryWire {
    #[serde(default)]
    resource: Option<Value>,
}

// ============================================================================
// Helper functions (internal)
// ============================================================================

fn schema_error<E: std::fmt::Display>(err: serde_path_to_error::Error<E>) -> FhirError {
    let path = err.path().to_string();
    let source = err.into_inner();
    let path = if path.is_empty() || path == "." {
        "<root>".to_string()
    } else {
        path
    };
    FhirError::Translation(format!("Dataset schema mismatch at {path}: {source}"))
}

fn wire_to_domain(wire: DatasetWire) -> Dataset {
    let bundles = wire
        .patients
        .into_iter()
        .map(|b| BundleData {
            id: b.id,
            entries: b
                .entry
                .into_iter()
                .filter_map(|e| e.resource)
                .map(ResourceEntry::from_resource)
                .collect(),
        })
        .collect();
    Dataset { bundles }
}
