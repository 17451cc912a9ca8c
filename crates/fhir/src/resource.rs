//! Resource type tagging for dataset entries.

use serde_json::Value;

/// Type of a clinical resource entry, taken from its `resourceType` field.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ResourceType {
    /// Patient demographics.
    Patient,
    /// Diagnosis or problem.
    Condition,
    /// Lab result or vital sign.
    Observation,
    /// Prescription.
    MedicationRequest,
    /// Visit.
    Encounter,
    /// Any other resource type; kept verbatim but never scored.
    Other(String),
}

impl ResourceType {
    /// Parse from the FHIR wire name.
    pub fn from_wire(s: &str) -> Self {
        match s {
            "Patient" => ResourceType::Patient,
            "Condition" => ResourceType::Condition,
            "Observation" => ResourceType::Observation,
            "MedicationRequest" => ResourceType::MedicationRequest,
            "Encounter" => ResourceType::Encounter,
            other => ResourceType::Other(other.to_owned()),
        }
    }

    /// FHIR wire name.
    pub fn as_str(&self) -> &str {
        match self {
            ResourceType::Patient => "Patient",
            ResourceType::Condition => "Condition",
            ResourceType::Observation => "Observation",
            ResourceType::MedicationRequest => "MedicationRequest",
            ResourceType::Encounter => "Encounter",
            ResourceType::Other(name) => name,
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single typed clinical record.
///
/// The body is retained as raw JSON so full-record queries can return it untouched.
/// Typed access goes through the view types in this crate.
#[derive(Clone, Debug, PartialEq)]
pub struct ResourceEntry {
    resource_type: ResourceType,
    resource: Value,
}

impl ResourceEntry {
    /// Wrap a raw resource body, tagging it by its `resourceType`.
    ///
    /// A body without a string `resourceType` is tagged `Other("")`.
    pub fn from_resource(resource: Value) -> Self {
        let resource_type = resource
            .get("resourceType")
            .and_then(Value::as_str)
            .map(ResourceType::from_wire)
            .unwrap_or_else(|| ResourceType::Other(String::new()));
        Self {
            resource_type,
            resource,
        }
    }

    pub fn resource_type(&self) -> &ResourceType {
        &self.resource_type
    }

    pub fn resource(&self) -> &Value {
        &self.resource
    }

    /// Resource `id`, if present as a string.
    pub fn id(&self) -> Option<&str> {
        self.resource.get("id").and_then(Value::as_str)
    }

    pub fn is(&self, resource_type: &ResourceType) -> bool {
        &self.resource_type == resource_type
    }
}
