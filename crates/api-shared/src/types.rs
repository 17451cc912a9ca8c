//! Request and response types exchanged with the dashboard.
//!
//! Field names are snake_case on the wire except where the frontend contract says
//! otherwise (`patientId` on the analyze request, `_source` on analysis results).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

// ============================================================================
// Health
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub status: String,
    pub service: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StatusRes {
    pub status: String,
    pub message: String,
}

// ============================================================================
// Patients
// ============================================================================

/// One row of the patient list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PatientSummary {
    pub id: String,
    pub name: String,
    pub gender: String,
    pub birth_date: Option<String>,
    pub conditions: usize,
    pub observations: usize,
    pub medications: usize,
    pub encounters: usize,
    /// Data richness: `2*observations + 2*conditions + medications + encounters`.
    pub score: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ListPatientsRes {
    pub patients: Vec<PatientSummary>,
}

/// A patient's resources grouped by type, bodies returned verbatim.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FullRecordRes {
    #[schema(value_type = Option<Object>)]
    pub patient: Option<Value>,
    #[schema(value_type = Vec<Object>)]
    pub conditions: Vec<Value>,
    #[schema(value_type = Vec<Object>)]
    pub observations: Vec<Value>,
    #[schema(value_type = Vec<Object>)]
    pub medications: Vec<Value>,
    #[schema(value_type = Vec<Object>)]
    pub encounters: Vec<Value>,
    /// Resources of any other type.
    #[schema(value_type = Vec<Object>)]
    pub other: Vec<Value>,
}

// ============================================================================
// Severity
// ============================================================================

/// Traffic-light classification. Ordered by increasing severity.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum SeverityLevel {
    #[default]
    Green,
    Orange,
    Red,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SeverityResult {
    pub patient_id: String,
    pub name: String,
    /// At most two characters.
    pub initials: String,
    pub gender: String,
    pub severity: SeverityLevel,
    /// At most three reasons, in the order they were found.
    pub reasons: Vec<String>,
}

// ============================================================================
// Analysis
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AnalyzeReq {
    #[serde(rename = "patientId")]
    pub patient_id: String,
    /// Opaque dashboard state; only its content matters, not key order.
    #[schema(value_type = Object)]
    #[serde(default)]
    pub snapshot: Value,
}

/// Directed, labelled edge of the graph overlay.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub label: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    #[serde(alias = "medium")]
    Moderate,
    High,
    Critical,
}

/// Where an analysis result came from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisSource {
    Cache,
    Fallback,
    #[default]
    Live,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AnalysisResult {
    #[serde(default)]
    pub highlighted_nodes: Vec<String>,
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
    #[serde(default)]
    pub cluster: Vec<String>,
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub narrative: String,
    #[serde(rename = "_source", default)]
    pub source: AnalysisSource,
}

// ============================================================================
// Cache status
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CacheConnectivity {
    Connected,
    Unavailable,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CacheStatusRes {
    pub status: CacheConnectivity,
    pub backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}
