//! Lenient view over a FHIR Patient resource.
//!
//! Only the first entry of `name` is considered, and from it only the first given
//! name and the family name. This mirrors how the dashboard labels patients.

use crate::{str_at, text_at};
use serde_json::Value;

/// Administrative gender as carried on the Patient resource.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
    Other,
    #[default]
    Unknown,
}

impl Gender {
    /// Parse from FHIR wire format string; anything unrecognised is `Unknown`.
    pub fn from_wire(s: &str) -> Self {
        match s {
            "male" => Gender::Male,
            "female" => Gender::Female,
            "other" => Gender::Other,
            _ => Gender::Unknown,
        }
    }

    /// Convert to FHIR wire format string.
    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
            Gender::Unknown => "unknown",
        }
    }
}

/// Demographic fields extracted from a Patient resource.
///
/// Every field is optional; absence means the source field was missing or had an
/// unexpected shape.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PatientView {
    pub id: Option<String>,
    /// First given name of the first `name` entry.
    pub given: Option<String>,
    /// Family name of the first `name` entry.
    pub family: Option<String>,
    pub gender: Gender,
    /// ISO 8601 date (YYYY-MM-DD).
    pub birth_date: Option<String>,
}

impl PatientView {
    pub fn from_resource(resource: &Value) -> Self {
        Self {
            id: text_at(resource, "/id"),
            given: text_at(resource, "/name/0/given/0"),
            family: text_at(resource, "/name/0/family"),
            gender: str_at(resource, "/gender")
                .map(Gender::from_wire)
                .unwrap_or(Gender::Unknown),
            birth_date: text_at(resource, "/birthDate"),
        }
    }

    /// First given name and family name joined by a space, trimmed.
    ///
    /// Empty when neither part is present.
    pub fn full_name(&self) -> String {
        format!(
            "{} {}",
            self.given.as_deref().unwrap_or(""),
            self.family.as_deref().unwrap_or("")
        )
        .trim()
        .to_owned()
    }
}

/// Uppercase first letters of up to two whitespace-separated tokens of `full_name`.
///
/// Each token contributes one char even when its uppercase form expands (`ß` → `S`).
pub fn initials(full_name: &str) -> String {
    full_name
        .split_whitespace()
        .take(2)
        .filter_map(|token| token.chars().next())
        .filter_map(|c| c.to_uppercase().next())
        .collect()
}
