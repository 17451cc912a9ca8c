//! Lenient view over a FHIR Condition resource.

use crate::text_at;
use serde_json::Value;

/// Coded diagnosis extracted from a Condition resource.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConditionView {
    /// Every `code.coding[].code` present, in order (normally ICD-10).
    pub codes: Vec<String>,
    /// `code.text`, else the first coding's display.
    pub display: Option<String>,
}

impl ConditionView {
    pub fn from_resource(resource: &Value) -> Self {
        let codes = resource
            .pointer("/code/coding")
            .and_then(Value::as_array)
            .map(|codings| {
                codings
                    .iter()
                    .filter_map(|c| c.get("code").and_then(Value::as_str))
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            codes,
            display: text_at(resource, "/code/text")
                .or_else(|| text_at(resource, "/code/coding/0/display")),
        }
    }

    /// Human-readable label, falling back to `code` when the resource has none.
    pub fn display_or<'a>(&'a self, code: &'a str) -> &'a str {
        self.display.as_deref().unwrap_or(code)
    }
}
