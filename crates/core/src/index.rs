//! In-memory resource index.
//!
//! Built once at startup from the dataset document and read-only afterwards. Each bundle's
//! entries are indexed under the id of the bundle's Patient entry; lookups by patient id are
//! hash-map lookups, filtering by resource type is linear in that patient's entry count.
//!
//! Bundles without a usable Patient entry are skipped. They are counted and logged so data
//! problems stay visible without failing ingestion.

use crate::{PatientError, PatientResult};
use fhir::{Dataset, ResourceEntry, ResourceType};
use std::collections::HashMap;
use std::path::Path;

/// All resources indexed under one patient.
#[derive(Clone, Debug, PartialEq)]
pub struct PatientRecord {
    id: String,
    entries: Vec<ResourceEntry>,
}

impl PatientRecord {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Entries in document order.
    pub fn entries(&self) -> &[ResourceEntry] {
        &self.entries
    }

    pub fn entries_of(&self, resource_type: &ResourceType) -> impl Iterator<Item = &ResourceEntry> + '_ {
        let resource_type = resource_type.clone();
        self.entries.iter().filter(move |e| e.is(&resource_type))
    }

    pub fn count_of(&self, resource_type: &ResourceType) -> usize {
        self.entries_of(resource_type).count()
    }
}

/// Mapping from patient id to that patient's resource entries.
#[derive(Clone, Debug, Default)]
pub struct ResourceIndex {
    records: HashMap<String, PatientRecord>,
    /// Patient ids in the order they first appear in the dataset.
    order: Vec<String>,
    skipped_bundles: usize,
}

impl ResourceIndex {
    /// Index every bundle of `dataset` under its Patient's id.
    ///
    /// A bundle whose Patient id repeats an earlier bundle's has its entries appended to the
    /// existing record.
    pub fn build(dataset: Dataset) -> Self {
        let mut index = ResourceIndex::default();

        for (position, bundle) in dataset.bundles.into_iter().enumerate() {
            let Some(patient_id) = bundle.patient_id() else {
                index.skipped_bundles += 1;
                tracing::warn!(
                    bundle_position = position,
                    bundle_id = bundle.id.as_deref().unwrap_or(""),
                    skipped = index.skipped_bundles,
                    "bundle has no Patient entry, skipping"
                );
                continue;
            };

            match index.records.get_mut(&patient_id) {
                Some(record) => record.entries.extend(bundle.entries),
                None => {
                    index.order.push(patient_id.clone());
                    index.records.insert(
                        patient_id.clone(),
                        PatientRecord {
                            id: patient_id,
                            entries: bundle.entries,
                        },
                    );
                }
            }
        }

        index
    }

    /// Read, parse and index the dataset file at `path`.
    ///
    /// # Errors
    ///
    /// Returns `PatientError` if:
    /// - the file cannot be read ([`PatientError::DataFileRead`]),
    /// - the document does not have the dataset structure ([`PatientError::Dataset`]).
    pub fn load(path: &Path) -> PatientResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| PatientError::DataFileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let index = Self::build(Dataset::parse(&text)?);

        tracing::info!(
            patients = index.len(),
            skipped_bundles = index.skipped_bundles,
            path = %path.display(),
            "resource index built"
        );
        Ok(index)
    }

    pub fn record(&self, patient_id: &str) -> Option<&PatientRecord> {
        self.records.get(patient_id)
    }

    pub fn contains(&self, patient_id: &str) -> bool {
        self.records.contains_key(patient_id)
    }

    /// Entries of one type for a patient. Unknown patients yield an empty list.
    pub fn entries_of(&self, patient_id: &str, resource_type: &ResourceType) -> Vec<&ResourceEntry> {
        self.records
            .get(patient_id)
            .map(|r| r.entries_of(resource_type).collect())
            .unwrap_or_default()
    }

    /// Records in dataset order.
    pub fn records(&self) -> impl Iterator<Item = &PatientRecord> {
        self.order.iter().filter_map(|id| self.records.get(id))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of bundles dropped for lacking a Patient entry.
    pub fn skipped_bundles(&self) -> usize {
        self.skipped_bundles
    }
}
