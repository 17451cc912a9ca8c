//! Patient service.
//!
//! Read-only queries over the resource index: the patient list, full records grouped by
//! resource type, and severity results. No API concerns live here.

use crate::config::CoreConfig;
use crate::error::{PatientError, PatientResult};
use crate::index::{PatientRecord, ResourceIndex};
use crate::severity;
use api_shared::{FullRecordRes, ListPatientsRes, PatientSummary, SeverityResult};
use fhir::{PatientView, ResourceType};
use std::sync::Arc;

/// Pure patient data operations over a shared index.
#[derive(Clone)]
pub struct PatientService {
    index: Arc<ResourceIndex>,
}

impl PatientService {
    pub fn new(index: Arc<ResourceIndex>) -> Self {
        Self { index }
    }

    /// Load the dataset named by `cfg` and wrap it in a service.
    ///
    /// # Errors
    ///
    /// Returns a `PatientError` if the data file cannot be read or parsed.
    pub fn load(cfg: &CoreConfig) -> PatientResult<Self> {
        Ok(Self::new(Arc::new(ResourceIndex::load(cfg.data_file())?)))
    }

    pub fn index(&self) -> &ResourceIndex {
        &self.index
    }

    pub fn contains(&self, patient_id: &str) -> bool {
        self.index.contains(patient_id)
    }

    /// Summaries of every patient, in dataset order.
    pub fn list_patients(&self) -> ListPatientsRes {
        ListPatientsRes {
            patients: self.index.records().map(summarise).collect(),
        }
    }

    /// Summaries ranked by data richness, richest first. Ties are broken by id.
    pub fn ranked_patients(&self) -> Vec<PatientSummary> {
        let mut patients = self.list_patients().patients;
        patients.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        patients
    }

    /// All resources of one patient, grouped by type.
    ///
    /// # Errors
    ///
    /// Returns [`PatientError::NotFound`] if the id is not indexed.
    pub fn full_record(&self, patient_id: &str) -> PatientResult<FullRecordRes> {
        let record = self
            .index
            .record(patient_id)
            .ok_or_else(|| PatientError::NotFound(patient_id.to_string()))?;

        let mut res = FullRecordRes::default();
        for entry in record.entries() {
            let body = entry.resource().clone();
            match entry.resource_type() {
                ResourceType::Patient if res.patient.is_none() => res.patient = Some(body),
                ResourceType::Patient => res.other.push(body),
                ResourceType::Condition => res.conditions.push(body),
                ResourceType::Observation => res.observations.push(body),
                ResourceType::MedicationRequest => res.medications.push(body),
                ResourceType::Encounter => res.encounters.push(body),
                ResourceType::Other(_) => res.other.push(body),
            }
        }
        Ok(res)
    }

    pub fn severity(&self, patient_id: &str) -> SeverityResult {
        severity::score(&self.index, patient_id)
    }

    pub fn severity_all(&self) -> Vec<SeverityResult> {
        severity::score_all(&self.index)
    }
}

fn summarise(record: &PatientRecord) -> PatientSummary {
    let patient = record
        .entries_of(&ResourceType::Patient)
        .next()
        .map(|e| PatientView::from_resource(e.resource()))
        .unwrap_or_default();

    let conditions = record.count_of(&ResourceType::Condition);
    let observations = record.count_of(&ResourceType::Observation);
    let medications = record.count_of(&ResourceType::MedicationRequest);
    let encounters = record.count_of(&ResourceType::Encounter);

    PatientSummary {
        id: record.id().to_string(),
        name: patient.full_name(),
        gender: patient.gender.as_str().to_string(),
        birth_date: patient.birth_date,
        conditions,
        observations,
        medications,
        encounters,
        score: 2 * observations + 2 * conditions + medications + encounters,
    }
}
