//! Simulated live lab stream.
//!
//! Each open stream owns a [`SimulationSession`] whose step counter starts at zero and
//! advances once per generated observation. Values come from two fixed rising series
//! (creatinine and potassium) with a small uniform jitter; past the end of a series the
//! value plateaus at its last entry.

use chrono::{SecondsFormat, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const CREATININE_SERIES: [f64; 15] = [
    0.9, 1.0, 1.1, 1.2, 1.3, 1.4, 1.55, 1.7, 1.85, 2.0, 2.15, 2.3, 2.5, 2.7, 2.9,
];
pub const POTASSIUM_SERIES: [f64; 15] = [
    4.0, 4.1, 4.2, 4.3, 4.5, 4.7, 4.9, 5.1, 5.3, 5.5, 5.6, 5.7, 5.8, 5.9, 6.0,
];

/// Half-width of the uniform jitter added to every value.
pub const JITTER: f64 = 0.05;

pub const CREATININE_CODE: &str = "2160-0";
pub const CREATININE_DISPLAY: &str = "Creatinine [Mass/volume] in Serum or Plasma";
pub const CREATININE_UNIT: &str = "mg/dL";
pub const POTASSIUM_UNIT: &str = "mEq/L";

/// Value of `series` at `step`, clamped to the last entry.
pub fn series_value(series: &[f64], step: usize) -> f64 {
    match series.len() {
        0 => 0.0,
        len => series[step.min(len - 1)],
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// One stream of simulated observations for a patient.
pub struct SimulationSession<R = StdRng> {
    patient_id: String,
    step: usize,
    rng: R,
}

impl SimulationSession<StdRng> {
    pub fn new(patient_id: impl Into<String>) -> Self {
        Self::with_rng(patient_id, StdRng::from_entropy())
    }
}

impl<R: Rng> SimulationSession<R> {
    pub fn with_rng(patient_id: impl Into<String>, rng: R) -> Self {
        Self {
            patient_id: patient_id.into(),
            step: 0,
            rng,
        }
    }

    pub fn patient_id(&self) -> &str {
        &self.patient_id
    }

    /// Step the next observation will be generated at.
    pub fn step(&self) -> usize {
        self.step
    }

    /// Generate the observation for the current step and advance.
    pub fn next_observation(&mut self) -> SimulatedObservation {
        let step = self.step;
        self.step += 1;

        let creatinine = round2(series_value(&CREATININE_SERIES, step) + self.jitter());
        let potassium = round2(series_value(&POTASSIUM_SERIES, step) + self.jitter());

        SimulatedObservation {
            resource_type: "Observation".to_string(),
            id: Uuid::new_v4().to_string(),
            status: "final".to_string(),
            code: CodeableConcept {
                coding: vec![Coding {
                    system: "http://loinc.org".to_string(),
                    code: CREATININE_CODE.to_string(),
                    display: CREATININE_DISPLAY.to_string(),
                }],
                text: "Creatinine".to_string(),
            },
            subject: Reference {
                reference: format!("Patient/{}", self.patient_id),
            },
            effective_date_time: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            value_quantity: Quantity {
                value: creatinine,
                unit: CREATININE_UNIT.to_string(),
            },
            potassium,
            potassium_unit: POTASSIUM_UNIT.to_string(),
            step,
        }
    }

    fn jitter(&mut self) -> f64 {
        self.rng.gen_range(-JITTER..=JITTER)
    }
}

/// FHIR-shaped creatinine Observation with the paired potassium reading alongside.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulatedObservation {
    pub resource_type: String,
    pub id: String,
    pub status: String,
    pub code: CodeableConcept,
    pub subject: Reference,
    pub effective_date_time: String,
    pub value_quantity: Quantity,
    #[serde(rename = "_potassium")]
    pub potassium: f64,
    #[serde(rename = "_potassium_unit")]
    pub potassium_unit: String,
    #[serde(rename = "_step")]
    pub step: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CodeableConcept {
    pub coding: Vec<Coding>,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coding {
    pub system: String,
    pub code: String,
    pub display: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub reference: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    pub value: f64,
    pub unit: String,
}

/// Frame pushed to stream clients.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum StreamMessage {
    NewObservation(SimulatedObservation),
}
