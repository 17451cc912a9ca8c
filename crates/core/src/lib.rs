//! # FHIRBrush Core
//!
//! Core logic for the FHIRBrush clinical dashboard backend.
//!
//! This crate contains the pure data operations behind the API:
//! - Loading the synthetic FHIR dataset into a read-only [`ResourceIndex`]
//! - Traffic-light severity scoring ([`severity`])
//! - Cache-aside LLM analysis ([`analysis`])
//! - Simulated live lab streams ([`stream`])
//!
//! **No API concerns**: HTTP routing, WebSocket framing and the OpenAPI document belong in
//! `api-rest`.

pub mod analysis;
pub mod config;
pub mod constants;
pub mod error;
pub mod index;
pub mod patient;
pub mod severity;
pub mod stream;

pub use analysis::{AnalysisGateway, CacheStore, MemoryCacheStore};
pub use config::{CacheBackend, CoreConfig, LlmConfig};
pub use error::{PatientError, PatientResult};
pub use fhirbrush_types::{NonEmptyText, TextError};
pub use index::{PatientRecord, ResourceIndex};
pub use patient::PatientService;
pub use stream::{SimulatedObservation, SimulationSession, StreamMessage};
