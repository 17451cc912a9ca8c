use std::path::PathBuf;

/// Errors surfaced by the core crate.
///
/// Only startup work (configuration, dataset loading) and lookups by id can fail.
/// Scoring, key derivation and the stream generator are total.
#[derive(Debug, thiserror::Error)]
pub enum PatientError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("Patient not found: {0}")]
    NotFound(String),

    #[error("failed to read data file {path}: {source}", path = path.display())]
    DataFileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid dataset: {0}")]
    Dataset(#[from] fhir::FhirError),

    #[error("invalid text: {0}")]
    Text(#[from] fhirbrush_types::TextError),
}

pub type PatientResult<T> = std::result::Result<T, PatientError>;
