//! # API Shared
//!
//! Shared definitions for FHIRBrush APIs.
//!
//! Contains:
//! - Request/response types (`types` module), serialisable and documented for OpenAPI
//! - Shared services like `HealthService`
//!
//! Used by `fhirbrush-core` (which produces these types), `api-rest` and the CLI.

pub mod health;
pub mod types;

pub use health::HealthService;
pub use types::*;
