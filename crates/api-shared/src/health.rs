use crate::types::{HealthRes, StatusRes};

/// Simple health service used by the REST API and the CLI.
///
/// This service provides a standardised way to check the health status of the
/// FHIRBrush backend.
#[derive(Clone, Default)]
pub struct HealthService;

impl HealthService {
    /// Liveness payload for `/api/health`.
    pub fn check_health() -> HealthRes {
        HealthRes {
            status: "ok".into(),
            service: "fhirbrush-backend".into(),
        }
    }

    /// Root status payload for `/`.
    pub fn root_status() -> StatusRes {
        StatusRes {
            status: "ok".into(),
            message: "FHIRBrush API".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_is_ok() {
        let res = HealthService::check_health();
        assert_eq!(res.status, "ok");
        assert_eq!(res.service, "fhirbrush-backend");
    }
}
