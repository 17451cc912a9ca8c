//! # API REST
//!
//! REST and WebSocket API for the FHIRBrush dashboard.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - Live observation streams over WebSocket (`stream`)
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, error bodies, CORS)
//!
//! Uses `api-shared` for common types and `fhirbrush-core` for all data operations.

#![warn(rust_2018_idioms)]

pub mod error;
pub mod stream;

use std::sync::Arc;

use api_shared::{
    AnalysisResult, AnalysisSource, AnalyzeReq, CacheConnectivity, CacheStatusRes, FullRecordRes,
    GraphEdge, HealthRes, HealthService, ListPatientsRes, PatientSummary, RiskLevel, SeverityLevel,
    SeverityResult, StatusRes,
};
use axum::{
    extract::{rejection::JsonRejection, Path as AxumPath, State},
    http::{HeaderValue, Method},
    response::Json,
    routing::{get, post},
    Router,
};
use fhirbrush_core::{AnalysisGateway, CoreConfig, PatientService};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use error::ApiError;

/// Application state shared by all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<CoreConfig>,
    pub patients: PatientService,
    pub analysis: Arc<AnalysisGateway>,
}

impl AppState {
    pub fn new(cfg: Arc<CoreConfig>, patients: PatientService, analysis: AnalysisGateway) -> Self {
        Self {
            cfg,
            patients,
            analysis: Arc::new(analysis),
        }
    }

    /// Load the dataset and wire the analysis gateway from `cfg`.
    ///
    /// # Errors
    ///
    /// Returns an error if the dataset cannot be loaded.
    pub fn from_config(cfg: Arc<CoreConfig>) -> anyhow::Result<Self> {
        let patients = PatientService::load(&cfg)?;
        let analysis = AnalysisGateway::from_config(&cfg);
        Ok(Self::new(cfg, patients, analysis))
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        root,
        health,
        list_patients,
        get_patient,
        patient_severity,
        all_severity,
        analyze,
        cache_status,
    ),
    components(schemas(
        StatusRes,
        HealthRes,
        PatientSummary,
        ListPatientsRes,
        FullRecordRes,
        SeverityLevel,
        SeverityResult,
        AnalyzeReq,
        AnalysisResult,
        AnalysisSource,
        GraphEdge,
        RiskLevel,
        CacheConnectivity,
        CacheStatusRes,
    ))
)]
pub struct ApiDoc;

/// Build the full router: REST endpoints, the stream socket, Swagger UI and CORS.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(state.cfg.cors_origins());

    Router::new()
        .route("/", get(root))
        .route("/api/health", get(health))
        .route("/api/patients", get(list_patients))
        .route("/api/patients/:id", get(get_patient))
        .route("/api/patients/:id/severity", get(patient_severity))
        .route("/api/severity", get(all_severity))
        .route("/api/analyze", post(analyze))
        .route("/api/cache/status", get(cache_status))
        .route("/ws/patients/:id/stream", get(stream::stream_upgrade))
        .merge(
            SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()),
        )
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

/// Bind `addr` and serve the router until the process is stopped.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails while running.
pub async fn serve(addr: &str, state: AppState) -> anyhow::Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("-- Starting FHIRBrush API on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service banner", body = StatusRes)
    )
)]
#[axum::debug_handler]
async fn root() -> Json<StatusRes> {
    Json(HealthService::root_status())
}

#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint used by monitoring and load balancers.
#[axum::debug_handler]
async fn health() -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    get,
    path = "/api/patients",
    responses(
        (status = 200, description = "Summaries of every patient in dataset order", body = ListPatientsRes)
    )
)]
#[axum::debug_handler]
async fn list_patients(State(state): State<AppState>) -> Json<ListPatientsRes> {
    Json(state.patients.list_patients())
}

#[utoipa::path(
    get,
    path = "/api/patients/{id}",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "All resources of the patient grouped by type", body = FullRecordRes),
        (status = 404, description = "Patient not found")
    )
)]
/// Full record of one patient.
///
/// # Errors
/// Returns `404 Not Found` if the id is not in the dataset.
#[axum::debug_handler]
async fn get_patient(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<FullRecordRes>, ApiError> {
    Ok(Json(state.patients.full_record(&id)?))
}

#[utoipa::path(
    get,
    path = "/api/patients/{id}/severity",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Severity of the patient; unknown ids score green", body = SeverityResult)
    )
)]
#[axum::debug_handler]
async fn patient_severity(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Json<SeverityResult> {
    Json(state.patients.severity(&id))
}

#[utoipa::path(
    get,
    path = "/api/severity",
    responses(
        (status = 200, description = "Severity of every patient in dataset order", body = [SeverityResult])
    )
)]
#[axum::debug_handler]
async fn all_severity(State(state): State<AppState>) -> Json<Vec<SeverityResult>> {
    Json(state.patients.severity_all())
}

#[utoipa::path(
    post,
    path = "/api/analyze",
    request_body = AnalyzeReq,
    responses(
        (status = 200, description = "Analysis from cache, live provider or fallback", body = AnalysisResult),
        (status = 400, description = "Bad request")
    )
)]
/// Cache-aside LLM analysis of a dashboard snapshot.
///
/// Provider and cache failures never surface here; they degrade to the fallback result.
#[axum::debug_handler]
async fn analyze(
    State(state): State<AppState>,
    req: Result<Json<AnalyzeReq>, JsonRejection>,
) -> Result<Json<AnalysisResult>, ApiError> {
    let Json(req) = req.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    if req.patient_id.trim().is_empty() {
        return Err(ApiError::BadRequest("patientId is required".into()));
    }
    Ok(Json(state.analysis.analyze(&req.patient_id, &req.snapshot).await))
}

#[utoipa::path(
    get,
    path = "/api/cache/status",
    responses(
        (status = 200, description = "Cache store connectivity", body = CacheStatusRes)
    )
)]
#[axum::debug_handler]
async fn cache_status(State(state): State<AppState>) -> Json<CacheStatusRes> {
    Json(state.analysis.cache_status().await)
}
