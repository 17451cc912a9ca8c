use std::path::PathBuf;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::AppState;
use fhirbrush_core::config::{
    cache_backend_from_env_value, cors_origins_from_env_value, duration_millis_from_env_value,
    duration_secs_from_env_value, llm_from_env_values, resolve_data_file,
};
use fhirbrush_core::constants::{
    DEFAULT_CACHE_NAMESPACE, DEFAULT_CACHE_TTL, DEFAULT_LLM_TIMEOUT, DEFAULT_STREAM_INTERVAL,
};
use fhirbrush_core::{CoreConfig, NonEmptyText};

/// Main entry point for the FHIRBrush backend
///
/// Serves the REST API, the observation stream WebSocket and Swagger UI on one address.
///
/// # Environment Variables
/// - `FHIRBRUSH_REST_ADDR`: server address (default: "0.0.0.0:8000")
/// - `FHIRBRUSH_DATA_FILE`: dataset document (default: located `data/synthetic_patients.json`)
/// - `FHIRBRUSH_CACHE`: `memory` or `disabled` (default: `memory`)
/// - `FHIRBRUSH_CACHE_TTL_SECS`, `FHIRBRUSH_CACHE_NAMESPACE`
/// - `ANTHROPIC_API_KEY`, `FHIRBRUSH_LLM_MODEL`, `FHIRBRUSH_LLM_TIMEOUT_SECS`
/// - `FHIRBRUSH_STREAM_INTERVAL_MS`, `FHIRBRUSH_CORS_ORIGINS`
///
/// # Errors
/// Returns an error if configuration is invalid, the dataset cannot be loaded, or the server
/// fails to bind or run.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fhirbrush_run=info".parse()?)
                .add_directive("fhirbrush_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("FHIRBRUSH_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".into());

    let cfg = Arc::new(config_from_env()?);
    tracing::info!(
        data_file = %cfg.data_file().display(),
        cache = ?cfg.cache_backend(),
        live_analysis = cfg.llm().is_some(),
        "++ Configuration resolved"
    );

    let state = AppState::from_config(cfg)?;
    api_rest::serve(&rest_addr, state).await
}

fn config_from_env() -> anyhow::Result<CoreConfig> {
    let env = |name: &str| std::env::var(name).ok();

    let data_file = resolve_data_file(env("FHIRBRUSH_DATA_FILE").map(PathBuf::from))?;
    let namespace = NonEmptyText::new(
        env("FHIRBRUSH_CACHE_NAMESPACE")
            .as_deref()
            .unwrap_or(DEFAULT_CACHE_NAMESPACE),
    )?;

    let cfg = CoreConfig::new(data_file, namespace)
        .with_cache_backend(cache_backend_from_env_value(env("FHIRBRUSH_CACHE"))?)
        .with_cache_ttl(duration_secs_from_env_value(
            "FHIRBRUSH_CACHE_TTL_SECS",
            env("FHIRBRUSH_CACHE_TTL_SECS"),
            DEFAULT_CACHE_TTL,
        )?)
        .with_llm(llm_from_env_values(
            env("ANTHROPIC_API_KEY"),
            env("FHIRBRUSH_LLM_MODEL"),
        )?)
        .with_llm_timeout(duration_secs_from_env_value(
            "FHIRBRUSH_LLM_TIMEOUT_SECS",
            env("FHIRBRUSH_LLM_TIMEOUT_SECS"),
            DEFAULT_LLM_TIMEOUT,
        )?)
        .with_stream_interval(duration_millis_from_env_value(
            "FHIRBRUSH_STREAM_INTERVAL_MS",
            env("FHIRBRUSH_STREAM_INTERVAL_MS"),
            DEFAULT_STREAM_INTERVAL,
        )?)
        .with_cors_origins(cors_origins_from_env_value(env("FHIRBRUSH_CORS_ORIGINS")));

    Ok(cfg)
}
