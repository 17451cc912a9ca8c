//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. The intent is to avoid reading process-wide environment variables
//! during request handling, which can lead to inconsistent behaviour in multi-threaded runtimes
//! and test harnesses.
//!
//! The `*_from_env_value` helpers take the raw `Option<String>` of an environment variable so
//! that binaries do the reading and tests can exercise the parsing without touching the
//! process environment.

use crate::constants::{
    DEFAULT_CACHE_TTL, DEFAULT_CORS_ORIGINS, DEFAULT_DATA_FILE, DEFAULT_LLM_MODEL,
    DEFAULT_LLM_TIMEOUT, DEFAULT_STREAM_INTERVAL,
};
use crate::{NonEmptyText, PatientError, PatientResult};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Which cache store backs the analysis gateway.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheBackend {
    /// In-process key-value store with TTL.
    Memory,
    /// No store; every analysis is a miss and the cache reports `unavailable`.
    Disabled,
}

/// Credentials and model for the live analysis provider.
#[derive(Clone)]
pub struct LlmConfig {
    api_key: String,
    model: NonEmptyText,
}

impl LlmConfig {
    pub fn new(api_key: impl Into<String>, model: NonEmptyText) -> Self {
        Self {
            api_key: api_key.into(),
            model,
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn model(&self) -> &str {
        self.model.as_str()
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .finish()
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_file: PathBuf,
    cache_backend: CacheBackend,
    cache_ttl: Duration,
    cache_namespace: NonEmptyText,
    llm: Option<LlmConfig>,
    llm_timeout: Duration,
    stream_interval: Duration,
    cors_origins: Vec<String>,
}

impl CoreConfig {
    /// Create a new `CoreConfig` with default cache, provider and stream settings.
    pub fn new(data_file: PathBuf, cache_namespace: NonEmptyText) -> Self {
        Self {
            data_file,
            cache_backend: CacheBackend::Memory,
            cache_ttl: DEFAULT_CACHE_TTL,
            cache_namespace,
            llm: None,
            llm_timeout: DEFAULT_LLM_TIMEOUT,
            stream_interval: DEFAULT_STREAM_INTERVAL,
            cors_origins: DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_cache_backend(mut self, backend: CacheBackend) -> Self {
        self.cache_backend = backend;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_llm(mut self, llm: Option<LlmConfig>) -> Self {
        self.llm = llm;
        self
    }

    pub fn with_llm_timeout(mut self, timeout: Duration) -> Self {
        self.llm_timeout = timeout;
        self
    }

    pub fn with_stream_interval(mut self, interval: Duration) -> Self {
        self.stream_interval = interval;
        self
    }

    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = origins;
        self
    }

    pub fn data_file(&self) -> &Path {
        &self.data_file
    }

    pub fn cache_backend(&self) -> CacheBackend {
        self.cache_backend
    }

    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }

    pub fn cache_namespace(&self) -> &NonEmptyText {
        &self.cache_namespace
    }

    pub fn llm(&self) -> Option<&LlmConfig> {
        self.llm.as_ref()
    }

    pub fn llm_timeout(&self) -> Duration {
        self.llm_timeout
    }

    pub fn stream_interval(&self) -> Duration {
        self.stream_interval
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.cors_origins
    }
}

/// Resolve the dataset file without reading environment variables.
///
/// If `override_file` is provided, it must be an existing file. Otherwise this searches for
/// `data/synthetic_patients.json` relative to the current working directory and then walks up
/// from `CARGO_MANIFEST_DIR`.
pub fn resolve_data_file(override_file: Option<PathBuf>) -> PatientResult<PathBuf> {
    if let Some(file) = override_file {
        if file.is_file() {
            return Ok(file);
        }
        return Err(PatientError::InvalidInput(format!(
            "FHIRBRUSH_DATA_FILE override is not a file: {}",
            file.display()
        )));
    }

    let cwd_relative = PathBuf::from(DEFAULT_DATA_FILE);
    if cwd_relative.is_file() {
        return Ok(cwd_relative);
    }

    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    for ancestor in manifest_dir.ancestors() {
        let candidate = ancestor.join(DEFAULT_DATA_FILE);
        if candidate.is_file() {
            return Ok(candidate);
        }
    }

    Err(PatientError::InvalidInput(format!(
        "could not locate {DEFAULT_DATA_FILE}"
    )))
}

/// Parse the cache backend name. `None` or blank selects the in-memory store.
pub fn cache_backend_from_env_value(value: Option<String>) -> PatientResult<CacheBackend> {
    match trimmed(value).as_deref() {
        None | Some("memory") => Ok(CacheBackend::Memory),
        Some("disabled") | Some("none") | Some("off") => Ok(CacheBackend::Disabled),
        Some(other) => Err(PatientError::InvalidInput(format!(
            "unknown cache backend '{other}' (expected 'memory' or 'disabled')"
        ))),
    }
}

/// Parse a whole number of seconds. `None` or blank yields `default`; zero is rejected.
pub fn duration_secs_from_env_value(
    name: &str,
    value: Option<String>,
    default: Duration,
) -> PatientResult<Duration> {
    Ok(positive_integer(name, value)?
        .map(Duration::from_secs)
        .unwrap_or(default))
}

/// Parse a whole number of milliseconds. `None` or blank yields `default`; zero is rejected.
pub fn duration_millis_from_env_value(
    name: &str,
    value: Option<String>,
    default: Duration,
) -> PatientResult<Duration> {
    Ok(positive_integer(name, value)?
        .map(Duration::from_millis)
        .unwrap_or(default))
}

/// Build the live provider config. A missing or blank API key disables the provider.
pub fn llm_from_env_values(
    api_key: Option<String>,
    model: Option<String>,
) -> PatientResult<Option<LlmConfig>> {
    let Some(api_key) = trimmed(api_key) else {
        return Ok(None);
    };
    let model = NonEmptyText::new(trimmed(model).as_deref().unwrap_or(DEFAULT_LLM_MODEL))?;
    Ok(Some(LlmConfig::new(api_key, model)))
}

/// Parse a comma-separated origin list. `None` or blank yields the dev-server defaults.
pub fn cors_origins_from_env_value(value: Option<String>) -> Vec<String> {
    let origins: Vec<String> = trimmed(value)
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default();

    if origins.is_empty() {
        DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect()
    } else {
        origins
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn positive_integer(name: &str, value: Option<String>) -> PatientResult<Option<u64>> {
    let Some(raw) = trimmed(value) else {
        return Ok(None);
    };
    match raw.parse::<u64>() {
        Ok(0) | Err(_) => Err(PatientError::InvalidInput(format!(
            "{name} must be a positive integer, got '{raw}'"
        ))),
        Ok(n) => Ok(Some(n)),
    }
}
