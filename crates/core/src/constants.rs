//! Constants used throughout the FHIRBrush core crate.
//!
//! Defaults for every configurable value live here so the binaries, the CLI and the
//! tests agree on them.

use std::time::Duration;

/// Dataset location searched for when no explicit data file is configured.
pub const DEFAULT_DATA_FILE: &str = "data/synthetic_patients.json";

/// Prefix of every analysis cache key.
pub const DEFAULT_CACHE_NAMESPACE: &str = "fhirbrush:analyze";

/// Lifetime of a cached analysis.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Number of hex characters of the SHA-256 digest kept in a cache key (64 bits).
pub const CACHE_KEY_HEX_LEN: usize = 16;

/// Model used by the live analysis provider unless overridden.
pub const DEFAULT_LLM_MODEL: &str = "claude-3-5-haiku-latest";

/// Upper bound on a single analysis provider call.
pub const DEFAULT_LLM_TIMEOUT: Duration = Duration::from_secs(20);

/// Anthropic Messages API endpoint.
pub const ANTHROPIC_MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";

/// Interval between simulated observations on a live stream.
pub const DEFAULT_STREAM_INTERVAL: Duration = Duration::from_secs(15);

/// Origins of the local dashboard dev server.
pub const DEFAULT_CORS_ORIGINS: &[&str] = &["http://localhost:5173", "http://127.0.0.1:5173"];
