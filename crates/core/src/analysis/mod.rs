//! LLM-backed analysis behind a cache.

pub mod cache;
pub mod gateway;
pub mod key;
pub mod provider;

pub use cache::{CacheError, CacheState, CacheStore, MemoryCacheStore};
pub use gateway::AnalysisGateway;
pub use key::{canonical_json, derive_cache_key};
pub use provider::{fallback_result, AnalysisError, AnalysisProvider, ClaudeProvider};
