//! Cache-aside gateway in front of the analysis provider.
//!
//! `analyze` never fails. A cache hit is returned as-is (tagged `cache`) without calling the
//! provider. On a miss the provider is called under a timeout; its result is tagged `live`,
//! and any error, timeout or missing provider produces the fallback result instead. Either
//! way the result is written back with the configured TTL. Store errors on read or write are
//! logged and treated as a miss.

use super::cache::{CacheError, CacheState, CacheStore, MemoryCacheStore};
use super::key::derive_cache_key;
use super::provider::{fallback_result, AnalysisProvider, ClaudeProvider};
use crate::config::{CacheBackend, CoreConfig};
use api_shared::{AnalysisResult, AnalysisSource, CacheConnectivity, CacheStatusRes};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AnalysisGateway {
    store: Option<Arc<dyn CacheStore>>,
    provider: Option<Arc<dyn AnalysisProvider>>,
    namespace: String,
    ttl: Duration,
    timeout: Duration,
}

impl AnalysisGateway {
    /// Gateway with no store and no provider: every call yields the fallback.
    pub fn new(namespace: impl Into<String>, ttl: Duration, timeout: Duration) -> Self {
        Self {
            store: None,
            provider: None,
            namespace: namespace.into(),
            ttl,
            timeout,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_provider(mut self, provider: Arc<dyn AnalysisProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Wire the store and provider selected by `cfg`.
    pub fn from_config(cfg: &CoreConfig) -> Self {
        let mut gateway = Self::new(
            cfg.cache_namespace().as_str(),
            cfg.cache_ttl(),
            cfg.llm_timeout(),
        );

        if cfg.cache_backend() == CacheBackend::Memory {
            gateway = gateway.with_store(Arc::new(MemoryCacheStore::new()));
        }
        if let Some(llm) = cfg.llm() {
            gateway = gateway.with_provider(Arc::new(ClaudeProvider::new(llm)));
        } else {
            tracing::info!("no analysis provider configured, analyze will serve fallback results");
        }
        gateway
    }

    pub fn cache_key(&self, patient_id: &str, snapshot: &Value) -> String {
        derive_cache_key(&self.namespace, patient_id, snapshot)
    }

    pub async fn analyze(&self, patient_id: &str, snapshot: &Value) -> AnalysisResult {
        let key = self.cache_key(patient_id, snapshot);

        if let Some(mut cached) = self.read_cached(&key).await {
            tracing::debug!(patient_id = %patient_id, key = %key, "analysis cache hit");
            cached.source = AnalysisSource::Cache;
            return cached;
        }

        let result = self.call_provider(patient_id, snapshot).await;
        self.write_back(&key, &result).await;
        result
    }

    async fn read_cached(&self, key: &str) -> Option<AnalysisResult> {
        let store = self.store.as_ref()?;

        let raw = match store.get(key).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "cache read failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(result) => Some(result),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "cached analysis unreadable, treating as miss");
                None
            }
        }
    }

    async fn call_provider(&self, patient_id: &str, snapshot: &Value) -> AnalysisResult {
        let Some(provider) = self.provider.as_ref() else {
            return fallback_result();
        };

        match tokio::time::timeout(self.timeout, provider.analyze(patient_id, snapshot)).await {
            Ok(Ok(mut result)) => {
                result.source = AnalysisSource::Live;
                result
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    patient_id = %patient_id,
                    provider = provider.name(),
                    error = %e,
                    "analysis provider failed, serving fallback"
                );
                fallback_result()
            }
            Err(_) => {
                tracing::warn!(
                    patient_id = %patient_id,
                    provider = provider.name(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "analysis provider timed out, serving fallback"
                );
                fallback_result()
            }
        }
    }

    async fn write_back(&self, key: &str, result: &AnalysisResult) {
        let Some(store) = self.store.as_ref() else {
            return;
        };

        let raw = match serde_json::to_string(result) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "failed to serialise analysis for cache");
                return;
            }
        };
        if let Err(e) = store.set_ex(key, raw, self.ttl).await {
            tracing::warn!(key = %key, error = %e, "cache write failed");
        }
    }

    pub async fn cache_state(&self) -> CacheState {
        let Some(store) = self.store.as_ref() else {
            return CacheState::Unavailable(None);
        };
        match store.ping().await {
            Ok(()) => CacheState::Connected,
            Err(e @ CacheError::Unavailable(_)) => CacheState::Unavailable(Some(e.to_string())),
            Err(e @ CacheError::Operation(_)) => CacheState::Error(e.to_string()),
        }
    }

    pub async fn cache_status(&self) -> CacheStatusRes {
        let backend = self
            .store
            .as_ref()
            .map(|s| s.backend().to_string())
            .unwrap_or_else(|| "disabled".to_string());

        let (status, detail) = match self.cache_state().await {
            CacheState::Connected => (CacheConnectivity::Connected, None),
            CacheState::Unavailable(detail) => (CacheConnectivity::Unavailable, detail),
            CacheState::Error(detail) => (CacheConnectivity::Error, Some(detail)),
        };
        CacheStatusRes {
            status,
            backend,
            detail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::provider::AnalysisError;
    use api_shared::{GraphEdge, RiskLevel};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TTL: Duration = Duration::from_secs(300);
    const TIMEOUT: Duration = Duration::from_secs(20);

    #[derive(Default)]
    struct CountingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AnalysisProvider for CountingProvider {
        async fn analyze(&self, patient_id: &str, _snapshot: &Value) -> Result<AnalysisResult, AnalysisError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(AnalysisResult {
                highlighted_nodes: vec![format!("{patient_id}-obs")],
                edges: vec![GraphEdge {
                    source: "a".into(),
                    target: "b".into(),
                    label: "drives".into(),
                }],
                cluster: vec![],
                risk_level: RiskLevel::High,
                narrative: "live".into(),
                source: AnalysisSource::Cache,
            })
        }
        fn name(&self) -> &str {
            "counting"
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl AnalysisProvider for FailingProvider {
        async fn analyze(&self, _: &str, _: &Value) -> Result<AnalysisResult, AnalysisError> {
            Err(AnalysisError::Http("503".into()))
        }
        fn name(&self) -> &str {
            "failing"
        }
    }

    struct HangingProvider;

    #[async_trait]
    impl AnalysisProvider for HangingProvider {
        async fn analyze(&self, _: &str, _: &Value) -> Result<AnalysisResult, AnalysisError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(AnalysisError::ProviderUnavailable("hung".into()))
        }
        fn name(&self) -> &str {
            "hanging"
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl CacheStore for BrokenStore {
        async fn ping(&self) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("connection refused".into()))
        }
        async fn get(&self, _: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError::Unavailable("connection refused".into()))
        }
        async fn set_ex(&self, _: &str, _: String, _: Duration) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("connection refused".into()))
        }
        fn backend(&self) -> &str {
            "broken"
        }
    }

    struct ErroringStore;

    #[async_trait]
    impl CacheStore for ErroringStore {
        async fn ping(&self) -> Result<(), CacheError> {
            Err(CacheError::Operation("WRONGTYPE".into()))
        }
        async fn get(&self, _: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError::Operation("WRONGTYPE".into()))
        }
        async fn set_ex(&self, _: &str, _: String, _: Duration) -> Result<(), CacheError> {
            Err(CacheError::Operation("WRONGTYPE".into()))
        }
        fn backend(&self) -> &str {
            "erroring"
        }
    }

    fn gateway(provider: Arc<dyn AnalysisProvider>) -> (AnalysisGateway, Arc<MemoryCacheStore>) {
        let store = Arc::new(MemoryCacheStore::new());
        let gateway = AnalysisGateway::new("ns", TTL, TIMEOUT)
            .with_store(store.clone())
            .with_provider(provider);
        (gateway, store)
    }

    #[tokio::test]
    async fn second_call_is_served_from_cache() {
        let provider = Arc::new(CountingProvider::default());
        let (gateway, _) = gateway(provider.clone());
        let snapshot = json!({"view": "graph", "selected": ["obs-1"]});

        let first = gateway.analyze("synth-001", &snapshot).await;
        assert_eq!(first.source, AnalysisSource::Live);

        let second = gateway.analyze("synth-001", &snapshot).await;
        assert_eq!(second.source, AnalysisSource::Cache);
        assert_eq!(second.highlighted_nodes, first.highlighted_nodes);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn reordered_snapshot_hits_cache() {
        let provider = Arc::new(CountingProvider::default());
        let (gateway, _) = gateway(provider.clone());

        gateway.analyze("p", &json!({"a": 1, "b": 2})).await;
        let again = gateway.analyze("p", &json!({"b": 2, "a": 1})).await;
        assert_eq!(again.source, AnalysisSource::Cache);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entry_calls_provider_again() {
        let provider = Arc::new(CountingProvider::default());
        let (gateway, _) = gateway(provider.clone());

        gateway.analyze("p", &json!({})).await;
        tokio::time::advance(TTL).await;
        let result = gateway.analyze("p", &json!({})).await;

        assert_eq!(result.source, AnalysisSource::Live);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn provider_error_serves_fallback_and_caches_it() {
        let (gateway, store) = gateway(Arc::new(FailingProvider));

        let result = gateway.analyze("p", &json!({})).await;
        assert_eq!(result.source, AnalysisSource::Fallback);
        assert_eq!(result.risk_level, RiskLevel::Moderate);
        assert_eq!(store.len(), 1);

        let again = gateway.analyze("p", &json!({})).await;
        assert_eq!(again.source, AnalysisSource::Cache);
    }

    #[tokio::test(start_paused = true)]
    async fn provider_timeout_serves_fallback() {
        let (gateway, _) = gateway(Arc::new(HangingProvider));
        let result = gateway.analyze("p", &json!({})).await;
        assert_eq!(result.source, AnalysisSource::Fallback);
    }

    #[tokio::test]
    async fn no_provider_serves_fallback() {
        let gateway = AnalysisGateway::new("ns", TTL, TIMEOUT);
        let result = gateway.analyze("p", &json!({})).await;
        assert_eq!(result.source, AnalysisSource::Fallback);
    }

    #[tokio::test]
    async fn broken_store_degrades_to_no_cache() {
        let provider = Arc::new(CountingProvider::default());
        let gateway = AnalysisGateway::new("ns", TTL, TIMEOUT)
            .with_store(Arc::new(BrokenStore))
            .with_provider(provider.clone());

        assert_eq!(gateway.analyze("p", &json!({})).await.source, AnalysisSource::Live);
        assert_eq!(gateway.analyze("p", &json!({})).await.source, AnalysisSource::Live);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);

        let status = gateway.cache_status().await;
        assert_eq!(status.status, CacheConnectivity::Unavailable);
        assert_eq!(status.backend, "broken");
        assert!(status.detail.unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn failing_ping_reports_error() {
        let gateway = AnalysisGateway::new("ns", TTL, TIMEOUT).with_store(Arc::new(ErroringStore));

        assert_eq!(
            gateway.cache_state().await,
            CacheState::Error("cache operation failed: WRONGTYPE".into())
        );
        let status = gateway.cache_status().await;
        assert_eq!(status.status, CacheConnectivity::Error);
        assert_eq!(status.detail.as_deref(), Some("cache operation failed: WRONGTYPE"));
    }

    #[tokio::test]
    async fn unreadable_cached_value_is_a_miss() {
        let provider = Arc::new(CountingProvider::default());
        let (gateway, store) = gateway(provider.clone());
        let key = gateway.cache_key("p", &json!({}));
        store.set_ex(&key, "not json".into(), TTL).await.unwrap();

        let result = gateway.analyze("p", &json!({})).await;
        assert_eq!(result.source, AnalysisSource::Live);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cache_status_reports_backend() {
        let (gateway, _) = gateway(Arc::new(FailingProvider));
        let status = gateway.cache_status().await;
        assert_eq!(status.status, CacheConnectivity::Connected);
        assert_eq!(status.backend, "memory");
        assert_eq!(status.detail, None);

        let disabled = AnalysisGateway::new("ns", TTL, TIMEOUT).cache_status().await;
        assert_eq!(disabled.status, CacheConnectivity::Unavailable);
        assert_eq!(disabled.backend, "disabled");
    }

    #[test]
    fn from_config_respects_backend() {
        let cfg = CoreConfig::new(
            "patients.json".into(),
            crate::NonEmptyText::new("fhirbrush:analyze").unwrap(),
        )
        .with_cache_backend(CacheBackend::Disabled);
        let gateway = AnalysisGateway::from_config(&cfg);
        assert!(gateway.store.is_none());
        assert!(gateway.provider.is_none());
        assert!(gateway.cache_key("p", &json!({})).starts_with("fhirbrush:analyze:"));
    }
}
