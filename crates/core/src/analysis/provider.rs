//! Analysis providers.
//!
//! A provider turns a patient id and dashboard snapshot into an [`AnalysisResult`]. The live
//! implementation calls the Anthropic Messages API; [`fallback_result`] is the fixed result
//! returned whenever no provider is configured or the provider fails.

use crate::config::LlmConfig;
use crate::constants::ANTHROPIC_MESSAGES_URL;
use api_shared::{AnalysisResult, AnalysisSource, RiskLevel};
use async_trait::async_trait;
use serde_json::{json, Value};

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("Provider '{0}' unavailable")]
    ProviderUnavailable(String),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for AnalysisError {
    fn from(e: reqwest::Error) -> Self {
        AnalysisError::Http(e.to_string())
    }
}

#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    async fn analyze(&self, patient_id: &str, snapshot: &Value) -> Result<AnalysisResult, AnalysisError>;
    /// Provider name used in logs.
    fn name(&self) -> &str;
}

/// Result served when live analysis is unavailable.
pub fn fallback_result() -> AnalysisResult {
    AnalysisResult {
        highlighted_nodes: Vec::new(),
        edges: Vec::new(),
        cluster: Vec::new(),
        risk_level: RiskLevel::Moderate,
        narrative: "AI analysis is unavailable right now. Review the highlighted labs and \
                    conditions manually."
            .to_string(),
        source: AnalysisSource::Fallback,
    }
}

const MAX_TOKENS: u32 = 1024;
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct ClaudeProvider {
    api_key: String,
    model: String,
    endpoint: String,
    client: reqwest::Client,
}

impl ClaudeProvider {
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            api_key: config.api_key().to_string(),
            model: config.model().to_string(),
            endpoint: ANTHROPIC_MESSAGES_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Point the provider at a different Messages endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn build_prompt(patient_id: &str, snapshot: &Value) -> String {
        format!(
            "You are assisting a clinician reviewing a patient dashboard.\n\
             Patient id: {patient_id}\n\
             Dashboard snapshot (JSON):\n{snapshot}\n\n\
             Reply with exactly one JSON object and nothing else, with these fields:\n\
             \"highlighted_nodes\": array of node ids from the snapshot that need attention,\n\
             \"edges\": array of {{\"source\", \"target\", \"label\"}} objects linking related nodes,\n\
             \"cluster\": array of node ids that belong together,\n\
             \"risk_level\": one of \"low\", \"moderate\", \"high\", \"critical\",\n\
             \"narrative\": two or three sentences summarising the clinical picture."
        )
    }

    /// Extract the reply text of a Messages API response.
    pub fn parse_response(json: &Value) -> Result<String, AnalysisError> {
        json.pointer("/content/0/text")
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .ok_or_else(|| AnalysisError::Parse("Missing content[0].text".to_string()))
    }

    /// Parse reply text into a live result. The text may be wrapped in a Markdown code fence.
    pub fn parse_result(text: &str) -> Result<AnalysisResult, AnalysisError> {
        let mut result: AnalysisResult = serde_json::from_str(strip_code_fence(text))
            .map_err(|e| AnalysisError::Parse(e.to_string()))?;
        result.source = AnalysisSource::Live;
        Ok(result)
    }
}

#[async_trait]
impl AnalysisProvider for ClaudeProvider {
    async fn analyze(&self, patient_id: &str, snapshot: &Value) -> Result<AnalysisResult, AnalysisError> {
        let body = json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "messages": [{"role": "user", "content": Self::build_prompt(patient_id, snapshot)}]
        });

        let resp = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AnalysisError::ProviderUnavailable(format!("claude: {e}")))?
            .error_for_status()?;

        let json: Value = resp.json().await?;
        Self::parse_result(&Self::parse_response(&json)?)
    }

    fn name(&self) -> &str {
        "claude"
    }
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. `json`) on the opening line.
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NonEmptyText;
    use axum::{http::HeaderMap, http::StatusCode, routing::post, Json, Router};
    use tokio::net::TcpListener;

    fn provider() -> ClaudeProvider {
        let model = NonEmptyText::new("claude-3-5-haiku-latest").unwrap();
        ClaudeProvider::new(&LlmConfig::new("sk-test", model))
    }

    #[test]
    fn claude_provider_new() {
        let p = provider();
        assert_eq!(p.name(), "claude");
        assert_eq!(p.model(), "claude-3-5-haiku-latest");
        assert_eq!(p.endpoint, ANTHROPIC_MESSAGES_URL);
    }

    #[test]
    fn parses_messages_response() {
        let raw = json!({"content": [{"type": "text", "text": "  {\"a\": 1}\n"}]});
        assert_eq!(ClaudeProvider::parse_response(&raw).unwrap(), "{\"a\": 1}");
        assert!(ClaudeProvider::parse_response(&json!({"content": []})).is_err());
    }

    #[test]
    fn parses_fenced_result() {
        let text = "```json\n{\"highlighted_nodes\": [\"obs-1\"], \"edges\": [], \"cluster\": [], \
                    \"risk_level\": \"high\", \"narrative\": \"Creatinine rising.\"}\n```";
        let result = ClaudeProvider::parse_result(text).unwrap();
        assert_eq!(result.highlighted_nodes, vec!["obs-1"]);
        assert_eq!(result.risk_level, RiskLevel::High);
        assert_eq!(result.source, AnalysisSource::Live);
    }

    #[test]
    fn rejects_non_json_reply() {
        let err = ClaudeProvider::parse_result("I cannot help with that.").unwrap_err();
        assert!(matches!(err, AnalysisError::Parse(_)));
    }

    #[test]
    fn strips_fences_only_when_present() {
        assert_eq!(strip_code_fence(" {} "), "{}");
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("```json\n{}"), "{}");
    }

    #[test]
    fn prompt_embeds_patient_and_snapshot() {
        let prompt = ClaudeProvider::build_prompt("synth-001", &json!({"view": "graph"}));
        assert!(prompt.contains("synth-001"));
        assert!(prompt.contains("\"view\":\"graph\""));
        assert!(prompt.contains("risk_level"));
    }

    #[test]
    fn fallback_is_moderate_and_tagged() {
        let result = fallback_result();
        assert_eq!(result.risk_level, RiskLevel::Moderate);
        assert_eq!(result.source, AnalysisSource::Fallback);
        assert!(result.highlighted_nodes.is_empty());
        assert!(result.narrative.contains("unavailable"));
    }

    async fn spawn_messages_stub(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://127.0.0.1:{}/v1/messages", addr.port())
    }

    #[tokio::test]
    async fn analyze_calls_messages_endpoint() {
        let router = Router::new().route(
            "/v1/messages",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                if headers.get("x-api-key").and_then(|v| v.to_str().ok()) != Some("sk-test")
                    || headers.get("anthropic-version").and_then(|v| v.to_str().ok())
                        != Some(ANTHROPIC_VERSION)
                    || body["model"] != "claude-3-5-haiku-latest"
                    || !body["messages"][0]["content"]
                        .as_str()
                        .is_some_and(|c| c.contains("synth-001"))
                {
                    return Err(StatusCode::BAD_REQUEST);
                }
                let text = "```json\n{\"highlighted_nodes\": [\"obs-1\"], \"edges\": [], \
                            \"cluster\": [\"obs-1\"], \"risk_level\": \"critical\", \
                            \"narrative\": \"Potassium rising.\"}\n```";
                Ok(Json(json!({"content": [{"type": "text", "text": text}]})))
            }),
        );
        let endpoint = spawn_messages_stub(router).await;

        let result = provider()
            .with_endpoint(endpoint)
            .analyze("synth-001", &json!({"view": "graph"}))
            .await
            .unwrap();
        assert_eq!(result.source, AnalysisSource::Live);
        assert_eq!(result.risk_level, RiskLevel::Critical);
        assert_eq!(result.cluster, vec!["obs-1"]);
        assert_eq!(result.narrative, "Potassium rising.");
    }

    #[tokio::test]
    async fn analyze_reports_error_status() {
        let router = Router::new().route(
            "/v1/messages",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, "rate limited") }),
        );
        let endpoint = spawn_messages_stub(router).await;

        let err = provider()
            .with_endpoint(endpoint)
            .analyze("synth-001", &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Http(ref msg) if msg.contains("429")));
    }
}
