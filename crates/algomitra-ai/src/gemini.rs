use std::sync::Arc;

use algomitra_types::api::GeneratedProblem;
use algomitra_types::models::{Difficulty, TestCase};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::normalize;
use crate::prompts;
use crate::retry::{Backoff, Retryable, retry_with_backoff};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-preview-09-2025";

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("generative API key is not configured")]
    NotConfigured,

    #[error("rate limited by upstream (429)")]
    RateLimited,

    #[error("upstream returned {0}")]
    Upstream(StatusCode),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed upstream response: {0}")]
    Malformed(String),
}

impl Retryable for GenerationError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited)
    }
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub backoff: Backoff,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            model: DEFAULT_MODEL.into(),
            api_key: None,
            backoff: Backoff::default(),
        }
    }
}

/// Client for the `generateContent` endpoint with structured JSON output.
/// Cheap to clone; build one at startup and hand it to the request state.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    config: Arc<GeminiConfig>,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        Self::with_http(reqwest::Client::new(), config)
    }

    pub fn with_http(http: reqwest::Client, config: GeminiConfig) -> Self {
        Self {
            http,
            config: Arc::new(config),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.config.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    /// Draft a whole problem from a free-text request.
    pub async fn generate_problem(
        &self,
        prompt: &str,
        difficulty: Option<Difficulty>,
    ) -> Result<GeneratedProblem, GenerationError> {
        let value = self
            .generate_json(
                prompts::PROBLEM_SYSTEM_PROMPT,
                &prompts::problem_prompt(prompt, difficulty),
                prompts::problem_schema(),
            )
            .await?;
        let problem = normalize::parse_problem(value)?;
        info!(
            "Generated problem '{}' with {} test cases",
            problem.title,
            problem.test_cases.len()
        );
        Ok(problem)
    }

    /// Produce extra hidden cases for an existing problem, never repeating
    /// the inputs in `existing`.
    pub async fn generate_test_cases(
        &self,
        description: &str,
        existing: &[TestCase],
    ) -> Result<Vec<TestCase>, GenerationError> {
        let value = self
            .generate_json(
                prompts::TEST_CASES_SYSTEM_PROMPT,
                &prompts::test_cases_prompt(description, existing),
                prompts::test_cases_schema(),
            )
            .await?;
        let cases = normalize::parse_test_cases(value, existing)?;
        info!("Generated {} supplementary test cases", cases.len());
        Ok(cases)
    }

    async fn generate_json(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        schema: Value,
    ) -> Result<Value, GenerationError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(GenerationError::NotConfigured)?;

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        );
        let payload = json!({
            "contents": [{ "parts": [{ "text": user_prompt }] }],
            "systemInstruction": { "parts": [{ "text": system_prompt }] },
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": schema,
            }
        });

        retry_with_backoff(self.config.backoff, |attempt| {
            debug!("generateContent attempt {}", attempt);
            let request = self
                .http
                .post(&url)
                .query(&[("key", api_key)])
                .json(&payload);
            async move {
                let response = request.send().await?;
                let status = response.status();
                if status == StatusCode::TOO_MANY_REQUESTS {
                    return Err(GenerationError::RateLimited);
                }
                if !status.is_success() {
                    return Err(GenerationError::Upstream(status));
                }
                let body = response.text().await?;
                extract_json(&body)
            }
        })
        .await
    }
}

/// Pull the first candidate's text out of a `generateContent` body and
/// parse it as JSON.
fn extract_json(body: &str) -> Result<Value, GenerationError> {
    let response: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|e| GenerationError::Malformed(format!("unreadable response body: {}", e)))?;

    let text = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.text)
        .ok_or_else(|| GenerationError::Malformed("no candidate text in response".into()))?;

    serde_json::from_str(&text)
        .map_err(|e| GenerationError::Malformed(format!("candidate text is not JSON: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use axum::{Json, Router, http::Uri};

    struct MockUpstream {
        base_url: String,
        hits: Arc<AtomicUsize>,
        requests: Arc<Mutex<Vec<(String, Value)>>>,
    }

    /// Serve `script` in order, repeating the last entry once it runs out.
    async fn mock_upstream(script: Vec<(StatusCode, String)>) -> MockUpstream {
        let hits = Arc::new(AtomicUsize::new(0));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let script = Arc::new(script);

        let app = Router::new().fallback({
            let hits = hits.clone();
            let requests = requests.clone();
            move |uri: Uri, Json(body): Json<Value>| {
                let hits = hits.clone();
                let requests = requests.clone();
                let script = script.clone();
                async move {
                    requests.lock().unwrap().push((uri.to_string(), body));
                    let n = hits.fetch_add(1, Ordering::SeqCst);
                    script[n.min(script.len() - 1)].clone()
                }
            }
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        MockUpstream {
            base_url: format!("http://{}", addr),
            hits,
            requests,
        }
    }

    fn candidate_body(payload: &Value) -> String {
        json!({
            "candidates": [{ "content": { "parts": [{ "text": payload.to_string() }] } }]
        })
        .to_string()
    }

    fn client_for(base_url: &str) -> GeminiClient {
        GeminiClient::new(GeminiConfig {
            base_url: base_url.to_string(),
            model: "test-model".into(),
            api_key: Some("test-key".into()),
            backoff: Backoff::new(3, Duration::from_millis(1)),
        })
    }

    fn problem_payload() -> Value {
        let cases: Vec<Value> = (0..5)
            .map(|i| json!({ "input": i.to_string(), "output": (i * 2).to_string(), "isSample": i == 0 }))
            .collect();
        json!({
            "title": "Double It",
            "description": "Return twice the input.",
            "difficulty": "Easy",
            "testCases": cases
        })
    }

    #[test]
    fn test_extract_json_reads_first_candidate() {
        let body = candidate_body(&json!({ "ok": true }));
        assert_eq!(extract_json(&body).unwrap(), json!({ "ok": true }));

        assert!(matches!(extract_json("{}"), Err(GenerationError::Malformed(_))));
        assert!(matches!(extract_json("not json"), Err(GenerationError::Malformed(_))));
        let not_json_text = json!({ "candidates": [{ "content": { "parts": [{ "text": "hello" }] } }] });
        assert!(matches!(
            extract_json(&not_json_text.to_string()),
            Err(GenerationError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_generate_problem_sends_structured_request() {
        let mock = mock_upstream(vec![(StatusCode::OK, candidate_body(&problem_payload()))]).await;
        let client = client_for(&mock.base_url);

        let problem = client
            .generate_problem("double a number", Some(Difficulty::Easy))
            .await
            .unwrap();
        assert_eq!(problem.title, "Double It");
        assert_eq!(problem.test_cases.len(), 5);

        let requests = mock.requests.lock().unwrap();
        let (uri, body) = &requests[0];
        assert!(uri.contains("/v1beta/models/test-model:generateContent"));
        assert!(uri.contains("key=test-key"));
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["responseSchema"]["type"], "OBJECT");
        assert!(body["contents"][0]["parts"][0]["text"]
            .as_str()
            .unwrap()
            .contains("Target difficulty: Easy"));
    }

    #[tokio::test]
    async fn test_rate_limits_are_retried() {
        let mock = mock_upstream(vec![
            (StatusCode::TOO_MANY_REQUESTS, String::new()),
            (StatusCode::TOO_MANY_REQUESTS, String::new()),
            (StatusCode::OK, candidate_body(&problem_payload())),
        ])
        .await;

        let problem = client_for(&mock.base_url)
            .generate_problem("double a number", None)
            .await
            .unwrap();
        assert_eq!(problem.difficulty, Difficulty::Easy);
        assert_eq!(mock.hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_persistent_rate_limit_gives_up_after_three_attempts() {
        let mock = mock_upstream(vec![(StatusCode::TOO_MANY_REQUESTS, String::new())]).await;

        let err = client_for(&mock.base_url)
            .generate_problem("anything", None)
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::RateLimited));
        assert_eq!(mock.hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_server_error_is_not_retried() {
        let mock = mock_upstream(vec![(StatusCode::INTERNAL_SERVER_ERROR, "boom".into())]).await;

        let err = client_for(&mock.base_url)
            .generate_test_cases("desc", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Upstream(s) if s == StatusCode::INTERNAL_SERVER_ERROR));
        assert_eq!(mock.hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_generated_test_cases_skip_samples() {
        let existing = vec![TestCase { input: "2".into(), output: "4".into(), is_sample: true }];
        let payload = json!([
            { "input": "2", "output": "4", "isSample": true },
            { "input": "0", "output": "0", "isSample": true },
            { "input": "-3", "output": "-6", "isSample": false }
        ]);
        let mock = mock_upstream(vec![(StatusCode::OK, candidate_body(&payload))]).await;

        let cases = client_for(&mock.base_url)
            .generate_test_cases("Double it", &existing)
            .await
            .unwrap();
        assert_eq!(cases.len(), 2);
        assert!(cases.iter().all(|tc| !tc.is_sample));
        assert!(cases.iter().all(|tc| tc.input != "2"));
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_any_request() {
        let mock = mock_upstream(vec![(StatusCode::OK, candidate_body(&problem_payload()))]).await;
        let client = GeminiClient::new(GeminiConfig {
            base_url: mock.base_url.clone(),
            ..GeminiConfig::default()
        });

        assert!(!client.is_configured());
        let err = client.generate_problem("x", None).await.unwrap_err();
        assert!(matches!(err, GenerationError::NotConfigured));
        assert_eq!(mock.hits.load(Ordering::SeqCst), 0);
    }
}
