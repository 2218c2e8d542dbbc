//! Gemini `generateContent` implementation.
//!
//! Sends the instruction text and the base64 audio as inline data in a single
//! JSON request. The API key travels as a query parameter and is never logged.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{parse_retry_hint, AttemptOutcome, EndpointClient, DEFAULT_RETRY_WAIT_SECS};
use crate::transcription::model::ModelId;
use crate::transcription::request::TranscriptionRequest;

/// Public Gemini API root.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const TEMPERATURE: f32 = 0.2;
const MAX_OUTPUT_TOKENS: u32 = 8192;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 2],
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text { text: &'a str },
    Inline { inline_data: InlineData<'a> },
}

#[derive(Debug, Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// HTTP client for the Gemini transcription endpoint.
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    default_wait_secs: u64,
}

impl GeminiClient {
    /// Creates a client against `base_url` (normally [`GEMINI_BASE_URL`]).
    ///
    /// # Errors
    /// - If the underlying HTTP client cannot be built
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        request_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {e}"))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            default_wait_secs: DEFAULT_RETRY_WAIT_SECS,
        })
    }

    /// Overrides the wait used when a 429 carries no retry hint.
    pub fn with_default_wait(mut self, secs: u64) -> Self {
        self.default_wait_secs = secs;
        self
    }

    fn endpoint(&self, model: &ModelId) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }
}

#[async_trait::async_trait]
impl EndpointClient for GeminiClient {
    async fn call(&self, model: &ModelId, request: &TranscriptionRequest) -> AttemptOutcome {
        let body = GenerateRequest {
            contents: [Content {
                parts: [
                    Part::Text {
                        text: request.instruction_text(),
                    },
                    Part::Inline {
                        inline_data: InlineData {
                            mime_type: request.mime_type(),
                            data: request.audio_base64(),
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        };

        let url = self.endpoint(model);
        tracing::debug!(
            "Gemini API Call:\n  URL: {}?key=<redacted>\n  Method: POST\n  Body: {} audio bytes ({}), temperature={}, maxOutputTokens={}",
            url,
            request.audio_len(),
            request.mime_type(),
            TEMPERATURE,
            MAX_OUTPUT_TOKENS
        );

        let response = match self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                let error_msg = if e.is_connect() {
                    "Failed to connect to the Gemini API server. Check your internet connection."
                        .to_string()
                } else if e.is_timeout() {
                    "Request to Gemini timed out. The API server is not responding.".to_string()
                } else {
                    // reqwest errors can embed the URL, which carries the key
                    format!("Gemini network error: {}", e.without_url())
                };
                return AttemptOutcome::HardFailure(error_msg);
            }
        };

        let status = response.status();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                return AttemptOutcome::HardFailure(format!(
                    "Failed to read Gemini response: {}",
                    e.without_url()
                ))
            }
        };

        let outcome = classify_response(status, &text, self.default_wait_secs);
        tracing::debug!(
            "Gemini API Response:\n  Model: {}\n  Status: {}\n  Outcome: {}",
            model,
            status,
            match &outcome {
                AttemptOutcome::Success(t) => format!("success ({} characters)", t.len()),
                AttemptOutcome::RateLimited(secs) => format!("rate limited ({secs}s)"),
                AttemptOutcome::HardFailure(msg) => format!("failure ({msg})"),
            }
        );
        outcome
    }
}

/// Maps an HTTP status and body to an attempt outcome.
fn classify_response(status: StatusCode, body: &str, default_wait_secs: u64) -> AttemptOutcome {
    if status == StatusCode::TOO_MANY_REQUESTS {
        let message = error_message(body).unwrap_or_default();
        return AttemptOutcome::RateLimited(parse_retry_hint(&message, default_wait_secs));
    }

    if !status.is_success() {
        let message = error_message(body)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| format!("API error {}", status.as_u16()));
        return AttemptOutcome::HardFailure(message);
    }

    let parsed: GenerateResponse = match serde_json::from_str(body) {
        Ok(parsed) => parsed,
        Err(e) => {
            return AttemptOutcome::HardFailure(format!("Failed to parse Gemini response: {e}"))
        }
    };

    let transcript = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.text)
        .map(|t| t.trim().to_string())
        .unwrap_or_default();

    if transcript.is_empty() {
        AttemptOutcome::HardFailure("empty response".to_string())
    } else {
        AttemptOutcome::Success(transcript)
    }
}

fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error)
        .and_then(|error| error.message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, Query, State};
    use axum::http::StatusCode as AxumStatus;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[derive(Clone)]
    struct Scripted {
        status: u16,
        body: Value,
        seen: Arc<Mutex<Vec<(String, HashMap<String, String>, Value)>>>,
    }

    async fn handler(
        State(scripted): State<Scripted>,
        Path(model_action): Path<String>,
        Query(query): Query<HashMap<String, String>>,
        Json(body): Json<Value>,
    ) -> (AxumStatus, Json<Value>) {
        scripted
            .seen
            .lock()
            .unwrap()
            .push((model_action, query, body));
        (
            AxumStatus::from_u16(scripted.status).unwrap(),
            Json(scripted.body.clone()),
        )
    }

    async fn serve(scripted: Scripted) -> String {
        let app = Router::new()
            .route("/v1beta/models/:model_action", post(handler))
            .with_state(scripted);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/v1beta")
    }

    fn scripted(status: u16, body: Value) -> Scripted {
        Scripted {
            status,
            body,
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn request() -> TranscriptionRequest {
        TranscriptionRequest::new(b"RIFFdata", "audio/webm;codecs=opus", "clean it up")
    }

    async fn call(scripted: Scripted) -> AttemptOutcome {
        let base = serve(scripted).await;
        let client = GeminiClient::new(base, "test-key", Duration::from_secs(5)).unwrap();
        client.call(&ModelId::from("gemini-2.5-flash-lite"), &request()).await
    }

    #[tokio::test]
    async fn test_success_sends_wire_contract() {
        let server = scripted(
            200,
            json!({"candidates": [{"content": {"parts": [{"text": "  Hello world.\n"}]}}]}),
        );
        let seen = server.seen.clone();

        let outcome = call(server).await;
        assert_eq!(outcome, AttemptOutcome::Success("Hello world.".to_string()));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let (model_action, query, body) = &seen[0];
        assert_eq!(model_action, "gemini-2.5-flash-lite:generateContent");
        assert_eq!(query.get("key").map(String::as_str), Some("test-key"));

        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[0]["text"], "clean it up");
        assert_eq!(parts[1]["inline_data"]["mime_type"], "audio/webm");
        assert_eq!(parts[1]["inline_data"]["data"], request().audio_base64());
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 8192);
        let temperature = body["generationConfig"]["temperature"].as_f64().unwrap();
        assert!((temperature - 0.2).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_rate_limit_with_hint() {
        let outcome = call(scripted(
            429,
            json!({"error": {"code": 429, "message": "Quota exceeded. Please retry in 12.4s."}}),
        ))
        .await;
        assert_eq!(outcome, AttemptOutcome::RateLimited(13));
    }

    #[tokio::test]
    async fn test_rate_limit_without_hint_defaults() {
        let outcome = call(scripted(
            429,
            json!({"error": {"message": "Resource has been exhausted"}}),
        ))
        .await;
        assert_eq!(outcome, AttemptOutcome::RateLimited(60));
    }

    #[tokio::test]
    async fn test_other_status_is_hard_failure() {
        let outcome = call(scripted(
            400,
            json!({"error": {"message": "API key not valid. Please pass a valid API key."}}),
        ))
        .await;
        assert_eq!(
            outcome,
            AttemptOutcome::HardFailure(
                "API key not valid. Please pass a valid API key.".to_string()
            )
        );

        let outcome = call(scripted(503, json!({}))).await;
        assert_eq!(outcome, AttemptOutcome::HardFailure("API error 503".to_string()));
    }

    #[tokio::test]
    async fn test_missing_transcript_is_hard_failure() {
        let outcome = call(scripted(200, json!({"candidates": []}))).await;
        assert_eq!(outcome, AttemptOutcome::HardFailure("empty response".to_string()));

        let outcome = call(scripted(
            200,
            json!({"candidates": [{"content": {"parts": [{"text": "   "}]}}]}),
        ))
        .await;
        assert_eq!(outcome, AttemptOutcome::HardFailure("empty response".to_string()));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_hard_failure() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = GeminiClient::new(
            format!("http://{addr}"),
            "secret-key",
            Duration::from_secs(2),
        )
        .unwrap();
        match client.call(&ModelId::from("m"), &request()).await {
            AttemptOutcome::HardFailure(msg) => assert!(!msg.contains("secret-key")),
            other => panic!("expected hard failure, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_unparsable_rate_limit_body() {
        assert_eq!(
            classify_response(StatusCode::TOO_MANY_REQUESTS, "<html>busy</html>", 60),
            AttemptOutcome::RateLimited(60)
        );
    }
}
