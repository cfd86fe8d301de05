//! Hosted workflow client abstraction
//!
//! The remote workflow service performs all retrieval and generation; this
//! module only builds the request body it expects, issues one blocking POST,
//! and extracts an answer string from whichever response shape comes back.
//!
//! Provides a unified interface with a real HTTP implementation and a mock
//! for testing.

use crate::config::WorkflowConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Who the answer is written for. The remote workflow adjusts register and
/// detail level based on this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    Clinician,
    Patient,
}

impl Audience {
    pub fn as_str(&self) -> &'static str {
        match self {
            Audience::Clinician => "clinician",
            Audience::Patient => "patient",
        }
    }
}

/// A single question to forward upstream
#[derive(Debug, Clone)]
pub struct WorkflowRequest {
    /// Free-text clinical question, guaranteed non-empty by the caller
    pub question: String,

    /// Audience selector
    pub audience: Audience,

    /// Optional structured findings, passed through unmodified. Invalid
    /// JSON is warned about, never blocking.
    pub findings_json: Option<String>,
}

/// Wire body for the workflow-run endpoint. Field names and casing must
/// match the remote service's declared input schema exactly; note the
/// capitalized `Role` key.
#[derive(Debug, Serialize)]
pub struct WorkflowPayload {
    pub inputs: WorkflowInputs,
    pub response_mode: &'static str,
    pub user: String,
}

#[derive(Debug, Serialize)]
pub struct WorkflowInputs {
    pub query: String,
    #[serde(rename = "Role")]
    pub role: Audience,
    pub findings_json: String,
}

/// Build the wire body for one request.
pub fn build_payload(request: &WorkflowRequest, user: &str) -> WorkflowPayload {
    if let Some(findings) = &request.findings_json {
        if !findings.trim().is_empty() && serde_json::from_str::<Value>(findings).is_err() {
            tracing::warn!(
                findings_len = findings.len(),
                "findings_json is not valid JSON, forwarding as-is"
            );
        }
    }

    WorkflowPayload {
        inputs: WorkflowInputs {
            query: request.question.clone(),
            role: request.audience,
            findings_json: request.findings_json.clone().unwrap_or_default(),
        },
        response_mode: "blocking",
        user: user.to_string(),
    }
}

/// Which response field the answer was taken from.
///
/// The hosted service has two response shapes in the wild: the workflow-run
/// envelope nests outputs under `data.outputs`, the chat-messages variant
/// puts `answer` at the top level. Candidates are probed in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerSource {
    OutputsText,
    OutputsAnswer,
    OutputsResult,
    OutputsTextString,
    Answer,
    /// 2xx response whose body was not JSON at all; the raw text is the answer
    RawBody,
}

impl AnswerSource {
    /// JSON path of the matched field
    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerSource::OutputsText => "data.outputs.text",
            AnswerSource::OutputsAnswer => "data.outputs.answer",
            AnswerSource::OutputsResult => "data.outputs.result",
            AnswerSource::OutputsTextString => "data.outputs.textString",
            AnswerSource::Answer => "answer",
            AnswerSource::RawBody => "raw_body",
        }
    }
}

/// Ordered candidate locations for the answer string
const ANSWER_CANDIDATES: &[(&[&str], AnswerSource)] = &[
    (&["data", "outputs", "text"], AnswerSource::OutputsText),
    (&["data", "outputs", "answer"], AnswerSource::OutputsAnswer),
    (&["data", "outputs", "result"], AnswerSource::OutputsResult),
    (&["data", "outputs", "textString"], AnswerSource::OutputsTextString),
    (&["answer"], AnswerSource::Answer),
];

/// Probe the candidate locations in priority order; first string value wins.
/// Non-string values at a candidate location are skipped, not coerced.
pub fn extract_answer(body: &Value) -> Option<(String, AnswerSource)> {
    for (path, source) in ANSWER_CANDIDATES {
        let mut node = body;
        let mut found = true;
        for key in *path {
            match node.get(key) {
                Some(next) => node = next,
                None => {
                    found = false;
                    break;
                }
            }
        }
        if found {
            if let Some(text) = node.as_str() {
                return Some((text.to_string(), *source));
            }
        }
    }
    None
}

/// Outcome of one forwarded request. A response that parses but matches no
/// known answer field is surfaced whole, never failed silently.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowOutcome {
    Answer { text: String, source: AnswerSource },
    ShapeMismatch { raw: Value },
}

/// Interpret one upstream response by status and body. Non-2xx surfaces the
/// status and body verbatim; a 2xx body that is not JSON at all is treated
/// as the answer text itself.
pub fn interpret_response(status: u16, body: String) -> Result<WorkflowOutcome> {
    if !(200..300).contains(&status) {
        return Err(AppError::UpstreamStatus { status, body });
    }

    match serde_json::from_str::<Value>(&body) {
        Ok(raw) => match extract_answer(&raw) {
            Some((text, source)) => Ok(WorkflowOutcome::Answer { text, source }),
            None => Ok(WorkflowOutcome::ShapeMismatch { raw }),
        },
        Err(_) => Ok(WorkflowOutcome::Answer {
            text: body,
            source: AnswerSource::RawBody,
        }),
    }
}

/// Map a failed send to the error taxonomy: timeouts are reported with the
/// configured bound, everything else with the transport message verbatim.
pub fn transport_error(is_timeout: bool, message: String, timeout_secs: u64) -> AppError {
    if is_timeout {
        AppError::UpstreamTimeout { timeout_secs }
    } else {
        AppError::Upstream { message }
    }
}

/// Trait for the upstream workflow call
#[async_trait]
pub trait WorkflowClient: Send + Sync {
    /// Forward one question and extract the answer. One POST, bounded
    /// timeout, no retry; every failure is terminal for this invocation.
    async fn ask(&self, request: &WorkflowRequest) -> Result<WorkflowOutcome>;

    /// The configured upstream endpoint, for readiness reporting
    fn endpoint(&self) -> &str;
}

/// Real workflow client over HTTP
pub struct HttpWorkflowClient {
    client: reqwest::Client,
    config: WorkflowConfig,
}

impl HttpWorkflowClient {
    /// Create the client. Rejects a missing or malformed credential up
    /// front so no request can ever be issued with one.
    pub fn new(config: WorkflowConfig) -> Result<Self> {
        config.validate_credential()?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl WorkflowClient for HttpWorkflowClient {
    async fn ask(&self, request: &WorkflowRequest) -> Result<WorkflowOutcome> {
        let payload = build_payload(request, &self.config.user);

        tracing::debug!(
            endpoint = %self.config.url,
            audience = request.audience.as_str(),
            question_len = request.question.len(),
            "Forwarding question to workflow service"
        );

        let response = self
            .client
            .post(&self.config.url)
            .bearer_auth(&self.config.api_key)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| transport_error(e.is_timeout(), e.to_string(), self.config.timeout_secs))?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| AppError::Upstream {
            message: format!("failed to read response body: {}", e),
        })?;

        interpret_response(status, body)
    }

    fn endpoint(&self) -> &str {
        &self.config.url
    }
}

/// Mock workflow client for testing. Replays a canned upstream body through
/// the same extraction path the real client uses, and counts calls so tests
/// can assert that no request was issued.
pub struct MockWorkflowClient {
    body: Value,
    status: u16,
    calls: AtomicUsize,
}

impl MockWorkflowClient {
    /// Mock a 200 response with the given body
    pub fn new(body: Value) -> Self {
        Self::with_status(200, body)
    }

    /// Mock a response with an explicit status code
    pub fn with_status(status: u16, body: Value) -> Self {
        Self {
            body,
            status,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of requests this mock has received
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WorkflowClient for MockWorkflowClient {
    async fn ask(&self, _request: &WorkflowRequest) -> Result<WorkflowOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        interpret_response(self.status, self.body.to_string())
    }

    fn endpoint(&self) -> &str {
        "mock://workflow"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(question: &str) -> WorkflowRequest {
        WorkflowRequest {
            question: question.to_string(),
            audience: Audience::Clinician,
            findings_json: None,
        }
    }

    #[test]
    fn test_payload_carries_question_verbatim() {
        let question = "Is metformin contraindicated in CKD stage 4?";
        let payload = build_payload(&request(question), "clinbridge");
        let wire = serde_json::to_value(&payload).unwrap();

        assert_eq!(wire["inputs"]["query"], question);
        assert_eq!(wire["inputs"]["Role"], "clinician");
        assert_eq!(wire["inputs"]["findings_json"], "");
        assert_eq!(wire["response_mode"], "blocking");
        assert_eq!(wire["user"], "clinbridge");
    }

    #[test]
    fn test_payload_forwards_findings_unmodified() {
        let mut req = request("q");
        req.findings_json = Some(r#"{"hba1c": 8.1}"#.to_string());
        let wire = serde_json::to_value(build_payload(&req, "u")).unwrap();
        assert_eq!(wire["inputs"]["findings_json"], r#"{"hba1c": 8.1}"#);
    }

    #[test]
    fn test_invalid_findings_warn_but_pass_through() {
        let mut req = request("q");
        req.findings_json = Some("not json at all".to_string());
        let wire = serde_json::to_value(build_payload(&req, "u")).unwrap();
        assert_eq!(wire["inputs"]["findings_json"], "not json at all");
    }

    #[test]
    fn test_audience_wire_casing() {
        assert_eq!(serde_json::to_value(Audience::Patient).unwrap(), "patient");
        let parsed: Audience = serde_json::from_str(r#""clinician""#).unwrap();
        assert_eq!(parsed, Audience::Clinician);
    }

    #[test]
    fn test_extract_top_level_answer() {
        let (text, source) = extract_answer(&json!({"answer": "X"})).unwrap();
        assert_eq!(text, "X");
        assert_eq!(source, AnswerSource::Answer);
    }

    #[test]
    fn test_extract_falls_back_to_text_string() {
        let body = json!({"data": {"outputs": {"textString": "Y"}}});
        let (text, source) = extract_answer(&body).unwrap();
        assert_eq!(text, "Y");
        assert_eq!(source, AnswerSource::OutputsTextString);
    }

    #[test]
    fn test_extract_priority_order() {
        let body = json!({
            "answer": "last",
            "data": {"outputs": {"text": "first", "result": "middle"}}
        });
        let (text, source) = extract_answer(&body).unwrap();
        assert_eq!(text, "first");
        assert_eq!(source, AnswerSource::OutputsText);
    }

    #[test]
    fn test_extract_skips_non_string_candidates() {
        let body = json!({
            "data": {"outputs": {"text": 42}},
            "answer": "fallback"
        });
        let (text, source) = extract_answer(&body).unwrap();
        assert_eq!(text, "fallback");
        assert_eq!(source, AnswerSource::Answer);
    }

    #[test]
    fn test_interpret_non_json_body_as_raw_answer() {
        let body = "The workflow replied in plain text.".to_string();
        let outcome = interpret_response(200, body.clone()).unwrap();
        assert_eq!(
            outcome,
            WorkflowOutcome::Answer {
                text: body,
                source: AnswerSource::RawBody,
            }
        );
    }

    #[test]
    fn test_interpret_non_2xx_surfaces_status_and_body() {
        let err = interpret_response(503, "upstream overloaded".to_string()).unwrap_err();
        match err {
            AppError::UpstreamStatus { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "upstream overloaded");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_interpret_2xx_json_without_answer_is_mismatch() {
        let outcome = interpret_response(200, r#"{"data":{"status":"running"}}"#.to_string())
            .unwrap();
        assert!(matches!(outcome, WorkflowOutcome::ShapeMismatch { .. }));
    }

    #[test]
    fn test_transport_timeout_maps_to_upstream_timeout() {
        let err = transport_error(true, "operation timed out".to_string(), 90);
        match err {
            AppError::UpstreamTimeout { timeout_secs } => assert_eq!(timeout_secs, 90),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_transport_failure_keeps_message_verbatim() {
        let err = transport_error(false, "connection refused".to_string(), 90);
        match err {
            AppError::Upstream { message } => assert_eq!(message, "connection refused"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_extract_none_on_unknown_shape() {
        assert!(extract_answer(&json!({"data": {"status": "running"}})).is_none());
    }

    #[tokio::test]
    async fn test_mock_answer() {
        let client = MockWorkflowClient::new(json!({"answer": "X"}));
        let outcome = client.ask(&request("q")).await.unwrap();
        assert_eq!(
            outcome,
            WorkflowOutcome::Answer {
                text: "X".to_string(),
                source: AnswerSource::Answer,
            }
        );
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_non_2xx_surfaces_status_and_body() {
        let client = MockWorkflowClient::with_status(404, json!({"code": "not_found"}));
        let err = client.ask(&request("q")).await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("404"));
        assert!(message.contains(r#"{"code":"not_found"}"#));
    }

    #[tokio::test]
    async fn test_mock_shape_mismatch_surfaces_raw_body() {
        let raw = json!({"data": {"outputs": {"unexpected": true}}});
        let client = MockWorkflowClient::new(raw.clone());
        let outcome = client.ask(&request("q")).await.unwrap();
        assert_eq!(outcome, WorkflowOutcome::ShapeMismatch { raw });
    }

    #[test]
    fn test_http_client_rejects_malformed_credential() {
        let config = WorkflowConfig {
            url: "https://api.example.com/v1/workflows/run".to_string(),
            api_key: "sk-wrong-issuer".to_string(),
            timeout_secs: 90,
            user: "clinbridge".to_string(),
        };
        assert!(HttpWorkflowClient::new(config).is_err());
    }

    #[test]
    fn test_http_client_accepts_valid_credential() {
        let config = WorkflowConfig {
            url: "https://api.example.com/v1/workflows/run".to_string(),
            api_key: "app-secret".to_string(),
            timeout_secs: 90,
            user: "clinbridge".to_string(),
        };
        assert!(HttpWorkflowClient::new(config).is_ok());
    }
}
