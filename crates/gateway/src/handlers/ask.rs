//! Ask handler
//!
//! Validates one submission, forwards it upstream once, and returns either
//! the extracted answer or the full raw payload when no known answer field
//! matched. Nothing is retried and nothing is stored.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;
use validator::Validate;

use crate::AppState;
use clinbridge_common::{
    errors::{AppError, Result},
    metrics,
    workflow::{Audience, WorkflowOutcome, WorkflowRequest},
};

/// Ask request
#[derive(Debug, Deserialize, Validate)]
pub struct AskRequest {
    #[validate(length(min = 1, max = 4000))]
    pub question: String,

    pub audience: Audience,

    /// Optional structured findings, forwarded as-is
    #[serde(default)]
    pub findings_json: Option<String>,
}

/// Ask response. Exactly one of `answer` and `raw` is present: `raw` carries
/// the full upstream payload when no recognized answer field matched.
#[derive(Debug, Serialize)]
pub struct AskResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,

    /// Which response field the answer came from, or "none" on shape mismatch
    pub source: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,

    pub elapsed_ms: u64,
}

/// Forward one question to the workflow service
pub async fn ask(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>> {
    let start = Instant::now();

    request.validate().map_err(|e| {
        metrics::record_rejection("question");
        AppError::Validation {
            message: e.to_string(),
            field: None,
        }
    })?;

    // A whitespace-only question passes the length bound but must never
    // reach the network.
    if request.question.trim().is_empty() {
        metrics::record_rejection("question");
        return Err(AppError::Validation {
            message: "question must not be empty or whitespace".to_string(),
            field: Some("question".to_string()),
        });
    }

    let upstream = WorkflowRequest {
        question: request.question,
        audience: request.audience,
        findings_json: request.findings_json,
    };

    let outcome = match state.workflow.ask(&upstream).await {
        Ok(outcome) => outcome,
        Err(e) => {
            metrics::record_upstream_error(&format!("{:?}", e.code()));
            return Err(e);
        }
    };

    let elapsed_ms = start.elapsed().as_millis() as u64;
    let elapsed_secs = elapsed_ms as f64 / 1000.0;

    let response = match outcome {
        WorkflowOutcome::Answer { text, source } => {
            metrics::record_ask(elapsed_secs, source.as_str());
            tracing::info!(
                audience = upstream.audience.as_str(),
                source = source.as_str(),
                answer_len = text.len(),
                latency_ms = elapsed_ms,
                "Answer extracted"
            );
            AskResponse {
                answer: Some(text),
                source: source.as_str().to_string(),
                raw: None,
                elapsed_ms,
            }
        }
        WorkflowOutcome::ShapeMismatch { raw } => {
            metrics::record_ask(elapsed_secs, "none");
            tracing::warn!(
                audience = upstream.audience.as_str(),
                latency_ms = elapsed_ms,
                "No recognized answer field, surfacing raw payload"
            );
            AskResponse {
                answer: None,
                source: "none".to_string(),
                raw: Some(raw),
                elapsed_ms,
            }
        }
    };

    Ok(Json(response))
}
