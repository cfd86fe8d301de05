//! ClinBridge Common Library
//!
//! Shared code for the ClinBridge services including:
//! - Workflow client abstraction and answer extraction
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod config;
pub mod errors;
pub mod metrics;
pub mod workflow;

// Re-export commonly used types
pub use config::AppConfig;
pub use errors::{AppError, Result};
pub use workflow::{AnswerSource, WorkflowClient, WorkflowOutcome, WorkflowRequest};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Required prefix for workflow API credentials. Tokens issued by the hosted
/// workflow service always start with this literal; anything else is a
/// misconfigured secret, not a runtime condition.
pub const CREDENTIAL_PREFIX: &str = "app-";
