//! Configuration management for ClinBridge services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config.toml, config.yaml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::AppError;
use crate::CREDENTIAL_PREFIX;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Upstream workflow service configuration
    #[serde(default)]
    pub workflow: WorkflowConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkflowConfig {
    /// Full URL of the hosted workflow-run endpoint
    #[serde(default)]
    pub url: String,

    /// Bearer credential for the workflow service
    #[serde(default)]
    pub api_key: String,

    /// Upstream request timeout in seconds. Workflow runs are slow; the
    /// hosted service can take over a minute on cold retrieval.
    #[serde(default = "default_workflow_timeout")]
    pub timeout_secs: u64,

    /// Fixed caller identifier sent in the request body
    #[serde(default = "default_workflow_user")]
    pub user: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_workflow_timeout() -> u64 { 90 }
fn default_workflow_user() -> String { "clinbridge".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "clinbridge".to_string() }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Start with defaults
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?

            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__WORKFLOW__URL=https://api.example.com/v1/workflows/run
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            .build()?;

        config.try_deserialize()
    }

    /// Check the loaded configuration is usable. A missing or malformed
    /// credential is a fatal configuration error at startup, never a
    /// runtime condition.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.workflow.url.trim().is_empty() {
            return Err(AppError::Configuration {
                message: "workflow.url is not set".to_string(),
            });
        }
        self.workflow.validate_credential()
    }

    /// Get upstream request timeout as Duration
    pub fn workflow_timeout(&self) -> Duration {
        Duration::from_secs(self.workflow.timeout_secs)
    }
}

impl WorkflowConfig {
    /// Reject absent or malformed bearer credentials. Valid tokens carry a
    /// fixed literal prefix; anything else must never reach the network.
    pub fn validate_credential(&self) -> Result<(), AppError> {
        if self.api_key.is_empty() {
            return Err(AppError::Configuration {
                message: "workflow.api_key is not set".to_string(),
            });
        }
        if !self.api_key.starts_with(CREDENTIAL_PREFIX) {
            return Err(AppError::Configuration {
                message: format!(
                    "workflow.api_key does not start with '{}'",
                    CREDENTIAL_PREFIX
                ),
            });
        }
        Ok(())
    }

    /// Upstream request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            workflow: WorkflowConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: String::new(),
            timeout_secs: default_workflow_timeout(),
            user: default_workflow_user(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            metrics_port: default_metrics_port(),
            service_name: default_service_name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> AppConfig {
        let mut config = AppConfig::default();
        config.workflow.url = "https://api.example.com/v1/workflows/run".to_string();
        config.workflow.api_key = "app-secret".to_string();
        config
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.workflow.timeout_secs, 90);
        assert_eq!(config.workflow.user, "clinbridge");
    }

    #[test]
    fn test_valid_credential() {
        let config = configured();
        assert!(config.validate().is_ok());
        assert_eq!(config.workflow_timeout(), Duration::from_secs(90));
    }

    #[test]
    fn test_missing_credential_is_fatal() {
        let mut config = configured();
        config.workflow.api_key = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_credential_is_fatal() {
        let mut config = configured();
        config.workflow.api_key = "sk-wrong-issuer".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("app-"));
    }

    #[test]
    fn test_missing_url_is_fatal() {
        let mut config = configured();
        config.workflow.url = "  ".to_string();
        assert!(config.validate().is_err());
    }
}
