//! Orchestrator configuration.
//!
//! Values come from the process environment:
//!
//! | Variable | Values | Default |
//! |---|---|---|
//! | `STARTLIST_CONFIRM_ON_FINALIZE` | `true` / `false` (also `1`/`0`, `yes`/`no`) | `true` |
//! | `STARTLIST_POST_COMMIT_FAILURES` | `propagate` / `log` | `propagate` |
//! | `STARTLIST_METRICS_ADDR` | socket address, e.g. `0.0.0.0:9090` | unset |

use crate::metrics::MetricsServer;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use thiserror::Error;

/// Environment variable toggling version confirmation on finalize.
pub const CONFIRM_ON_FINALIZE_VAR: &str = "STARTLIST_CONFIRM_ON_FINALIZE";

/// Environment variable selecting the post-commit failure mode.
pub const POST_COMMIT_FAILURES_VAR: &str = "STARTLIST_POST_COMMIT_FAILURES";

/// Environment variable holding the metrics listen address.
pub const METRICS_ADDR_VAR: &str = "STARTLIST_METRICS_ADDR";

/// Configuration errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable is set to a value that cannot be parsed.
    #[error("Invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        /// Variable name
        key: String,
        /// Raw value
        value: String,
        /// What was expected
        reason: String,
    },
}

/// What the orchestrator does when publishing or version persistence fails
/// after the unit of work has committed.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostCommitFailureMode {
    /// Return [`CommandError::DeliveryFailed`](crate::CommandError::DeliveryFailed).
    #[default]
    Propagate,
    /// Log the failure and return the snapshot as if delivery succeeded.
    LogAndContinue,
}

impl FromStr for PostCommitFailureMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "propagate" => Ok(Self::Propagate),
            "log" | "log_and_continue" => Ok(Self::LogAndContinue),
            _ => Err("expected `propagate` or `log`".to_string()),
        }
    }
}

impl fmt::Display for PostCommitFailureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Propagate => write!(f, "propagate"),
            Self::LogAndContinue => write!(f, "log"),
        }
    }
}

/// Settings for [`CommandOrchestrator`](crate::CommandOrchestrator).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Record a confirmed version for every finalization.
    pub confirm_on_finalize: bool,
    /// Handling of post-commit delivery failures.
    pub post_commit_failures: PostCommitFailureMode,
    /// Address for the Prometheus metrics endpoint, if any.
    pub metrics_addr: Option<SocketAddr>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            confirm_on_finalize: true,
            post_commit_failures: PostCommitFailureMode::Propagate,
            metrics_addr: None,
        }
    }
}

impl OrchestratorConfig {
    /// Load configuration from the process environment.
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a set variable cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a present value cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(CONFIRM_ON_FINALIZE_VAR) {
            config.confirm_on_finalize = parse_bool(&value)
                .ok_or_else(|| invalid(CONFIRM_ON_FINALIZE_VAR, &value, "expected a boolean"))?;
        }

        if let Some(value) = lookup(POST_COMMIT_FAILURES_VAR) {
            config.post_commit_failures = value
                .parse()
                .map_err(|reason: String| invalid(POST_COMMIT_FAILURES_VAR, &value, &reason))?;
        }

        if let Some(value) = lookup(METRICS_ADDR_VAR) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                config.metrics_addr = Some(trimmed.parse().map_err(|e: std::net::AddrParseError| {
                    invalid(METRICS_ADDR_VAR, &value, &e.to_string())
                })?);
            }
        }

        tracing::debug!(
            confirm_on_finalize = config.confirm_on_finalize,
            post_commit_failures = %config.post_commit_failures,
            metrics_addr = ?config.metrics_addr,
            "Orchestrator configuration loaded"
        );
        Ok(config)
    }

    /// Metrics server for the configured address, if one is set.
    ///
    /// Call [`MetricsServer::start`] inside a Tokio runtime to serve it.
    #[must_use]
    pub fn metrics_server(&self) -> Option<MetricsServer> {
        self.metrics_addr.map(MetricsServer::new)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn invalid(key: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<OrchestratorConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        OrchestratorConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config, OrchestratorConfig::default());
        assert!(config.confirm_on_finalize);
        assert_eq!(config.post_commit_failures, PostCommitFailureMode::Propagate);
        assert!(config.metrics_server().is_none());
    }

    #[test]
    fn reads_every_variable() {
        let config = load(&[
            (CONFIRM_ON_FINALIZE_VAR, "no"),
            (POST_COMMIT_FAILURES_VAR, "LOG"),
            (METRICS_ADDR_VAR, "127.0.0.1:9090"),
        ])
        .unwrap();
        assert!(!config.confirm_on_finalize);
        assert_eq!(config.post_commit_failures, PostCommitFailureMode::LogAndContinue);
        assert_eq!(config.metrics_addr, Some("127.0.0.1:9090".parse().unwrap()));
        assert!(config.metrics_server().is_some());
    }

    #[test]
    fn rejects_bad_boolean() {
        let error = load(&[(CONFIRM_ON_FINALIZE_VAR, "maybe")]).unwrap_err();
        assert!(matches!(
            error,
            ConfigError::InvalidValue { ref key, .. } if key == CONFIRM_ON_FINALIZE_VAR
        ));
    }

    #[test]
    fn rejects_unknown_failure_mode() {
        assert!(load(&[(POST_COMMIT_FAILURES_VAR, "retry")]).is_err());
    }

    #[test]
    fn rejects_bad_address() {
        assert!(load(&[(METRICS_ADDR_VAR, "not-an-address")]).is_err());
    }

    #[test]
    fn blank_address_means_disabled() {
        assert_eq!(load(&[(METRICS_ADDR_VAR, "  ")]).unwrap().metrics_addr, None);
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: OrchestratorConfig =
            serde_json::from_str(r#"{"post_commit_failures":"log_and_continue"}"#).unwrap();
        assert!(config.confirm_on_finalize);
        assert_eq!(config.post_commit_failures, PostCommitFailureMode::LogAndContinue);
    }
}
