mod agent;
mod logging;
mod stream;

pub use agent::*;
pub use logging::*;
pub use stream::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        let base_url = &self.agent.base_url;
        if base_url.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "agent.base_url".into(),
                message: "base_url must not be empty".into(),
            });
        } else if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "agent.base_url".into(),
                message: "base_url must start with http:// or https://".into(),
            });
        }

        for (field, path) in [
            ("agent.stream_path", &self.agent.stream_path),
            ("agent.upload_path", &self.agent.upload_path),
            ("agent.copilot_path", &self.agent.copilot_path),
        ] {
            if !path.starts_with('/') {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: field.into(),
                    message: "path must start with '/'".into(),
                });
            }
        }

        if self.stream.frame_prefix.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "stream.frame_prefix".into(),
                message: "frame prefix must not be empty".into(),
            });
        }

        if self.stream.channel_capacity == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "stream.channel_capacity".into(),
                message: "channel capacity must be greater than 0".into(),
            });
        }

        if self.stream.idle_timeout_ms == Some(0) {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "stream.idle_timeout_ms".into(),
                message: "idle timeout must be greater than 0 (omit it to disable)".into(),
            });
        }

        if self.stream.failure_notice.trim().is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "stream.failure_notice".into(),
                message: "failed turns will show no explanation to the user".into(),
            });
        }

        if base_url.starts_with("http://")
            && !(base_url.contains("127.0.0.1") || base_url.contains("localhost"))
        {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "agent.base_url".into(),
                message: "datasets will be uploaded over plain HTTP to a non-local host".into(),
            });
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_error(issues: &[ConfigError], field: &str) -> bool {
        issues
            .iter()
            .any(|e| e.field == field && e.severity == ConfigSeverity::Error)
    }

    #[test]
    fn default_config_is_valid() {
        let issues = Config::default().validate();
        assert!(issues.is_empty(), "unexpected issues: {issues:?}");
    }

    #[test]
    fn empty_base_url_is_error() {
        let mut cfg = Config::default();
        cfg.agent.base_url.clear();
        assert!(has_error(&cfg.validate(), "agent.base_url"));
    }

    #[test]
    fn base_url_without_scheme_is_error() {
        let mut cfg = Config::default();
        cfg.agent.base_url = "agent.local:5000".into();
        assert!(has_error(&cfg.validate(), "agent.base_url"));
    }

    #[test]
    fn relative_path_is_error() {
        let mut cfg = Config::default();
        cfg.agent.upload_path = "api/agent/upload".into();
        assert!(has_error(&cfg.validate(), "agent.upload_path"));
    }

    #[test]
    fn zero_capacity_and_timeout_are_errors() {
        let mut cfg = Config::default();
        cfg.stream.channel_capacity = 0;
        cfg.stream.idle_timeout_ms = Some(0);
        let issues = cfg.validate();
        assert!(has_error(&issues, "stream.channel_capacity"));
        assert!(has_error(&issues, "stream.idle_timeout_ms"));
    }

    #[test]
    fn plain_http_remote_host_warns() {
        let mut cfg = Config::default();
        cfg.agent.base_url = "http://analysis.example.org".into();
        let issues = cfg.validate();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, ConfigSeverity::Warning);
    }

    #[test]
    fn display_includes_tag_and_field() {
        let issue = ConfigError {
            severity: ConfigSeverity::Warning,
            field: "stream.failure_notice".into(),
            message: "empty".into(),
        };
        assert_eq!(issue.to_string(), "[WARN] stream.failure_notice: empty");
    }
}
