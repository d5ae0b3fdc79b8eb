use crate::core::ConfigurationError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_LIMIT: usize = 4;
pub const DEFAULT_MAX_LIMIT: usize = DEFAULT_LIMIT * 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub limit: LimitValue,

    #[serde(default = "default_max_limit")]
    pub max_limit: usize,

    #[serde(default)]
    pub diagnostics: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_reference: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity_threshold: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub swc_blacklist: Vec<String>,

    #[serde(default = "default_client_tool_name")]
    pub client_tool_name: String,

    #[serde(default)]
    pub poll: PollSettings,
}

/// The concurrency limit exactly as the user wrote it.
///
/// Kept raw until dispatch so a value like `"test"` is reported back
/// verbatim instead of failing config parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LimitValue {
    Number(f64),
    Text(String),
}

impl Default for LimitValue {
    fn default() -> Self {
        Self::Number(DEFAULT_LIMIT as f64)
    }
}

impl fmt::Display for LimitValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<usize> for LimitValue {
    fn from(value: usize) -> Self {
        Self::Number(value as f64)
    }
}

impl From<&str> for LimitValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl LimitValue {
    /// Resolves the ceiling of concurrently running jobs.
    ///
    /// Fractions are truncated. Zero is accepted and treated as one, so a
    /// batch always makes progress.
    pub fn ceiling(&self, max: usize) -> Result<usize, ConfigurationError> {
        let value = match self {
            Self::Number(n) => *n,
            Self::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| ConfigurationError::LimitNotANumber(s.clone()))?,
        };

        if !value.is_finite() {
            return Err(ConfigurationError::LimitNotANumber(self.to_string()));
        }

        if value < 0.0 || value > max as f64 {
            return Err(ConfigurationError::LimitOutOfRange {
                value: self.to_string(),
                max,
            });
        }

        Ok((value as usize).max(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollSettings {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl PollSettings {
    /// A zero interval is raised to one second.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_max_limit() -> usize {
    DEFAULT_MAX_LIMIT
}
fn default_client_tool_name() -> String {
    "truffle".to_string()
}
fn default_interval_secs() -> u64 {
    5
}
fn default_timeout_secs() -> u64 {
    300
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            limit: LimitValue::default(),
            max_limit: default_max_limit(),
            diagnostics: false,
            job_reference: None,
            severity_threshold: None,
            swc_blacklist: Vec::new(),
            client_tool_name: default_client_tool_name(),
            poll: PollSettings::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(limit) = std::env::var("ANALYSIS_LIMIT") {
            config.limit = LimitValue::Text(limit);
        }

        if let Ok(debug) = std::env::var("ANALYSIS_DEBUG") {
            config.diagnostics = matches!(
                debug.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }

        if let Ok(reference) = std::env::var("ANALYSIS_JOB_REFERENCE") {
            if !reference.trim().is_empty() {
                config.job_reference = Some(reference.trim().to_string());
            }
        }

        if let Ok(severity) = std::env::var("ANALYSIS_SEVERITY") {
            config.severity_threshold = Some(severity);
        }

        if let Ok(blacklist) = std::env::var("ANALYSIS_SWC_BLACKLIST") {
            config.swc_blacklist = blacklist
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        if let Ok(tool) = std::env::var("ANALYSIS_CLIENT_TOOL") {
            config.client_tool_name = tool;
        }

        Ok(config)
    }

    pub fn with_limit(mut self, limit: impl Into<LimitValue>) -> Self {
        self.limit = limit.into();
        self
    }

    pub fn with_job_reference(mut self, reference: impl Into<String>) -> Self {
        self.job_reference = Some(reference.into());
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: bool) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn with_poll(mut self, interval_secs: u64, timeout_secs: u64) -> Self {
        self.poll = PollSettings {
            interval_secs,
            timeout_secs,
        };
        self
    }

    pub fn ceiling(&self) -> Result<usize, ConfigurationError> {
        self.limit.ceiling(self.max_limit)
    }

    pub fn save_yaml(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

pub const EXAMPLE_CONFIG: &str = r#"
# Analysis orchestration configuration

# Concurrent submissions in flight (0..=max_limit)
limit: 4
max_limit: 40

# Report every artifact field dropped before submission
diagnostics: false

# Retrieve a finished job instead of analyzing (privileged accounts only)
# job_reference: 3f2a0c1e-...

# Passed through to the report layer
# severity_threshold: warning
# swc_blacklist: [SWC-103, SWC-111]

client_tool_name: truffle

poll:
  interval_secs: 5
  timeout_secs: 300
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.ceiling().unwrap(), 4);
        assert_eq!(config.max_limit, 40);
        assert_eq!(config.poll.timeout(), Duration::from_secs(300));
        assert_eq!(config.client_tool_name, "truffle");
    }

    #[test]
    fn test_zero_poll_interval_raised() {
        let config = EngineConfig::default().with_poll(0, 60);
        assert_eq!(config.poll.interval(), Duration::from_secs(1));
        assert_eq!(config.poll.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_example_config_parses() {
        let config: EngineConfig = serde_yaml::from_str(EXAMPLE_CONFIG).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_non_numeric_limit_rejected() {
        let config = EngineConfig::default().with_limit("test");
        assert_eq!(
            config.ceiling().unwrap_err().to_string(),
            "limit parameter should be a number; got test."
        );
    }

    #[test]
    fn test_limit_above_max_rejected() {
        let config = EngineConfig::default().with_limit(DEFAULT_MAX_LIMIT + 5);
        assert_eq!(
            config.ceiling().unwrap_err().to_string(),
            "limit should be between 0 and 40; got 45."
        );
    }

    #[test]
    fn test_negative_and_infinite_limits() {
        assert!(matches!(
            LimitValue::Number(-1.0).ceiling(40),
            Err(ConfigurationError::LimitOutOfRange { .. })
        ));
        assert!(matches!(
            LimitValue::Number(f64::INFINITY).ceiling(40),
            Err(ConfigurationError::LimitNotANumber(_))
        ));
        assert!(matches!(
            LimitValue::Text("NaN".into()).ceiling(40),
            Err(ConfigurationError::LimitNotANumber(_))
        ));
    }

    #[test]
    fn test_numeric_text_and_edges() {
        assert_eq!(LimitValue::Text(" 7 ".into()).ceiling(40).unwrap(), 7);
        assert_eq!(LimitValue::Number(2.9).ceiling(40).unwrap(), 2);
        assert_eq!(LimitValue::Number(0.0).ceiling(40).unwrap(), 1);
        assert_eq!(LimitValue::Number(40.0).ceiling(40).unwrap(), 40);
    }

    #[test]
    fn test_limit_accepts_string_in_yaml() {
        let config: EngineConfig = serde_yaml::from_str("limit: test").unwrap();
        assert_eq!(config.limit, LimitValue::Text("test".into()));
    }

    #[test]
    fn test_yaml_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analysis.yaml");

        let config = EngineConfig::default()
            .with_limit(8usize)
            .with_job_reference("job-1")
            .with_poll(2, 60);
        config.save_yaml(&path).unwrap();

        let loaded = EngineConfig::from_yaml_file(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
