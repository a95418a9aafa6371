//! Configuration management for notion-sync
//!
//! This module handles loading, parsing, and validating application configuration
//! from YAML files and environment variables. Credentials are resolved once at
//! startup and passed explicitly into the client, notifier and dispatcher.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::SyncError;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Notion API configuration
    #[serde(default)]
    pub notion: NotionConfig,

    /// Target database per entity kind
    #[serde(default)]
    pub collections: CollectionConfig,

    /// GitHub back-reference configuration
    #[serde(default)]
    pub github: GitHubConfig,

    /// Retry configuration for Notion calls
    #[serde(default)]
    pub retry: RetryConfig,

    /// OpenTelemetry configuration
    #[serde(default)]
    pub otel: OtelConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileRead(format!("Failed to read config file: {}", e)))?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(yaml);
        serde_yaml::from_str(&expanded)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse YAML: {}", e)))
    }

    /// Load configuration from the environment variables a GitHub workflow exposes
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();

        config.notion.token = non_empty_env("NOTION_TOKEN");
        config.collections.issues = non_empty_env("NOTION_ISSUES_DB_ID");
        config.collections.pull_requests = non_empty_env("NOTION_PRS_DB_ID");
        config.collections.projects = non_empty_env("NOTION_PROJECTS_DB_ID");
        config.collections.discussions = non_empty_env("NOTION_DISCUSSIONS_DB_ID");
        config.github.token = non_empty_env("GITHUB_TOKEN");

        if let Some(level) = non_empty_env("NOTION_SYNC_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Some(format) = non_empty_env("NOTION_SYNC_LOG_FORMAT") {
            config.logging.format = format;
        }
        if let Some(attempts) = non_empty_env("NOTION_SYNC_MAX_ATTEMPTS") {
            config.retry.max_attempts = attempts.parse().map_err(|_| {
                ConfigError::InvalidValue(format!("NOTION_SYNC_MAX_ATTEMPTS={}", attempts))
            })?;
        }
        if let Some(backoff) = non_empty_env("NOTION_SYNC_BACKOFF_SECS") {
            config.retry.backoff_factor_secs = backoff.parse().map_err(|_| {
                ConfigError::InvalidValue(format!("NOTION_SYNC_BACKOFF_SECS={}", backoff))
            })?;
        }

        Ok(config)
    }

    /// Check that every required credential and collection id is present
    ///
    /// All missing values are reported at once, sorted by their environment name.
    pub fn validate(&self) -> Result<(), SyncError> {
        let required = [
            ("NOTION_TOKEN", &self.notion.token),
            ("NOTION_ISSUES_DB_ID", &self.collections.issues),
            ("NOTION_PRS_DB_ID", &self.collections.pull_requests),
            ("NOTION_PROJECTS_DB_ID", &self.collections.projects),
            ("NOTION_DISCUSSIONS_DB_ID", &self.collections.discussions),
        ];

        let mut missing: Vec<String> = required
            .iter()
            .filter(|(_, value)| value.as_deref().map_or(true, |v| v.trim().is_empty()))
            .map(|(name, _)| name.to_string())
            .collect();

        if missing.is_empty() {
            return Ok(());
        }
        missing.sort();
        Err(SyncError::ConfigurationIncomplete(missing))
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Notion API configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotionConfig {
    /// Integration token
    pub token: Option<String>,

    /// API base URL
    #[serde(default = "default_notion_base_url")]
    pub base_url: String,

    /// Value of the `Notion-Version` header
    #[serde(default = "default_notion_version")]
    pub api_version: String,

    /// Property holding the external identifier in every database
    #[serde(default = "default_id_property")]
    pub id_property: String,
}

impl Default for NotionConfig {
    fn default() -> Self {
        Self {
            token: None,
            base_url: default_notion_base_url(),
            api_version: default_notion_version(),
            id_property: default_id_property(),
        }
    }
}

fn default_notion_base_url() -> String {
    "https://api.notion.com/v1/".to_string()
}

fn default_notion_version() -> String {
    "2022-06-28".to_string()
}

fn default_id_property() -> String {
    "GitHub ID".to_string()
}

/// Notion database id per entity kind
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CollectionConfig {
    /// Database receiving issues
    pub issues: Option<String>,

    /// Database receiving pull requests
    pub pull_requests: Option<String>,

    /// Database receiving project entries
    pub projects: Option<String>,

    /// Database receiving discussions
    pub discussions: Option<String>,
}

/// GitHub back-reference configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GitHubConfig {
    /// Token used to list and post comments; absent disables back-references
    pub token: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_github_timeout")]
    pub timeout_secs: u64,

    /// User-Agent sent to the GitHub API
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            timeout_secs: default_github_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_github_timeout() -> u64 {
    15
}

fn default_user_agent() -> String {
    concat!("notion-sync/", env!("CARGO_PKG_VERSION")).to_string()
}

/// Retry configuration for Notion API calls
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryConfig {
    /// Total number of attempts, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base delay in seconds; the delay after attempt `n` is `factor * 2^(n-1)`
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor_secs: f64,

    /// Timeout for each individual HTTP call, in seconds
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,

    /// Whether to scale each delay by a random 50-100% factor
    #[serde(default)]
    pub jitter: bool,
}

impl RetryConfig {
    /// Attempts actually performed; never less than one
    pub fn effective_max_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Backoff factor with negative and non-finite values treated as zero
    pub fn backoff_factor(&self) -> Duration {
        if self.backoff_factor_secs > 0.0 {
            Duration::try_from_secs_f64(self.backoff_factor_secs).unwrap_or(Duration::ZERO)
        } else {
            Duration::ZERO
        }
    }

    /// Per-request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_factor_secs: default_backoff_factor(),
            timeout_secs: default_request_timeout(),
            jitter: false,
        }
    }
}

fn default_max_attempts() -> u32 {
    5
}

fn default_backoff_factor() -> f64 {
    1.0
}

fn default_request_timeout() -> u64 {
    10
}

/// OpenTelemetry configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OtelConfig {
    /// Whether OpenTelemetry is enabled
    #[serde(default)]
    pub enabled: bool,

    /// OTLP endpoint URL
    pub endpoint: Option<String>,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

impl Default for OtelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
            service_name: default_service_name(),
        }
    }
}

fn default_service_name() -> String {
    "notion-sync".to_string()
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: `json` or `pretty`
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

/// Configuration error types
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum ConfigError {
    /// Error reading configuration file
    #[error("Failed to read configuration file: {0}")]
    FileRead(String),

    /// Error parsing configuration
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    /// Invalid configuration value
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Expand environment variables in a string
///
/// Supports `${VAR_NAME}` syntax. Unset variables are left untouched.
fn expand_env_vars(input: &str) -> String {
    let re = regex_lite::Regex::new(r"\$\{([^}]+)\}")
        .expect("Invalid regex pattern for environment variable expansion");

    re.replace_all(input, |caps: &regex_lite::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| caps[0].to_string())
    })
    .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_config() -> Config {
        Config {
            notion: NotionConfig {
                token: Some("secret".to_string()),
                ..Default::default()
            },
            collections: CollectionConfig {
                issues: Some("db-issues".to_string()),
                pull_requests: Some("db-prs".to_string()),
                projects: Some("db-projects".to_string()),
                discussions: Some("db-discussions".to_string()),
            },
            ..Default::default()
        }
    }

    // Test 1: Parse complete configuration from YAML
    #[test]
    fn test_parse_complete_yaml_config() {
        let yaml = r#"
notion:
  token: "secret_abc"
  base_url: "http://localhost:9000/v1/"
  api_version: "2022-06-28"
  id_property: "External ID"

collections:
  issues: "db-issues"
  pull_requests: "db-prs"
  projects: "db-projects"
  discussions: "db-discussions"

github:
  token: "ghp_123"
  timeout_secs: 5

retry:
  max_attempts: 3
  backoff_factor_secs: 0.5
  timeout_secs: 20
  jitter: true

otel:
  enabled: true
  endpoint: "http://localhost:4317"

logging:
  level: "debug"
  format: "pretty"
"#;

        let config = Config::from_yaml(yaml).unwrap();

        assert_eq!(config.notion.token.as_deref(), Some("secret_abc"));
        assert_eq!(config.notion.base_url, "http://localhost:9000/v1/");
        assert_eq!(config.notion.id_property, "External ID");
        assert_eq!(config.collections.issues.as_deref(), Some("db-issues"));
        assert_eq!(config.collections.discussions.as_deref(), Some("db-discussions"));
        assert_eq!(config.github.token.as_deref(), Some("ghp_123"));
        assert_eq!(config.github.timeout_secs, 5);
        assert_eq!(config.retry.max_attempts, 3);
        assert!((config.retry.backoff_factor_secs - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.retry.timeout_secs, 20);
        assert!(config.retry.jitter);
        assert!(config.otel.enabled);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "pretty");
        assert!(config.validate().is_ok());
    }

    // Test 2: Default values are applied for missing fields
    #[test]
    fn test_default_values_applied() {
        let config = Config::from_yaml("{}").unwrap();

        assert_eq!(config.notion.token, None);
        assert_eq!(config.notion.base_url, "https://api.notion.com/v1/");
        assert_eq!(config.notion.api_version, "2022-06-28");
        assert_eq!(config.notion.id_property, "GitHub ID");
        assert_eq!(config.github.token, None);
        assert_eq!(config.github.timeout_secs, 15);
        assert_eq!(config.retry.max_attempts, 5);
        assert!((config.retry.backoff_factor_secs - 1.0).abs() < f64::EPSILON);
        assert_eq!(config.retry.timeout_secs, 10);
        assert!(!config.retry.jitter);
        assert!(!config.otel.enabled);
        assert_eq!(config.otel.service_name, "notion-sync");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "json");
        assert_eq!(config, Config::default());
    }

    // Test 3: Environment variable expansion
    #[test]
    fn test_env_var_expansion() {
        std::env::set_var("TEST_NOTION_SYNC_TOKEN", "expanded_secret");

        let yaml = r#"
notion:
  token: "${TEST_NOTION_SYNC_TOKEN}"
collections:
  issues: "${TEST_NOTION_SYNC_UNSET_VAR}"
"#;

        let config = Config::from_yaml(yaml).unwrap();

        assert_eq!(config.notion.token.as_deref(), Some("expanded_secret"));
        assert_eq!(
            config.collections.issues.as_deref(),
            Some("${TEST_NOTION_SYNC_UNSET_VAR}")
        );

        std::env::remove_var("TEST_NOTION_SYNC_TOKEN");
    }

    // Test 4: Validation reports every missing value, sorted
    #[test]
    fn test_validate_reports_all_missing() {
        let config = Config::default();

        match config.validate() {
            Err(SyncError::ConfigurationIncomplete(missing)) => {
                assert_eq!(
                    missing,
                    vec![
                        "NOTION_DISCUSSIONS_DB_ID",
                        "NOTION_ISSUES_DB_ID",
                        "NOTION_PRS_DB_ID",
                        "NOTION_PROJECTS_DB_ID",
                        "NOTION_TOKEN",
                    ]
                );
            }
            other => panic!("Expected ConfigurationIncomplete, got {:?}", other),
        }
    }

    // Test 5: Blank values count as missing
    #[test]
    fn test_validate_blank_value() {
        let mut config = complete_config();
        config.collections.pull_requests = Some("   ".to_string());

        assert_eq!(
            config.validate(),
            Err(SyncError::ConfigurationIncomplete(vec![
                "NOTION_PRS_DB_ID".to_string()
            ]))
        );
    }

    // Test 6: GitHub token is optional
    #[test]
    fn test_github_token_optional() {
        let config = complete_config();
        assert!(config.github.token.is_none());
        assert!(config.validate().is_ok());
    }

    // Test 7: Retry clamps
    #[test]
    fn test_retry_config_clamps() {
        let config = RetryConfig {
            max_attempts: 0,
            backoff_factor_secs: -3.0,
            timeout_secs: 7,
            jitter: false,
        };

        assert_eq!(config.effective_max_attempts(), 1);
        assert_eq!(config.backoff_factor(), Duration::ZERO);
        assert_eq!(config.request_timeout(), Duration::from_secs(7));
    }

    // Test 8: Parse error for invalid YAML
    #[test]
    fn test_parse_error_invalid_yaml() {
        let yaml = r#"
retry:
  max_attempts: "many"
"#;

        match Config::from_yaml(yaml) {
            Err(ConfigError::Parse(msg)) => assert!(msg.contains("Failed to parse YAML")),
            other => panic!("Expected ConfigError::Parse, got {:?}", other),
        }
    }

    // Test 9: Load from file
    #[test]
    fn test_from_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "notion:\n  token: \"from-file\"").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.notion.token.as_deref(), Some("from-file"));

        let missing = Config::from_file("/nonexistent/notion-sync.yml");
        assert!(matches!(missing, Err(ConfigError::FileRead(_))));
    }

    // Test 10: from_env loads the workflow variables
    #[test]
    fn test_from_env() {
        std::env::set_var("NOTION_TOKEN", "env-token");
        std::env::set_var("NOTION_ISSUES_DB_ID", "env-issues");
        std::env::set_var("NOTION_PRS_DB_ID", "env-prs");
        std::env::set_var("NOTION_PROJECTS_DB_ID", "env-projects");
        std::env::set_var("NOTION_DISCUSSIONS_DB_ID", "env-discussions");
        std::env::set_var("NOTION_SYNC_MAX_ATTEMPTS", "2");

        let config = Config::from_env().unwrap();

        assert_eq!(config.notion.token.as_deref(), Some("env-token"));
        assert_eq!(config.collections.issues.as_deref(), Some("env-issues"));
        assert_eq!(config.collections.pull_requests.as_deref(), Some("env-prs"));
        assert_eq!(config.collections.projects.as_deref(), Some("env-projects"));
        assert_eq!(
            config.collections.discussions.as_deref(),
            Some("env-discussions")
        );
        assert_eq!(config.retry.max_attempts, 2);
        assert!(config.validate().is_ok());

        std::env::remove_var("NOTION_TOKEN");
        std::env::remove_var("NOTION_ISSUES_DB_ID");
        std::env::remove_var("NOTION_PRS_DB_ID");
        std::env::remove_var("NOTION_PROJECTS_DB_ID");
        std::env::remove_var("NOTION_DISCUSSIONS_DB_ID");
        std::env::remove_var("NOTION_SYNC_MAX_ATTEMPTS");
    }
}
