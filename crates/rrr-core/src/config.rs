//! Pipeline configuration
//!
//! Loaded from an optional TOML file, then overridden from the environment
//! for endpoints and secrets.

use rrr_cache::CacheConfig;
use rrr_metrics::{END_MARKER, START_MARKER};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding [`LlmConfig::endpoint`]
pub const ENV_LLM_ENDPOINT: &str = "RRR_LLM_ENDPOINT";
/// Environment variable overriding [`LlmConfig::api_key`]
pub const ENV_LLM_API_KEY: &str = "RRR_LLM_API_KEY";
/// Environment variable overriding [`LlmConfig::deployment`]
pub const ENV_LLM_DEPLOYMENT: &str = "RRR_LLM_DEPLOYMENT";
/// Environment variable overriding [`LlmConfig::api_version`]
pub const ENV_LLM_API_VERSION: &str = "RRR_LLM_API_VERSION";

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("cannot read config {}: {source}", path.display())]
    Read {
        /// Config file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// File is not valid TOML for this schema
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Values are inconsistent
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Size of the extraction worker pool
    pub max_workers: usize,
    /// Header that opens the metrics table
    pub start_marker: String,
    /// Header that follows the metrics table
    pub end_marker: String,
    /// Directory charts are written to
    pub visualizations_dir: PathBuf,
    /// URL prefix charts are served under
    pub visualizations_url: String,
    /// Cache settings
    pub cache: CacheConfig,
    /// Language model settings
    pub llm: LlmConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            start_marker: START_MARKER.to_string(),
            end_marker: END_MARKER.to_string(),
            visualizations_dir: PathBuf::from("visualizations"),
            visualizations_url: "/visualizations".to_string(),
            cache: CacheConfig::default(),
            llm: LlmConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from TOML text
    ///
    /// # Errors
    /// Returns an error if the text is not valid TOML or fails validation.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, defaults otherwise, then apply the environment
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_toml_str(&text)?
            }
            None => Self::default(),
        };
        Ok(config.with_env())
    }

    /// Apply `RRR_LLM_*` environment overrides
    #[must_use]
    pub fn with_env(mut self) -> Self {
        self.llm = self.llm.with_overrides(|name| std::env::var(name).ok());
        self
    }

    /// Check value consistency
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_workers == 0 {
            return Err(ConfigError::Invalid("max_workers must be at least 1".into()));
        }
        if self.start_marker.trim().is_empty() || self.end_marker.trim().is_empty() {
            return Err(ConfigError::Invalid("table markers must not be blank".into()));
        }
        if self.start_marker == self.end_marker {
            return Err(ConfigError::Invalid("table markers must differ".into()));
        }
        Ok(())
    }

    /// With worker pool size
    #[inline]
    #[must_use]
    pub fn with_max_workers(mut self, workers: usize) -> Self {
        self.max_workers = workers;
        self
    }

    /// With table markers
    #[inline]
    #[must_use]
    pub fn with_markers(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.start_marker = start.into();
        self.end_marker = end.into();
        self
    }

    /// With chart output directory
    #[inline]
    #[must_use]
    pub fn with_visualizations_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.visualizations_dir = dir.into();
        self
    }

    /// With cache settings
    #[inline]
    #[must_use]
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }
}

/// Chat-completions endpoint settings (Azure OpenAI compatible)
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Service base URL, e.g. `https://example.openai.azure.com`
    pub endpoint: String,
    /// API key; never serialized
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Deployment (model) name
    pub deployment: String,
    /// API version query parameter
    pub api_version: String,
    /// Sampling temperature for structuring and reports
    pub temperature: f32,
    /// Nucleus sampling for structuring and reports
    pub top_p: f32,
    /// Sampling temperature for the judge
    pub judge_temperature: f32,
    /// Response token cap for the judge
    pub judge_max_tokens: u32,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: None,
            deployment: String::new(),
            api_version: "2024-02-15-preview".to_string(),
            temperature: 0.1,
            top_p: 0.9,
            judge_temperature: 0.0,
            judge_max_tokens: 512,
            timeout_secs: 120,
        }
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("deployment", &self.deployment)
            .field("api_version", &self.api_version)
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .finish_non_exhaustive()
    }
}

impl LlmConfig {
    /// Request timeout
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Whether endpoint, deployment and key are all set
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.endpoint.is_empty()
            && !self.deployment.is_empty()
            && self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    /// Override fields from a variable lookup (the process environment in
    /// production)
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = lookup(ENV_LLM_ENDPOINT) {
            self.endpoint = v;
        }
        if let Some(v) = lookup(ENV_LLM_API_KEY) {
            self.api_key = Some(v);
        }
        if let Some(v) = lookup(ENV_LLM_DEPLOYMENT) {
            self.deployment = v;
        }
        if let Some(v) = lookup(ENV_LLM_API_VERSION) {
            self.api_version = v;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_use_report_markers() {
        let config = PipelineConfig::default();
        assert_eq!(config.start_marker, START_MARKER);
        assert_eq!(config.end_marker, END_MARKER);
        assert_eq!(config.cache.ttl_secs, 3 * 24 * 60 * 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn toml_overrides_selected_fields() {
        let config = PipelineConfig::from_toml_str(
            r#"
            max_workers = 2

            [cache]
            ttl_secs = 60

            [llm]
            endpoint = "https://llm.example"
            deployment = "gpt-4o"
            "#,
        )
        .unwrap();
        assert_eq!(config.max_workers, 2);
        assert_eq!(config.cache.ttl_secs, 60);
        assert_eq!(config.cache.hot_capacity, CacheConfig::default().hot_capacity);
        assert_eq!(config.llm.deployment, "gpt-4o");
        assert!((config.llm.top_p - 0.9).abs() < f32::EPSILON);
    }

    #[test]
    fn zero_workers_rejected() {
        let err = PipelineConfig::from_toml_str("max_workers = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn env_overrides_apply() {
        let llm = LlmConfig::default().with_overrides(|name| match name {
            ENV_LLM_ENDPOINT => Some("https://e".into()),
            ENV_LLM_API_KEY => Some("secret".into()),
            ENV_LLM_DEPLOYMENT => Some("dep".into()),
            _ => None,
        });
        assert!(llm.is_configured());
        assert!(!format!("{llm:?}").contains("secret"));
    }
}
