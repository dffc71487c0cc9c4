//! Server configuration file
//!
//! One TOML file carries both the pipeline settings (top level, `[cache]`,
//! `[llm]`) and a `[server]` table.

use rrr_core::{ConfigError, PipelineConfig};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

/// Default listen address
pub const DEFAULT_BIND: &str = "127.0.0.1:8000";

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address
    pub bind: SocketAddr,
    /// Largest accepted request body in bytes
    pub max_body_bytes: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8000)),
            max_body_bytes: 16 * 1024,
        }
    }
}

impl ServerConfig {
    /// With listen address
    #[inline]
    #[must_use]
    pub fn with_bind(mut self, bind: SocketAddr) -> Self {
        self.bind = bind;
        self
    }
}

/// Everything the binary reads from its config file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Listener
    #[serde(default)]
    pub server: ServerConfig,
    /// Pipeline, cache and LLM settings
    #[serde(flatten)]
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    /// Parse from TOML text
    ///
    /// # Errors
    /// Returns an error if the text is not valid TOML or fails validation.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.pipeline.validate()?;
        Ok(config)
    }

    /// Load `path` if given, defaults otherwise, then apply `RRR_LLM_*`
    /// environment overrides
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_toml_str(&text)?
            }
            None => Self::default(),
        };
        config.pipeline = config.pipeline.with_env();
        Ok(config)
    }
}
