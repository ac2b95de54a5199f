//! Configuration for spam-rs
//!
//! Built-in defaults, overridden by an optional TOML file, overridden by
//! `SPAM_`-prefixed environment variables (`SPAM_SERVER__LISTEN_ADDR=...`).

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

use crate::error::{Result, SpamError};

/// Main service configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClassifierConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Artifact locations
    pub artifacts: ArtifactConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Listen address (e.g., "0.0.0.0:5000")
    pub listen_addr: String,
    /// Largest accepted request body, in bytes
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_max_body_bytes() -> usize {
    16 * 1024 * 1024
}

/// Artifact locations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArtifactConfig {
    /// Persisted vectorizer
    pub vectorizer_path: String,
    /// Persisted classifier
    pub model_path: String,
    /// Replacement stopword list (built-in English list when unset)
    #[serde(default)]
    pub stopwords_path: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by RUST_LOG
    pub level: String,
    /// "pretty", "compact" or "json"
    pub format: String,
}

impl ClassifierConfig {
    /// Load configuration, layering an optional TOML file and the environment
    /// over the defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = config::Config::try_from(&Self::default())
            .map_err(|e| SpamError::Config(format!("Invalid defaults: {}", e)))?;

        let mut builder = config::Config::builder().add_source(defaults);
        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(true),
            );
        }
        builder = builder.add_source(
            config::Environment::with_prefix("SPAM")
                .prefix_separator("_")
                .separator("__"),
        );

        let config: Self = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| SpamError::Config(format!("Failed to load config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.server.listen_addr.parse::<SocketAddr>().map_err(|e| {
            SpamError::Config(format!(
                "Invalid listen address '{}': {}",
                self.server.listen_addr, e
            ))
        })?;

        if self.server.max_body_bytes == 0 {
            return Err(SpamError::Config("max_body_bytes must be positive".to_string()));
        }

        if self.artifacts.vectorizer_path.trim().is_empty() {
            return Err(SpamError::Config("vectorizer_path is empty".to_string()));
        }
        if self.artifacts.model_path.trim().is_empty() {
            return Err(SpamError::Config("model_path is empty".to_string()));
        }

        match self.logging.format.as_str() {
            "pretty" | "compact" | "json" => Ok(()),
            other => Err(SpamError::Config(format!(
                "Unknown logging format '{}'",
                other
            ))),
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                listen_addr: "0.0.0.0:5000".to_string(),
                max_body_bytes: default_max_body_bytes(),
            },
            artifacts: ArtifactConfig {
                vectorizer_path: "artifacts/vectorizer.bin".to_string(),
                model_path: "artifacts/model.bin".to_string(),
                stopwords_path: None,
            },
            logging: LoggingConfig {
                level: "spam_rs=info,tower_http=info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}
