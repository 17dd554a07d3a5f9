//! Engine configuration

use crate::parser::ParseLimits;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Tunables for [`PolicyEngine`](crate::engine::PolicyEngine)
///
/// Every field has a default, so `{}` is a valid config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Entries in the checked-expression cache; 0 disables it
    pub cache_capacity: usize,

    /// Longest condition expression accepted, in characters
    pub max_expression_length: usize,

    /// Deepest nesting accepted in a condition expression
    pub max_nesting_depth: usize,

    /// Default log filter for binaries embedding the engine
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let limits = ParseLimits::default();
        Self {
            cache_capacity: 0,
            max_expression_length: limits.max_length,
            max_nesting_depth: limits.max_depth,
            log_level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse from a file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_expression_length == 0 {
            return Err(ConfigError::Invalid("max_expression_length must be positive".to_string()));
        }
        if self.max_nesting_depth == 0 {
            return Err(ConfigError::Invalid("max_nesting_depth must be positive".to_string()));
        }
        if self.log_level.trim().is_empty() {
            return Err(ConfigError::Invalid("log_level must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn parse_limits(&self) -> ParseLimits {
        ParseLimits {
            max_length: self.max_expression_length,
            max_depth: self.max_nesting_depth,
        }
    }
}
