//! Configuration for the Gemini client, retries and the creations store

use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

pub const DEFAULT_GEMINI_MODEL: &str
  = "gemini-2.5-flash-preview-05-20";
pub const DEFAULT_GEMINI_API_BASE: &str
  = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini API configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig
{   /// API key, passed explicitly to the client
    pub api_key: Option<String>
  , /// Model name
    pub model: String
  , /// API base URL
    pub api_base: String
  , /// Request timeout in seconds
    pub timeout_secs: u64
  , /// Sampling temperature, unless a Pal overrides it
    pub temperature: f32
  , /// Output token limit
    pub max_output_tokens: u32
}

impl Default for GeminiConfig
{   fn default() -> Self
    {   GeminiConfig
        {   api_key: None
          , model: DEFAULT_GEMINI_MODEL.to_string()
          , api_base: DEFAULT_GEMINI_API_BASE.to_string()
          , timeout_secs: 60
          , temperature: 0.7
          , max_output_tokens: 2048
        }
    }
}

/// Retry configuration for remote requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig
{   /// Extra attempts after the first one
    pub max_retries: usize
  , /// Backoff multiplier for retries
    pub backoff_multiplier: f32
  , /// Initial backoff duration in milliseconds
    pub initial_backoff_ms: u64
}

impl Default for RetryConfig
{   fn default() -> Self
    {   RetryConfig
        {   max_retries: 2
          , backoff_multiplier: 2.0
          , initial_backoff_ms: 250
        }
    }
}

/// Local creations store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig
{   /// JSON file holding saved creations
    pub path: PathBuf
}

impl Default for StoreConfig
{   fn default() -> Self
    {   StoreConfig
        {   path: PathBuf::from("pal_creations.json")
        }
    }
}

/// Pal configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PalConfig
{   pub gemini: GeminiConfig
  , pub retry: RetryConfig
  , pub store: StoreConfig
}

impl PalConfig
{   /// Defaults overridden by `GEMINI_API_KEY`, `PAL_GEMINI_MODEL`
    /// and `PAL_STORE_PATH`
    pub fn from_env() -> Self
    {   let mut config = PalConfig::default();
        if let Ok(key) = std::env::var("GEMINI_API_KEY")
        {   debug!("Using Gemini API key from environment");
            config.gemini.api_key = Some(key);
        }
        if let Ok(model) = std::env::var("PAL_GEMINI_MODEL")
        {   debug!("Using Gemini model from environment: {}", model);
            config.gemini.model = model;
        }
        if let Ok(path) = std::env::var("PAL_STORE_PATH")
        {   config.store.path = PathBuf::from(path);
        }
        config
    }

    /// Load from a JSON file; missing sections fall back to defaults
    pub fn from_file(
      path: impl AsRef<Path>
    ) -> Result<Self, crate::error::Error>
    {   let path = path.as_ref();
        debug!("Loading config from {}", path.display());
        let text = std::fs::read_to_string(path)
          .map_err(|e| {
            crate::error::Error::InvalidConfiguration(
              format!("{}: {}", path.display(), e)
            )
          })?;
        let config: PalConfig = serde_json::from_str(&text)
          .map_err(|e| {
            crate::error::Error::InvalidConfiguration(
              format!("{}: {}", path.display(), e)
            )
          })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the client cannot work with
    pub fn validate(&self) -> Result<(), crate::error::Error>
    {   let invalid = |msg: &str| -> Result<(), crate::error::Error> {
          Err(crate::error::Error::InvalidConfiguration(
            msg.to_string()
          ))
        };
        if self.gemini.model.trim().is_empty()
        {   return invalid("gemini.model is empty");
        }
        if !self.gemini.api_base.starts_with("http")
        {   return invalid("gemini.api_base must be an http(s) URL");
        }
        if self.gemini.timeout_secs == 0
        {   return invalid("gemini.timeout_secs must be positive");
        }
        if self.gemini.max_output_tokens == 0
        {   return invalid("gemini.max_output_tokens must be positive");
        }
        if self.retry.backoff_multiplier < 1.0
        {   return invalid("retry.backoff_multiplier must be >= 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests
{   use super::*;

    #[test]
    fn partial_json_uses_defaults()
    {   let config: PalConfig = serde_json::from_str(
          r#"{"gemini": {"model": "gemini-2.0-flash"}}"#
        ).unwrap();
        assert_eq!(config.gemini.model, "gemini-2.0-flash");
        assert_eq!(config.gemini.max_output_tokens, 2048);
        assert_eq!(config.retry, RetryConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_bad_values()
    {   let mut config = PalConfig::default();
        config.gemini.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = PalConfig::default();
        config.gemini.api_base = "ftp://example".to_string();
        assert!(config.validate().is_err());
    }
}
