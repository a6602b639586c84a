//! Server configuration

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Upstream provider settings
    pub upstream: UpstreamConfig,

    /// Resumable delivery settings
    #[serde(default)]
    pub resumable: ResumableConfig,

    /// Pricing catalog time-to-live in seconds
    #[serde(default = "default_catalog_ttl_secs")]
    pub catalog_ttl_secs: u64,

    /// Static bearer tokens accepted by the relay
    #[serde(default)]
    pub tokens: Vec<TokenConfig>,
}

/// Upstream provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Provider API base URL
    pub base_url: String,

    /// Bearer key for the provider API
    #[serde(default)]
    pub api_key: String,

    /// Model served to every chat
    #[serde(default = "default_model")]
    pub model: String,

    /// System prompt prepended to every turn
    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Allow plain-http base URLs (development only)
    #[serde(default)]
    pub allow_http: bool,
}

/// Resumable delivery settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumableConfig {
    /// Enable the in-process stream registry
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Broadcast capacity per stream
    #[serde(default = "default_stream_capacity")]
    pub stream_capacity: usize,
}

impl Default for ResumableConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            stream_capacity: default_stream_capacity(),
        }
    }
}

/// One accepted bearer token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    pub token: String,
    pub user_id: String,
    #[serde(default = "default_user_type")]
    pub user_type: chatrelay_session::UserType,
}

impl ServerConfig {
    /// Load configuration from file and CLI overrides
    pub fn load(config_path: &str, cli: &crate::Cli) -> anyhow::Result<Self> {
        // Try to load from file, or use defaults
        let mut config: Self = if Path::new(config_path).exists() {
            let content = std::fs::read_to_string(config_path)?;
            serde_yaml::from_str(&content)?
        } else {
            Self::default()
        };

        // Apply CLI overrides
        if let Some(base_url) = &cli.upstream {
            config.upstream.base_url = base_url.clone();
        }
        if let Some(api_key) = &cli.api_key {
            config.upstream.api_key = api_key.clone();
        }
        if let Some(model) = &cli.model {
            config.upstream.model = model.clone();
        }

        Ok(config)
    }

    /// Validate the upstream base URL scheme
    pub fn validate(&self) -> anyhow::Result<()> {
        let parsed = url::Url::parse(&self.upstream.base_url)?;
        match parsed.scheme() {
            "https" => {}
            "http" if self.upstream.allow_http => {}
            scheme => anyhow::bail!(
                "upstream scheme '{scheme}' not allowed, only https is permitted"
            ),
        }
        if parsed.host_str().is_none() {
            anyhow::bail!("upstream URL must have a host");
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            upstream: UpstreamConfig {
                base_url: "https://api.openai.com/v1".to_string(),
                api_key: String::new(),
                model: default_model(),
                system_prompt: None,
                allow_http: false,
            },
            resumable: ResumableConfig::default(),
            catalog_ttl_secs: default_catalog_ttl_secs(),
            tokens: Vec::new(),
        }
    }
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_catalog_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_stream_capacity() -> usize {
    1024
}

fn default_true() -> bool {
    true
}

fn default_user_type() -> chatrelay_session::UserType {
    chatrelay_session::UserType::Regular
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_validates() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_http_blocked_by_default() {
        let mut config = ServerConfig::default();
        config.upstream.base_url = "http://api.example.com/v1".into();
        assert!(config.validate().is_err());

        config.upstream.allow_http = true;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_roundtrip() {
        let yaml = r#"
upstream:
  base_url: "https://api.openai.com/v1"
  model: "gpt-4o"
resumable:
  enabled: false
tokens:
  - token: "secret"
    user_id: "u1"
    user_type: guest
"#;
        let config: ServerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.upstream.model, "gpt-4o");
        assert!(!config.resumable.enabled);
        assert_eq!(config.tokens.len(), 1);
        assert_eq!(
            config.tokens[0].user_type,
            chatrelay_session::UserType::Guest
        );
    }
}
