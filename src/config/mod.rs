use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Configuration {
    pub engine: Option<EngineConfig>,
    pub tmdb: Option<TmdbConfig>,
    pub musicbrainz: Option<MusicBrainzConfig>,
    pub webhook: Option<WebhookConfig>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EngineConfig {
    pub workers: Option<usize>,
    #[serde(rename = "queueCapacity")]
    pub queue_capacity: Option<usize>,
    #[serde(rename = "synopsisMaxChars")]
    pub synopsis_max_chars: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TmdbConfig {
    #[serde(rename = "apikey")]
    pub api_key: String,
    #[serde(rename = "baseUrl")]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MusicBrainzConfig {
    #[serde(rename = "baseUrl")]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebhookConfig {
    pub url: String,
    #[serde(rename = "authHeader")]
    pub auth_header: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid webhook url {url:?}: {source}")]
    InvalidWebhookUrl {
        url: String,
        source: url::ParseError,
    },

    #[error("webhook url must be http or https, got {0:?}")]
    UnsupportedScheme(String),

    #[error("tmdb api key is empty")]
    EmptyApiKey,

    #[error("{0} must be at least 1")]
    Zero(&'static str),
}

impl Configuration {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: Configuration = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(ref engine) = self.engine {
            if engine.workers == Some(0) {
                return Err(ConfigError::Zero("engine.workers"));
            }
            if engine.queue_capacity == Some(0) {
                return Err(ConfigError::Zero("engine.queueCapacity"));
            }
            if engine.synopsis_max_chars == Some(0) {
                return Err(ConfigError::Zero("engine.synopsisMaxChars"));
            }
        }

        if let Some(ref tmdb) = self.tmdb {
            if tmdb.api_key.trim().is_empty() {
                return Err(ConfigError::EmptyApiKey);
            }
        }

        if let Some(ref webhook) = self.webhook {
            let parsed = url::Url::parse(&webhook.url).map_err(|source| ConfigError::InvalidWebhookUrl {
                url: webhook.url.clone(),
                source,
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ConfigError::UnsupportedScheme(parsed.scheme().to_string()));
            }
        }

        Ok(())
    }

    pub fn workers(&self) -> usize {
        self.engine
            .as_ref()
            .and_then(|e| e.workers)
            .unwrap_or(4)
    }

    pub fn queue_capacity(&self) -> usize {
        self.engine
            .as_ref()
            .and_then(|e| e.queue_capacity)
            .unwrap_or(256)
    }

    pub fn synopsis_max_chars(&self) -> usize {
        self.engine
            .as_ref()
            .and_then(|e| e.synopsis_max_chars)
            .unwrap_or(500)
    }
}

impl TmdbConfig {
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or(crate::tmdb::DEFAULT_BASE_URL)
    }
}

impl MusicBrainzConfig {
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or(crate::musicbrainz::DEFAULT_BASE_URL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = Configuration::parse("{}").unwrap();

        assert_eq!(config.workers(), 4);
        assert_eq!(config.queue_capacity(), 256);
        assert_eq!(config.synopsis_max_chars(), 500);
        assert!(config.webhook.is_none());
    }

    #[test]
    fn parses_full_configuration() {
        let yaml = r#"
engine:
  workers: 2
  queueCapacity: 16
  synopsisMaxChars: 120
tmdb:
  apikey: "abc123"
musicbrainz:
  baseUrl: "http://mb.local/ws/2"
webhook:
  url: "https://hooks.example.com/availarr"
  authHeader: "Bearer token"
"#;
        let config = Configuration::parse(yaml).unwrap();

        assert_eq!(config.workers(), 2);
        assert_eq!(config.queue_capacity(), 16);
        assert_eq!(config.synopsis_max_chars(), 120);
        assert_eq!(config.tmdb.as_ref().unwrap().base_url(), crate::tmdb::DEFAULT_BASE_URL);
        assert_eq!(config.musicbrainz.as_ref().unwrap().base_url(), "http://mb.local/ws/2");
        assert_eq!(
            config.webhook.as_ref().unwrap().auth_header.as_deref(),
            Some("Bearer token")
        );
    }

    #[test]
    fn rejects_bad_webhook_urls() {
        assert!(Configuration::parse("webhook:\n  url: \"not a url\"\n").is_err());
        assert!(Configuration::parse("webhook:\n  url: \"ftp://example.com/x\"\n").is_err());
    }

    #[test]
    fn rejects_zero_workers() {
        let config = Configuration {
            engine: Some(EngineConfig {
                workers: Some(0),
                ..Default::default()
            }),
            ..Default::default()
        };

        assert!(matches!(config.validate(), Err(ConfigError::Zero("engine.workers"))));
    }
}
