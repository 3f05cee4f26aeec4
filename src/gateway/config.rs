//! Configuration for the gateway client.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use super::error::{GatewayError, GatewayResult};

/// Default backend base URL for local development.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Environment variable overriding the backend base URL.
pub const BASE_URL_ENV: &str = "AVACHAT_API_URL";

/// Configuration for the REST gateway.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Backend base URL, scheme included, no trailing path.
    pub base_url: String,
    /// Whole-request timeout.
    #[serde(with = "duration_serde")]
    pub request_timeout: Duration,
    /// Connection timeout.
    #[serde(with = "duration_serde")]
    pub connect_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl GatewayConfig {
    /// Create a new config with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config from the environment, falling back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
            config.base_url = base_url;
        }
        config
    }

    /// Set the backend base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the whole-request timeout.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Validate the base URL and return it parsed.
    ///
    /// # Errors
    /// Returns [`GatewayError::Config`] if the base URL is not a valid
    /// absolute URL.
    pub fn parsed_base_url(&self) -> GatewayResult<Url> {
        Url::parse(&self.base_url)
            .map_err(|err| GatewayError::Config(format!("invalid base url {:?}: {err}", self.base_url)))
    }

    /// Join an endpoint path onto the base URL.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }
}

/// Serde module for Duration serialization.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GatewayConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert!(config.parsed_base_url().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = GatewayConfig::new()
            .with_base_url("https://chat.example.com/")
            .with_request_timeout(Duration::from_secs(60));

        assert_eq!(config.base_url, "https://chat.example.com/");
        assert_eq!(config.request_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_endpoint_join_handles_trailing_slash() {
        let config = GatewayConfig::new().with_base_url("http://localhost:8000/");
        assert_eq!(config.endpoint("/messages/"), "http://localhost:8000/messages/");

        let bare = GatewayConfig::new().with_base_url("http://localhost:8000");
        assert_eq!(bare.endpoint("/login"), "http://localhost:8000/login");
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let config = GatewayConfig::new().with_base_url("not a url");
        assert!(config.parsed_base_url().is_err());
    }
}
