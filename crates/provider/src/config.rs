//! Provider configuration and client construction.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use pagerform_api::client::DEFAULT_BASE_URL;
use pagerform_api::{PagerDutyApi, PagerDutyClient};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use tracing::{debug, info};

use crate::error::ProviderError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings needed to talk to `PagerDuty`.
///
/// The token is wrapped in [`SecretString`] and never shows up in `Debug`
/// output.
#[derive(Debug, Deserialize)]
pub struct ProviderConfig {
    /// `PagerDuty` REST API v2 token.
    #[serde(default)]
    pub token: Option<SecretString>,
    /// Skip the `GET /abilities` probe when building the client.
    #[serde(default)]
    pub skip_credentials_validation: bool,
    /// Base URL of the REST API.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Override for the `User-Agent` header.
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Per-request timeout, written as `timeout_secs` in TOML.
    #[serde(
        rename = "timeout_secs",
        default = "default_timeout",
        deserialize_with = "deserialize_secs"
    )]
    pub timeout: Duration,
}

fn default_api_url() -> String {
    DEFAULT_BASE_URL.to_owned()
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn deserialize_secs<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    u64::deserialize(deserializer).map(Duration::from_secs)
}

#[derive(Deserialize)]
struct ConfigFile {
    pagerduty: ProviderConfig,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            token: None,
            skip_credentials_validation: false,
            api_url: default_api_url(),
            user_agent: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ProviderConfig {
    /// Create a configuration with the given token and default settings.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(SecretString::new(token.into())),
            ..Self::default()
        }
    }

    /// Create configuration from environment variables.
    ///
    /// Reads:
    /// - `PAGERDUTY_TOKEN`
    /// - `PAGERDUTY_SKIP_CREDENTIALS_VALIDATION` (`true`/`1` to skip)
    /// - `PAGERDUTY_API_URL` (defaults to `https://api.pagerduty.com`)
    pub fn from_env() -> Self {
        let token = std::env::var("PAGERDUTY_TOKEN")
            .ok()
            .filter(|t| !t.is_empty())
            .map(SecretString::new);
        let skip_credentials_validation = std::env::var("PAGERDUTY_SKIP_CREDENTIALS_VALIDATION")
            .is_ok_and(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"));
        let api_url = std::env::var("PAGERDUTY_API_URL").unwrap_or_else(|_| default_api_url());

        Self {
            token,
            skip_credentials_validation,
            api_url,
            ..Self::default()
        }
    }

    /// Parse the `[pagerduty]` table of a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ProviderError> {
        let file: ConfigFile =
            toml::from_str(contents).map_err(|e| ProviderError::Configuration(e.to_string()))?;
        Ok(file.pagerduty)
    }

    /// Read and parse a TOML configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ProviderError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ProviderError::Configuration(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Override the token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(SecretString::new(token.into()));
        self
    }

    /// Override the API base URL.
    #[must_use]
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Toggle the credential probe.
    #[must_use]
    pub fn with_skip_credentials_validation(mut self, skip: bool) -> Self {
        self.skip_credentials_validation = skip;
        self
    }

    /// Override the `User-Agent` header.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Override the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build an HTTP client without contacting `PagerDuty`.
    pub fn build_client(&self) -> Result<PagerDutyClient, ProviderError> {
        let token = self
            .token
            .as_ref()
            .filter(|t| !t.expose_secret().is_empty())
            .ok_or(ProviderError::MissingCredentials)?;
        if self.timeout.is_zero() {
            return Err(ProviderError::Configuration(
                "timeout must be greater than zero".into(),
            ));
        }

        let mut builder = PagerDutyClient::builder(token.expose_secret().clone())
            .base_url(self.api_url.clone())
            .timeout(self.timeout);
        if let Some(ua) = &self.user_agent {
            builder = builder.user_agent(ua.clone());
        }

        builder
            .build()
            .map_err(|e| ProviderError::Configuration(e.to_string()))
    }

    /// Build the shared API client and, unless disabled, validate the token.
    pub async fn client(&self) -> Result<Arc<dyn PagerDutyApi>, ProviderError> {
        let client: Arc<dyn PagerDutyApi> = Arc::new(self.build_client()?);
        self.check_credentials(client.as_ref()).await?;
        info!(api_url = %self.api_url, "PagerDuty client configured");
        Ok(client)
    }

    /// Probe `GET /abilities` unless `skip_credentials_validation` is set.
    pub async fn check_credentials(&self, api: &dyn PagerDutyApi) -> Result<(), ProviderError> {
        if self.skip_credentials_validation {
            debug!("skipping PagerDuty credential validation");
            return Ok(());
        }

        let abilities = api
            .list_abilities()
            .await
            .map_err(ProviderError::Credentials)?;
        debug!(abilities = abilities.len(), "PagerDuty credentials accepted");
        Ok(())
    }
}
