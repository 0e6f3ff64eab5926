//! Speech proxy connection settings.

use crate::error::{VoxwireError, VoxwireResult};
use reqwest::header::HeaderValue;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Default proxy address
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:3000";

/// Path of the text-to-speech endpoint
pub const TEXT_ASK_PATH: &str = "/text-ask";

/// Connection settings for the speech proxy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Proxy address, without the endpoint path
    pub base_url: String,
    /// Sent as `X-Client-Token`; empty disables the header
    pub client_token: String,
    /// Sent as `X-Session-Id`; empty disables the header
    pub session_id: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            client_token: String::new(),
            session_id: String::new(),
        }
    }
}

impl ProxyConfig {
    /// Create settings for a proxy at `base_url`
    #[must_use]
    pub fn new<S: Into<String>>(base_url: S) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the proxy address
    #[must_use]
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the client token
    #[must_use]
    pub fn with_client_token<S: Into<String>>(mut self, token: S) -> Self {
        self.client_token = token.into();
        self
    }

    /// Set the session id
    #[must_use]
    pub fn with_session_id<S: Into<String>>(mut self, session_id: S) -> Self {
        self.session_id = session_id.into();
        self
    }

    /// Use a fresh random session id
    #[must_use]
    pub fn with_generated_session_id(self) -> Self {
        self.with_session_id(uuid::Uuid::new_v4().to_string())
    }

    /// Parse settings from TOML; missing keys take their defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or the settings are invalid
    pub fn from_toml_str(text: &str) -> VoxwireResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load settings from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or holds invalid settings
    pub fn from_file<P: AsRef<Path>>(path: P) -> VoxwireResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            VoxwireError::file(format!("Failed to read config {}: {e}", path.display()))
        })?;
        let config = Self::from_toml_str(&text)?;
        info!("Loaded proxy config from {}", path.display());
        Ok(config)
    }

    /// Validate settings
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is not an http(s) URL or a header
    /// value contains characters HTTP headers cannot carry
    pub fn validate(&self) -> VoxwireResult<()> {
        self.text_ask_url()?;

        for (name, value) in [
            ("client_token", &self.client_token),
            ("session_id", &self.session_id),
        ] {
            if HeaderValue::from_str(value).is_err() {
                return Err(VoxwireError::configuration(format!(
                    "{name} is not a valid header value"
                )));
            }
        }

        Ok(())
    }

    /// Full URL of the text-ask endpoint
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL does not parse as an http(s) URL
    pub fn text_ask_url(&self) -> VoxwireResult<Url> {
        let joined = format!("{}{TEXT_ASK_PATH}", self.base_url.trim_end_matches('/'));
        let url = Url::parse(&joined).map_err(|e| {
            VoxwireError::configuration(format!("Invalid base URL '{}': {e}", self.base_url))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(VoxwireError::configuration(format!(
                "Base URL must use http or https, got '{}'",
                url.scheme()
            )));
        }
        Ok(url)
    }
}
