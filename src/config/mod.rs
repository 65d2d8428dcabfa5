//! Client options (layered: code > env).

use std::fmt;

use bon::Builder;

use crate::error::{LiveError, Result};

/// Default host for the Live API websocket endpoint.
pub const DEFAULT_BASE_URL: &str = "wss://generativelanguage.googleapis.com";
/// API version segment used in the endpoint path.
pub const DEFAULT_API_VERSION: &str = "v1beta";

/// Connection options for the websocket transport.
///
/// Build explicitly:
/// ```
/// use genai_live::config::ClientOptions;
///
/// let options = ClientOptions::builder().api_key("secret").build();
/// assert_eq!(options.api_version, "v1beta");
/// ```
#[derive(Clone, Builder)]
pub struct ClientOptions {
    #[builder(into)]
    pub api_key: String,
    #[builder(into, default = DEFAULT_BASE_URL.to_string())]
    pub base_url: String,
    #[builder(into, default = DEFAULT_API_VERSION.to_string())]
    pub api_version: String,
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("api_key", &format_args!("<{} chars>", self.api_key.len()))
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .finish()
    }
}

impl ClientOptions {
    /// Load from environment variables (`GEMINI_API_KEY`, `GOOGLE_API_KEY`, ...).
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve options through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let api_key = ["GEMINI_API_KEY", "GOOGLE_API_KEY"]
            .iter()
            .find_map(|name| non_empty(name))
            .ok_or_else(|| {
                LiveError::Configuration("Missing GEMINI_API_KEY or GOOGLE_API_KEY".into())
            })?;

        Ok(Self {
            api_key,
            base_url: non_empty("GEMINI_LIVE_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_version: non_empty("GEMINI_LIVE_API_VERSION")
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
        })
    }

    /// Websocket URL of the bidirectional generate-content service.
    pub fn endpoint(&self) -> Result<String> {
        let base = self.base_url.trim().trim_end_matches('/');
        if base.is_empty() {
            return Err(LiveError::Configuration("Base URL cannot be empty".into()));
        }
        if self.api_key.trim().is_empty() {
            return Err(LiveError::Configuration("API key cannot be empty".into()));
        }
        Ok(format!(
            "{base}/ws/google.ai.generativelanguage.{}.GenerativeService.BidiGenerateContent?key={}",
            self.api_version, self.api_key
        ))
    }
}
