//! Client-wide defaults.

use crate::condition::SuccessCondition;
use crate::error::HttpError;
use crate::report::ErrorFields;
use crate::response::{JsonMode, ResponseKey};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, ClientBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// HTTP client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Prefix for relative request URLs. Empty means URLs are used as given.
    pub base_url: String,
    /// Request timeout in milliseconds. `None` waits indefinitely.
    pub timeout_ms: Option<u64>,
    /// Connection timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// User agent string.
    pub user_agent: String,
    /// Maximum idle connections per host.
    pub pool_max_idle_per_host: usize,
    /// Enable gzip decompression.
    pub gzip: bool,
    /// Body key unwrapped on success.
    pub response_key: ResponseKey,
    /// Default business success condition.
    pub condition: Option<SuccessCondition>,
    /// Headers sent with every request.
    pub default_headers: BTreeMap<String, String>,
    /// How response bodies are decoded.
    pub json_mode: JsonMode,
    /// Body fields holding business error code and message.
    pub error_fields: ErrorFields,
    /// URL fragments whose transport errors are not reported.
    pub error_whitelist: Vec<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout_ms: None,
            connect_timeout_ms: 10_000,
            user_agent: format!("pure-http/{}", env!("CARGO_PKG_VERSION")),
            pool_max_idle_per_host: 10,
            gzip: true,
            response_key: ResponseKey::default(),
            condition: None,
            default_headers: BTreeMap::new(),
            json_mode: JsonMode::default(),
            error_fields: ErrorFields::default(),
            error_whitelist: Vec::new(),
        }
    }
}

impl HttpConfig {
    /// Request timeout, if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Default headers as a `HeaderMap`.
    pub fn header_map(&self) -> Result<HeaderMap, HttpError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.default_headers {
            let name = HeaderName::try_from(name.as_str())
                .map_err(|e| HttpError::InvalidRequest(format!("header name {name:?}: {e}")))?;
            let value = HeaderValue::try_from(value.as_str())
                .map_err(|e| HttpError::InvalidRequest(format!("header value for {name}: {e}")))?;
            headers.insert(name, value);
        }
        Ok(headers)
    }

    /// Whether transport errors for `url` should be kept out of reports.
    pub fn is_whitelisted(&self, url: &str) -> bool {
        self.error_whitelist
            .iter()
            .any(|fragment| !fragment.is_empty() && url.contains(fragment.as_str()))
    }
}

/// Build the underlying reqwest client.
pub fn build_client(config: &HttpConfig) -> Result<Client, HttpError> {
    let mut builder = ClientBuilder::new()
        .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
        .user_agent(&config.user_agent)
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        .gzip(config.gzip);

    if let Some(timeout) = config.timeout() {
        builder = builder.timeout(timeout);
    }

    builder.build().map_err(HttpError::ClientBuild)
}
