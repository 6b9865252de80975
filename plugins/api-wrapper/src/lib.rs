//! # API Wrapper Module
//!
//! Thin JSON client for a single upstream API authenticated with a bearer
//! token.
//!
//! ## Example
//!
//! ```rust,no_run
//! use api_wrapper::{ApiWrapper, ApiSettings};
//! use http::Method;
//!
//! # async fn example() -> Result<(), overseer_module_api::ModuleError> {
//! let mut api = ApiWrapper::new(ApiSettings {
//!     base_url: "http://127.0.0.1:8081/v1".to_string(),
//!     ..ApiSettings::default()
//! });
//! api.set_api_key("secret");
//!
//! let users = api.request(Method::GET, "/users", None).await?;
//! # Ok(())
//! # }
//! ```
//!
//! Only plain `http://` endpoints are supported.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use http::{Method, Uri};
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use overseer_module_api::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Name under which the module is registered
pub const NAME: &str = "api_wrapper";

/// API client settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Prefix joined with every endpoint
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token
    #[serde(default)]
    pub api_key: Option<String>,

    /// Per-request timeout
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            timeout: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "http://api.example.com/v1".to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Bearer-authenticated JSON client
#[derive(Debug)]
pub struct ApiWrapper {
    base_url: String,
    timeout: Duration,
    api_key: Option<String>,
    headers: HeaderMap,
    client: Client<HttpConnector, Full<Bytes>>,
}

impl ApiWrapper {
    /// Create a client with the given settings
    pub fn new(settings: ApiSettings) -> Self {
        let client = Client::builder(TokioExecutor::new()).build_http();

        let mut api = Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            timeout: settings.timeout,
            api_key: None,
            headers: HeaderMap::new(),
            client,
        };

        if let Some(key) = settings.api_key.filter(|k| !k.is_empty()) {
            api.set_api_key(key);
        }
        api
    }

    /// Build a client from a JSON settings block
    pub fn from_settings(settings: &serde_json::Value) -> Result<Self, ModuleError> {
        let settings: ApiSettings = if settings.is_null() {
            ApiSettings::default()
        } else {
            serde_json::from_value(settings.clone())
                .map_err(|e| ModuleError::config(format!("invalid {NAME} settings: {e}")))?
        };

        let uri = settings
            .base_url
            .parse::<Uri>()
            .map_err(|e| ModuleError::config(format!("invalid base_url {}: {e}", settings.base_url)))?;

        if uri.scheme_str() != Some("http") {
            return Err(ModuleError::config(format!(
                "base_url {} must use http://",
                settings.base_url
            )));
        }

        Ok(Self::new(settings))
    }

    /// Base URL every endpoint is joined to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Configure the bearer token
    ///
    /// A key that cannot be carried in a header is rejected and leaves the
    /// client unauthenticated.
    pub fn set_api_key(&mut self, key: impl Into<String>) {
        let key = key.into();
        match HeaderValue::from_str(&format!("Bearer {key}")) {
            Ok(mut value) => {
                value.set_sensitive(true);
                self.headers.insert(AUTHORIZATION, value);
                self.api_key = Some(key);
            }
            Err(e) => {
                warn!(error = %e, "Rejected API key");
                self.clear_api_key();
            }
        }
    }

    fn clear_api_key(&mut self) {
        self.api_key = None;
        self.headers.remove(AUTHORIZATION);
    }

    /// Whether a bearer token is configured
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    /// Send a request and parse the JSON response
    ///
    /// An empty response body yields `Value::Null`. Fails when no key is
    /// configured or the status is not 2xx.
    pub async fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, ModuleError> {
        if !self.has_api_key() {
            return Err(ModuleError::config("API key not set"));
        }

        let url = self.url(endpoint);
        let uri: Uri = url
            .parse()
            .map_err(|e| ModuleError::config(format!("invalid URL {url}: {e}")))?;

        let mut builder = http::Request::builder()
            .method(method.clone())
            .uri(uri)
            .header(ACCEPT, "application/json");
        for (name, value) in &self.headers {
            builder = builder.header(name, value);
        }

        let payload = match body {
            Some(body) => {
                builder = builder.header(CONTENT_TYPE, "application/json");
                Bytes::from(serde_json::to_vec(&body)?)
            }
            None => Bytes::new(),
        };

        let request = builder
            .body(Full::new(payload))
            .map_err(|e| ModuleError::runtime(format!("failed to build request: {e}")))?;

        debug!(method = %method, url = %url, "Sending API request");

        let exchange = async {
            let response = self
                .client
                .request(request)
                .await
                .map_err(|e| ModuleError::runtime(format!("request to {url} failed: {e}")))?;

            let status = response.status();
            let body = response
                .into_body()
                .collect()
                .await
                .map_err(|e| ModuleError::runtime(format!("failed to read body: {e}")))?
                .to_bytes();

            if !status.is_success() {
                return Err(ModuleError::runtime(format!(
                    "{method} {url} returned {status}: {}",
                    String::from_utf8_lossy(&body)
                )));
            }

            if body.is_empty() {
                return Ok(serde_json::Value::Null);
            }
            Ok(serde_json::from_slice(&body)?)
        };

        timeout(self.timeout, exchange)
            .await
            .map_err(|_| ModuleError::runtime(format!("{method} {url} timed out")))?
    }
}

impl Module for ApiWrapper {
    fn name(&self) -> &str {
        NAME
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn description(&self) -> &str {
        "Bearer-authenticated JSON API client"
    }

    fn as_health_checkable(&self) -> Option<&dyn HealthCheckable> {
        Some(self)
    }

    fn as_cleanable(&mut self) -> Option<&mut dyn Cleanable> {
        Some(self)
    }
}

#[async_trait]
impl HealthCheckable for ApiWrapper {
    async fn health_check(&self) -> Result<bool, ModuleError> {
        Ok(self.has_api_key())
    }
}

#[async_trait]
impl Cleanable for ApiWrapper {
    async fn cleanup(&mut self) -> Result<(), ModuleError> {
        self.clear_api_key();
        self.headers.clear();
        Ok(())
    }
}

/// Catalog factory for [`ApiWrapper`]
pub fn factory(settings: &serde_json::Value) -> Result<Box<dyn Module>, ModuleError> {
    Ok(Box::new(ApiWrapper::from_settings(settings)?))
}
