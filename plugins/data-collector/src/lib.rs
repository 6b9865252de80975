//! # Data Collector Module
//!
//! Periodically fetches JSON documents from configured HTTP sources.
//!
//! ## Settings
//!
//! ```yaml
//! modules:
//!   data_collector:
//!     sources: ["http://127.0.0.1:9000/metrics"]
//!     timeout: 10s
//! ```
//!
//! Each health check runs one collection over every source, so under the
//! supervisor the module collects once per pass. It reports healthy when
//! that collection succeeded. With no sources configured it stays healthy
//! and collects nothing.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use http::{StatusCode, Uri};
use http_body_util::{BodyExt, Empty};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use overseer_module_api::prelude::*;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Name under which the module is registered
pub const NAME: &str = "data_collector";

/// Collector settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectorSettings {
    /// URLs fetched on every collection
    #[serde(default)]
    pub sources: Vec<String>,

    /// Per-request timeout
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            timeout: default_timeout(),
        }
    }
}

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

/// Document fetched from one source
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    /// Parsed response body
    pub value: serde_json::Value,
    /// When the document was received
    pub collected_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct CollectorState {
    data: BTreeMap<String, Sample>,
    last_error: Option<String>,
    collections: u64,
}

/// Fetches JSON from a list of HTTP sources
#[derive(Debug)]
pub struct DataCollector {
    settings: CollectorSettings,
    client: Client<HttpConnector, Empty<Bytes>>,
    state: Mutex<CollectorState>,
}

impl DataCollector {
    /// Create a collector with the given settings
    pub fn new(settings: CollectorSettings) -> Self {
        let client = Client::builder(TokioExecutor::new()).build_http();

        Self {
            settings,
            client,
            state: Mutex::new(CollectorState::default()),
        }
    }

    /// Build a collector from a JSON settings block
    pub fn from_settings(settings: &serde_json::Value) -> Result<Self, ModuleError> {
        let settings = if settings.is_null() {
            CollectorSettings::default()
        } else {
            serde_json::from_value(settings.clone())
                .map_err(|e| ModuleError::config(format!("invalid {NAME} settings: {e}")))?
        };

        for source in &settings.sources {
            source
                .parse::<Uri>()
                .map_err(|e| ModuleError::config(format!("invalid source {source}: {e}")))?;
        }

        Ok(Self::new(settings))
    }

    /// Configured sources
    pub fn sources(&self) -> &[String] {
        &self.settings.sources
    }

    /// Fetch every source once
    ///
    /// All sources are attempted. Successful documents replace the previous
    /// sample for their source; the last failure is kept and returned.
    pub async fn collect(&self) -> Result<usize, ModuleError> {
        let mut collected = 0;
        let mut failure = None;

        for source in &self.settings.sources {
            match self.fetch(source).await {
                Ok(value) => {
                    debug!(source = %source, "Collected sample");
                    self.state.lock().data.insert(
                        source.clone(),
                        Sample {
                            value,
                            collected_at: Utc::now(),
                        },
                    );
                    collected += 1;
                }
                Err(e) => {
                    warn!(source = %source, error = %e, "Collection failed");
                    failure = Some(e);
                }
            }
        }

        let mut state = self.state.lock();
        state.collections += 1;
        state.last_error = failure.as_ref().map(ToString::to_string);
        drop(state);

        match failure {
            Some(e) => Err(e),
            None => {
                info!(sources = collected, "Collection completed");
                Ok(collected)
            }
        }
    }

    async fn fetch(&self, source: &str) -> Result<serde_json::Value, ModuleError> {
        let uri: Uri = source
            .parse()
            .map_err(|e| ModuleError::config(format!("invalid source {source}: {e}")))?;

        let request = http::Request::get(uri)
            .header(http::header::ACCEPT, "application/json")
            .body(Empty::<Bytes>::new())
            .map_err(|e| ModuleError::runtime(format!("failed to build request: {e}")))?;

        let exchange = async {
            let response = self
                .client
                .request(request)
                .await
                .map_err(|e| ModuleError::runtime(format!("request to {source} failed: {e}")))?;

            let status = response.status();
            if status != StatusCode::OK {
                return Err(ModuleError::runtime(format!(
                    "{source} returned {status}"
                )));
            }

            let body = response
                .into_body()
                .collect()
                .await
                .map_err(|e| ModuleError::runtime(format!("failed to read body: {e}")))?
                .to_bytes();

            Ok(serde_json::from_slice(&body)?)
        };

        timeout(self.settings.timeout, exchange)
            .await
            .map_err(|_| ModuleError::runtime(format!("{source} timed out")))?
    }

    /// Latest sample per source
    pub fn data(&self) -> BTreeMap<String, Sample> {
        self.state.lock().data.clone()
    }

    /// Error from the latest collection, if it failed
    pub fn last_error(&self) -> Option<String> {
        self.state.lock().last_error.clone()
    }

    /// Number of completed collections
    pub fn collections(&self) -> u64 {
        self.state.lock().collections
    }
}

impl Module for DataCollector {
    fn name(&self) -> &str {
        NAME
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn description(&self) -> &str {
        "Collects JSON documents from HTTP sources"
    }

    fn as_health_checkable(&self) -> Option<&dyn HealthCheckable> {
        Some(self)
    }

    fn as_cleanable(&mut self) -> Option<&mut dyn Cleanable> {
        Some(self)
    }
}

#[async_trait]
impl HealthCheckable for DataCollector {
    async fn health_check(&self) -> Result<bool, ModuleError> {
        if self.settings.sources.is_empty() {
            return Ok(true);
        }
        Ok(self.collect().await.is_ok())
    }
}

#[async_trait]
impl Cleanable for DataCollector {
    async fn cleanup(&mut self) -> Result<(), ModuleError> {
        let state = self.state.get_mut();
        state.data.clear();
        state.last_error = None;
        self.settings.sources.clear();
        debug!("Data collector cleaned up");
        Ok(())
    }
}

/// Catalog factory for [`DataCollector`]
pub fn factory(settings: &serde_json::Value) -> Result<Box<dyn Module>, ModuleError> {
    Ok(Box::new(DataCollector::from_settings(settings)?))
}
