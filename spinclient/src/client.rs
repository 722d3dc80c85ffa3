//! HTTP client for the spin feed with dual-source fallback
//!
//! Every fetch tries the station's API relay first and falls back to the
//! Spinitron API when the relay's REST endpoint is unreachable or answers
//! with an error. The fallback is per-fetch: it is independent of whether
//! the relay's SSE stream happens to be healthy at the time.
//!
//! # Example
//!
//! ```no_run
//! use spinclient::SpinClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = SpinClient::builder()
//!         .primary_api_key("spinitron-key")
//!         .build()?;
//!
//!     let fetched = client.fetch_latest_spin().await?;
//!     println!("{} - {} (via {})", fetched.spin.artist, fetched.spin.song, fetched.source);
//!     Ok(())
//! }
//! ```

use crate::error::{Error, Result};
use crate::models::{FetchedSpin, SpinRecord, SpinSource, SpinsEnvelope};
use reqwest::header::ACCEPT;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Default API relay base URL
pub const DEFAULT_PROXY_BASE_URL: &str = "https://api-1.wbor.org";

/// Default Spinitron API base URL (fallback path)
pub const DEFAULT_PRIMARY_API_BASE: &str = "https://spinitron.com/api";

/// Path of the relay's most-recent-spins endpoint
pub const PROXY_SPINS_PATH: &str = "/api/spins";

/// Path of the relay's SSE stream announcing new spins
pub const SSE_EVENTS_PATH: &str = "/spin-events";

/// Default timeout for spin fetches and SSE probes
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Default User-Agent
pub const DEFAULT_USER_AGENT: &str = "spinwatch/0.1.0 (spinclient)";

/// Spin feed HTTP client
///
/// The client is stateless and cheap to clone; it shares one
/// `reqwest::Client` connection pool across clones.
#[derive(Debug, Clone)]
pub struct SpinClient {
    client: Client,
    proxy_base: String,
    primary_base: String,
    primary_api_key: Option<String>,
    timeout: Duration,
}

impl SpinClient {
    /// Create a builder for configuring the client
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Get the relay base URL
    pub fn proxy_base(&self) -> &str {
        &self.proxy_base
    }

    /// URL of the relay's SSE stream
    pub fn sse_url(&self) -> Result<Url> {
        Ok(Url::parse(&format!(
            "{}{}",
            self.proxy_base, SSE_EVENTS_PATH
        ))?)
    }

    /// Get the internal HTTP client
    ///
    /// Useful for sharing the connection pool with the SSE listener.
    pub fn http_client(&self) -> &Client {
        &self.client
    }

    /// Fetch the most recent spin, falling back to the Spinitron API
    ///
    /// Tries the relay REST endpoint first. On any failure there (network
    /// error, timeout, non-success status, malformed payload) the Spinitron
    /// API is tried with the configured key. The caller never retries
    /// inline; the next trigger retries naturally.
    pub async fn fetch_latest_spin(&self) -> Result<FetchedSpin> {
        match self.fetch_from_proxy().await {
            Ok(spin) => Ok(FetchedSpin {
                spin,
                source: SpinSource::Proxy,
            }),
            Err(proxy_err) => {
                tracing::warn!(
                    error = %proxy_err,
                    "Relay spin fetch failed, falling back to Spinitron API"
                );
                let spin = self.fetch_from_primary().await?;
                Ok(FetchedSpin {
                    spin,
                    source: SpinSource::Primary,
                })
            }
        }
    }

    /// Lightweight reachability check of the relay's SSE endpoint
    ///
    /// Establishes the connection and waits for response headers only; no
    /// event is read. Used to detect stream recovery while in polling mode.
    pub async fn probe_sse_endpoint(&self) -> Result<()> {
        let response = self
            .client
            .get(self.sse_url()?)
            .header(ACCEPT, "text/event-stream")
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Error::Api(status))
        }
    }

    async fn fetch_from_proxy(&self) -> Result<SpinRecord> {
        let url = Url::parse(&format!("{}{}", self.proxy_base, PROXY_SPINS_PATH))?;

        tracing::debug!(%url, "Fetching latest spin from relay");

        let request = self.client.get(url).timeout(self.timeout);
        self.fetch_spin(request).await
    }

    async fn fetch_from_primary(&self) -> Result<SpinRecord> {
        let url = Url::parse(&format!("{}/spins", self.primary_base))?;

        tracing::debug!(%url, "Fetching latest spin from Spinitron API");

        let mut request = self.client.get(url).timeout(self.timeout);
        if let Some(key) = &self.primary_api_key {
            request = request.bearer_auth(key);
        }
        self.fetch_spin(request).await
    }

    async fn fetch_spin(&self, request: reqwest::RequestBuilder) -> Result<SpinRecord> {
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Api(status));
        }

        let body = response.text().await?;
        let envelope: SpinsEnvelope = serde_json::from_str(&body)?;
        envelope.into_latest().ok_or(Error::EmptyFeed)
    }
}

/// Builder for [`SpinClient`]
#[derive(Debug)]
pub struct ClientBuilder {
    client: Option<Client>,
    proxy_base: String,
    primary_base: String,
    primary_api_key: Option<String>,
    timeout: Duration,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            client: None,
            proxy_base: DEFAULT_PROXY_BASE_URL.to_string(),
            primary_base: DEFAULT_PRIMARY_API_BASE.to_string(),
            primary_api_key: None,
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl ClientBuilder {
    /// Set the relay base URL
    pub fn proxy_base(mut self, base: impl Into<String>) -> Self {
        self.proxy_base = trim_trailing_slash(base.into());
        self
    }

    /// Set the Spinitron API base URL
    pub fn primary_base(mut self, base: impl Into<String>) -> Self {
        self.primary_base = trim_trailing_slash(base.into());
        self
    }

    /// Set the Spinitron API key used on the fallback path
    pub fn primary_api_key(mut self, key: impl Into<String>) -> Self {
        self.primary_api_key = Some(key.into());
        self
    }

    /// Set the per-request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Use a custom `reqwest::Client` (shared connection pool, proxies)
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<SpinClient> {
        let client = match self.client {
            Some(client) => client,
            None => Client::builder().user_agent(DEFAULT_USER_AGENT).build()?,
        };

        Ok(SpinClient {
            client,
            proxy_base: self.proxy_base,
            primary_base: self.primary_base,
            primary_api_key: self.primary_api_key,
            timeout: self.timeout,
        })
    }
}

fn trim_trailing_slash(mut s: String) -> String {
    while s.ends_with('/') {
        s.pop();
    }
    s
}
