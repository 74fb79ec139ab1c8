//! Lightweight HTTP probes
//!
//! Cluster endpoints (API server, OAuth server, routes) answer with
//! self-signed certificates and often need a bearer token, so certificate
//! verification is off and the token is attached to every request. A request
//! that fails in transit or gets an unexpected response is retryable; only a
//! request that cannot be built at all is an error.

use std::time::Duration;

use parking_lot::Mutex;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Url};
use tracing::{debug, trace};

use crate::config::DEFAULT_HTTP_TIMEOUT;
use crate::poll::{PollError, Poller, ProbeResult};
use crate::Error;

/// What one request observed
#[derive(Debug)]
enum Observation {
    /// Expected status (and body text, if required); carries the body
    Matched(String),
    /// Anything else; carries a short description for logs and errors
    Unmatched(String),
}

/// A GET request with an expected response
#[derive(Clone, Debug)]
pub struct HttpProbe {
    url: String,
    bearer_token: Option<String>,
    headers: Vec<(String, String)>,
    expected_status: u16,
    body_contains: Option<String>,
    request_timeout: Duration,
}

impl HttpProbe {
    /// Probe `url`, expecting status 200
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            bearer_token: None,
            headers: Vec::new(),
            expected_status: 200,
            body_contains: None,
            request_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }

    /// Send `Authorization: Bearer <token>`
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Add a request header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Expect this status code instead of 200
    pub fn expect_status(mut self, status: u16) -> Self {
        self.expected_status = status;
        self
    }

    /// Also require the body to contain `text`
    pub fn expect_body_contains(mut self, text: impl Into<String>) -> Self {
        self.body_contains = Some(text.into());
        self
    }

    /// Per-request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Target URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send one request
    ///
    /// `Ok(Some(body))` when the response matches, `Ok(None)` when it does
    /// not or the request failed in transit.
    pub async fn check_once(&self) -> crate::Result<Option<String>> {
        let (client, url) = self.prepare()?;
        match self.observe(&client, &url).await {
            Observation::Matched(body) => Ok(Some(body)),
            Observation::Unmatched(_) => Ok(None),
        }
    }

    /// Poll until the response matches and return its body
    pub async fn wait_for(&self, poller: &Poller) -> Result<String, PollError<Error>> {
        let (client, url) = self.prepare().map_err(PollError::Probe)?;
        let body: Mutex<Option<String>> = Mutex::new(None);
        let (client, url, body_ref) = (&client, &url, &body);

        poller
            .run(move || async move {
                match self.observe(client, url).await {
                    Observation::Matched(b) => {
                        *body_ref.lock() = Some(b);
                        ProbeResult::Done
                    }
                    Observation::Unmatched(observed) => ProbeResult::retry_with(observed),
                }
            })
            .await
            .into_result()?;

        Ok(body.into_inner().unwrap_or_default())
    }

    fn prepare(&self) -> crate::Result<(Client, Url)> {
        let url = Url::parse(&self.url)
            .map_err(|e| Error::http(&self.url, format!("invalid url: {}", e)))?;

        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::http(&self.url, format!("invalid header name {:?}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::http(&self.url, format!("invalid header value for {}: {}", name, e)))?;
            headers.insert(name, value);
        }

        let client = Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(self.request_timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::http(&self.url, format!("failed to build client: {}", e)))?;

        Ok((client, url))
    }

    async fn observe(&self, client: &Client, url: &Url) -> Observation {
        let mut request = client.get(url.clone());
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                debug!(url = %self.url, error = %e, "HTTP probe request failed");
                return Observation::Unmatched(format!("request failed: {}", e));
            }
        };

        let status = response.status().as_u16();
        let body = match response.text().await {
            Ok(b) => b,
            Err(e) => {
                debug!(url = %self.url, status, error = %e, "HTTP probe body unreadable");
                return Observation::Unmatched(format!("status {}, unreadable body: {}", status, e));
            }
        };

        if status != self.expected_status {
            trace!(url = %self.url, status, expected = self.expected_status, "Unexpected status");
            return Observation::Unmatched(format!("status {}", status));
        }
        if let Some(text) = &self.body_contains {
            if !body.contains(text.as_str()) {
                return Observation::Unmatched(format!("status {}, body missing {:?}", status, text));
            }
        }
        Observation::Matched(body)
    }
}
