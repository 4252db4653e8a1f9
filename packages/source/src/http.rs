//! Single-shot HTTP attempts.
//!
//! The fetcher never retries a `(partition, path)` pair, so unlike a
//! general-purpose client this layer sends exactly one request per call,
//! bounded by the attempt timeout, and classifies the outcome. Falling
//! back to the next attempt is the fetcher's job.
//!
//! # Usage
//!
//! ```ignore
//! let transport = HttpTransport::new()?;
//! let body = transport.get_json(&request).await?;
//! ```

use std::time::Duration;

use async_trait::async_trait;

use crate::SourceError;

/// Maximum length of the response body preview included in error logs.
const BODY_PREVIEW_LEN: usize = 500;

/// A fully-built GET request for one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRequest {
    /// Final URL, query string included and rewritten for the network path.
    pub url: String,
    /// Request headers (client identification, static headers, credential).
    pub headers: Vec<(String, String)>,
    /// Forward proxy, for `http_proxy` paths.
    pub proxy: Option<String>,
    /// Attempt timeout.
    pub timeout: Duration,
    /// Log-safe description (never contains the credential).
    pub label: String,
}

/// First [`BODY_PREVIEW_LEN`] characters of a body, for logs.
fn body_preview(text: &str) -> String {
    match text.char_indices().nth(BODY_PREVIEW_LEN) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Sends attempt requests.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `request` once and parses the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] on connection failure, timeout, non-2xx
    /// status, or an undecodable body.
    async fn get_json(&self, request: &AttemptRequest) -> Result<serde_json::Value, SourceError>;
}

/// [`Transport`] backed by `reqwest`.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Builds the shared client used by direct and relay paths.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the client cannot be built.
    pub fn new() -> Result<Self, SourceError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self { client })
    }

    fn client_for(&self, request: &AttemptRequest) -> Result<reqwest::Client, SourceError> {
        match &request.proxy {
            None => Ok(self.client.clone()),
            Some(proxy_url) => Ok(reqwest::Client::builder()
                .proxy(reqwest::Proxy::all(proxy_url)?)
                .build()?),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_json(&self, request: &AttemptRequest) -> Result<serde_json::Value, SourceError> {
        let client = self.client_for(request)?;

        let mut builder = client.get(&request.url).timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        // Strip the URL from transport errors: it may carry a credential.
        let response = builder
            .send()
            .await
            .map_err(|e| SourceError::Http(e.without_url()))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                label: request.label.clone(),
            });
        }

        // Read the raw body as text first, then parse as JSON.
        // This lets us log the actual response content on failure.
        let text = response
            .text()
            .await
            .map_err(|e| SourceError::Http(e.without_url()))?;
        serde_json::from_str(&text).map_err(|e| {
            let preview = body_preview(&text);
            log::debug!(
                "JSON parse failed.\n  \
                 attempt: {}\n  \
                 status: {status}\n  \
                 content-type: {content_type:?}\n  \
                 received: {} bytes\n  \
                 parse error: {e}\n  \
                 body preview: {preview}",
                request.label,
                text.len(),
            );
            SourceError::Json(e)
        })
    }
}
