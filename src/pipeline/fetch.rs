//! Document fetch: download the source PDF into memory.
//!
//! The whole body is buffered before anything is returned, so later stages
//! only ever see a complete document. The client-level timeout is the stage
//! deadline; when it fires the in-flight request is dropped and the run fails
//! with [`ReviewError::Fetch`].

use crate::config::FetchSettings;
use crate::error::ReviewError;
use crate::model::RawDocument;
use std::time::Duration;
use tracing::{debug, info};

/// Check if the input string looks like a URL this fetcher can retrieve.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Downloads source documents over HTTP(S).
#[derive(Clone, Debug)]
pub struct DocumentFetcher {
    client: reqwest::Client,
    timeout_secs: u64,
    max_bytes: u64,
}

impl DocumentFetcher {
    pub fn new(settings: &FetchSettings) -> Result<Self, ReviewError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| {
                ReviewError::Configuration(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            timeout_secs: settings.timeout_secs,
            max_bytes: settings.max_bytes,
        })
    }

    /// Retrieve the full body at `url`.
    ///
    /// Fails on unsupported schemes, transport errors, non-2xx statuses,
    /// timeouts and bodies larger than the configured ceiling.
    pub async fn fetch(&self, url: &str) -> Result<RawDocument, ReviewError> {
        if !is_url(url) {
            return Err(ReviewError::fetch(url, "not an HTTP/HTTPS URL"));
        }

        info!(url, "Downloading source document");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error(url, e))?;

        if !response.status().is_success() {
            return Err(ReviewError::fetch(url, format!("HTTP {}", response.status())));
        }

        if let Some(len) = response.content_length() {
            if len > self.max_bytes {
                return Err(self.too_large(url, len));
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(url, e))?;

        // Content-Length may be absent (chunked encoding).
        if bytes.len() as u64 > self.max_bytes {
            return Err(self.too_large(url, bytes.len() as u64));
        }

        debug!(url, bytes = bytes.len(), "Download complete");

        Ok(RawDocument {
            source: url.to_string(),
            bytes: bytes.to_vec(),
        })
    }

    fn transport_error(&self, url: &str, e: reqwest::Error) -> ReviewError {
        if e.is_timeout() {
            ReviewError::fetch(url, format!("timed out after {}s", self.timeout_secs))
        } else {
            ReviewError::fetch(url, e.to_string())
        }
    }

    fn too_large(&self, url: &str, len: u64) -> ReviewError {
        ReviewError::fetch(
            url,
            format!("document is {len} bytes, limit is {}", self.max_bytes),
        )
    }
}
