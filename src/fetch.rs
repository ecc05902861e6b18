// Retrying JSON fetcher.
//
// One `Transport` call is one network attempt. `RetryingFetcher` layers
// the retry policy on top: transient statuses and network failures are
// retried with exponential backoff, anything else ends the fetch at once.

use std::io::Read;
use std::time::Duration;

use async_trait::async_trait;
use flate2::read::GzDecoder;
use serde_json::Value;

use crate::config::{RetryPolicy, USER_AGENT};
use crate::error::{FetchError, TransportError};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Raw result of a single HTTP GET.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    /// Value of the `Content-Encoding` header, if any.
    pub content_encoding: Option<String>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn json(status: u16, body: &Value) -> Self {
        Self {
            status,
            content_encoding: None,
            body: body.to_string().into_bytes(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            content_encoding: None,
            body: Vec::new(),
        }
    }
}

/// A single network attempt.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<RawResponse, TransportError>;
}

/// reqwest-backed transport. Decompression is left to [`decode_body`] so the
/// client asks for gzip explicitly and receives the raw bytes.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<RawResponse, TransportError> {
        let resp = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT_ENCODING, "gzip")
            .send()
            .await
            .map_err(classify_reqwest)?;

        let status = resp.status().as_u16();
        let content_encoding = resp
            .headers()
            .get(reqwest::header::CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        let body = resp.bytes().await.map_err(classify_reqwest)?.to_vec();

        Ok(RawResponse {
            status,
            content_encoding,
            body,
        })
    }
}

fn classify_reqwest(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_connect() || e.is_request() || e.is_body() {
        TransportError::Connect(e.to_string())
    } else {
        TransportError::Other(e.to_string())
    }
}

/// Decompress a gzip body (by header or by magic bytes) and parse it as JSON.
pub fn decode_body(content_encoding: Option<&str>, body: &[u8]) -> Result<Value, FetchError> {
    let gzipped = content_encoding
        .map(|v| v.trim().eq_ignore_ascii_case("gzip"))
        .unwrap_or(false)
        || body.starts_with(&GZIP_MAGIC);

    if gzipped {
        let mut decoder = GzDecoder::new(body);
        let mut text = String::new();
        decoder
            .read_to_string(&mut text)
            .map_err(|e| FetchError::Decode(format!("gzip: {e}")))?;
        serde_json::from_str(&text).map_err(|e| FetchError::Decode(e.to_string()))
    } else {
        serde_json::from_slice(body).map_err(|e| FetchError::Decode(e.to_string()))
    }
}

/// Fetches JSON documents, retrying transient failures.
pub struct RetryingFetcher<T> {
    transport: T,
    policy: RetryPolicy,
}

impl<T: Transport> RetryingFetcher<T> {
    pub fn new(transport: T, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Fetch `url` and parse the body. Never panics on remote failures.
    pub async fn fetch(&self, url: &str) -> Result<Value, FetchError> {
        let attempts = self.policy.attempts();

        for attempt in 1..=attempts {
            let delay = self.policy.backoff_before(attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let last = attempt == attempts;
            match self.transport.get(url).await {
                Ok(resp) if (200..300).contains(&resp.status) => {
                    return decode_body(resp.content_encoding.as_deref(), &resp.body).map_err(
                        |e| {
                            tracing::error!(url, "Unexpected error: {e}");
                            e
                        },
                    );
                }
                Ok(resp) if self.policy.is_transient_status(resp.status) => {
                    if last {
                        tracing::error!(
                            url,
                            "HTTP {} error persisted after {attempts} attempts. Skipping.",
                            resp.status
                        );
                        return Err(FetchError::Transient {
                            status: resp.status,
                            attempts,
                        });
                    }
                    tracing::warn!(
                        url,
                        "HTTP {} error (attempt {attempt}/{attempts}). Retrying in {:?}...",
                        resp.status,
                        self.policy.backoff_before(attempt + 1)
                    );
                }
                Ok(resp) => {
                    if resp.status == 404 {
                        tracing::debug!(url, "HTTP 404, not found");
                    } else {
                        tracing::error!(url, "HTTP {} error (non-retryable). Skipping.", resp.status);
                    }
                    return Err(FetchError::Permanent {
                        status: resp.status,
                    });
                }
                Err(TransportError::Other(message)) => {
                    tracing::error!(url, "Unexpected error: {message}");
                    return Err(FetchError::Unexpected(message));
                }
                Err(e) => {
                    if last {
                        tracing::error!(
                            url,
                            "Network error persisted after {attempts} attempts: {e}"
                        );
                        return Err(FetchError::Network {
                            message: e.to_string(),
                            attempts,
                        });
                    }
                    tracing::warn!(
                        url,
                        "Network error: {e} (attempt {attempt}/{attempts}). Retrying in {:?}...",
                        self.policy.backoff_before(attempt + 1)
                    );
                }
            }
        }

        Err(FetchError::Unexpected("retry loop exhausted".to_string()))
    }
}
