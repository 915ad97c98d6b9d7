use std::error::Error as _;
use std::future::Future;

use bytes::Bytes;
use common::{CompactResponse, ErrorResponse, GetResult, PutRequest, PutResponse};
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

/// How a key is placed into the `get/{key}` path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KeyEncoding {
    /// Appended verbatim. Reserved characters such as `/` or `?` change the
    /// request target, exactly as the store's browser client does.
    #[default]
    Raw,
    /// Pushed as a single percent-encoded path segment.
    Percent,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub key_encoding: KeyEncoding,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            key_encoding: KeyEncoding::default(),
        }
    }

    pub fn with_key_encoding(mut self, key_encoding: KeyEncoding) -> Self {
        self.key_encoding = key_encoding;
        self
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid server base url {url}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("failed to build request url for key {key}: {reason}")]
    InvalidKeyUrl { key: String, reason: String },
    #[error(transparent)]
    Request(#[from] reqwest::Error),
    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl TransportError {
    /// The error text followed by every distinct cause in its source chain.
    pub fn describe(&self) -> String {
        let mut text = self.to_string();
        let mut source = self.source();
        while let Some(cause) = source {
            let cause_text = cause.to_string();
            if !text.contains(&cause_text) {
                text.push_str(": ");
                text.push_str(&cause_text);
            }
            source = cause.source();
        }
        text
    }
}

/// A response that reached the store and carried a JSON body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiReply<T> {
    Success(T),
    Rejected { status: u16, error: String },
}

/// The three store endpoints. `KvClient` is the HTTP implementation.
pub trait KvApi {
    fn put(
        &self,
        request: &PutRequest,
    ) -> impl Future<Output = Result<ApiReply<PutResponse>, TransportError>> + Send;

    fn get(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<ApiReply<GetResult>, TransportError>> + Send;

    fn compact(
        &self,
    ) -> impl Future<Output = Result<ApiReply<CompactResponse>, TransportError>> + Send;
}

#[derive(Debug, Clone)]
pub struct KvClient {
    http: Client,
    base_url: Url,
    key_encoding: KeyEncoding,
}

impl KvClient {
    pub fn new(config: ClientConfig) -> Result<Self, TransportError> {
        Ok(Self {
            http: Client::new(),
            base_url: normalize_base_url(&config.base_url)?,
            key_encoding: config.key_encoding,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn get_url(&self, key: &str) -> Result<Url, TransportError> {
        match self.key_encoding {
            KeyEncoding::Raw => Url::parse(&format!("{}get/{key}", self.base_url)).map_err(|err| {
                TransportError::InvalidKeyUrl {
                    key: key.to_string(),
                    reason: err.to_string(),
                }
            }),
            KeyEncoding::Percent => {
                // `.` and `..` (even as `%2E`) are dot segments that URL
                // parsing removes, so they cannot be sent as a key segment.
                if matches!(key, "." | "..") {
                    return Err(TransportError::InvalidKeyUrl {
                        key: key.to_string(),
                        reason: "dot segments cannot be sent as a path segment".to_string(),
                    });
                }
                let mut url = self.endpoint_url("get/")?;
                url.path_segments_mut()
                    .map_err(|_| TransportError::InvalidKeyUrl {
                        key: key.to_string(),
                        reason: "base url cannot be used for path segments".to_string(),
                    })?
                    .pop_if_empty()
                    .push(key);
                Ok(url)
            }
        }
    }

    fn endpoint_url(&self, path: &str) -> Result<Url, TransportError> {
        self.base_url
            .join(path)
            .map_err(|err| TransportError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: err.to_string(),
            })
    }

    async fn read_reply<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<ApiReply<T>, TransportError> {
        let status = response.status();
        let body = response.bytes().await?;
        debug!(%status, body_len = body.len(), "store replied");
        decode_reply(status, &body)
    }
}

impl KvApi for KvClient {
    async fn put(&self, request: &PutRequest) -> Result<ApiReply<PutResponse>, TransportError> {
        let url = self.endpoint_url("put")?;
        debug!(%url, key = %request.key, "sending put");

        let response = self.http.post(url).json(request).send().await?;
        Self::read_reply(response).await
    }

    async fn get(&self, key: &str) -> Result<ApiReply<GetResult>, TransportError> {
        let url = self.get_url(key)?;
        debug!(%url, key = %key, "sending get");

        let response = self.http.get(url).send().await?;
        Self::read_reply(response).await
    }

    async fn compact(&self) -> Result<ApiReply<CompactResponse>, TransportError> {
        let url = self.endpoint_url("compact")?;
        debug!(%url, "sending compact");

        let response = self.http.post(url).send().await?;
        Self::read_reply(response).await
    }
}

/// Bodies are decoded before the status is looked at: a body that is not
/// JSON fails the call whatever the status was.
fn decode_reply<T: DeserializeOwned>(
    status: StatusCode,
    body: &Bytes,
) -> Result<ApiReply<T>, TransportError> {
    if status.is_success() {
        return Ok(ApiReply::Success(serde_json::from_slice(body)?));
    }

    let payload: ErrorResponse = serde_json::from_slice(body)?;
    let error = payload.error.unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    });

    Ok(ApiReply::Rejected {
        status: status.as_u16(),
        error,
    })
}

fn normalize_base_url(input: &str) -> Result<Url, TransportError> {
    let trimmed = input.trim();
    let with_scheme = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };
    let url = if with_scheme.ends_with('/') {
        with_scheme
    } else {
        format!("{with_scheme}/")
    };

    Url::parse(&url).map_err(|err| TransportError::InvalidBaseUrl {
        url: input.to_string(),
        reason: err.to_string(),
    })
}
