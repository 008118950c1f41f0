use crate::config::ResponderConfig;
use crate::error::ResponderError;
use crate::types::{RelayRequest, Reply};
use async_trait::async_trait;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::Client;
use std::str::Utf8Error;
use std::time::Duration;

/// Body the responder returns when it has nothing to say.
pub const NO_REPLY_SENTINEL: &str = "No Message";

/// Everything but RFC 3986 unreserved characters gets escaped.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

#[async_trait]
pub trait Responder: Send + Sync {
    async fn ask(&self, request: &RelayRequest) -> Result<Reply, ResponderError>;
}

pub fn encode_query_value(value: &str) -> String {
    utf8_percent_encode(value, QUERY_VALUE).to_string()
}

pub fn decode_query_value(value: &str) -> Result<String, Utf8Error> {
    percent_decode_str(value)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
}

pub fn build_request_url(endpoint: &str, request: &RelayRequest) -> String {
    let separator = if endpoint.contains('?') { '&' } else { '?' };
    format!(
        "{}{}q={}&chat_id={}",
        endpoint,
        separator,
        encode_query_value(&request.text),
        encode_query_value(request.chat.as_str())
    )
}

/// Single best-effort GET against the external responder. No retries.
#[derive(Debug, Clone)]
pub struct HttpResponder {
    client: Client,
    endpoint: String,
}

impl HttpResponder {
    pub fn new(cfg: &ResponderConfig) -> reqwest::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self::with_client(client, cfg.url.clone()))
    }

    pub fn with_client(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl Responder for HttpResponder {
    async fn ask(&self, request: &RelayRequest) -> Result<Reply, ResponderError> {
        let url = build_request_url(&self.endpoint, request);
        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ResponderError::Status { status, body });
        }
        let body = resp.text().await?;
        Ok(Reply::from_body(body, NO_REPLY_SENTINEL))
    }
}
