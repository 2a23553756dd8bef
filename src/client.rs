//! Authenticated put.io REST client.
//!
//! A thin wrapper around a configured `reqwest::Client`. Every request
//! carries the OAuth token as a bearer `Authorization` header. No timeout
//! and no retries are configured: one call either succeeds or fails the
//! operation that issued it.

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::feed::FeedEnvelope;

/// The public put.io API.
pub const DEFAULT_BASE_URL: &str = "https://api.put.io";

const USER_AGENT: &str = concat!("hemmer-provider-putio/", env!("CARGO_PKG_VERSION"));

/// Errors returned by [`PutioClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// The base URL or a request path could not be parsed.
    #[error("invalid put.io URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The token cannot be sent as an HTTP header.
    #[error("invalid OAuth token: {0}")]
    InvalidToken(#[from] header::InvalidHeaderValue),

    /// Building, sending, or reading the request failed.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// put.io answered with a non-2xx status.
    #[error("put.io returned HTTP {status}: {message}")]
    Status {
        /// The HTTP status code.
        status: u16,
        /// put.io's error message, or the raw body when it sent none.
        message: String,
    },

    /// The response body did not have the expected shape.
    #[error("unexpected put.io response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Error payload put.io sends with non-2xx responses.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiErrorBody {
    error_type: Option<String>,
    error_message: Option<String>,
}

/// Response of `GET /v2/oauth2/validate`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TokenInfo {
    /// put.io's status string, `"OK"` on success.
    pub result: Option<String>,
    /// The id of the validated token.
    pub token_id: Option<i64>,
    /// The account the token belongs to.
    pub user_id: Option<i64>,
}

/// Client for the put.io v2 API.
#[derive(Debug, Clone)]
pub struct PutioClient {
    base_url: Url,
    http: Client,
}

impl PutioClient {
    /// Build a client for `base_url` authenticated with `token`.
    ///
    /// A path in `base_url` is kept as a prefix of every endpoint, so
    /// `http://proxy/putio` sends feeds to `http://proxy/putio/v2/rss/...`.
    pub fn new(token: &str, base_url: &str) -> Result<Self, ClientError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let prefixed = format!("{}/", base_url.path());
            base_url.set_path(&prefixed);
        }

        let mut authorization = HeaderValue::from_str(&format!("Bearer {}", token))?;
        authorization.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, authorization);
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(headers)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { base_url, http })
    }

    /// The API root this client talks to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Check that the token is accepted by put.io.
    #[instrument(skip(self), name = "putio.validate_token")]
    pub async fn validate_token(&self) -> Result<TokenInfo, ClientError> {
        let url = self.endpoint("v2/oauth2/validate")?;
        let body = self.send(self.http.get(url)).await?;
        decode(&body)
    }

    /// Create a feed from an already form-encoded body.
    #[instrument(skip(self, form), name = "putio.create_feed")]
    pub async fn create_feed(&self, form: String) -> Result<FeedEnvelope, ClientError> {
        let url = self.endpoint("v2/rss/create")?;
        let request = self
            .http
            .post(url)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(header::CONTENT_LENGTH, form.len())
            .body(form);
        let body = self.send(request).await?;
        decode(&body)
    }

    /// Fetch one feed.
    #[instrument(skip(self), name = "putio.get_feed")]
    pub async fn get_feed(&self, id: u64) -> Result<FeedEnvelope, ClientError> {
        let url = self.endpoint(&format!("v2/rss/{}", id))?;
        let body = self.send(self.http.get(url)).await?;
        decode(&body)
    }

    /// Delete one feed. The response body is ignored.
    #[instrument(skip(self), name = "putio.delete_feed")]
    pub async fn delete_feed(&self, id: u64) -> Result<(), ClientError> {
        let url = self.endpoint(&format!("v2/rss/{}/delete", id))?;
        self.send(self.http.post(url)).await?;
        Ok(())
    }

    /// `path` is relative to the base URL.
    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base_url.join(path)?)
    }

    /// Send a request and return the body of a 2xx response.
    async fn send(&self, request: RequestBuilder) -> Result<String, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        debug!(status = status.as_u16(), url = %response.url(), "put.io responded");

        let body = response.text().await?;
        if status.is_success() {
            return Ok(body);
        }

        Err(ClientError::Status {
            status: status.as_u16(),
            message: error_message(&body, status.canonical_reason()),
        })
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ClientError> {
    Ok(serde_json::from_str(body)?)
}

/// Pick the most useful message out of an error response body.
fn error_message(body: &str, reason: Option<&str>) -> String {
    let parsed: ApiErrorBody = serde_json::from_str(body).unwrap_or_default();
    match (parsed.error_type, parsed.error_message) {
        (Some(kind), Some(message)) => format!("{} ({})", message, kind),
        (None, Some(message)) => message,
        (Some(kind), None) => kind,
        (None, None) if !body.trim().is_empty() => body.trim().to_string(),
        (None, None) => reason.unwrap_or("Unknown").to_string(),
    }
}
