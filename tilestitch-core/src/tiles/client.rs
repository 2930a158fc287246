use std::fmt::Debug;
#[cfg(feature = "reqwest")]
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::tiles::TileRequest;
#[cfg(feature = "reqwest")]
use crate::tiles::HttpMethod;

/// A failure to talk to the tile server at all.
///
/// Unlike an HTTP error status, these abort the whole mosaic.
#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    /// Errors of the [`ReqwestClient`].
    #[cfg(feature = "reqwest")]
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    /// The connection could not be established or was interrupted.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// An IO error while reading the response.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A response received for one tile request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileResponse {
    /// HTTP status code.
    pub status: u16,
    /// Canonical reason phrase of the status, may be empty.
    pub status_text: String,
    /// Raw response body.
    pub body: Bytes,
}

impl TileResponse {
    /// A `200 OK` response with the given body.
    #[must_use]
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self {
            status: 200,
            status_text: "OK".to_string(),
            body: body.into(),
        }
    }

    /// True for any 2xx status.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Executes tile requests.
///
/// Implementations must be usable from many tasks at once; the fetch
/// orchestrator shares a single client between all tiles of a mosaic.
#[async_trait]
pub trait TileClient: Send + Sync + Debug {
    /// Sends the request and returns whatever the server answered.
    ///
    /// Only failures to obtain a response are errors, HTTP error statuses are
    /// returned as a regular [`TileResponse`].
    async fn execute(&self, request: &TileRequest) -> Result<TileResponse, TransportError>;
}

/// [`TileClient`] backed by [`reqwest`].
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

#[cfg(feature = "reqwest")]
impl ReqwestClient {
    /// Creates a client with a per-request timeout and user agent.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self::from_client(client))
    }

    /// Wraps an already configured [`reqwest::Client`].
    #[must_use]
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[cfg(feature = "reqwest")]
#[async_trait]
impl TileClient for ReqwestClient {
    async fn execute(&self, request: &TileRequest) -> Result<TileResponse, TransportError> {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(request.url.clone()),
            HttpMethod::Post => self.client.post(request.url.clone()),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        Ok(TileResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(200, true)]
    #[case(204, true)]
    #[case(299, true)]
    #[case(304, false)]
    #[case(404, false)]
    #[case(500, false)]
    fn test_is_success(#[case] status: u16, #[case] expected: bool) {
        let response = TileResponse {
            status,
            status_text: String::new(),
            body: Bytes::new(),
        };
        assert_eq!(response.is_success(), expected);
    }

    #[cfg(feature = "reqwest")]
    #[test]
    fn test_reqwest_client_builds() {
        assert!(ReqwestClient::new(Duration::from_secs(5), "tilestitch-test").is_ok());
    }
}
