use std::fmt;
use std::future::Future;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::{CONTENT_TYPE, COOKIE};
use hyper::{Method, Request, Uri};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SyncRequest {
    pub delta: u64,
}

/// The authority's reply. `total` is optional on the wire: the server sends
/// `null` for empty deltas, and a reply without a usable total is treated as
/// undelivered no matter what the status line said.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SyncResponse {
    #[serde(default)]
    pub total: Option<i64>,
}

#[derive(Debug)]
pub enum SyncError {
    /// The request could not be completed at all.
    Transport(String),
    /// The authority answered with a non-success status.
    Status(u16),
    /// The authority answered, but not with a numeric total.
    MalformedResponse,
    /// The configured endpoint is not a valid URI.
    BadEndpoint(String),
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::Transport(err) => write!(f, "transport failure: {err}"),
            SyncError::Status(code) => write!(f, "authority replied with status {code}"),
            SyncError::MalformedResponse => write!(f, "authority reply had no numeric total"),
            SyncError::BadEndpoint(err) => write!(f, "bad sync endpoint: {err}"),
        }
    }
}

impl std::error::Error for SyncError {}

/// The remote score authority, seen from the session.
///
/// Two separate capabilities: `push_delta` is awaited and
/// confirmed; `push_detached` is the unload beacon, fire-and-forget, and its
/// delivery is never observed.
pub trait ScoreAuthority: Send + Sync + 'static {
    fn push_delta(&self, delta: u64) -> impl Future<Output = Result<u64, SyncError>> + Send;

    /// Must not block; callers use it only while tearing down. Requires a
    /// running tokio runtime.
    fn push_detached(&self, delta: u64);
}

/// HTTP client for the score endpoint: `POST {"delta": n}`, cookie
/// credential attached when configured, `{"total": n}` expected back.
#[derive(Clone, Debug)]
pub struct HttpScoreAuthority {
    client: Client<HttpConnector, Full<Bytes>>,
    endpoint: Uri,
    cookie: Option<String>,
}

impl HttpScoreAuthority {
    pub fn new(endpoint: &str, cookie: Option<String>) -> Result<Self, SyncError> {
        let endpoint: Uri = endpoint
            .parse()
            .map_err(|err: hyper::http::uri::InvalidUri| SyncError::BadEndpoint(err.to_string()))?;
        let client = Client::builder(TokioExecutor::new()).build_http();
        Ok(Self {
            client,
            endpoint,
            cookie,
        })
    }

    async fn send(&self, delta: u64) -> Result<u64, SyncError> {
        let body = serde_json::to_vec(&SyncRequest { delta })
            .map_err(|err| SyncError::Transport(err.to_string()))?;

        let mut request = Request::builder()
            .method(Method::POST)
            .uri(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json");
        if let Some(cookie) = &self.cookie {
            request = request.header(COOKIE, cookie.as_str());
        }
        let request = request
            .body(Full::new(Bytes::from(body)))
            .map_err(|err| SyncError::Transport(err.to_string()))?;

        let response = self
            .client
            .request(request)
            .await
            .map_err(|err| SyncError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Status(status.as_u16()));
        }

        let bytes = response
            .into_body()
            .collect()
            .await
            .map_err(|err| SyncError::Transport(err.to_string()))?
            .to_bytes();
        let parsed: SyncResponse =
            serde_json::from_slice(&bytes).map_err(|_| SyncError::MalformedResponse)?;

        match parsed.total {
            Some(total) if total >= 0 => Ok(total as u64),
            _ => Err(SyncError::MalformedResponse),
        }
    }
}

impl ScoreAuthority for HttpScoreAuthority {
    fn push_delta(&self, delta: u64) -> impl Future<Output = Result<u64, SyncError>> + Send {
        self.send(delta)
    }

    fn push_detached(&self, delta: u64) {
        debug!(delta, "detached score send");
        let authority = self.clone();
        tokio::spawn(async move {
            // Best effort by contract: the outcome is dropped either way.
            let _ = authority.send(delta).await;
        });
    }
}
