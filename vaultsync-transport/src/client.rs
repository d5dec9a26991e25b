//! WebDAV client over reqwest.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{CONTENT_TYPE, IF_MODIFIED_SINCE, LAST_MODIFIED};
use reqwest::{Method, RequestBuilder, StatusCode};
use tokio_util::sync::CancellationToken;

use vaultsync_core::{Credentials, RemoteTarget};

use crate::error::TransportError;

/// Content type sent with every upload.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// The two operations the push path needs.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Confirms the server and path are reachable.
    ///
    /// A missing remote file is still a success: it proves the server
    /// answered for that path.
    async fn probe(
        &self,
        target: &RemoteTarget,
        cancel: &CancellationToken,
    ) -> Result<(), TransportError>;

    /// Replaces the remote file with `bytes`.
    async fn upload(
        &self,
        target: &RemoteTarget,
        bytes: Vec<u8>,
        cancel: &CancellationToken,
    ) -> Result<(), TransportError>;
}

/// Result of a conditional download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched {
    /// The server reported the file unchanged since the given instant.
    NotModified,
    /// No file exists at the target yet.
    Missing,
    /// Full file content, plus the server's `Last-Modified` when it sent one.
    Body {
        bytes: Vec<u8>,
        last_modified: Option<DateTime<Utc>>,
    },
}

/// Conditional download used by the startup pull.
#[async_trait]
pub trait RemoteFetch: Send + Sync {
    async fn fetch(
        &self,
        target: &RemoteTarget,
        since: Option<DateTime<Utc>>,
        cancel: &CancellationToken,
    ) -> Result<Fetched, TransportError>;
}

/// Stateless-per-call WebDAV client with HTTP Basic authentication.
#[derive(Debug, Clone)]
pub struct WebDavClient {
    http: reqwest::Client,
    credentials: Credentials,
    propfind: Method,
}

impl WebDavClient {
    pub fn new(credentials: Credentials, timeout: Duration) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;
        let propfind = Method::from_bytes(b"PROPFIND")
            .map_err(|e| TransportError::Client(e.to_string()))?;
        Ok(Self {
            http,
            credentials,
            propfind,
        })
    }

    fn request(&self, method: Method, target: &RemoteTarget) -> RequestBuilder {
        self.http
            .request(method, target.as_str())
            .basic_auth(self.credentials.username(), Some(self.credentials.password()))
    }
}

#[async_trait]
impl RemoteStore for WebDavClient {
    async fn probe(
        &self,
        target: &RemoteTarget,
        cancel: &CancellationToken,
    ) -> Result<(), TransportError> {
        let request = self
            .request(self.propfind.clone(), target)
            .header("Depth", "0");
        let response = send(request.send(), cancel).await?;
        let status = response.status();
        tracing::debug!(url = %target, status = status.as_u16(), "probe response");

        if probe_accepts(status) {
            Ok(())
        } else {
            Err(TransportError::from_status(status))
        }
    }

    async fn upload(
        &self,
        target: &RemoteTarget,
        bytes: Vec<u8>,
        cancel: &CancellationToken,
    ) -> Result<(), TransportError> {
        let len = bytes.len();
        let request = self
            .request(Method::PUT, target)
            .header(CONTENT_TYPE, OCTET_STREAM)
            .body(bytes);
        let response = send(request.send(), cancel).await?;
        let status = response.status();
        tracing::debug!(url = %target, bytes = len, status = status.as_u16(), "upload response");

        if status.is_success() {
            Ok(())
        } else {
            Err(TransportError::from_status(status))
        }
    }
}

#[async_trait]
impl RemoteFetch for WebDavClient {
    async fn fetch(
        &self,
        target: &RemoteTarget,
        since: Option<DateTime<Utc>>,
        cancel: &CancellationToken,
    ) -> Result<Fetched, TransportError> {
        let mut request = self.request(Method::GET, target);
        if let Some(since) = since {
            request = request.header(IF_MODIFIED_SINCE, http_date(since));
        }
        let response = send(request.send(), cancel).await?;
        let status = response.status();
        tracing::debug!(url = %target, status = status.as_u16(), "fetch response");

        match status {
            StatusCode::NOT_MODIFIED => Ok(Fetched::NotModified),
            StatusCode::NOT_FOUND => Ok(Fetched::Missing),
            s if s.is_success() => {
                let last_modified = response
                    .headers()
                    .get(LAST_MODIFIED)
                    .and_then(|v| v.to_str().ok())
                    .and_then(parse_http_date);
                let bytes = send(response.bytes(), cancel).await?;
                Ok(Fetched::Body {
                    bytes: bytes.to_vec(),
                    last_modified,
                })
            }
            s => Err(TransportError::from_status(s)),
        }
    }
}

/// Drive a reqwest future, giving up as soon as `cancel` fires.
async fn send<T>(
    request: impl Future<Output = Result<T, reqwest::Error>>,
    cancel: &CancellationToken,
) -> Result<T, TransportError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(TransportError::Cancelled),
        result = request => result.map_err(TransportError::from),
    }
}

/// 207, any 2xx, and 404 all prove the path is served.
fn probe_accepts(status: StatusCode) -> bool {
    status == StatusCode::MULTI_STATUS
        || status.is_success()
        || status == StatusCode::NOT_FOUND
}

/// IMF-fixdate, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn parse_http_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
