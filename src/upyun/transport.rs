//! HTTP transport used by the dispatcher
//!
//! The dispatcher only needs "send this request, give me status, headers and
//! the whole body". `HyperTransport` is the production implementation:
//! - HTTP/1.1 over a pooled hyper client
//! - TCP_NODELAY and keepalive on the connector
//! - optional per-request timeout covering send and body collection

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::HeaderMap;
use hyper::{Request, StatusCode};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client as HyperClient;
use hyper_util::rt::TokioExecutor;
use std::time::Duration;

use crate::upyun::error::{Result, UpYunError};

/// Fully collected reply
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RawResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Header value as text, `None` when absent or not visible ASCII
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Something that can execute a signed request
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn execute(&self, request: Request<Full<Bytes>>) -> Result<RawResponse>;
}

/// Transport settings
#[derive(Debug, Clone)]
pub struct TransportOptions {
    /// Whole-request timeout; `None` waits until the server answers
    pub timeout: Option<Duration>,
    pub connect_timeout: Duration,
    pub pool_idle_timeout: Duration,
    pub pool_max_idle_per_host: usize,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(300)),
            connect_timeout: Duration::from_secs(10),
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 32,
        }
    }
}

/// Hyper-backed transport
///
/// Clone is cheap - the underlying client shares its connection pool.
#[derive(Clone)]
pub struct HyperTransport {
    client: HyperClient<HttpConnector, Full<Bytes>>,
    timeout: Option<Duration>,
}

impl HyperTransport {
    pub fn new(options: TransportOptions) -> Self {
        let mut http = HttpConnector::new();
        http.set_nodelay(true);
        http.set_connect_timeout(Some(options.connect_timeout));
        http.set_keepalive(Some(Duration::from_secs(90)));

        let client = HyperClient::builder(TokioExecutor::new())
            .pool_idle_timeout(options.pool_idle_timeout)
            .pool_max_idle_per_host(options.pool_max_idle_per_host)
            .set_host(true)
            .build(http);

        Self {
            client,
            timeout: options.timeout,
        }
    }

    async fn send(&self, request: Request<Full<Bytes>>) -> Result<RawResponse> {
        let response = self.client.request(request).await?;
        let status = response.status();
        let (parts, body) = response.into_parts();
        let body = body.collect().await?.to_bytes();

        Ok(RawResponse {
            status,
            headers: parts.headers,
            body,
        })
    }
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new(TransportOptions::default())
    }
}

#[async_trait]
impl Transport for HyperTransport {
    async fn execute(&self, request: Request<Full<Bytes>>) -> Result<RawResponse> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.send(request))
                .await
                .map_err(|_| UpYunError::Timeout(limit))?,
            None => self.send(request).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_str() {
        let mut response = RawResponse::new(StatusCode::OK, "");
        response
            .headers
            .insert("x-upyun-width", "100".parse().unwrap());
        assert_eq!(response.header_str("x-upyun-width"), Some("100"));
        assert_eq!(response.header_str("X-UpYun-Width"), Some("100"));
        assert_eq!(response.header_str("x-upyun-height"), None);
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        // Bind then drop to get a port nothing listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = HyperTransport::new(TransportOptions {
            timeout: Some(Duration::from_secs(5)),
            ..TransportOptions::default()
        });
        let request = Request::get(format!("http://{}/demo/", addr))
            .body(Full::new(Bytes::new()))
            .unwrap();

        let err = transport.execute(request).await.unwrap_err();
        assert!(matches!(err, UpYunError::Transport(_)), "got {err:?}");
    }
}
