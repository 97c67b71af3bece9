// ABOUTME: HTTP transport for the bucket service.
// ABOUTME: POSTs JSON batch requests, optionally over mutual TLS.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;

use super::{CallOptions, Transport};
use crate::bucket::{BatchRequest, BatchResponse};
use crate::config::ClientConfig;
use crate::context::RequestContext;
use crate::error::TransportError;
use crate::tls::TlsCredentials;

/// Path of the batch endpoint, relative to the service base URL.
pub const MULTI_TOKEN_REQUEST_PATH: &str = "v1/multi-token-request";

/// Pause between dispatch attempts while waiting for an unreachable service.
const WAIT_FOR_READY_PAUSE: Duration = Duration::from_millis(100);

/// HTTP transport - one JSON request/response exchange per batch.
///
/// The service is addressed as `host:port` (scheme chosen by whether TLS is
/// configured) or by a full URL.
pub struct HttpTransport {
    endpoint_url: reqwest::Url,
    http_client: reqwest::Client,
    closed: AtomicBool,
}

impl HttpTransport {
    /// Connect to the bucket service described by `config`.
    ///
    /// Without `tls` the connection is plaintext. The service must accept a
    /// TCP connection within the configured dial timeout.
    pub async fn connect(
        config: &ClientConfig,
        tls: Option<TlsCredentials>,
    ) -> Result<Self, TransportError> {
        let base_url = resolve_base_url(&config.remote, tls.is_some())?;
        let endpoint_url = base_url
            .join(MULTI_TOKEN_REQUEST_PATH)
            .map_err(|e| TransportError::Connection(format!("Invalid URL: {}", e)))?;

        let mut builder = reqwest::Client::builder()
            .connect_timeout(config.dial_timeout)
            .user_agent(format!("tokenbucket-client/{}", env!("CARGO_PKG_VERSION")));

        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        if let Some(tls) = tls {
            builder = builder
                .use_rustls_tls()
                .tls_built_in_root_certs(false)
                .add_root_certificate(tls.root_ca)
                .identity(tls.identity);
        }

        let http_client = builder.build().map_err(|e| {
            TransportError::Connection(format!("Failed to create HTTP client: {}", e))
        })?;

        check_reachable(&base_url, config.dial_timeout).await?;

        tracing::debug!(endpoint = %endpoint_url, "connected to token bucket service");

        Ok(Self {
            endpoint_url,
            http_client,
            closed: AtomicBool::new(false),
        })
    }

    /// Get the batch endpoint URL.
    pub fn endpoint_url(&self) -> &str {
        self.endpoint_url.as_str()
    }

    /// One POST of `request` to the batch endpoint.
    async fn dispatch(&self, request: &BatchRequest) -> Result<BatchResponse, TransportError> {
        let request_id = uuid::Uuid::new_v4().to_string();
        tracing::trace!(%request_id, requests = request.len(), "dispatching batch");

        let response = self
            .http_client
            .post(self.endpoint_url.clone())
            .header("Accept", "application/json")
            .header("X-Request-Id", &request_id)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    TransportError::Unavailable(e.to_string())
                } else {
                    TransportError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    tracing::debug!(
                        status = status.as_u16(),
                        error = %e,
                        "cannot read error body"
                    );
                    String::new()
                }
            };
            return Err(TransportError::Status {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body)
            .map_err(|e| TransportError::Protocol(format!("Invalid batch response: {}", e)))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn multi_token_request(
        &self,
        ctx: &RequestContext,
        request: BatchRequest,
        options: CallOptions,
    ) -> Result<BatchResponse, TransportError> {
        loop {
            if self.closed.load(Ordering::Acquire) {
                return Err(TransportError::Closed);
            }

            let result = tokio::select! {
                biased;
                reason = ctx.cancelled() => return Err(reason.into()),
                result = self.dispatch(&request) => result,
            };

            match result {
                Err(TransportError::Unavailable(message)) if !options.fail_fast => {
                    tracing::debug!(%message, "service unavailable, waiting for it to recover");
                    tokio::select! {
                        biased;
                        reason = ctx.cancelled() => return Err(reason.into()),
                        () = tokio::time::sleep(WAIT_FOR_READY_PAUSE) => {}
                    }
                }
                other => return other,
            }
        }
    }

    async fn shutdown(&self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

/// Base URL of the service with a trailing slash, so endpoint paths join under it.
fn resolve_base_url(remote: &str, tls: bool) -> Result<reqwest::Url, TransportError> {
    let raw = if remote.contains("://") {
        remote.to_string()
    } else {
        let scheme = if tls { "https" } else { "http" };
        format!("{}://{}", scheme, remote)
    };

    let mut url = reqwest::Url::parse(&raw)
        .map_err(|e| TransportError::Connection(format!("Invalid address {}: {}", remote, e)))?;

    if url.host_str().is_none() {
        return Err(TransportError::Connection(format!(
            "Invalid address {}: missing host",
            remote
        )));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}

/// Check that the service accepts TCP connections.
async fn check_reachable(url: &reqwest::Url, dial_timeout: Duration) -> Result<(), TransportError> {
    let host = url
        .host_str()
        .map(|h| h.trim_start_matches('[').trim_end_matches(']'))
        .ok_or_else(|| TransportError::Connection("missing host".into()))?;
    let port = url
        .port_or_known_default()
        .ok_or_else(|| TransportError::Connection(format!("No port for {}", url)))?;

    match tokio::time::timeout(dial_timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(_stream)) => Ok(()),
        Ok(Err(e)) => Err(TransportError::Connection(format!(
            "{}:{} unreachable: {}",
            host, port, e
        ))),
        Err(_) => Err(TransportError::Connection(format!(
            "{}:{} did not answer within {:?}",
            host, port, dial_timeout
        ))),
    }
}
