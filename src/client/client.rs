// ABOUTME: Token bucket client - builds batch requests and maps answers to grants.
// ABOUTME: Fails open whenever the service gives no usable answer.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::bucket::{Admission, BatchRequest, BatchResponse, BucketRequest, MultiAdmission};
use crate::config::ClientConfig;
use crate::context::RequestContext;
use crate::error::{ClientError, ContextError, TransportError};
use crate::serializer::RequestSerializer;
use crate::tls::TlsCredentials;
use crate::transport::{CallOptions, HttpTransport, Transport};

/// Client for a networked token bucket service.
///
/// One client owns one transport and sends at most one request over it at a
/// time. Concurrent callers queue on an internal gate, but never past their
/// own [`RequestContext`].
///
/// # Fail-open policy
///
/// Whenever the service cannot give a usable answer (unreachable, too slow,
/// error status, empty or misaligned response) the request is treated as
/// granted. Each such resolution is logged at `warn` and counted in
/// [`fail_open_count`](Self::fail_open_count).
pub struct TokenBucketClient {
    transport: Arc<dyn Transport>,
    serializer: RequestSerializer,
    fail_open: AtomicU64,
}

impl TokenBucketClient {
    /// Connect to the bucket service described by `config`.
    ///
    /// TLS is enabled only when all three credential paths are configured.
    pub async fn connect(config: &ClientConfig) -> Result<Self, ClientError> {
        let tls = TlsCredentials::from_paths(&config.tls)?;
        if tls.is_none() {
            tracing::debug!(remote = %config.remote, "TLS disabled, connecting in plaintext");
        }

        let transport = HttpTransport::connect(config, tls).await?;
        Ok(Self::with_transport(Arc::new(transport)))
    }

    /// Build a client over an already established transport.
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            serializer: RequestSerializer::new(),
            fail_open: AtomicU64::new(0),
        }
    }

    /// Number of requests resolved as granted because no usable answer arrived.
    pub fn fail_open_count(&self) -> u64 {
        self.fail_open.load(Ordering::Relaxed)
    }

    /// Send a batch and return the service's answer unchanged.
    ///
    /// Dispatch is fail-fast: an unreachable service is reported at once.
    pub async fn multi_token_request(
        &self,
        ctx: &RequestContext,
        request: BatchRequest,
    ) -> Result<BatchResponse, ClientError> {
        self.submit_batch(ctx, request, CallOptions::default()).await
    }

    /// Send a batch with explicit call options.
    ///
    /// Waits for exclusive use of the transport for as long as `ctx` allows.
    /// If `ctx` is done first, returns its error without contacting the
    /// service. `ctx` also bounds the call itself.
    pub async fn submit_batch(
        &self,
        ctx: &RequestContext,
        request: BatchRequest,
        options: CallOptions,
    ) -> Result<BatchResponse, ClientError> {
        let Some(_permit) = self.serializer.acquire(ctx.cancelled()).await else {
            return Err(ctx.err().unwrap_or(ContextError::Cancelled).into());
        };

        let result = tokio::select! {
            biased;
            reason = ctx.cancelled() => Err(TransportError::Context(reason)),
            result = self.transport.multi_token_request(ctx, request, options) => result,
        };

        result.map_err(|err| match err {
            TransportError::Context(reason) => ClientError::Context(reason),
            other => ClientError::Transport(other),
        })
    }

    /// Ask for `amount` tokens from one bucket.
    ///
    /// Returns the service's verdict for the bucket. If the call fails the
    /// admission is granted and carries the error; if the service answers
    /// with no outcomes at all, it is granted without an error. Only the
    /// first outcome is read.
    pub async fn request_single(
        &self,
        ctx: &RequestContext,
        family: &str,
        name: &str,
        amount: i64,
    ) -> Admission {
        let request = BatchRequest::single(BucketRequest::new(family, name, amount));

        let response = match self.multi_token_request(ctx, request).await {
            Ok(response) => response,
            Err(err) => {
                self.record_fail_open(family, name, &err.to_string());
                return Admission::fail_open(Some(err));
            }
        };

        match response.first() {
            Some(outcome) => {
                tracing::debug!(
                    family,
                    bucket = name,
                    amount,
                    granted = outcome.success,
                    "token request answered"
                );
                Admission::decided(outcome.success)
            }
            None => {
                self.record_fail_open(family, name, "empty response");
                Admission::fail_open(None)
            }
        }
    }

    /// Ask for tokens from several buckets in one call.
    ///
    /// The answer must hold exactly one outcome per request, in order. If it
    /// does not, or the call fails, every position is granted.
    pub async fn request_many(
        &self,
        ctx: &RequestContext,
        requests: Vec<BucketRequest>,
        require_all: bool,
    ) -> MultiAdmission {
        let expected = requests.len();
        if expected == 0 {
            return MultiAdmission {
                granted: Vec::new(),
                error: None,
            };
        }

        let first = requests[0].clone();
        let request = BatchRequest::new(requests, require_all);

        let response = match self.multi_token_request(ctx, request).await {
            Ok(response) => response,
            Err(err) => {
                self.record_fail_open(&first.family, &first.name, &err.to_string());
                return MultiAdmission::fail_open(expected, Some(err));
            }
        };

        if response.len() != expected {
            let cause = format!(
                "misaligned response: {} outcomes for {} requests",
                response.len(),
                expected
            );
            self.record_fail_open(&first.family, &first.name, &cause);
            return MultiAdmission::fail_open(expected, None);
        }

        MultiAdmission {
            granted: response.responses.iter().map(|r| r.success).collect(),
            error: None,
        }
    }

    /// Shutdown the transport.
    pub async fn close(self) -> Result<(), ClientError> {
        self.transport.shutdown().await?;
        Ok(())
    }

    fn record_fail_open(&self, family: &str, name: &str, cause: &str) {
        self.fail_open.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(
            family,
            bucket = name,
            cause,
            "no usable answer from token bucket service, failing open"
        );
    }
}
