// ABOUTME: Transport abstraction for talking to the bucket service.
// ABOUTME: Re-exports the HTTP transport implementation.

mod http;

pub use http::{HttpTransport, MULTI_TOKEN_REQUEST_PATH};

use async_trait::async_trait;

use crate::bucket::{BatchRequest, BatchResponse};
use crate::context::RequestContext;
use crate::error::TransportError;

/// Per-call dispatch options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallOptions {
    /// Surface an unreachable service immediately instead of waiting for it
    /// to come back until the context is done.
    pub fail_fast: bool,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self { fail_fast: true }
    }
}

impl CallOptions {
    /// Wait for the service to become reachable, bounded by the call's context.
    pub fn wait_for_ready() -> Self {
        Self { fail_fast: false }
    }
}

/// Trait for bucket service transport implementations.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a batch request and receive the service's answer.
    ///
    /// Implementations must give up with [`TransportError::Context`] once
    /// `ctx` is done.
    async fn multi_token_request(
        &self,
        ctx: &RequestContext,
        request: BatchRequest,
        options: CallOptions,
    ) -> Result<BatchResponse, TransportError>;

    /// Shutdown the transport.
    async fn shutdown(&self) -> Result<(), TransportError>;
}
