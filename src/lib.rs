// ABOUTME: Root module for tokenbucket-client - a client for a token bucket service.
// ABOUTME: Re-exports all public types from submodules.

pub mod bucket;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod prelude;
pub mod serializer;
pub mod tls;
pub mod transport;

pub use client::TokenBucketClient;
pub use context::RequestContext;
pub use error::ClientError;
