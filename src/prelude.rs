// ABOUTME: Prelude module - convenient imports for common use cases.
// ABOUTME: Use `use tokenbucket_client::prelude::*;` to get started quickly.

pub use crate::bucket::{
    Admission, BatchRequest, BatchResponse, BucketRequest, BucketResponse, MultiAdmission,
};
pub use crate::client::TokenBucketClient;
pub use crate::config::{ClientConfig, DEFAULT_PORT, TlsPaths};
pub use crate::context::RequestContext;
pub use crate::error::{ClientError, ContextError, TlsError, TransportError};
pub use crate::serializer::{RequestSerializer, SerializerPermit};
pub use crate::tls::TlsCredentials;
pub use crate::transport::{CallOptions, HttpTransport, Transport};
