// ABOUTME: Serializer module for gating access to a shared connection.
// ABOUTME: Admits one request at a time without waiting past a caller's deadline.

mod serializer;

pub use serializer::{RequestSerializer, SerializerPermit};
