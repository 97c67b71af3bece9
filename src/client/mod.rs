// ABOUTME: Client module - the public request surface of the bucket service.
// ABOUTME: Serializes calls and resolves answers under a fail-open policy.

mod client;

pub use client::TokenBucketClient;
