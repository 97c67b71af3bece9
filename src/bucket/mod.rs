// ABOUTME: Bucket module - request and response messages of the bucket service.
// ABOUTME: Also holds the admission results handed back to callers.

mod types;

pub use types::*;

#[cfg(test)]
mod types_test;
