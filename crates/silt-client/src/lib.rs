//! Object model for the Silt client.
//!
//! This is the main entry point for applications. A [`Client`] hands out
//! [`Bucket`]s; a bucket hands out [`Record`]s. A record holds zero, one, or
//! many concurrent [`Version`]s of a stored value: zero means not found, one
//! is the resolved state every unified accessor requires, and two or more is
//! the conflicted state produced when concurrent writes diverge. Conflicted
//! records materialize every sibling and hand the whole record to a
//! caller-supplied [`Resolve`] hook.

pub mod bucket;
pub mod client;
pub mod encoding;
pub mod error;
pub mod record;
pub mod resolve;

#[cfg(test)]
mod test_util;

pub use bucket::Bucket;
pub use client::{BucketCachePolicy, Client, ClientConfig, QuorumDefaults};
pub use encoding::CodecRegistry;
pub use error::{ClientError, ClientResult};
pub use record::{Record, Version};
pub use resolve::Resolve;

// Re-export the types callers handle directly.
pub use silt_pool::Endpoint;
pub use silt_transport::{HttpTransport, Transport};
pub use silt_types::{IndexValue, Link, Quorum};
