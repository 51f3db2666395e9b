//! Request orchestration for the Silt client.
//!
//! One logical operation (get, put, delete, listing, query) runs as one or
//! more HTTP requests over a pooled connection: BUILD (codec renders the
//! request) → SEND (pooled connection, full response read) → RETRY (bounded,
//! transient faults only) → PARSE (status-driven decode).
//!
//! The [`Transport`] trait is the seam the object model talks through;
//! [`HttpTransport`] is the real implementation.

pub mod error;
pub mod http;
pub mod traits;
pub mod types;

pub use error::{TransportError, TransportResult};
pub use self::http::HttpTransport;
pub use traits::Transport;
pub use types::{GetResponse, PutResponse};

/// Attempts per logical request, counting the first.
pub const RETRY_COUNT: usize = 3;

/// Default REST path prefix.
pub const DEFAULT_PREFIX: &str = "silt";

/// Default map-reduce path prefix.
pub const DEFAULT_MAPRED_PREFIX: &str = "mapred";
