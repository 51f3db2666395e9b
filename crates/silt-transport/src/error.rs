use silt_codec::CodecError;
use silt_pool::PoolError;
use silt_types::TypeError;
use thiserror::Error;

/// Errors produced while running a logical operation.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Pool-level connectivity failure (no endpoints, connect refused, ...).
    #[error(transparent)]
    Pool(#[from] PoolError),

    /// The transient-fault retry budget ran out.
    #[error("request failed after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: usize, last: String },

    /// A non-transient socket failure; not retried.
    #[error("connection failed: {0}")]
    Connection(#[source] hyper::Error),

    /// Wire-format failure, including unexpected HTTP statuses.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The response was well-formed HTTP but not what the operation needs
    /// (e.g. a keyless put whose response carries no Location).
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// A JSON endpoint returned a body that does not parse.
    #[error("malformed JSON response: {0}")]
    Json(#[from] serde_json::Error),

    /// Identifier validation failure, raised before any I/O.
    #[error(transparent)]
    Type(#[from] TypeError),

    #[error("could not build request: {0}")]
    Request(#[from] http::Error),
}

pub type TransportResult<T> = Result<T, TransportError>;
