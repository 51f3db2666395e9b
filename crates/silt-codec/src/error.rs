use thiserror::Error;

/// Errors produced while encoding or decoding the wire format.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The response status was well-formed but outside the set the caller
    /// declared for this operation. Never retried.
    #[error("unexpected status {status} (expected one of {expected:?})")]
    UnexpectedStatus {
        status: u16,
        expected: Vec<u16>,
        body: String,
    },

    #[error("metadata does not fit the wire format: {0}")]
    InvalidHeader(String),

    #[error("index field {field:?} carries a non-integer value {token:?}")]
    InvalidIndexValue { field: String, token: String },
}

pub type CodecResult<T> = Result<T, CodecError>;
