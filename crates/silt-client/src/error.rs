use silt_transport::TransportError;
use silt_types::TypeError;
use thiserror::Error;

/// Errors produced by the object model.
#[derive(Debug, Error)]
pub enum ClientError {
    /// A unified accessor was used while the record holds more than one
    /// version. Purely a local guard; never causes network I/O.
    #[error("record holds {0} sibling versions; reconcile before accessing unified fields")]
    Conflict(usize),

    /// The operation needs a key and the record has none yet.
    #[error("record has no key")]
    NoKey,

    #[error("no decoder registered for content type {0:?}")]
    NoDecoder(String),

    #[error("no encoder registered for content type {0:?}")]
    NoEncoder(String),

    #[error("payload encoding failed: {0}")]
    Encode(String),

    #[error("payload decoding failed: {0}")]
    Decode(String),

    /// A fetch-by-vtag during sibling materialization came back with
    /// something other than a single version.
    #[error("sibling fetch for vtag {0:?} did not return a single version")]
    SiblingShape(String),

    #[error("no sibling at index {0}")]
    NoSibling(usize),

    /// Identifier validation failure, raised before any network I/O.
    #[error(transparent)]
    Type(#[from] TypeError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

pub type ClientResult<T> = Result<T, ClientError>;
