use thiserror::Error;

/// Errors produced by the connection pool.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("no endpoints configured")]
    NoEndpoints,

    #[error("connect failed: {0}")]
    Connect(#[source] std::io::Error),

    #[error("handshake failed: {0}")]
    Handshake(#[source] hyper::Error),
}

pub type PoolResult<T> = Result<T, PoolError>;
