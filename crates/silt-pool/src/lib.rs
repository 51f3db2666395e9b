//! Connection pool for the Silt client.
//!
//! Owns a set of reusable HTTP/1.1 connections to one or more store
//! endpoints. Connections are dialed lazily, lent out exclusively via a
//! drop-guard that gives them back on every exit path, and closed rather
//! than returned when their endpoint has been removed in the meantime.

pub mod conn;
pub mod endpoint;
pub mod error;
pub mod manager;

pub use conn::Connection;
pub use endpoint::Endpoint;
pub use error::{PoolError, PoolResult};
pub use manager::{ConnectionManager, PooledConnection};
