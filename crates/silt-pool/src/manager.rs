use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex};

use crate::conn::Connection;
use crate::endpoint::Endpoint;
use crate::error::{PoolError, PoolResult};

struct PoolState {
    endpoints: Vec<Endpoint>,
    idle: Vec<Connection>,
}

/// The connection pool.
///
/// Endpoint and free-list bookkeeping is synchronous under one mutex, safe
/// for concurrent take/giveback/remove from multiple tasks; the lock is
/// never held across an await point. Dialing happens outside the lock.
#[derive(Clone)]
pub struct ConnectionManager {
    state: Arc<Mutex<PoolState>>,
}

impl ConnectionManager {
    pub fn new(endpoints: Vec<Endpoint>) -> Self {
        Self {
            state: Arc::new(Mutex::new(PoolState {
                endpoints,
                idle: Vec::new(),
            })),
        }
    }

    /// A pool over a single endpoint.
    pub fn single(host: impl Into<String>, port: u16) -> Self {
        Self::new(vec![Endpoint::new(host, port)])
    }

    pub fn add_endpoint(&self, endpoint: Endpoint) {
        self.state
            .lock()
            .expect("lock poisoned")
            .endpoints
            .push(endpoint);
    }

    /// Drop matching endpoint(s) and close idle connections bound to them.
    ///
    /// Connections currently borrowed are closed on their next giveback.
    pub fn remove_endpoint(&self, host: &str, port: Option<u16>) {
        let mut state = self.state.lock().expect("lock poisoned");
        state.endpoints.retain(|ep| !ep.matches(host, port));
        // Draining drops (closes) the evicted connections.
        state.idle.retain(|conn| !conn.endpoint().matches(host, port));
    }

    /// Current endpoint configuration, in take() preference order.
    pub fn endpoints(&self) -> Vec<Endpoint> {
        self.state.lock().expect("lock poisoned").endpoints.clone()
    }

    /// Number of idle connections held by the pool.
    pub fn idle_count(&self) -> usize {
        self.state.lock().expect("lock poisoned").idle.len()
    }

    /// Borrow a connection: an idle one if available, else a fresh dial
    /// against the first configured endpoint.
    ///
    /// The returned guard gives the connection back on drop, on every exit
    /// path; call [`PooledConnection::discard`] to close it instead.
    pub async fn take(&self) -> PoolResult<PooledConnection> {
        let dial_target = {
            let mut state = self.state.lock().expect("lock poisoned");
            loop {
                match state.idle.pop() {
                    Some(conn) if conn.is_open() => {
                        return Ok(PooledConnection {
                            conn: Some(conn),
                            pool: Arc::clone(&self.state),
                        });
                    }
                    // A peer hung up while the connection sat idle.
                    Some(_) => continue,
                    None => break,
                }
            }
            state.endpoints.first().cloned().ok_or(PoolError::NoEndpoints)?
        };

        let conn = Connection::dial(dial_target).await?;
        Ok(PooledConnection {
            conn: Some(conn),
            pool: Arc::clone(&self.state),
        })
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock().expect("lock poisoned");
        f.debug_struct("ConnectionManager")
            .field("endpoints", &state.endpoints)
            .field("idle", &state.idle.len())
            .finish()
    }
}

/// A borrowed connection.
///
/// Drop performs giveback: the connection returns to the free list only if
/// its endpoint is still configured and it is still open; otherwise it is
/// closed. This runs on every exit path, including unwinding.
pub struct PooledConnection {
    conn: Option<Connection>,
    pool: Arc<Mutex<PoolState>>,
}

impl std::fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection")
            .field("conn", &self.conn)
            .finish()
    }
}

impl PooledConnection {
    /// Close the connection instead of returning it to the pool.
    ///
    /// Used after a request failed on this connection; a subsequent take()
    /// will dial fresh.
    pub fn discard(mut self) {
        if let Some(conn) = self.conn.take() {
            tracing::debug!(endpoint = %conn.endpoint(), "discarding connection");
            drop(conn);
        }
    }
}

impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.conn.as_ref().expect("connection already released")
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Connection {
        self.conn.as_mut().expect("connection already released")
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };
        let mut state = self.pool.lock().expect("lock poisoned");
        let still_configured = state.endpoints.contains(conn.endpoint());
        if still_configured && conn.is_open() {
            state.idle.push(conn);
        }
        // Otherwise the caller's endpoint was removed mid-borrow (or the
        // peer hung up); dropping the connection closes it.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    /// A listener that accepts and parks connections so they stay open.
    async fn parking_listener() -> (String, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut parked = Vec::new();
            loop {
                match listener.accept().await {
                    Ok((sock, _)) => parked.push(sock),
                    Err(_) => break,
                }
            }
        });
        ("127.0.0.1".to_string(), addr.port())
    }

    #[tokio::test]
    async fn take_with_no_endpoints_fails() {
        let pool = ConnectionManager::new(Vec::new());
        let err = pool.take().await.unwrap_err();
        assert!(matches!(err, PoolError::NoEndpoints));
    }

    #[tokio::test]
    async fn take_dials_first_endpoint() {
        let (host, port) = parking_listener().await;
        let pool = ConnectionManager::single(host.clone(), port);
        let conn = pool.take().await.unwrap();
        assert_eq!(conn.endpoint(), &Endpoint::new(host, port));
        assert!(conn.is_open());
    }

    #[tokio::test]
    async fn giveback_returns_connection_to_free_list() {
        let (host, port) = parking_listener().await;
        let pool = ConnectionManager::single(host, port);

        let conn = pool.take().await.unwrap();
        assert_eq!(pool.idle_count(), 0);
        drop(conn);
        assert_eq!(pool.idle_count(), 1);

        // The idle connection is reused, not re-dialed.
        let again = pool.take().await.unwrap();
        assert_eq!(pool.idle_count(), 0);
        drop(again);
        assert_eq!(pool.idle_count(), 1);
    }

    #[tokio::test]
    async fn discard_closes_instead_of_returning() {
        let (host, port) = parking_listener().await;
        let pool = ConnectionManager::single(host, port);
        let conn = pool.take().await.unwrap();
        conn.discard();
        assert_eq!(pool.idle_count(), 0);
    }

    #[tokio::test]
    async fn remove_endpoint_closes_idle_connections() {
        let (host, port) = parking_listener().await;
        let pool = ConnectionManager::single(host.clone(), port);
        drop(pool.take().await.unwrap());
        assert_eq!(pool.idle_count(), 1);

        pool.remove_endpoint(&host, Some(port));
        assert_eq!(pool.idle_count(), 0);
        assert!(pool.endpoints().is_empty());
    }

    #[tokio::test]
    async fn borrowed_connection_is_closed_on_giveback_after_removal() {
        let (host, port) = parking_listener().await;
        let pool = ConnectionManager::single(host.clone(), port);

        let conn = pool.take().await.unwrap();
        pool.remove_endpoint(&host, None);
        drop(conn);
        assert_eq!(pool.idle_count(), 0);
    }

    #[tokio::test]
    async fn remove_by_host_drops_every_port() {
        let (host, port_a) = parking_listener().await;
        let (_, port_b) = parking_listener().await;
        let pool = ConnectionManager::new(vec![
            Endpoint::new(host.clone(), port_a),
            Endpoint::new(host.clone(), port_b),
        ]);
        pool.remove_endpoint(&host, None);
        assert!(pool.endpoints().is_empty());
    }

    #[tokio::test]
    async fn add_endpoint_restores_service() {
        let (host, port) = parking_listener().await;
        let pool = ConnectionManager::new(Vec::new());
        assert!(matches!(pool.take().await, Err(PoolError::NoEndpoints)));

        pool.add_endpoint(Endpoint::new(host, port));
        let conn = pool.take().await.unwrap();
        assert!(conn.is_open());
    }

    #[tokio::test]
    async fn concurrent_takes_get_distinct_connections() {
        let (host, port) = parking_listener().await;
        let pool = ConnectionManager::single(host, port);

        let a = pool.take().await.unwrap();
        let b = pool.take().await.unwrap();
        drop(a);
        drop(b);
        assert_eq!(pool.idle_count(), 2);
    }
}
