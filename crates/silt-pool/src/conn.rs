use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::client::conn::http1::{self, SendRequest};
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

use crate::endpoint::Endpoint;
use crate::error::{PoolError, PoolResult};

/// One exclusively-owned HTTP/1.1 connection to a store node.
///
/// A connection is never shared by two operations; the pool's take/giveback
/// discipline enforces exclusive ownership for the duration of one request.
pub struct Connection {
    endpoint: Endpoint,
    sender: SendRequest<Full<Bytes>>,
    driver: JoinHandle<()>,
}

impl Connection {
    /// Dial the endpoint and complete the HTTP/1.1 handshake.
    pub async fn dial(endpoint: Endpoint) -> PoolResult<Self> {
        let stream = TcpStream::connect((endpoint.host.as_str(), endpoint.port))
            .await
            .map_err(PoolError::Connect)?;
        let io = TokioIo::new(stream);
        let (sender, conn) = http1::handshake::<_, Full<Bytes>>(io)
            .await
            .map_err(PoolError::Handshake)?;
        let driver = tokio::spawn(async move {
            if let Err(err) = conn.await {
                tracing::debug!(error = %err, "connection closed");
            }
        });
        tracing::debug!(endpoint = %endpoint, "dialed");
        Ok(Self {
            endpoint,
            sender,
            driver,
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Whether the connection can still carry a request.
    pub fn is_open(&self) -> bool {
        !self.sender.is_closed()
    }

    /// Issue one request and wait for the response head.
    ///
    /// The caller must read the response body to its end before the
    /// connection is reused; the transport always reads bodies fully.
    pub async fn send(
        &mut self,
        req: Request<Full<Bytes>>,
    ) -> hyper::Result<Response<Incoming>> {
        self.sender.ready().await?;
        self.sender.send_request(req).await
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        // Dropping the sender hangs up; aborting covers a driver blocked on
        // a peer that never closes.
        self.driver.abort();
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("endpoint", &self.endpoint)
            .field("open", &self.is_open())
            .finish()
    }
}
