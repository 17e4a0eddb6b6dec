//! A DNS over TCP transport.
//!
//! Messages on a stream are preceded by their length as a 16 bit unsigned
//! integer in network byte order. Each exchange writes one request and
//! reads one response.
//!
//! Connections can be kept in a per-server pool. A pooled connection is
//! only handed out again if it is younger than the configured maximum
//! lifetime, still has a peer, and has no unread data waiting. If an
//! exchange on a reused connection fails, the connection is dropped and the
//! exchange is tried again, eventually on a fresh connection. A failure on
//! a fresh connection is returned to the caller.

use super::error::Error;
use super::transport::{check_response, Protocol, QueryFuture, Transport};
use crate::base::wire::ComposeError;
use crate::utils::config::DefMinMax;
use bytes::Bytes;
use dashmap::DashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::trace;

/// Limits for the lifetime of a pooled connection.
const MAX_LIFETIME: DefMinMax<Duration> = DefMinMax::new(
    Duration::from_secs(5),
    Duration::ZERO,
    Duration::from_secs(3600),
);

//------------ Config --------------------------------------------------------

/// Configuration of a TCP transport.
#[derive(Clone, Debug)]
pub struct Config {
    /// Whether connections are kept for later exchanges.
    enable_pool: bool,

    /// How long a connection may be reused after it was opened.
    max_lifetime: Duration,
}

impl Config {
    /// Creates a new config with default values.
    pub fn new() -> Self {
        Default::default()
    }

    pub fn enable_pool(&self) -> bool {
        self.enable_pool
    }

    /// Sets whether connections are reused.
    ///
    /// The default is true.
    pub fn set_enable_pool(&mut self, value: bool) {
        self.enable_pool = value
    }

    pub fn max_lifetime(&self) -> Duration {
        self.max_lifetime
    }

    /// Sets the maximum age of a connection that is still reused.
    ///
    /// The value is limited to at most one hour. The default is five
    /// seconds.
    pub fn set_max_lifetime(&mut self, value: Duration) {
        self.max_lifetime = MAX_LIFETIME.limit(value)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enable_pool: true,
            max_lifetime: MAX_LIFETIME.default(),
        }
    }
}

//------------ ConnectionPools -----------------------------------------------

/// Idle connections keyed by server address.
#[derive(Debug, Default)]
pub struct ConnectionPools {
    pools: DashMap<SocketAddr, Vec<PooledStream>>,
}

impl ConnectionPools {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the most recently returned connection to a server.
    fn pop(&self, server: SocketAddr) -> Option<PooledStream> {
        self.pools.get_mut(&server)?.pop()
    }

    fn push(&self, server: SocketAddr, stream: PooledStream) {
        self.pools.entry(server).or_default().push(stream)
    }

    /// Returns the number of idle connections to a server.
    pub fn idle(&self, server: SocketAddr) -> usize {
        self.pools.get(&server).map(|pool| pool.len()).unwrap_or(0)
    }
}

/// A connection together with the time it was opened.
#[derive(Debug)]
struct PooledStream {
    stream: TcpStream,
    created: Instant,
}

impl PooledStream {
    fn new(stream: TcpStream) -> Self {
        PooledStream {
            stream,
            created: Instant::now(),
        }
    }

    /// Returns whether the connection can carry another exchange.
    fn is_reusable(&self, max_lifetime: Duration) -> bool {
        if self.created.elapsed() >= max_lifetime {
            return false;
        }
        if self.stream.peer_addr().is_err() {
            return false;
        }
        // Data or end-of-stream waiting on an idle connection means the
        // server has moved on.
        let mut buf = [0u8; 1];
        matches!(
            self.stream.try_read(&mut buf),
            Err(ref err) if err.kind() == io::ErrorKind::WouldBlock
        )
    }
}

//------------ TcpTransport --------------------------------------------------

/// The TCP transport.
#[derive(Clone, Debug, Default)]
pub struct TcpTransport {
    config: Config,
    pools: Arc<ConnectionPools>,
}

impl TcpTransport {
    /// Creates a transport with default configuration and its own pools.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: Config) -> Self {
        Self::with_pools(config, Default::default())
    }

    /// Creates a transport using the given connection pools.
    pub fn with_pools(config: Config, pools: Arc<ConnectionPools>) -> Self {
        TcpTransport { config, pools }
    }

    pub fn pools(&self) -> &Arc<ConnectionPools> {
        &self.pools
    }

    /// Takes a usable pooled connection, dropping stale ones on the way.
    fn take_pooled(&self, server: SocketAddr) -> Option<PooledStream> {
        if !self.config.enable_pool {
            return None;
        }
        while let Some(stream) = self.pools.pop(server) {
            if stream.is_reusable(self.config.max_lifetime) {
                return Some(stream);
            }
            trace!(%server, "dropping stale TCP connection");
        }
        None
    }

    async fn exchange(
        &self,
        server: SocketAddr,
        request: &[u8],
    ) -> Result<Bytes, Error> {
        loop {
            let (mut stream, reused) = match self.take_pooled(server) {
                Some(stream) => (stream, true),
                None => {
                    let stream = TcpStream::connect(server)
                        .await
                        .map_err(|e| Error::StreamConnect(Arc::new(e)))?;
                    trace!(%server, "opened TCP connection");
                    (PooledStream::new(stream), false)
                }
            };
            match exchange_on(&mut stream.stream, request).await {
                Ok(response) => {
                    if self.config.enable_pool {
                        self.pools.push(server, stream);
                    }
                    return Ok(response);
                }
                Err(err) if reused => {
                    trace!(
                        %server, %err,
                        "exchange on reused TCP connection failed"
                    );
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Transport for TcpTransport {
    fn protocol(&self) -> Protocol {
        Protocol::Tcp
    }

    fn query<'a>(
        &'a self,
        server: SocketAddr,
        request: &'a [u8],
    ) -> QueryFuture<'a> {
        Box::pin(self.exchange(server, request))
    }
}

/// Performs one length-prefixed exchange on a stream.
async fn exchange_on(
    stream: &mut TcpStream,
    request: &[u8],
) -> Result<Bytes, Error> {
    let len = u16::try_from(request.len())
        .map_err(|_| Error::MessageComposeError(ComposeError::ShortBuf))?;
    let mut buf = Vec::with_capacity(request.len() + 2);
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(request);
    stream
        .write_all(&buf)
        .await
        .map_err(|e| Error::StreamWriteError(Arc::new(e)))?;
    stream
        .flush()
        .await
        .map_err(|e| Error::StreamWriteError(Arc::new(e)))?;

    let len = stream.read_u16().await.map_err(Error::stream_read)?;
    if len == 0 {
        return Err(Error::ConnectionClosed);
    }
    let mut response = vec![0; usize::from(len)];
    stream
        .read_exact(&mut response)
        .await
        .map_err(Error::stream_read)?;
    check_response(request, response.into())
}
