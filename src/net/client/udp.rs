//! A DNS over UDP transport.
//!
//! Each exchange sends one datagram and waits for one datagram in return.
//! Sockets are unconnected and bound to an ephemeral port. When pooling is
//! enabled, a socket is put into a [`SocketPool`] after a successful
//! exchange and reused by a later one. A socket involved in any failure is
//! dropped, since a late response may still arrive on it.

use super::error::Error;
use super::transport::{check_response, Protocol, QueryFuture, Transport};
use crate::base::message::HEADER_LEN;
use crate::utils::config::DefMinMax;
use bytes::Bytes;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tracing::trace;

/// How many times do we try a new random port if we get ‘address in use.’
const RETRY_RANDOM_PORT: usize = 10;

/// Configuration limits for the receive buffer size.
///
/// The buffer has to hold at least a complete header. The maximum is the
/// largest possible UDP payload.
const RECV_SIZE: DefMinMax<usize> = DefMinMax::new(4096, 512, 65535);

//------------ Config --------------------------------------------------------

/// Configuration of a UDP transport.
#[derive(Clone, Debug)]
pub struct Config {
    /// Whether sockets are kept for later exchanges.
    enable_socket_pool: bool,

    /// The minimum size of the receive buffer.
    recv_size: usize,
}

impl Config {
    /// Creates a new config with default values.
    pub fn new() -> Self {
        Default::default()
    }

    pub fn enable_socket_pool(&self) -> bool {
        self.enable_socket_pool
    }

    /// Sets whether sockets are reused.
    ///
    /// The default is true.
    pub fn set_enable_socket_pool(&mut self, value: bool) {
        self.enable_socket_pool = value
    }

    pub fn recv_size(&self) -> usize {
        self.recv_size
    }

    /// Sets the minimum size of the receive buffer.
    ///
    /// If a request advertises a larger UDP payload size in its OPT record,
    /// the buffer grows to that size for the exchange. The value is limited to the range from 512 to 65535 and the
    /// default is 4096.
    pub fn set_recv_size(&mut self, value: usize) {
        self.recv_size = RECV_SIZE.limit(value)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enable_socket_pool: true,
            recv_size: RECV_SIZE.default(),
        }
    }
}

//------------ SocketPool ----------------------------------------------------

/// Idle UDP sockets, one list per address family.
#[derive(Debug, Default)]
pub struct SocketPool {
    v4: Mutex<Vec<UdpSocket>>,
    v6: Mutex<Vec<UdpSocket>>,
}

impl SocketPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes an idle socket for the address family of `server`.
    fn take(&self, server: SocketAddr) -> Option<UdpSocket> {
        self.family(server.is_ipv4()).lock().pop()
    }

    /// Returns a socket to the pool.
    fn put(&self, sock: UdpSocket) {
        let v4 = sock.local_addr().map(|a| a.is_ipv4()).unwrap_or(true);
        self.family(v4).lock().push(sock)
    }

    fn family(&self, v4: bool) -> &Mutex<Vec<UdpSocket>> {
        if v4 {
            &self.v4
        } else {
            &self.v6
        }
    }

    /// Returns the number of idle sockets.
    pub fn len(&self) -> usize {
        self.v4.lock().len() + self.v6.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

//------------ UdpTransport --------------------------------------------------

/// The UDP transport.
#[derive(Clone, Debug, Default)]
pub struct UdpTransport {
    config: Config,
    pool: Arc<SocketPool>,
}

impl UdpTransport {
    /// Creates a transport with default configuration and its own pool.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: Config) -> Self {
        Self::with_pool(config, Default::default())
    }

    /// Creates a transport using the given socket pool.
    pub fn with_pool(config: Config, pool: Arc<SocketPool>) -> Self {
        UdpTransport { config, pool }
    }

    pub fn pool(&self) -> &Arc<SocketPool> {
        &self.pool
    }

    async fn exchange(
        &self,
        server: SocketAddr,
        request: &[u8],
    ) -> Result<Bytes, Error> {
        let sock = match self.pool.take(server) {
            Some(sock) => {
                trace!(%server, "reusing pooled UDP socket");
                sock
            }
            None => udp_bind(server.is_ipv4()).await?,
        };
        let sent = sock
            .send_to(request, server)
            .await
            .map_err(|e| Error::UdpSend(Arc::new(e)))?;
        if sent != request.len() {
            return Err(Error::UdpShortSend);
        }

        let size = advertised_payload_size(request)
            .map_or(self.config.recv_size, |size| {
                size.max(self.config.recv_size)
            });
        let mut buf = vec![0; size];
        let len = loop {
            let (len, from) = sock
                .recv_from(&mut buf)
                .await
                .map_err(|e| Error::UdpReceive(Arc::new(e)))?;
            if from == server {
                break len;
            }
            trace!(%server, %from, "ignoring datagram from unexpected peer");
        };
        buf.truncate(len);

        let response = check_response(request, buf.into())?;
        if self.config.enable_socket_pool {
            self.pool.put(sock);
        }
        Ok(response)
    }
}

impl Transport for UdpTransport {
    fn protocol(&self) -> Protocol {
        Protocol::Udp
    }

    fn query<'a>(
        &'a self,
        server: SocketAddr,
        request: &'a [u8],
    ) -> QueryFuture<'a> {
        Box::pin(self.exchange(server, request))
    }
}

/// Returns the UDP payload size a request advertises in its OPT record.
///
/// Requests end in an OPT record without options, so the record is found
/// at a fixed distance from the end.
fn advertised_payload_size(request: &[u8]) -> Option<usize> {
    const OPT_LEN: usize = 11;
    if request.len() < HEADER_LEN + OPT_LEN || request[10..12] == [0, 0] {
        return None;
    }
    let opt = &request[request.len() - OPT_LEN..];
    if opt[0] != 0 || opt[1..3] != [0, 41] || opt[9..11] != [0, 0] {
        return None;
    }
    Some(usize::from(u16::from_be_bytes([opt[3], opt[4]])))
}

/// Bind to a local UDP port.
async fn udp_bind(v4: bool) -> Result<UdpSocket, Error> {
    let mut i = 0;
    loop {
        let local: SocketAddr = if v4 {
            ([0u8; 4], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };
        match UdpSocket::bind(&local).await {
            Ok(sock) => return Ok(sock),
            Err(err) => {
                if i == RETRY_RANDOM_PORT {
                    return Err(Error::UdpBind(Arc::new(err)));
                } else {
                    i += 1
                }
            }
        }
    }
}

//============ Testing =======================================================
