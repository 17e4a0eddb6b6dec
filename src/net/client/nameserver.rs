//! Name server addresses.

use std::fmt;
use std::net::{AddrParseError, IpAddr, SocketAddr};
use std::str::FromStr;

/// The port name servers listen on.
pub const DEFAULT_PORT: u16 = 53;

//------------ NameServer ----------------------------------------------------

/// A server to send queries to.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct NameServer {
    addr: SocketAddr,

    /// Whether queries to this server always use TCP.
    prefer_tcp: bool,
}

impl NameServer {
    pub fn new(addr: SocketAddr) -> Self {
        NameServer {
            addr,
            prefer_tcp: false,
        }
    }

    /// Creates a name server listening on the default port.
    pub fn from_ip(addr: IpAddr) -> Self {
        Self::new(SocketAddr::new(addr, DEFAULT_PORT))
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn prefer_tcp(&self) -> bool {
        self.prefer_tcp
    }

    /// Returns the server with TCP preference changed.
    #[must_use]
    pub fn with_prefer_tcp(mut self, prefer_tcp: bool) -> Self {
        self.prefer_tcp = prefer_tcp;
        self
    }
}

//--- From and FromStr

impl From<SocketAddr> for NameServer {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr)
    }
}

impl From<IpAddr> for NameServer {
    fn from(addr: IpAddr) -> Self {
        Self::from_ip(addr)
    }
}

impl FromStr for NameServer {
    type Err = AddrParseError;

    /// Parses a socket address or a bare IP address using port 53.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse::<SocketAddr>() {
            Ok(addr) => Ok(Self::new(addr)),
            Err(_) => s.parse::<IpAddr>().map(Self::from_ip),
        }
    }
}

impl fmt::Display for NameServer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.addr.fmt(f)
    }
}

//============ Testing =======================================================
