//! A record of what happened during a lookup.
//!
//! If enabled in the lookup configuration, every decision the lookup
//! engine takes is recorded as an [`AuditEvent`]. The trail is returned
//! with both the response and the error of a lookup.

use super::error::Error;
use super::transport::Protocol;
use crate::base::header::Header;
use crate::base::iana::OptRcode;
use std::net::SocketAddr;
use std::slice;
use std::time::Duration;

//------------ AuditEvent ----------------------------------------------------

/// A single step of a lookup.
#[derive(Clone, Debug)]
pub enum AuditEvent {
    /// The servers that will be asked, in order.
    ResolvedServers(Vec<SocketAddr>),

    /// The response was found in the cache.
    CacheHit { server: SocketAddr },

    /// A request is about to be sent.
    Attempt {
        server: SocketAddr,
        protocol: Protocol,

        /// The attempt number for this server, starting at zero.
        attempt: usize,
    },

    /// A truncated response is retried over TCP.
    TruncatedRetryTcp { server: SocketAddr },

    /// A response with an error code moves the lookup on to the next
    /// server.
    RetryNextServer { server: SocketAddr, rcode: OptRcode },

    /// The header of a decoded response.
    ResponseHeader { header: Header, size: usize },

    /// The response carried an error code.
    ResponseError(OptRcode),

    /// An attempt failed.
    TransportError { server: SocketAddr, error: Error },

    /// The lookup is finished.
    Ended {
        elapsed: Duration,

        /// The size of the response if there is one.
        size: Option<usize>,
    },
}

//------------ Audit ---------------------------------------------------------

/// The audit trail of a lookup.
#[derive(Clone, Debug, Default)]
pub struct Audit {
    events: Vec<AuditEvent>,
}

impl Audit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: AuditEvent) {
        self.events.push(event)
    }

    pub fn events(&self) -> &[AuditEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, AuditEvent> {
        self.events.iter()
    }
}

impl<'a> IntoIterator for &'a Audit {
    type Item = &'a AuditEvent;
    type IntoIter = slice::Iter<'a, AuditEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
