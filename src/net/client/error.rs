//! Error type for client transports and lookups.

use crate::base::iana::OptRcode;
use crate::base::wire::{ComposeError, ParseError};
use std::error;
use std::fmt::{Display, Formatter};
use std::io;
use std::sync::Arc;

/// Error type for client transports and lookups.
#[derive(Clone, Debug)]
pub enum Error {
    /// The request could not be composed.
    MessageComposeError(ComposeError),

    /// The response could not be decoded.
    MessageParseError(ParseError),

    /// Octet sequence too short to be a valid DNS message.
    ShortMessage,

    /// The ID of the response differs from that of the request.
    IdMismatch {
        /// The ID of the request.
        expected: u16,

        /// The ID found in the response.
        received: u16,
    },

    /// Binding a UDP socket gave an error.
    UdpBind(Arc<io::Error>),

    /// Sending over a UDP socket gave an error.
    UdpSend(Arc<io::Error>),

    /// Sending over a UDP socket gave a partial result.
    UdpShortSend,

    /// Receiving from a UDP socket gave an error.
    UdpReceive(Arc<io::Error>),

    /// Connecting a TCP stream gave an error.
    StreamConnect(Arc<io::Error>),

    /// Writing to a stream gave an error.
    StreamWriteError(Arc<io::Error>),

    /// Reading from stream gave an error.
    StreamReadError(Arc<io::Error>),

    /// Reading for a stream ended unexpectedly.
    StreamUnexpectedEndOfData,

    /// The server closed the connection instead of answering.
    ConnectionClosed,

    /// No response arrived within the timeout.
    Timeout,

    /// The caller canceled the query.
    Canceled,

    /// All attempts on all servers timed out.
    ConnectionTimeout,

    /// All attempts on all servers failed.
    NoConnection,

    /// There are no servers to ask.
    NoServers,

    /// The server answered with an error response code.
    DnsError(OptRcode),

    /// A runtime for a blocking query could not be created.
    Runtime(Arc<io::Error>),
}

impl Error {
    /// Returns whether the error is a transport fault worth retrying.
    ///
    /// Codec errors, cancellation, and the final outcomes of a lookup are
    /// not transient.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::ShortMessage
                | Error::IdMismatch { .. }
                | Error::UdpBind(_)
                | Error::UdpSend(_)
                | Error::UdpShortSend
                | Error::UdpReceive(_)
                | Error::StreamConnect(_)
                | Error::StreamWriteError(_)
                | Error::StreamReadError(_)
                | Error::StreamUnexpectedEndOfData
                | Error::ConnectionClosed
                | Error::Timeout
        )
    }

    /// Converts an error from reading a stream.
    pub(crate) fn stream_read(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Error::StreamUnexpectedEndOfData
        } else {
            Error::StreamReadError(Arc::new(err))
        }
    }
}

//--- From

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        Error::MessageParseError(err)
    }
}

impl From<ComposeError> for Error {
    fn from(err: ComposeError) -> Self {
        Error::MessageComposeError(err)
    }
}

//--- Display and Error

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        match self {
            Error::MessageComposeError(err) => {
                write!(f, "cannot compose request: {}", err)
            }
            Error::MessageParseError(err) => {
                write!(f, "cannot parse response: {}", err)
            }
            Error::ShortMessage => {
                write!(f, "octet sequence to short to be a valid message")
            }
            Error::IdMismatch { expected, received } => write!(
                f,
                "response ID {} does not match request ID {}",
                received, expected
            ),
            Error::UdpBind(_) => write!(f, "error binding UDP socket"),
            Error::UdpSend(_) => write!(f, "error sending to UDP socket"),
            Error::UdpShortSend => write!(f, "partial sent to UDP socket"),
            Error::UdpReceive(_) => {
                write!(f, "error receiving from UDP socket")
            }
            Error::StreamConnect(_) => write!(f, "error connecting stream"),
            Error::StreamWriteError(_) => {
                write!(f, "error writing to stream")
            }
            Error::StreamReadError(_) => {
                write!(f, "error reading from stream")
            }
            Error::StreamUnexpectedEndOfData => {
                write!(f, "unexpected end of data")
            }
            Error::ConnectionClosed => write!(f, "connection closed"),
            Error::Timeout => write!(f, "timeout waiting for response"),
            Error::Canceled => write!(f, "query canceled"),
            Error::ConnectionTimeout => {
                write!(f, "connection timed out; no servers could be reached")
            }
            Error::NoConnection => write!(f, "no connection could be made"),
            Error::NoServers => write!(f, "no name servers configured"),
            Error::DnsError(rcode) => {
                write!(f, "server returned error response {}", rcode)
            }
            Error::Runtime(_) => write!(f, "cannot run blocking query"),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::MessageComposeError(e) => Some(e),
            Error::MessageParseError(e) => Some(e),
            Error::UdpBind(e)
            | Error::UdpSend(e)
            | Error::UdpReceive(e)
            | Error::StreamConnect(e)
            | Error::StreamWriteError(e)
            | Error::StreamReadError(e)
            | Error::Runtime(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

//============ Testing =======================================================
