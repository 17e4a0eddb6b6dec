//! The interface shared by the UDP and TCP transports.

use super::error::Error;
use crate::base::message::HEADER_LEN;
use bytes::Bytes;
use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

/// The future returned by [`Transport::query`].
pub type QueryFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Bytes, Error>> + Send + 'a>>;

//------------ Protocol ------------------------------------------------------

/// The protocol used by a transport.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Protocol {
    Udp,
    Tcp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Protocol::Udp => "UDP",
            Protocol::Tcp => "TCP",
        })
    }
}

//------------ Transport -----------------------------------------------------

/// Sending one request to one server and receiving the response.
///
/// The returned future owns whatever socket it uses. Dropping it before it
/// completes closes that socket instead of returning it to a pool, which is
/// how a timeout or cancellation interrupts a transport.
pub trait Transport: fmt::Debug + Send + Sync {
    /// Returns the protocol of the transport.
    fn protocol(&self) -> Protocol;

    /// Sends the request in wire format and returns the raw response.
    ///
    /// The response is at least a complete header long and has the same ID
    /// as the request.
    fn query<'a>(
        &'a self,
        server: SocketAddr,
        request: &'a [u8],
    ) -> QueryFuture<'a>;
}

/// Checks that a response belongs to the request.
pub fn check_response(request: &[u8], response: Bytes) -> Result<Bytes, Error> {
    if response.len() < HEADER_LEN || request.len() < 2 {
        return Err(Error::ShortMessage);
    }
    let expected = u16::from_be_bytes([request[0], request[1]]);
    let received = u16::from_be_bytes([response[0], response[1]]);
    if expected != received {
        return Err(Error::IdMismatch { expected, received });
    }
    Ok(response)
}

/// Runs a future unless the token is canceled first.
///
/// On cancellation the future is dropped and [`Error::Canceled`] is
/// returned.
pub async fn cancelable<F, T>(
    cancel: &CancellationToken,
    fut: F,
) -> Result<T, Error>
where
    F: Future<Output = Result<T, Error>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Canceled),
        res = fut => res,
    }
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;

    const REQUEST: &[u8] = b"\xab\xcd\x01\x00\x00\x01\x00\x00\x00\x00\x00\x00";

    #[test]
    fn matching_response() {
        let response = Bytes::from_static(
            b"\xab\xcd\x81\x80\x00\x01\x00\x00\x00\x00\x00\x00",
        );
        assert_eq!(check_response(REQUEST, response.clone()).unwrap(), response);
    }

    #[test]
    fn mismatched_id() {
        let response = Bytes::from_static(
            b"\xab\xce\x81\x80\x00\x01\x00\x00\x00\x00\x00\x00",
        );
        assert!(matches!(
            check_response(REQUEST, response),
            Err(Error::IdMismatch {
                expected: 0xabcd,
                received: 0xabce
            })
        ));
    }

    #[test]
    fn short_response() {
        let response = Bytes::from_static(b"\xab\xcd\x81\x80");
        assert!(matches!(
            check_response(REQUEST, response),
            Err(Error::ShortMessage)
        ));
    }

    #[tokio::test]
    async fn cancel_wins() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let res = cancelable(&cancel, std::future::pending::<Result<(), _>>())
            .await;
        assert!(matches!(res, Err(Error::Canceled)));

        let res = cancelable(&CancellationToken::new(), async { Ok(5) }).await;
        assert_eq!(res.unwrap(), 5);
    }
}
