//! Loopback name servers for testing the client.
//!
//! A [`MockServer`] listens on UDP and TCP on the same port of the IPv4
//! loopback address. Every request is handed to a [`Handler`] which
//! decides on the response. Returning `None` drops the request, which looks
//! like a lost packet to the client. On TCP it also closes the connection.
#![allow(dead_code)]

use bytes::Bytes;
use domain_lookup::base::iana::{Class, Rcode, Rtype};
use domain_lookup::base::wire::{Composer, Parser};
use domain_lookup::base::{Header, HeaderCounts, Question};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, UdpSocket};

//------------ Handler -------------------------------------------------------

/// Decides on the response to a request.
///
/// The arguments are the request in wire format and the number of requests
/// the server has seen on this protocol so far, starting at zero.
pub type Handler = Arc<dyn Fn(&[u8], usize) -> Option<Vec<u8>> + Send + Sync>;

pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&[u8], usize) -> Option<Vec<u8>> + Send + Sync + 'static,
{
    Arc::new(f)
}

//------------ MockServer ----------------------------------------------------

pub struct MockServer {
    pub addr: SocketAddr,
    udp_count: Arc<AtomicUsize>,
    tcp_count: Arc<AtomicUsize>,
    tcp_connections: Arc<AtomicUsize>,
}

impl MockServer {
    /// Starts a server on the current runtime.
    pub async fn start(udp: Handler, tcp: Handler) -> Self {
        let (sock, listener) = bind_pair().await;
        let addr = sock.local_addr().unwrap();
        let udp_count = Arc::new(AtomicUsize::new(0));
        let tcp_count = Arc::new(AtomicUsize::new(0));
        let tcp_connections = Arc::new(AtomicUsize::new(0));

        let count = udp_count.clone();
        tokio::spawn(async move {
            let mut buf = vec![0; 65535];
            loop {
                let Ok((len, peer)) = sock.recv_from(&mut buf).await else {
                    return;
                };
                let seen = count.fetch_add(1, Ordering::SeqCst);
                if let Some(response) = udp(&buf[..len], seen) {
                    let _ = sock.send_to(&response, peer).await;
                }
            }
        });

        let count = tcp_count.clone();
        let connections = tcp_connections.clone();
        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    return;
                };
                connections.fetch_add(1, Ordering::SeqCst);
                let count = count.clone();
                let tcp = tcp.clone();
                tokio::spawn(async move {
                    loop {
                        let Ok(len) = stream.read_u16().await else {
                            return;
                        };
                        let mut request = vec![0; usize::from(len)];
                        if stream.read_exact(&mut request).await.is_err() {
                            return;
                        }
                        let seen = count.fetch_add(1, Ordering::SeqCst);
                        let Some(response) = tcp(&request, seen) else {
                            return;
                        };
                        let mut buf = (response.len() as u16).to_be_bytes().to_vec();
                        buf.extend_from_slice(&response);
                        if stream.write_all(&buf).await.is_err() {
                            return;
                        }
                    }
                });
            }
        });

        MockServer {
            addr,
            udp_count,
            tcp_count,
            tcp_connections,
        }
    }

    /// Starts a server that answers UDP only.
    pub async fn udp_only(udp: Handler) -> Self {
        Self::start(udp, handler(|_, _| None)).await
    }

    pub fn udp_requests(&self) -> usize {
        self.udp_count.load(Ordering::SeqCst)
    }

    pub fn tcp_requests(&self) -> usize {
        self.tcp_count.load(Ordering::SeqCst)
    }

    /// Returns the number of accepted TCP connections.
    pub fn tcp_connections(&self) -> usize {
        self.tcp_connections.load(Ordering::SeqCst)
    }
}

/// Binds a UDP socket and a TCP listener to the same loopback port.
async fn bind_pair() -> (UdpSocket, TcpListener) {
    for _ in 0..20 {
        let sock = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let addr = sock.local_addr().unwrap();
        if let Ok(listener) = TcpListener::bind(addr).await {
            return (sock, listener);
        }
    }
    panic!("no free port for UDP and TCP");
}

//------------ Building responses --------------------------------------------

/// Returns the question of a request.
pub fn request_question(request: &[u8]) -> Question {
    let mut parser = Parser::new(Bytes::copy_from_slice(request));
    Header::parse(&mut parser).unwrap();
    HeaderCounts::parse(&mut parser).unwrap();
    Question::parse(&mut parser).unwrap()
}

/// Builds a response to a request.
///
/// The answer section contains one A record for the question name per
/// entry of `answers`, each given as the TTL and address.
pub fn response(
    request: &[u8],
    rcode: Rcode,
    tc: bool,
    answers: &[(u32, Ipv4Addr)],
) -> Vec<u8> {
    let mut parser = Parser::new(Bytes::copy_from_slice(request));
    let req_header = Header::parse(&mut parser).unwrap();
    HeaderCounts::parse(&mut parser).unwrap();
    let question = Question::parse(&mut parser).unwrap();

    let mut header = Header::new();
    header.set_id(req_header.id());
    header.set_qr(true);
    header.set_rd(req_header.rd());
    header.set_ra(true);
    header.set_tc(tc);
    header.set_rcode(rcode);

    let mut target = Composer::with_capacity(65535);
    header.compose(&mut target).unwrap();
    HeaderCounts {
        qdcount: 1,
        ancount: answers.len() as u16,
        nscount: 0,
        arcount: 0,
    }
    .compose(&mut target)
    .unwrap();
    question.compose(&mut target).unwrap();
    for (ttl, addr) in answers {
        question.qname().compose(&mut target).unwrap();
        Rtype::A.compose(&mut target).unwrap();
        Class::IN.compose(&mut target).unwrap();
        target.append_u32_be(*ttl).unwrap();
        target.append_u16_be(4).unwrap();
        target.append_slice(&addr.octets()).unwrap();
    }
    target.finish().to_vec()
}

/// Builds a NOERROR response with a single A record.
pub fn answer(request: &[u8]) -> Vec<u8> {
    response(request, Rcode::NOERROR, false, &[(300, Ipv4Addr::new(192, 0, 2, 1))])
}
