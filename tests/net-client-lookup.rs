#![cfg(feature = "net")]
mod common;

use crate::common::{answer, handler, request_question, response, MockServer};
use domain_lookup::base::iana::{Class, Rcode, Rtype};
use domain_lookup::base::{Name, Question};
use domain_lookup::net::client::audit::AuditEvent;
use domain_lookup::net::client::cache::ResponseCache;
use domain_lookup::net::client::error::Error;
use domain_lookup::net::client::lookup::{Config, LookupClient};
use domain_lookup::net::client::nameserver::NameServer;
use domain_lookup::net::client::tcp::{Config as TcpConfig, TcpTransport};
use domain_lookup::net::client::udp::UdpTransport;
use domain_lookup::rdata::RecordData;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

fn config() -> Config {
    let mut config = Config::new();
    config.set_use_random_name_server(false);
    config.set_use_cache(false);
    config.set_retries(1);
    config.set_timeout(Duration::from_millis(200));
    config.set_enable_audit_trail(true);
    config
}

fn client(servers: &[&MockServer], config: Config) -> LookupClient {
    LookupClient::with_config(
        servers.iter().map(|s| NameServer::new(s.addr)).collect(),
        config,
    )
}

fn example() -> Question {
    Question::new("example.com".parse().unwrap(), Rtype::A, Class::IN)
}

#[tokio::test]
async fn udp_answer() {
    let server = MockServer::udp_only(handler(|req, _| Some(answer(req)))).await;
    let res = client(&[&server], config())
        .query_question(example())
        .await
        .unwrap();
    assert_eq!(res.server(), server.addr);
    assert!(!res.from_cache());
    let answer = res.message().answer();
    assert_eq!(answer.len(), 1);
    assert_eq!(answer[0].ttl(), 300);
    assert!(matches!(answer[0].data(), RecordData::A(_)));
    assert_eq!(server.udp_requests(), 1);
    assert_eq!(server.tcp_requests(), 0);
}

#[tokio::test]
async fn truncated_retries_over_tcp_once() {
    let server = MockServer::start(
        handler(|req, _| Some(response(req, Rcode::NOERROR, true, &[]))),
        handler(|req, _| Some(answer(req))),
    )
    .await;
    let res = client(&[&server], config())
        .query_question(example())
        .await
        .unwrap();
    assert!(!res.message().is_truncated());
    assert_eq!(res.message().answer().len(), 1);
    assert_eq!(server.udp_requests(), 1);
    assert_eq!(server.tcp_requests(), 1);
    let retries = res
        .audit()
        .unwrap()
        .iter()
        .filter(|event| matches!(event, AuditEvent::TruncatedRetryTcp { .. }))
        .count();
    assert_eq!(retries, 1);
}

#[tokio::test]
async fn truncated_without_fallback() {
    let server = MockServer::start(
        handler(|req, _| Some(response(req, Rcode::NOERROR, true, &[]))),
        handler(|req, _| Some(answer(req))),
    )
    .await;
    let mut config = config();
    config.set_use_tcp_fallback(false);
    let res = client(&[&server], config)
        .query_question(example())
        .await
        .unwrap();
    assert!(res.message().is_truncated());
    assert_eq!(server.tcp_requests(), 0);
}

#[tokio::test]
async fn truncated_without_fallback_is_not_cached() {
    let server = MockServer::start(
        handler(|req, _| {
            Some(response(
                req,
                Rcode::NOERROR,
                true,
                &[(300, Ipv4Addr::new(192, 0, 2, 1))],
            ))
        }),
        handler(|req, _| Some(answer(req))),
    )
    .await;
    let mut config = config();
    config.set_use_tcp_fallback(false);
    config.set_use_cache(true);
    let client = client(&[&server], config);
    for _ in 0..2 {
        let res = client.query_question(example()).await.unwrap();
        assert!(res.message().is_truncated());
        assert!(!res.from_cache());
    }
    assert_eq!(server.udp_requests(), 2);
    assert_eq!(server.tcp_requests(), 0);
}

#[tokio::test]
async fn large_udp_response() {
    let server = MockServer::udp_only(handler(|req, _| {
        let answers: Vec<_> = (0..300u32)
            .map(|i| (300, Ipv4Addr::from(0xc000_0200 + i)))
            .collect();
        Some(response(req, Rcode::NOERROR, false, &answers))
    }))
    .await;
    let mut config = config();
    config.set_udp_payload_size(8192);
    let res = client(&[&server], config)
        .query_question(example())
        .await
        .unwrap();
    assert!(res.message().size() > 4096);
    assert_eq!(res.message().answer().len(), 300);
    assert_eq!(server.udp_requests(), 1);
    assert_eq!(server.tcp_requests(), 0);
}

#[tokio::test]
async fn id_mismatch_is_retried() {
    let server = MockServer::udp_only(handler(|req, seen| {
        let mut res = answer(req);
        if seen == 0 {
            res[0] ^= 0xff;
        }
        Some(res)
    }))
    .await;
    let res = client(&[&server], config())
        .query_question(example())
        .await
        .unwrap();
    assert_eq!(res.message().answer().len(), 1);
    assert_eq!(server.udp_requests(), 2);
    assert!(res.audit().unwrap().iter().any(|event| matches!(
        event,
        AuditEvent::TransportError {
            error: Error::IdMismatch { .. },
            ..
        }
    )));
}

#[tokio::test]
async fn all_attempts_time_out() {
    let server = MockServer::udp_only(handler(|_, _| None)).await;
    let mut config = config();
    config.set_timeout(Duration::from_millis(100));
    let err = client(&[&server], config)
        .query_question(example())
        .await
        .unwrap_err();
    assert!(matches!(err.error(), Error::ConnectionTimeout));
    assert_eq!(err.server(), Some(server.addr));
    assert_eq!(err.question(), &example());
    // One attempt plus one retry.
    assert_eq!(server.udp_requests(), 2);
}

#[tokio::test]
async fn refused_connections() {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut config = config();
    config.set_use_tcp_only(true);
    let client = LookupClient::with_config(vec![NameServer::new(addr)], config);
    let err = client.query_question(example()).await.unwrap_err();
    assert!(matches!(err.error(), Error::NoConnection));
}

#[tokio::test]
async fn cancel_in_flight() {
    let server = MockServer::udp_only(handler(|_, _| None)).await;
    let mut config = config();
    config.set_timeout(Duration::from_secs(5));
    let client = client(&[&server], config);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });
    let err = client
        .query_with_cancel(example(), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err.error(), Error::Canceled));
    assert_eq!(server.udp_requests(), 1);
}

#[tokio::test]
async fn cancel_before_sending() {
    let server = MockServer::udp_only(handler(|req, _| Some(answer(req)))).await;
    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = client(&[&server], config())
        .query_with_cancel(example(), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err.error(), Error::Canceled));
    assert_eq!(server.udp_requests(), 0);
}

#[tokio::test]
async fn nxdomain_is_a_result() {
    let server = MockServer::udp_only(handler(|req, _| {
        Some(response(req, Rcode::NXDOMAIN, false, &[]))
    }))
    .await;
    let res = client(&[&server], config())
        .query_question(example())
        .await
        .unwrap();
    assert_eq!(res.message().header().rcode(), Rcode::NXDOMAIN);
}

#[tokio::test]
async fn nxdomain_thrown() {
    let server = MockServer::udp_only(handler(|req, _| {
        Some(response(req, Rcode::NXDOMAIN, false, &[]))
    }))
    .await;
    let mut config = config();
    config.set_throw_dns_errors(true);
    let err = client(&[&server], config)
        .query_question(example())
        .await
        .unwrap_err();
    assert!(matches!(
        err.error(),
        Error::DnsError(rcode) if *rcode == Rcode::NXDOMAIN.into()
    ));
    assert_eq!(
        err.response().unwrap().header().rcode(),
        Rcode::NXDOMAIN
    );
    // NXDOMAIN is final, so there is no retry.
    assert_eq!(server.udp_requests(), 1);
}

#[tokio::test]
async fn servfail_moves_to_next_server() {
    let failing = MockServer::udp_only(handler(|req, _| {
        Some(response(req, Rcode::SERVFAIL, false, &[]))
    }))
    .await;
    let working = MockServer::udp_only(handler(|req, _| Some(answer(req)))).await;
    let res = client(&[&failing, &working], config())
        .query_question(example())
        .await
        .unwrap();
    assert_eq!(res.server(), working.addr);
    assert_eq!(res.message().header().rcode(), Rcode::NOERROR);
    assert_eq!(failing.udp_requests(), 1);
    assert_eq!(working.udp_requests(), 1);
}

#[tokio::test]
async fn last_servfail_is_returned() {
    let servfail = |req: &[u8], _: usize| {
        Some(response(req, Rcode::SERVFAIL, false, &[]))
    };
    let first = MockServer::udp_only(handler(servfail)).await;
    let second = MockServer::udp_only(handler(servfail)).await;

    let res = client(&[&first, &second], config())
        .query_question(example())
        .await
        .unwrap();
    assert_eq!(res.server(), second.addr);
    assert_eq!(res.message().header().rcode(), Rcode::SERVFAIL);

    let mut config = config();
    config.set_throw_dns_errors(true);
    let err = client(&[&first, &second], config)
        .query_question(example())
        .await
        .unwrap_err();
    assert!(matches!(err.error(), Error::DnsError(_)));
    assert_eq!(err.server(), Some(second.addr));
}

#[tokio::test]
async fn servfail_without_continue() {
    let failing = MockServer::udp_only(handler(|req, _| {
        Some(response(req, Rcode::SERVFAIL, false, &[]))
    }))
    .await;
    let working = MockServer::udp_only(handler(|req, _| Some(answer(req)))).await;
    let mut config = config();
    config.set_continue_on_dns_error(false);
    let res = client(&[&failing, &working], config)
        .query_question(example())
        .await
        .unwrap();
    assert_eq!(res.server(), failing.addr);
    assert_eq!(res.message().header().rcode(), Rcode::SERVFAIL);
    assert_eq!(working.udp_requests(), 0);
}

#[tokio::test]
async fn second_query_from_cache() {
    let server = MockServer::udp_only(handler(|req, _| Some(answer(req)))).await;
    let mut config = config();
    config.set_use_cache(true);
    let client = client(&[&server], config);

    let first = client.query_question(example()).await.unwrap();
    assert!(!first.from_cache());
    let second = client
        .query(
            "EXAMPLE.com.".parse().unwrap(),
            Rtype::A,
            Class::IN,
        )
        .await
        .unwrap();
    assert!(second.from_cache());
    assert_eq!(second.message().answer().len(), 1);
    assert_eq!(server.udp_requests(), 1);
    assert!(matches!(
        second.audit().unwrap().events()[1],
        AuditEvent::CacheHit { .. }
    ));
}

#[tokio::test]
async fn server_preferring_tcp() {
    let server = MockServer::start(
        handler(|req, _| Some(answer(req))),
        handler(|req, _| Some(answer(req))),
    )
    .await;
    let client = LookupClient::with_config(
        vec![NameServer::new(server.addr).with_prefer_tcp(true)],
        config(),
    );
    client.query_question(example()).await.unwrap();
    assert_eq!(server.udp_requests(), 0);
    assert_eq!(server.tcp_requests(), 1);
}

#[tokio::test]
async fn pooled_sockets_are_reused() {
    let server = MockServer::start(
        handler(|req, _| Some(answer(req))),
        handler(|req, _| Some(answer(req))),
    )
    .await;
    let udp = Arc::new(UdpTransport::new());
    let tcp = Arc::new(TcpTransport::new());
    let servers = vec![NameServer::new(server.addr)];

    let client = LookupClient::with_parts(
        servers.clone(),
        config(),
        udp.clone(),
        tcp.clone(),
        ResponseCache::new(),
    );
    client.query_question(example()).await.unwrap();
    client.query_question(example()).await.unwrap();
    assert_eq!(udp.pool().len(), 1);

    let mut tcp_config = config();
    tcp_config.set_use_tcp_only(true);
    let client = LookupClient::with_parts(
        servers,
        tcp_config,
        udp,
        tcp.clone(),
        ResponseCache::new(),
    );
    client.query_question(example()).await.unwrap();
    client.query_question(example()).await.unwrap();
    assert_eq!(tcp.pools().idle(server.addr), 1);
    assert_eq!(server.tcp_requests(), 2);
}

fn tcp_client(server: &MockServer, tcp: Arc<TcpTransport>) -> LookupClient {
    let mut config = config();
    config.set_use_tcp_only(true);
    LookupClient::with_parts(
        vec![NameServer::new(server.addr)],
        config,
        Arc::new(UdpTransport::new()),
        tcp,
        ResponseCache::new(),
    )
}

#[tokio::test]
async fn expired_tcp_connection_is_replaced() {
    let server = MockServer::start(
        handler(|_, _| None),
        handler(|req, _| Some(answer(req))),
    )
    .await;
    let mut tcp_config = TcpConfig::new();
    tcp_config.set_max_lifetime(Duration::ZERO);
    let tcp = Arc::new(TcpTransport::with_config(tcp_config));
    let client = tcp_client(&server, tcp.clone());
    client.query_question(example()).await.unwrap();
    client.query_question(example()).await.unwrap();
    assert_eq!(server.tcp_connections(), 2);
    assert_eq!(server.tcp_requests(), 2);
    assert_eq!(tcp.pools().idle(server.addr), 1);
}

#[tokio::test]
async fn closed_tcp_connection_is_retried() {
    // The first connection answers once, then closes on the next request.
    let server = MockServer::start(
        handler(|_, _| None),
        handler(|req, seen| if seen == 1 { None } else { Some(answer(req)) }),
    )
    .await;
    let tcp = Arc::new(TcpTransport::new());
    let client = tcp_client(&server, tcp.clone());
    client.query_question(example()).await.unwrap();
    assert_eq!(tcp.pools().idle(server.addr), 1);

    let res = client.query_question(example()).await.unwrap();
    assert_eq!(res.message().answer().len(), 1);
    assert_eq!(server.tcp_connections(), 2);
    assert_eq!(server.tcp_requests(), 3);
    assert_eq!(tcp.pools().idle(server.addr), 1);
    // The transport recovered on its own.
    assert!(!res.audit().unwrap().iter().any(|event| matches!(
        event,
        AuditEvent::TransportError { .. }
    )));
}

#[tokio::test]
async fn audit_trail() {
    let server = MockServer::udp_only(handler(|req, _| Some(answer(req)))).await;
    let res = client(&[&server], config())
        .query_question(example())
        .await
        .unwrap();
    let events = res.audit().unwrap().events();
    assert!(matches!(
        events[0],
        AuditEvent::ResolvedServers(ref servers) if servers == &[server.addr]
    ));
    assert!(matches!(events[1], AuditEvent::Attempt { attempt: 0, .. }));
    assert!(matches!(events[2], AuditEvent::ResponseHeader { .. }));
    assert!(matches!(
        events.last(),
        Some(AuditEvent::Ended { size: Some(_), .. })
    ));

    let mut config = config();
    config.set_enable_audit_trail(false);
    let res = client(&[&server], config)
        .query_question(example())
        .await
        .unwrap();
    assert!(res.audit().is_none());
}

#[tokio::test]
async fn reverse_lookup() {
    let server = MockServer::udp_only(handler(|req, _| {
        let question = request_question(req);
        assert_eq!(question.qname().to_string(), "1.2.0.192.in-addr.arpa.");
        assert_eq!(question.qtype(), Rtype::PTR);
        Some(response(req, Rcode::NOERROR, false, &[]))
    }))
    .await;
    let res = client(&[&server], config())
        .query_reverse(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)))
        .await
        .unwrap();
    assert_eq!(
        res.message().first_question().unwrap().qname(),
        &"1.2.0.192.in-addr.arpa".parse::<Name>().unwrap()
    );
}

#[test]
fn blocking_query() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let server = runtime.block_on(MockServer::udp_only(handler(|req, _| {
        Some(answer(req))
    })));
    let client = client(&[&server], config());
    let res = client.query_blocking(example()).unwrap();
    assert_eq!(res.message().answer().len(), 1);
    assert_eq!(server.udp_requests(), 1);
}
